// Channel hopping
//
// Walks the channel table one dwell period at a time. The interval on the
// channel being left is closed with a tick before the device is retuned,
// unless that channel has never carried any airtime.

use crate::app::config::HopConfig;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::source::PacketSource;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct ChannelHopper {
    enabled: bool,
    dwell: Duration,
    last_hop: Option<Instant>,
}

impl ChannelHopper {
    pub fn new(config: &HopConfig) -> Self {
        Self {
            enabled: config.enabled,
            dwell: config.dwell,
            last_hop: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            tracing::info!(enabled, "channel hopping toggled");
        }
        self.enabled = enabled;
        self.last_hop = None;
    }

    pub fn dwell(&self) -> Duration {
        self.dwell
    }

    /// Hop to the next channel if the dwell time has passed
    ///
    /// Returns the new channel index after a successful hop. A failed tune
    /// keeps the current channel and is retried after the next dwell period.
    pub fn poll(&mut self, engine: &mut Engine, source: &mut dyn PacketSource, now: Instant) -> Option<usize> {
        if !self.enabled {
            return None;
        }
        let Some(last) = self.last_hop else {
            self.last_hop = Some(now);
            return None;
        };
        if now.saturating_duration_since(last) < self.dwell {
            return None;
        }
        self.last_hop = Some(now);

        let len = engine.channels().len();
        let next = (engine.channels().current_index() + 1) % len.max(1);
        match change_channel(engine, source, next) {
            Ok(()) => Some(next),
            Err(e) => {
                tracing::warn!(error = %e, "channel change failed, staying on current channel");
                None
            }
        }
    }
}

/// Retune the source and move the engine to channel index `idx`
pub fn change_channel(engine: &mut Engine, source: &mut dyn PacketSource, idx: usize) -> Result<()> {
    let def = engine
        .channels()
        .get(idx)
        .map(|slot| slot.def)
        .ok_or(Error::UnknownChannel {
            index: idx,
            len: engine.channels().len(),
        })?;
    source.tune(idx, &def)?;
    let leaving = engine.channels().current();
    if leaving.durations > 0 || leaving.durations_avg.value().is_some() {
        engine.tick();
    }
    engine.set_current_channel(idx)?;
    tracing::debug!(channel = def.chan, freq = def.freq, "tuned");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::EngineConfig;
    use crate::engine::channel::ChannelDef;
    use crate::wlan::PacketRecord;

    /// Records tune calls and can refuse a channel number
    struct MockSource {
        tuned: Vec<usize>,
        refuse: Option<u32>,
    }

    impl PacketSource for MockSource {
        fn next_record(&mut self, _now: Instant) -> Option<PacketRecord> {
            None
        }

        fn tune(&mut self, idx: usize, channel: &ChannelDef) -> Result<()> {
            if self.refuse == Some(channel.chan) {
                return Err(Error::Tune {
                    channel: channel.chan,
                    reason: "busy".to_string(),
                });
            }
            self.tuned.push(idx);
            Ok(())
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    fn setup(refuse: Option<u32>) -> (Engine, MockSource, ChannelHopper) {
        let defs = [ChannelDef::new(1, 2412), ChannelDef::new(6, 2437), ChannelDef::new(11, 2462)];
        let engine = Engine::new(EngineConfig::default(), &defs).unwrap();
        let source = MockSource { tuned: Vec::new(), refuse };
        let hopper = ChannelHopper::new(&HopConfig {
            enabled: true,
            dwell: Duration::from_millis(250),
        });
        (engine, source, hopper)
    }

    #[test]
    fn test_hops_after_dwell_and_wraps() {
        let (mut engine, mut source, mut hopper) = setup(None);
        let start = Instant::now();
        assert_eq!(hopper.poll(&mut engine, &mut source, start), None);
        assert_eq!(hopper.poll(&mut engine, &mut source, start + Duration::from_millis(100)), None);

        let mut t = start;
        let mut seen = Vec::new();
        for _ in 0..3 {
            t += Duration::from_millis(250);
            seen.push(hopper.poll(&mut engine, &mut source, t));
        }
        assert_eq!(seen, vec![Some(1), Some(2), Some(0)]);
        assert_eq!(source.tuned, vec![1, 2, 0]);
        assert_eq!(engine.channels().current_index(), 0);
    }

    #[test]
    fn test_tick_before_leaving_channel() {
        let (mut engine, mut source, _) = setup(None);
        let rec = PacketRecord {
            pkt_duration: 700,
            ..Default::default()
        };
        engine.dispatch(&rec, Instant::now());
        change_channel(&mut engine, &mut source, 2).unwrap();

        let left = engine.channels().get(0).unwrap();
        assert_eq!(left.durations, 0);
        assert_eq!(left.durations_last, 700);
        assert_eq!(engine.channels().current_index(), 2);
    }

    #[test]
    fn test_idle_channel_not_ticked_on_change() {
        let (mut engine, mut source, _) = setup(None);
        change_channel(&mut engine, &mut source, 0).unwrap();
        change_channel(&mut engine, &mut source, 1).unwrap();

        let idle = engine.channels().get(0).unwrap();
        assert_eq!(idle.durations_avg.value(), None);
        assert_eq!(idle.utilization(Duration::from_millis(100)), 0.0);
        assert_eq!(engine.channels().current_index(), 1);
        assert_eq!(source.tuned, vec![0, 1]);
    }

    #[test]
    fn test_failed_tune_keeps_channel() {
        let (mut engine, mut source, mut hopper) = setup(Some(6));
        let start = Instant::now();
        hopper.poll(&mut engine, &mut source, start);
        let out = hopper.poll(&mut engine, &mut source, start + Duration::from_millis(300));
        assert_eq!(out, None);
        assert_eq!(engine.channels().current_index(), 0);
        assert!(source.tuned.is_empty());
    }

    #[test]
    fn test_disabled_never_hops() {
        let (mut engine, mut source, mut hopper) = setup(None);
        hopper.set_enabled(false);
        let start = Instant::now();
        for i in 0..5 {
            assert_eq!(hopper.poll(&mut engine, &mut source, start + Duration::from_secs(i)), None);
        }
        assert_eq!(engine.channels().current_index(), 0);
    }

    #[test]
    fn test_change_channel_out_of_range() {
        let (mut engine, mut source, _) = setup(None);
        let err = change_channel(&mut engine, &mut source, 9).unwrap_err();
        assert_eq!(err, Error::UnknownChannel { index: 9, len: 3 });
    }
}
