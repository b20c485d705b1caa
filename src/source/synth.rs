// Synthetic 802.11 traffic
//
// Seeded simulation of a few access points and their stations. Only frames
// from transmitters on the tuned channel are produced, except probe
// requests, which stations send on every channel they scan.

use super::PacketSource;
use crate::engine::channel::ChannelDef;
use crate::error::{Error, Result};
use crate::wlan::{
    mcs_rate, MacAddr, PacketRecord, PKT_TYPE_ACK, PKT_TYPE_BEACON, PKT_TYPE_CTRL, PKT_TYPE_DATA, PKT_TYPE_IP,
    PKT_TYPE_MGMT, PKT_TYPE_PROBE, PKT_TYPE_QDATA, PKT_TYPE_UDP, PHY_FLAG_BADFCS, RATE_FLAG_HT40, RATE_FLAG_MCS,
    WLAN_FRAME_ACK, WLAN_FRAME_BEACON, WLAN_FRAME_PROBE_REQ, WLAN_FRAME_PROBE_RESP, WLAN_FRAME_QDATA,
    WLAN_MODE_AP, WLAN_MODE_PROBE, WLAN_MODE_STA,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

const NOISE_FLOOR: i32 = -95;

/// Channels access points are placed on, when present in the table
const PREFERRED_CHANNELS: [u32; 6] = [1, 6, 11, 36, 44, 149];

const NETWORK_NAMES: [&str; 6] = ["lab-net", "guest", "iot", "office", "cafe", "mesh"];

/// Legacy rates in 100 kbps units
const LEGACY_RATES: [u32; 6] = [10, 20, 60, 120, 240, 540];

const MIN_INTERVAL: Duration = Duration::from_micros(10);

/// Never fall further behind than this; older slots are skipped
const MAX_BACKLOG: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthConfig {
    pub seed: u64,
    /// Simulated client stations
    pub stations: usize,
    /// Frames per second while tuned to a busy channel
    pub rate: u32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            stations: 12,
            rate: 400,
        }
    }
}

#[derive(Debug, Clone)]
struct SimAp {
    mac: MacAddr,
    essid: &'static str,
    /// Beacons carry no name; probe responses do
    hidden: bool,
    channel: ChannelDef,
    signal: i32,
    seqno: u32,
}

#[derive(Debug, Clone)]
struct SimSta {
    mac: MacAddr,
    ap: usize,
    signal: i32,
    ip: Ipv4Addr,
    seqno: u32,
}

/// Seeded traffic generator implementing [`PacketSource`]
#[derive(Debug)]
pub struct SyntheticSource {
    rng: StdRng,
    aps: Vec<SimAp>,
    stations: Vec<SimSta>,
    channels: Vec<ChannelDef>,
    tuned: Option<(usize, ChannelDef)>,
    interval: Duration,
    next_due: Option<Instant>,
    frames: u64,
}

impl SyntheticSource {
    /// Build the simulated world from a seed and the device's channel table
    pub fn new(config: &SynthConfig, channels: &[ChannelDef]) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);

        let usable: Vec<ChannelDef> = channels
            .iter()
            .copied()
            .filter(|c| PREFERRED_CHANNELS.contains(&c.chan))
            .collect();
        let placement = if usable.is_empty() { channels.to_vec() } else { usable };

        let ap_count = config.stations.div_ceil(4).max(1);
        let mut aps = Vec::with_capacity(ap_count);
        for i in 0..ap_count {
            let Some(channel) = placement.get(rng.random_range(0..placement.len().max(1))).copied() else {
                break;
            };
            aps.push(SimAp {
                mac: MacAddr([0x02, 0xa0, rng.random(), rng.random(), (i >> 8) as u8, i as u8]),
                essid: NETWORK_NAMES[i % NETWORK_NAMES.len()],
                // one hidden network so the split path gets exercised
                hidden: i == 1,
                channel,
                signal: rng.random_range(-85..-35),
                seqno: 0,
            });
        }

        let stations = if aps.is_empty() {
            Vec::new()
        } else {
            (0..config.stations)
                .map(|i| SimSta {
                    mac: MacAddr([0x02, 0x5a, rng.random(), rng.random(), (i >> 8) as u8, i as u8]),
                    ap: rng.random_range(0..aps.len()),
                    signal: rng.random_range(-90..-40),
                    ip: Ipv4Addr::new(192, 168, 1, 10 + (i % 240) as u8),
                    seqno: 0,
                })
                .collect()
        };

        tracing::debug!(
            seed = config.seed,
            aps = aps.len(),
            stations = stations.len(),
            "synthetic source ready"
        );

        Self {
            rng,
            aps,
            stations,
            channels: channels.to_vec(),
            tuned: None,
            interval: (Duration::from_secs(1) / config.rate.max(1)).max(MIN_INTERVAL),
            next_due: None,
            frames: 0,
        }
    }

    /// Frames produced so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn on_tuned(&self, chan: u32) -> (Vec<usize>, Vec<usize>) {
        let aps: Vec<usize> = (0..self.aps.len())
            .filter(|i| self.aps[*i].channel.chan == chan)
            .collect();
        let stations = (0..self.stations.len())
            .filter(|i| aps.contains(&self.stations[*i].ap))
            .collect();
        (aps, stations)
    }

    fn generate(&mut self) -> Option<PacketRecord> {
        let (idx, tuned) = self.tuned?;
        let (aps, stations) = self.on_tuned(tuned.chan);

        let roll = self.rng.random_range(0..100);
        let mut record = if aps.is_empty() {
            // quiet channel, only scanning stations
            if self.stations.is_empty() || roll >= 20 {
                return None;
            }
            let sta = self.rng.random_range(0..self.stations.len());
            self.probe_request(sta)
        } else if roll < 15 || stations.is_empty() {
            let ap = aps[self.rng.random_range(0..aps.len())];
            self.beacon(ap, false)
        } else if roll < 20 {
            let ap = aps[self.rng.random_range(0..aps.len())];
            self.beacon(ap, true)
        } else if roll < 25 {
            let sta = stations[self.rng.random_range(0..stations.len())];
            self.probe_request(sta)
        } else if roll < 40 {
            let sta = stations[self.rng.random_range(0..stations.len())];
            self.ack(self.stations[sta].mac)
        } else if roll < 60 {
            let sta = stations[self.rng.random_range(0..stations.len())];
            self.ap_data(sta)
        } else {
            let sta = stations[self.rng.random_range(0..stations.len())];
            self.sta_data(sta)
        };

        if self.rng.random_bool(0.02) {
            record.phy_flags |= PHY_FLAG_BADFCS;
        }
        record.phy_freq = tuned.freq;
        record.phy_chan = tuned.chan;
        record.pkt_chan_idx = Some(idx);
        record.phy_noise = NOISE_FLOOR + self.rng.random_range(-2..=2);
        record.phy_snr = (record.phy_signal - record.phy_noise).max(0) as u32;
        record.pkt_duration = airtime_us(record.wlan_len, record.rate());
        Some(record)
    }

    fn jitter(&mut self, signal: i32) -> i32 {
        (signal + self.rng.random_range(-4..=4)).min(-20)
    }

    fn beacon(&mut self, ap: usize, probe_response: bool) -> PacketRecord {
        let signal = self.jitter(self.aps[ap].signal);
        let ap = &mut self.aps[ap];
        ap.seqno = (ap.seqno + 1) & 0x0fff;
        let essid = if ap.hidden && !probe_response { "" } else { ap.essid };
        let (pkt_types, wlan_type) = if probe_response {
            (PKT_TYPE_MGMT | PKT_TYPE_PROBE, WLAN_FRAME_PROBE_RESP)
        } else {
            (PKT_TYPE_MGMT | PKT_TYPE_BEACON, WLAN_FRAME_BEACON)
        };
        PacketRecord {
            pkt_types,
            wlan_type,
            phy_signal: signal,
            phy_rate: 10,
            wlan_len: 180 + essid.len() as u32,
            wlan_src: ap.mac,
            wlan_dst: MacAddr::BROADCAST,
            wlan_bssid: ap.mac,
            wlan_essid: essid.to_string(),
            wlan_tsf: u64::from(ap.seqno) * 102_400,
            wlan_bintval: 100,
            wlan_mode: WLAN_MODE_AP,
            wlan_channel: ap.channel.chan,
            wlan_seqno: ap.seqno,
            wlan_rsn: true,
            ..Default::default()
        }
    }

    fn probe_request(&mut self, sta: usize) -> PacketRecord {
        let signal = self.jitter(self.stations[sta].signal);
        let wanted = self.aps[self.stations[sta].ap].essid;
        let essid = if self.rng.random_bool(0.5) { wanted } else { "" };
        let sta = &mut self.stations[sta];
        sta.seqno = (sta.seqno + 1) & 0x0fff;
        PacketRecord {
            pkt_types: PKT_TYPE_MGMT | PKT_TYPE_PROBE,
            wlan_type: WLAN_FRAME_PROBE_REQ,
            phy_signal: signal,
            phy_rate: 10,
            wlan_len: 60 + essid.len() as u32,
            wlan_src: sta.mac,
            wlan_dst: MacAddr::BROADCAST,
            wlan_bssid: MacAddr::BROADCAST,
            wlan_essid: essid.to_string(),
            wlan_mode: WLAN_MODE_PROBE,
            wlan_seqno: sta.seqno,
            ..Default::default()
        }
    }

    fn ack(&mut self, dst: MacAddr) -> PacketRecord {
        let signal = self.jitter(-60);
        PacketRecord {
            pkt_types: PKT_TYPE_CTRL | PKT_TYPE_ACK,
            wlan_type: WLAN_FRAME_ACK,
            phy_signal: signal,
            phy_rate: 60,
            wlan_len: 14,
            wlan_dst: dst,
            ..Default::default()
        }
    }

    fn sta_data(&mut self, sta: usize) -> PacketRecord {
        let signal = self.jitter(self.stations[sta].signal);
        let bssid = self.aps[self.stations[sta].ap].mac;
        let retry = self.rng.random_bool(0.1);
        let len = self.rng.random_range(60..1560);
        let mut record = PacketRecord {
            pkt_types: PKT_TYPE_DATA | PKT_TYPE_QDATA | PKT_TYPE_IP | PKT_TYPE_UDP,
            wlan_type: WLAN_FRAME_QDATA,
            phy_signal: signal,
            wlan_len: len,
            wlan_dst: bssid,
            wlan_bssid: bssid,
            wlan_mode: WLAN_MODE_STA,
            wlan_retry: retry,
            wlan_rsn: true,
            ..Default::default()
        };
        self.pick_rate(&mut record);
        let sta = &mut self.stations[sta];
        if !retry {
            sta.seqno = (sta.seqno + 1) & 0x0fff;
        }
        record.wlan_src = sta.mac;
        record.wlan_seqno = sta.seqno;
        record.ip_src = Some(sta.ip);
        record
    }

    fn ap_data(&mut self, sta: usize) -> PacketRecord {
        let ap = self.stations[sta].ap;
        let signal = self.jitter(self.aps[ap].signal);
        let len = self.rng.random_range(60..1560);
        let mut record = PacketRecord {
            pkt_types: PKT_TYPE_DATA | PKT_TYPE_QDATA,
            wlan_type: WLAN_FRAME_QDATA,
            phy_signal: signal,
            wlan_len: len,
            wlan_dst: self.stations[sta].mac,
            wlan_mode: WLAN_MODE_AP,
            ..Default::default()
        };
        self.pick_rate(&mut record);
        let ap = &mut self.aps[ap];
        ap.seqno = (ap.seqno + 1) & 0x0fff;
        record.wlan_src = ap.mac;
        record.wlan_bssid = ap.mac;
        record.wlan_seqno = ap.seqno;
        record
    }

    fn pick_rate(&mut self, record: &mut PacketRecord) {
        if self.rng.random_bool(0.5) {
            let idx = self.rng.random_range(0..16u8);
            let ht40 = self.rng.random_bool(0.3);
            record.phy_rate_flags = RATE_FLAG_MCS | if ht40 { RATE_FLAG_HT40 } else { 0 };
            record.phy_rate_idx = idx;
            record.phy_rate = mcs_rate(idx, !ht40, true);
        } else {
            record.phy_rate = LEGACY_RATES[self.rng.random_range(0..LEGACY_RATES.len())];
        }
    }
}

impl PacketSource for SyntheticSource {
    fn next_record(&mut self, now: Instant) -> Option<PacketRecord> {
        loop {
            let due = *self.next_due.get_or_insert(now);
            if due > now {
                return None;
            }
            self.next_due = Some(if now.saturating_duration_since(due) > MAX_BACKLOG {
                now + self.interval
            } else {
                due + self.interval
            });
            if let Some(record) = self.generate() {
                self.frames += 1;
                return Some(record);
            }
        }
    }

    fn tune(&mut self, idx: usize, channel: &ChannelDef) -> Result<()> {
        if self.channels.get(idx) != Some(channel) {
            return Err(Error::Tune {
                channel: channel.chan,
                reason: "not in the device channel list".to_string(),
            });
        }
        self.tuned = Some((idx, *channel));
        Ok(())
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

/// Estimated time on air in usec for `len` bytes at `rate` (100 kbps units)
fn airtime_us(len: u32, rate: u32) -> u32 {
    if rate == 0 {
        return 0;
    }
    // preamble plus payload
    20 + len * 8 * 10 / rate
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(seed: u64) -> (SyntheticSource, Vec<ChannelDef>) {
        let channels = ChannelDef::default_table();
        let config = SynthConfig {
            seed,
            stations: 12,
            rate: 1000,
        };
        (SyntheticSource::new(&config, &channels), channels)
    }

    fn drain(src: &mut SyntheticSource, now: Instant) -> Vec<PacketRecord> {
        std::iter::from_fn(|| src.next_record(now)).collect()
    }

    fn busiest(src: &SyntheticSource, channels: &[ChannelDef]) -> usize {
        let chan = src.aps[0].channel.chan;
        channels.iter().position(|c| c.chan == chan).unwrap()
    }

    #[test]
    fn test_untuned_source_is_silent() {
        let (mut src, _) = source(7);
        let start = Instant::now();
        assert!(drain(&mut src, start + Duration::from_millis(500)).is_empty());
    }

    #[test]
    fn test_same_seed_same_traffic() {
        let start = Instant::now();
        let (mut a, channels) = source(42);
        let (mut b, _) = source(42);
        let idx = busiest(&a, &channels);
        a.tune(idx, &channels[idx]).unwrap();
        b.tune(idx, &channels[idx]).unwrap();
        a.next_record(start);
        b.next_record(start);

        let later = start + Duration::from_millis(200);
        let fa = drain(&mut a, later);
        let fb = drain(&mut b, later);
        assert!(!fa.is_empty());
        assert_eq!(fa, fb);
    }

    #[test]
    fn test_frames_follow_tuned_channel() {
        let start = Instant::now();
        let (mut src, channels) = source(3);
        let idx = busiest(&src, &channels);
        src.tune(idx, &channels[idx]).unwrap();
        src.next_record(start);
        let frames = drain(&mut src, start + Duration::from_millis(300));
        assert!(frames.iter().all(|f| f.pkt_chan_idx == Some(idx)));
        assert!(frames.iter().all(|f| f.phy_chan == channels[idx].chan));
        // beacons advertise the AP's own channel
        assert!(frames
            .iter()
            .filter(|f| f.is_beacon())
            .all(|f| f.wlan_channel == channels[idx].chan));
    }

    #[test]
    fn test_pacing() {
        let start = Instant::now();
        let channels = ChannelDef::default_table();
        let config = SynthConfig {
            seed: 9,
            stations: 8,
            rate: 100,
        };
        let mut src = SyntheticSource::new(&config, &channels);
        let idx = channels.iter().position(|c| c.chan == src.aps[0].channel.chan).unwrap();
        src.tune(idx, &channels[idx]).unwrap();
        let first: Vec<_> = drain(&mut src, start);
        assert!(first.len() <= 1);
        let frames = drain(&mut src, start + Duration::from_millis(500));
        assert!(frames.len() <= 51, "got {}", frames.len());
        assert!(!frames.is_empty());
        assert_eq!(src.frames(), (first.len() + frames.len()) as u64);
    }

    #[test]
    fn test_tune_rejects_unknown_channel() {
        let (mut src, _) = source(1);
        let err = src.tune(0, &ChannelDef::new(200, 6000)).unwrap_err();
        assert!(matches!(err, Error::Tune { channel: 200, .. }));
    }

    #[test]
    fn test_airtime() {
        assert_eq!(airtime_us(100, 0), 0);
        assert_eq!(airtime_us(1500, 540), 20 + 222);
        assert_eq!(airtime_us(100, 10), 20 + 800);
    }
}
