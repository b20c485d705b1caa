// History ring buffer
//
// Fixed-capacity circular buffer of recent per-packet samples, read
// newest-first by trend and sparkline consumers.

use crate::wlan::PacketRecord;

/// One packet's contribution to the history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistorySample {
    pub signal: i32,
    pub noise: i32,
    /// Rate in 100 kbps units
    pub rate: u32,
    /// Frame type code (`1` for bad FCS)
    pub frame_type: u16,
    pub retry: bool,
}

impl HistorySample {
    pub fn from_record(record: &PacketRecord) -> Self {
        Self {
            signal: record.phy_signal,
            noise: record.phy_noise,
            rate: record.rate(),
            frame_type: record.type_code(),
            retry: record.wlan_retry,
        }
    }
}

/// Ring of the N most recent samples
#[derive(Debug, Clone)]
pub struct History {
    samples: Vec<HistorySample>,
    /// Next slot to write
    index: usize,
    /// Valid entries, `min(pushed, capacity)`
    len: usize,
}

impl History {
    /// Create an empty history; a capacity of 0 is raised to 1
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![HistorySample::default(); capacity.max(1)],
            index: 0,
            len: 0,
        }
    }

    /// Store a sample, overwriting the oldest once full. O(1).
    pub fn push(&mut self, sample: HistorySample) {
        self.samples[self.index] = sample;
        self.index = (self.index + 1) % self.samples.len();
        self.len = (self.len + 1).min(self.samples.len());
    }

    /// Samples from most recent to oldest
    pub fn iter_recent(&self) -> impl Iterator<Item = &HistorySample> + '_ {
        let cap = self.samples.len();
        (1..=self.len).map(move |back| &self.samples[(self.index + cap - back) % cap])
    }

    pub fn latest(&self) -> Option<&HistorySample> {
        self.iter_recent().next()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(signal: i32) -> HistorySample {
        HistorySample {
            signal,
            ..Default::default()
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Pushing capacity + k samples keeps exactly capacity entries,
        /// newest first
        #[test]
        fn prop_wraps_at_capacity(capacity in 1usize..64, extra in 0usize..200) {
            let mut hist = History::new(capacity);
            let total = capacity + extra;
            for i in 0..total {
                hist.push(sample(i as i32));
            }
            prop_assert_eq!(hist.len(), capacity);
            prop_assert_eq!(hist.latest().map(|s| s.signal), Some(total as i32 - 1));

            let seen: Vec<i32> = hist.iter_recent().map(|s| s.signal).collect();
            let expected: Vec<i32> = (total - capacity..total).rev().map(|i| i as i32).collect();
            prop_assert_eq!(seen, expected);
        }
    }

    #[test]
    fn test_partial_fill() {
        let mut hist = History::new(255);
        assert!(hist.is_empty());
        assert_eq!(hist.latest(), None);

        hist.push(sample(-40));
        hist.push(sample(-50));
        assert_eq!(hist.len(), 2);
        let seen: Vec<i32> = hist.iter_recent().map(|s| s.signal).collect();
        assert_eq!(seen, vec![-50, -40]);

        // restartable
        assert_eq!(hist.iter_recent().count(), 2);
    }

    #[test]
    fn test_zero_capacity_is_usable() {
        let mut hist = History::new(0);
        hist.push(sample(-1));
        hist.push(sample(-2));
        assert_eq!(hist.capacity(), 1);
        assert_eq!(hist.latest().map(|s| s.signal), Some(-2));
    }
}
