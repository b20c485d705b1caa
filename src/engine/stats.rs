// Global statistics
//
// Packet/retry/byte/airtime counters, overall and broken down by PHY rate
// slot and by frame type code. Only `reset` ever lowers a counter.

use crate::wlan::{rate_slot, PacketRecord, MAX_RATES, RATE_FLAG_MCS};

/// Number of frame type code slots
pub const MAX_FSTYPE: usize = 256;

/// One set of additive counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub packets: u64,
    pub retries: u64,
    pub bytes: u64,
    /// Airtime in usec
    pub duration: u64,
}

impl Counters {
    fn add(&mut self, record: &PacketRecord) {
        self.packets += 1;
        if record.wlan_retry {
            self.retries += 1;
        }
        self.bytes += u64::from(record.wlan_len);
        self.duration += u64::from(record.pkt_duration);
    }
}

#[derive(Debug, Clone)]
pub struct Statistics {
    total: Counters,
    per_rate: [Counters; MAX_RATES],
    per_type: Vec<Counters>,
    /// Frames rejected by the packet filter
    pub filtered_packets: u64,
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}

impl Statistics {
    pub fn new() -> Self {
        Self {
            total: Counters::default(),
            per_rate: [Counters::default(); MAX_RATES],
            per_type: vec![Counters::default(); MAX_FSTYPE],
            filtered_packets: 0,
        }
    }

    pub fn record(&mut self, record: &PacketRecord) {
        self.total.add(record);

        let mcs = (record.phy_rate_flags & RATE_FLAG_MCS != 0).then_some(record.phy_rate_idx);
        self.per_rate[rate_slot(record.phy_rate, mcs)].add(record);

        let code = usize::from(record.type_code()) % MAX_FSTYPE;
        self.per_type[code].add(record);
    }

    /// Zero every counter
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn total(&self) -> &Counters {
        &self.total
    }

    /// Counters for a rate slot (0 = unknown)
    pub fn rate(&self, slot: usize) -> Option<&Counters> {
        self.per_rate.get(slot)
    }

    /// Counters for a frame type code
    pub fn frame_type(&self, code: u16) -> Option<&Counters> {
        self.per_type.get(usize::from(code))
    }

    /// Non-empty rate slots, lowest first
    pub fn rates(&self) -> impl Iterator<Item = (usize, &Counters)> {
        self.per_rate.iter().enumerate().filter(|(_, c)| c.packets > 0)
    }

    /// Non-empty frame type codes, lowest first
    pub fn frame_types(&self) -> impl Iterator<Item = (u16, &Counters)> {
        self.per_type
            .iter()
            .enumerate()
            .filter(|(_, c)| c.packets > 0)
            .map(|(code, c)| (code as u16, c))
    }
}
