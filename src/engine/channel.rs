// Channel spectrum table
//
// One aggregate slot per channel the capture device can tune to, built once
// at startup. Frames are always attributed to the channel the device is
// tuned to (`current_index`), never to the channel a transmitter claims.

use super::ewma::Ewma;
use super::node::NodeId;
use crate::error::{Error, Result};
use crate::wlan::PacketRecord;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

/// Channel number and centre frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelDef {
    pub chan: u32,
    /// MHz
    pub freq: u32,
}

impl ChannelDef {
    pub const fn new(chan: u32, freq: u32) -> Self {
        Self { chan, freq }
    }

    /// 2.4 GHz channels 1-14 and the common 5 GHz channels
    pub fn default_table() -> Vec<ChannelDef> {
        let mut table: Vec<ChannelDef> = (1..=13).map(|c| ChannelDef::new(c, 2407 + 5 * c)).collect();
        table.push(ChannelDef::new(14, 2484));
        let five_ghz = (36..=64)
            .step_by(4)
            .chain((100..=140).step_by(4))
            .chain((149..=165).step_by(4));
        table.extend(five_ghz.map(|c| ChannelDef::new(c, 5000 + 5 * c)));
        table
    }
}

/// What one channel knows about one node seen on it
#[derive(Debug, Clone)]
pub struct ChannelNode {
    /// Last signal from this node on this channel
    pub sig: i32,
    pub sig_avg: Ewma,
    pub packets: u64,
}

/// Aggregate state of one channel
#[derive(Debug, Clone)]
pub struct ChannelSlot {
    pub def: ChannelDef,
    pub signal: i32,
    pub signal_avg: Ewma,
    pub noise: i32,
    pub noise_avg: Ewma,
    pub packets: u64,
    pub bytes: u64,
    /// Airtime (usec) since the last tick
    pub durations: u64,
    /// Airtime (usec) since startup
    pub durations_total: u64,
    /// Airtime of the last completed tick interval
    pub durations_last: u64,
    /// Smoothed airtime per tick interval
    pub durations_avg: Ewma,
    nodes: BTreeMap<NodeId, ChannelNode>,
    ewma_weight: f64,
}

impl ChannelSlot {
    fn new(def: ChannelDef, ewma_weight: f64) -> Self {
        Self {
            def,
            signal: 0,
            signal_avg: Ewma::new(ewma_weight),
            noise: 0,
            noise_avg: Ewma::new(ewma_weight),
            packets: 0,
            bytes: 0,
            durations: 0,
            durations_total: 0,
            durations_last: 0,
            durations_avg: Ewma::new(ewma_weight),
            nodes: BTreeMap::new(),
            ewma_weight,
        }
    }

    /// Nodes cross-referenced as seen on this channel
    pub fn nodes(&self) -> &BTreeMap<NodeId, ChannelNode> {
        &self.nodes
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Smoothed share of each tick interval spent on air, 0.0 - 1.0
    pub fn utilization(&self, interval: Duration) -> f64 {
        let interval_us = interval.as_micros() as f64;
        if interval_us <= 0.0 {
            return 0.0;
        }
        (self.durations_avg.get() / interval_us).clamp(0.0, 1.0)
    }

    fn record(&mut self, record: &PacketRecord) {
        self.signal = record.phy_signal;
        if record.phy_signal != 0 {
            self.signal_avg.update(f64::from(record.phy_signal));
        }
        self.noise = record.phy_noise;
        if record.phy_noise != 0 {
            self.noise_avg.update(f64::from(record.phy_noise));
        }
        self.packets += 1;
        self.bytes += u64::from(record.wlan_len);
        self.durations += u64::from(record.pkt_duration);
        self.durations_total += u64::from(record.pkt_duration);
    }

    fn tick(&mut self) {
        self.durations_last = self.durations;
        self.durations = 0;
        self.durations_avg.update(self.durations_last as f64);
    }
}

/// Fixed table of channel slots plus the currently tuned index
#[derive(Debug, Clone)]
pub struct ChannelTable {
    slots: Vec<ChannelSlot>,
    current: usize,
}

impl ChannelTable {
    /// Build the table; channel numbers must be unique and non-empty
    pub fn new(defs: &[ChannelDef], ewma_weight: f64) -> Result<Self> {
        if defs.is_empty() {
            return Err(Error::EmptyChannelTable);
        }
        let mut seen = HashSet::new();
        for def in defs {
            if !seen.insert(def.chan) {
                return Err(Error::DuplicateChannel(def.chan));
            }
        }
        Ok(Self {
            slots: defs.iter().map(|d| ChannelSlot::new(*d, ewma_weight)).collect(),
            current: 0,
        })
    }

    /// Account a frame against the current channel, returning its index
    pub fn record(&mut self, record: &PacketRecord) -> usize {
        let idx = self.current;
        self.slots[idx].record(record);
        idx
    }

    /// Cross-reference a node on a channel; `true` if newly added
    pub(crate) fn link_node(&mut self, idx: usize, node: NodeId, record: &PacketRecord) -> bool {
        let Some(slot) = self.slots.get_mut(idx) else {
            return false;
        };
        let weight = slot.ewma_weight;
        let mut added = false;
        let entry = slot.nodes.entry(node).or_insert_with(|| {
            added = true;
            ChannelNode {
                sig: 0,
                sig_avg: Ewma::new(weight),
                packets: 0,
            }
        });
        entry.sig = record.phy_signal;
        if record.phy_signal != 0 {
            entry.sig_avg.update(f64::from(record.phy_signal));
        }
        entry.packets += 1;
        added
    }

    /// Remove a node's cross-reference; `true` if it was present
    pub(crate) fn unlink_node(&mut self, idx: usize, node: NodeId) -> bool {
        self.slots
            .get_mut(idx)
            .is_some_and(|slot| slot.nodes.remove(&node).is_some())
    }

    /// Close the current tick interval on the current channel
    ///
    /// The since-last-tick airtime moves into `durations_last` and the
    /// smoothed per-tick average; the cumulative counter is untouched.
    pub fn tick(&mut self) {
        let idx = self.current;
        self.slots[idx].tick();
    }

    /// Set the channel the capture device is tuned to
    pub fn set_current(&mut self, idx: usize) -> Result<()> {
        if idx >= self.slots.len() {
            return Err(Error::UnknownChannel {
                index: idx,
                len: self.slots.len(),
            });
        }
        self.current = idx;
        Ok(())
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &ChannelSlot {
        &self.slots[self.current]
    }

    /// Index of a channel number
    pub fn find_index(&self, chan: u32) -> Option<usize> {
        self.slots.iter().position(|s| s.def.chan == chan)
    }

    /// Index of a centre frequency (MHz)
    pub fn find_by_freq(&self, freq: u32) -> Option<usize> {
        self.slots.iter().position(|s| s.def.freq == freq)
    }

    pub fn get(&self, idx: usize) -> Option<&ChannelSlot> {
        self.slots.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelSlot> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
