// Packet classification and aggregation engine
//
// `Engine` owns every aggregate index (nodes, ESSIDs, channels, history,
// statistics) and is the only place links between them are changed. Each
// record is dispatched in a fixed order:
//   statistics -> history -> channel table -> node routing
// Housekeeping (tick, timeout sweep, channel change) runs between dispatches
// on the caller's cadence, never inside one.

pub mod channel;
pub mod essid;
pub mod ewma;
pub mod filter;
pub mod history;
pub mod node;
pub mod stats;

use crate::app::config::EngineConfig;
use crate::error::{Error, Result};
use crate::wlan::PacketRecord;
use channel::{ChannelDef, ChannelTable};
use essid::{EssidId, EssidRegistry};
use filter::PacketFilter;
use history::{History, HistorySample};
use node::{NodeId, NodeRegistry};
use stats::Statistics;
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Why a record did not reach a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Not a beacon/probe/data frame, bad FCS, or no usable source address
    NotAttributable,
    /// New MAC while the node registry is full
    CapacityExhausted,
}

/// Result of routing one record to the node registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Created(NodeId),
    Updated(NodeId),
    Dropped(DropReason),
}

impl RouteOutcome {
    pub fn node(&self) -> Option<NodeId> {
        match self {
            RouteOutcome::Created(id) | RouteOutcome::Updated(id) => Some(*id),
            RouteOutcome::Dropped(_) => None,
        }
    }
}

/// Aggregate state of one capture stream
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    nodes: NodeRegistry,
    essids: EssidRegistry,
    channels: ChannelTable,
    history: History,
    stats: Statistics,
    filter: PacketFilter,
    paused: bool,
    /// New MACs dropped because the registry was full
    dropped: u64,
}

impl Engine {
    pub fn new(config: EngineConfig, channels: &[ChannelDef]) -> Result<Self> {
        let channels = ChannelTable::new(channels, config.ewma_weight)?;
        Ok(Self {
            nodes: NodeRegistry::new(config.node_capacity),
            essids: EssidRegistry::new(config.split_trigger),
            history: History::new(config.history_capacity),
            stats: Statistics::new(),
            filter: PacketFilter::default(),
            paused: false,
            dropped: 0,
            channels,
            config,
        })
    }

    /// Feed one record through every index
    ///
    /// Returns `None` when nothing was dispatched (paused or filtered).
    pub fn dispatch(&mut self, record: &PacketRecord, now: Instant) -> Option<RouteOutcome> {
        if self.paused {
            return None;
        }
        if !self.filter.accepts(record) {
            self.stats.filtered_packets += 1;
            return None;
        }

        self.stats.record(record);
        self.history.push(HistorySample::from_record(record));
        let chan_idx = self.channels.record(record);
        Some(self.classify_and_route(record, chan_idx, now))
    }

    /// Create or update the node a record belongs to
    fn classify_and_route(&mut self, record: &PacketRecord, chan_idx: usize, now: Instant) -> RouteOutcome {
        if !record.identifies_node() {
            return RouteOutcome::Dropped(DropReason::NotAttributable);
        }

        let (id, created) = match self.nodes.lookup(&record.wlan_src) {
            Some(id) => (id, false),
            None => match self.register_node(record, now) {
                Some(id) => (id, true),
                None => return RouteOutcome::Dropped(DropReason::CapacityExhausted),
            },
        };

        let ap_channel = self
            .nodes
            .get(id)
            .and_then(|n| n.ap_node)
            .and_then(|ap| self.nodes.get(ap))
            .map(|ap| ap.wlan_channel)
            .filter(|ch| *ch != 0);
        if let Some(node) = self.nodes.get_mut(id) {
            node.apply(record, now, ap_channel);
        }

        self.route_essid(id, record);
        self.link_ap(id);
        self.link_channel(id, chan_idx, record);

        if created {
            RouteOutcome::Created(id)
        } else {
            RouteOutcome::Updated(id)
        }
    }

    fn register_node(&mut self, record: &PacketRecord, now: Instant) -> Option<NodeId> {
        let mac = record.wlan_src;
        match self.nodes.insert(mac, now, self.config.ewma_weight, EssidId::HIDDEN) {
            Some(id) => {
                self.essids.attach(id, EssidId::HIDDEN);
                tracing::debug!(mac = %mac, node = %id, "new node");
                Some(id)
            }
            None => {
                if self.dropped == 0 {
                    tracing::warn!(
                        mac = %mac,
                        capacity = self.nodes.capacity(),
                        "node table full, dropping new nodes"
                    );
                }
                self.dropped += 1;
                None
            }
        }
    }

    /// Attribute a node to its ESSID group
    ///
    /// Beacons and probe responses carry the name. Other frames only move a
    /// hidden node once its BSSID has been correlated with a named group.
    fn route_essid(&mut self, id: NodeId, record: &PacketRecord) {
        let Some((hidden, bssid)) = self.nodes.get(id).map(|n| (n.essid.is_hidden(), n.bssid)) else {
            return;
        };
        let target = if record.advertises_network() {
            let res = self
                .essids
                .resolve(&record.wlan_essid, record.wlan_bssid, record.is_probe_response());
            if let Some(bssid) = res.correlated {
                self.migrate_hidden(bssid, res.group);
            }
            res.group
        } else if hidden {
            self.essids.resolve("", bssid, false).group
        } else {
            return;
        };
        self.relink_essid(id, target);
    }

    /// Move hidden members on `bssid` into the named group it now maps to
    fn migrate_hidden(&mut self, bssid: crate::wlan::MacAddr, group: EssidId) {
        let moving: Vec<NodeId> = self
            .essids
            .hidden()
            .members()
            .iter()
            .copied()
            .filter(|m| self.nodes.get(*m).is_some_and(|n| n.bssid == bssid))
            .collect();
        if moving.is_empty() {
            return;
        }
        for m in &moving {
            self.relink_essid(*m, group);
        }
        self.essids.mark_hidden_split(group);
        tracing::debug!(bssid = %bssid, moved = moving.len(), "hidden nodes moved to named ESSID");
    }

    /// Single mutation path for the node <-> ESSID link
    fn relink_essid(&mut self, id: NodeId, group: EssidId) {
        if self.essids.get(group).is_none() {
            return;
        }
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        let old = node.essid;
        if old == group {
            return;
        }
        node.essid = group;
        self.essids.detach(id, old);
        self.essids.attach(id, group);
    }

    /// Point a station at the registered node owning its BSSID
    fn link_ap(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        if !node.is_station() || !node.bssid.is_unicast_identity() || node.bssid == node.mac {
            return;
        }
        let ap = self.nodes.lookup(&node.bssid);
        if ap.is_none() || node.ap_node == ap {
            return;
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.ap_node = ap;
        }
    }

    /// Single mutation path for the node <-> channel relation
    fn link_channel(&mut self, id: NodeId, chan_idx: usize, record: &PacketRecord) {
        if self.channels.link_node(chan_idx, id, record) {
            if let Some(node) = self.nodes.get_mut(id) {
                node.channels.insert(chan_idx);
            }
            tracing::debug!(node = %id, channel = chan_idx, "node seen on new channel");
        }
    }

    /// Remove nodes not seen for longer than `timeout`, returning how many
    pub fn sweep_timeouts(&mut self, now: Instant, timeout: Duration) -> usize {
        let expired = self.nodes.expired(now, timeout);
        for id in &expired {
            self.remove_node(*id);
        }
        if !expired.is_empty() {
            tracing::info!(removed = expired.len(), remaining = self.nodes.len(), "node timeout sweep");
        }
        expired.len()
    }

    /// Sweep with the configured node timeout
    pub fn sweep(&mut self, now: Instant) -> usize {
        self.sweep_timeouts(now, self.config.node_timeout)
    }

    /// Remove a node and retract it from every index
    fn remove_node(&mut self, id: NodeId) {
        let Some(node) = self.nodes.remove(id) else {
            return;
        };
        self.essids.detach(id, node.essid);
        for idx in &node.channels {
            self.channels.unlink_node(*idx, id);
        }
        tracing::debug!(mac = %node.mac, node = %id, "node timed out");
    }

    /// Close the current channel's tick interval
    pub fn tick(&mut self) {
        self.channels.tick();
    }

    /// Record which channel index the capture device is tuned to
    pub fn set_current_channel(&mut self, idx: usize) -> Result<()> {
        self.channels.set_current(idx)
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            tracing::info!(paused, "dispatch paused state changed");
        }
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Clear statistics counters; identity state is untouched
    pub fn reset_stats(&mut self) {
        self.stats.reset();
        tracing::info!("statistics reset");
    }

    pub fn set_filter(&mut self, filter: PacketFilter) {
        self.filter = filter;
    }

    pub fn filter(&self) -> &PacketFilter {
        &self.filter
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn nodes(&self) -> &NodeRegistry {
        &self.nodes
    }

    pub fn essids(&self) -> &EssidRegistry {
        &self.essids
    }

    pub fn channels(&self) -> &ChannelTable {
        &self.channels
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    /// New MACs dropped since startup because the registry was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Verify every cross-index invariant
    pub fn check_integrity(&self) -> Result<()> {
        let fail = |msg: String| Err(Error::Integrity(msg));

        if self.nodes.len() > self.nodes.capacity() {
            return fail(format!("{} nodes exceed capacity {}", self.nodes.len(), self.nodes.capacity()));
        }

        let mut macs = HashSet::new();
        for node in self.nodes.iter() {
            if !macs.insert(node.mac) {
                return fail(format!("duplicate MAC {}", node.mac));
            }
            if self.nodes.lookup(&node.mac) != Some(node.id) {
                return fail(format!("{} not indexed by MAC {}", node.id, node.mac));
            }
            match self.essids.get(node.essid) {
                Some(group) if group.members().contains(&node.id) => {}
                _ => return fail(format!("{} missing from its ESSID group", node.id)),
            }
            for idx in &node.channels {
                if !self.channels.get(*idx).is_some_and(|slot| slot.has_node(node.id)) {
                    return fail(format!("{} lists channel {} without back-reference", node.id, idx));
                }
            }
            if let Some(ap) = node.ap_node {
                if self.nodes.get(ap).is_none() {
                    return fail(format!("{} points at removed AP {}", node.id, ap));
                }
            }
        }

        for group in self.essids.iter_all() {
            for member in group.members() {
                if self.nodes.get(*member).map(|n| n.essid) != Some(group.id()) {
                    return fail(format!("ESSID {:?} holds stale member {}", group.name(), member));
                }
            }
        }

        for (idx, slot) in self.channels.iter().enumerate() {
            for id in slot.nodes().keys() {
                if !self.nodes.get(*id).is_some_and(|n| n.channels.contains(&idx)) {
                    return fail(format!("channel {} holds stale node {}", slot.def.chan, id));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wlan::{
        MacAddr, PHY_FLAG_BADFCS, PKT_TYPE_ACK, PKT_TYPE_BEACON, PKT_TYPE_CTRL, PKT_TYPE_DATA, PKT_TYPE_MGMT,
        PKT_TYPE_PROBE, WLAN_FRAME_ACK, WLAN_FRAME_BEACON, WLAN_FRAME_DATA, WLAN_FRAME_PROBE_REQ,
        WLAN_FRAME_PROBE_RESP, WLAN_MODE_AP, WLAN_MODE_PROBE, WLAN_MODE_STA,
    };
    use essid::SplitTrigger;
    use proptest::prelude::*;

    const AP: MacAddr = MacAddr([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01]);
    const STA: MacAddr = MacAddr([0x02, 0x11, 0x22, 0x33, 0x44, 0x55]);

    fn engine() -> Engine {
        Engine::new(EngineConfig::default(), &ChannelDef::default_table()).unwrap()
    }

    fn beacon(src: MacAddr, essid: &str) -> PacketRecord {
        PacketRecord {
            pkt_types: PKT_TYPE_MGMT | PKT_TYPE_BEACON,
            wlan_type: WLAN_FRAME_BEACON,
            wlan_src: src,
            wlan_dst: MacAddr::BROADCAST,
            wlan_bssid: src,
            wlan_essid: essid.to_string(),
            wlan_mode: WLAN_MODE_AP,
            wlan_channel: 4,
            phy_signal: -40,
            phy_rate: 10,
            wlan_len: 120,
            pkt_duration: 1000,
            ..Default::default()
        }
    }

    fn probe_response(src: MacAddr, essid: &str) -> PacketRecord {
        PacketRecord {
            pkt_types: PKT_TYPE_MGMT | PKT_TYPE_PROBE,
            wlan_type: WLAN_FRAME_PROBE_RESP,
            ..beacon(src, essid)
        }
    }

    fn data(src: MacAddr, bssid: MacAddr) -> PacketRecord {
        PacketRecord {
            pkt_types: PKT_TYPE_DATA,
            wlan_type: WLAN_FRAME_DATA,
            wlan_src: src,
            wlan_dst: bssid,
            wlan_bssid: bssid,
            wlan_mode: WLAN_MODE_STA,
            phy_signal: -60,
            phy_rate: 540,
            wlan_len: 1500,
            pkt_duration: 300,
            ..Default::default()
        }
    }

    fn ack(dst: MacAddr) -> PacketRecord {
        PacketRecord {
            pkt_types: PKT_TYPE_CTRL | PKT_TYPE_ACK,
            wlan_type: WLAN_FRAME_ACK,
            wlan_dst: dst,
            phy_signal: -55,
            ..Default::default()
        }
    }

    #[test]
    fn test_end_to_end_two_channels() {
        let mut eng = engine();
        let now = Instant::now();

        eng.set_current_channel(3).unwrap();
        let first = eng.dispatch(&beacon(AP, "lab-net"), now);
        let id = match first {
            Some(RouteOutcome::Created(id)) => id,
            other => panic!("expected Created, got {other:?}"),
        };

        assert_eq!(eng.nodes().len(), 1);
        let node = eng.nodes().get(id).unwrap();
        assert_eq!(node.channels().iter().copied().collect::<Vec<_>>(), vec![3]);
        assert_eq!(eng.essids().len(), 1);
        let group = eng.essids().get_by_name("lab-net").unwrap();
        assert_eq!(group.num_nodes(), 1);
        assert_eq!(node.essid(), group.id());
        let slot = eng.channels().get(3).unwrap();
        assert_eq!(slot.nodes().keys().copied().collect::<Vec<_>>(), vec![id]);
        assert_eq!(slot.packets, 1);

        eng.set_current_channel(5).unwrap();
        let second = eng.dispatch(&beacon(AP, "lab-net"), now);
        assert_eq!(second, Some(RouteOutcome::Updated(id)));

        assert_eq!(eng.nodes().len(), 1);
        let node = eng.nodes().get(id).unwrap();
        assert_eq!(node.channels().iter().copied().collect::<Vec<_>>(), vec![3, 5]);
        assert!(eng.channels().get(5).unwrap().has_node(id));
        assert_eq!(eng.stats().total().packets, 2);
        eng.check_integrity().unwrap();
    }

    #[test]
    fn test_control_frames_feed_stats_but_not_nodes() {
        let mut eng = engine();
        let now = Instant::now();
        let out = eng.dispatch(&ack(AP), now);
        assert_eq!(out, Some(RouteOutcome::Dropped(DropReason::NotAttributable)));
        assert!(eng.nodes().is_empty());
        assert_eq!(eng.stats().total().packets, 1);
        assert_eq!(eng.history().len(), 1);
        assert_eq!(eng.channels().current().packets, 1);
    }

    #[test]
    fn test_bad_fcs_and_broadcast_source_unattributed() {
        let mut eng = engine();
        let now = Instant::now();
        let mut bad = beacon(AP, "lab-net");
        bad.phy_flags = PHY_FLAG_BADFCS;
        assert_eq!(eng.dispatch(&bad, now), Some(RouteOutcome::Dropped(DropReason::NotAttributable)));
        let bcast = data(MacAddr::BROADCAST, AP);
        assert_eq!(eng.dispatch(&bcast, now), Some(RouteOutcome::Dropped(DropReason::NotAttributable)));
        assert!(eng.nodes().is_empty());
        assert_eq!(eng.history().latest().map(|s| s.frame_type), Some(0x08));
    }

    #[test]
    fn test_capacity_exhaustion_drops() {
        let config = EngineConfig {
            node_capacity: 2,
            ..Default::default()
        };
        let mut eng = Engine::new(config, &ChannelDef::default_table()).unwrap();
        let now = Instant::now();
        let macs: Vec<MacAddr> = (1..=3).map(|i| MacAddr([2, 0, 0, 0, 0, i])).collect();
        eng.dispatch(&data(macs[0], AP), now);
        eng.dispatch(&data(macs[1], AP), now);
        let out = eng.dispatch(&data(macs[2], AP), now);
        assert_eq!(out, Some(RouteOutcome::Dropped(DropReason::CapacityExhausted)));
        assert_eq!(eng.nodes().len(), 2);
        assert_eq!(eng.dropped(), 1);
        assert!(eng.nodes().lookup(&macs[2]).is_none());
        // existing nodes untouched by the dropped frame
        assert_eq!(eng.nodes().get_by_mac(&macs[0]).unwrap().pkt_count, 1);
        eng.check_integrity().unwrap();
    }

    #[test]
    fn test_sweep_cascades() {
        let mut eng = engine();
        let start = Instant::now();
        eng.set_current_channel(0).unwrap();
        eng.dispatch(&beacon(AP, "lab-net"), start);
        eng.set_current_channel(2).unwrap();
        let later = start + Duration::from_secs(30);
        eng.dispatch(&data(STA, AP), later);
        let sta = eng.nodes().lookup(&STA).unwrap();
        let ap = eng.nodes().lookup(&AP).unwrap();
        assert_eq!(eng.nodes().get(sta).unwrap().ap_node(), Some(ap));

        let removed = eng.sweep_timeouts(start + Duration::from_secs(61), Duration::from_secs(60));
        assert_eq!(removed, 1);
        assert!(eng.nodes().get(ap).is_none());
        assert_eq!(eng.nodes().get(sta).unwrap().ap_node(), None);
        // the station followed the correlated BSSID into the named group
        assert_eq!(eng.essids().get_by_name("lab-net").unwrap().num_nodes(), 1);
        assert!(!eng.channels().get(0).unwrap().has_node(ap));
        // the ESSID group outlives its members
        assert_eq!(eng.essids().len(), 1);
        eng.check_integrity().unwrap();

        assert_eq!(eng.sweep(later + Duration::from_secs(61)), 1);
        assert!(eng.nodes().is_empty());
        assert!(eng.channels().iter().all(|slot| slot.num_nodes() == 0));
        assert_eq!(eng.essids().get_by_name("lab-net").unwrap().num_nodes(), 0);
        eng.check_integrity().unwrap();
    }

    #[test]
    fn test_station_inherits_ap_channel() {
        let mut eng = engine();
        let now = Instant::now();
        eng.dispatch(&beacon(AP, "lab-net"), now);
        eng.dispatch(&data(STA, AP), now);
        eng.dispatch(&data(STA, AP), now);
        assert_eq!(eng.nodes().get_by_mac(&STA).unwrap().wlan_channel, 4);
    }

    #[test]
    fn test_hidden_members_move_on_correlation() {
        let mut eng = engine();
        let now = Instant::now();
        eng.dispatch(&beacon(AP, ""), now);
        eng.dispatch(&data(STA, AP), now);
        assert_eq!(eng.essids().hidden().num_nodes(), 2);
        assert!(!eng.essids().hidden().is_split());

        eng.dispatch(&beacon(AP, "lab-net"), now);
        let named = eng.essids().get_by_name("lab-net").unwrap();
        assert_eq!(named.num_nodes(), 2);
        assert_eq!(eng.essids().hidden().num_nodes(), 0);
        assert!(eng.essids().hidden().is_split());
        assert_eq!(eng.essids().hidden().split_essid(), Some(named.id()));

        // further hidden beacons from that BSSID stay with the named group
        let named_id = named.id();
        eng.dispatch(&beacon(AP, ""), now);
        assert_eq!(eng.nodes().get_by_mac(&AP).unwrap().essid(), named_id);
        eng.check_integrity().unwrap();
    }

    #[test]
    fn test_late_station_follows_correlated_bssid() {
        let mut eng = engine();
        let now = Instant::now();
        eng.dispatch(&beacon(AP, "lab-net"), now);
        eng.dispatch(&data(STA, AP), now);
        let named = eng.essids().get_by_name("lab-net").unwrap().id();
        assert_eq!(eng.nodes().get_by_mac(&STA).unwrap().essid(), named);
        eng.check_integrity().unwrap();
    }

    #[test]
    fn test_probe_response_trigger_ignores_beacons() {
        let config = EngineConfig {
            split_trigger: SplitTrigger::ProbeResponse,
            ..Default::default()
        };
        let mut eng = Engine::new(config, &ChannelDef::default_table()).unwrap();
        let now = Instant::now();
        eng.dispatch(&data(STA, AP), now);
        eng.dispatch(&beacon(AP, "lab-net"), now);
        assert_eq!(eng.essids().hidden().num_nodes(), 1);
        assert!(!eng.essids().hidden().is_split());

        eng.dispatch(&probe_response(AP, "lab-net"), now);
        assert_eq!(eng.essids().hidden().num_nodes(), 0);
        assert!(eng.essids().hidden().is_split());
        assert_eq!(eng.essids().get_by_name("lab-net").unwrap().num_nodes(), 2);
        eng.check_integrity().unwrap();
    }

    #[test]
    fn test_pause_and_reset() {
        let mut eng = engine();
        let now = Instant::now();
        eng.dispatch(&beacon(AP, "lab-net"), now);
        eng.set_paused(true);
        assert_eq!(eng.dispatch(&beacon(AP, "lab-net"), now), None);
        assert_eq!(eng.stats().total().packets, 1);
        eng.set_paused(false);

        eng.reset_stats();
        assert_eq!(eng.stats().total().packets, 0);
        assert_eq!(eng.nodes().len(), 1);
        assert_eq!(eng.history().len(), 1);
        assert_eq!(eng.channels().current().packets, 1);
    }

    #[test]
    fn test_filter_counts_rejections_only() {
        let mut eng = engine();
        let mut filter = PacketFilter::new();
        filter.allow_mac(STA);
        eng.set_filter(filter);
        let now = Instant::now();
        assert_eq!(eng.dispatch(&beacon(AP, "lab-net"), now), None);
        assert_eq!(eng.stats().filtered_packets, 1);
        assert_eq!(eng.stats().total().packets, 0);
        assert!(eng.history().is_empty());
        assert!(matches!(eng.dispatch(&data(STA, AP), now), Some(RouteOutcome::Created(_))));
    }

    #[test]
    fn test_tick_through_engine() {
        let mut eng = engine();
        let now = Instant::now();
        eng.dispatch(&beacon(AP, "lab-net"), now);
        eng.tick();
        let slot = eng.channels().current();
        assert_eq!(slot.durations, 0);
        assert_eq!(slot.durations_last, 1000);
        assert_eq!(slot.durations_total, 1000);
    }

    #[test]
    fn test_bad_channel_index() {
        let mut eng = engine();
        let len = eng.channels().len();
        assert!(matches!(eng.set_current_channel(len), Err(Error::UnknownChannel { .. })));
        assert!(matches!(Engine::new(EngineConfig::default(), &[]), Err(Error::EmptyChannelTable)));
    }

    // ------------------------------------------------------------------------
    // Property tests over random operation sequences
    // ------------------------------------------------------------------------

    #[derive(Debug, Clone)]
    enum Op {
        Frame {
            kind: u8,
            src: u8,
            essid: u8,
            bssid: u8,
            chan: usize,
        },
        Advance(u64),
        Sweep,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            8 => (0u8..5, 0u8..12, 0u8..4, 0u8..6, 0usize..6).prop_map(|(kind, src, essid, bssid, chan)| {
                Op::Frame { kind, src, essid, bssid, chan }
            }),
            1 => (0u64..20_000).prop_map(Op::Advance),
            1 => Just(Op::Sweep),
        ]
    }

    fn test_mac(n: u8, zero: MacAddr) -> MacAddr {
        if n == 0 {
            zero
        } else {
            MacAddr([0x02, 0, 0, 0, 0, n])
        }
    }

    fn make_frame(kind: u8, src: u8, essid: u8, bssid: u8) -> PacketRecord {
        let src = test_mac(src, MacAddr::ZERO);
        let bssid = test_mac(bssid, MacAddr::BROADCAST);
        let name = ["", "lab-net", "guest", "iot"][essid as usize % 4];
        match kind {
            0 => PacketRecord {
                wlan_bssid: bssid,
                ..beacon(src, name)
            },
            1 => PacketRecord {
                wlan_bssid: bssid,
                ..probe_response(src, name)
            },
            2 => data(src, bssid),
            3 => ack(src),
            _ => PacketRecord {
                pkt_types: PKT_TYPE_MGMT | PKT_TYPE_PROBE,
                wlan_type: WLAN_FRAME_PROBE_REQ,
                wlan_src: src,
                wlan_bssid: MacAddr::BROADCAST,
                wlan_essid: name.to_string(),
                wlan_mode: WLAN_MODE_PROBE,
                phy_signal: -70,
                ..Default::default()
            },
        }
    }

    fn run_ops(eng: &mut Engine, ops: &[Op], mut check: impl FnMut(&Engine)) {
        let mut now = Instant::now();
        for op in ops {
            match op {
                Op::Frame { kind, src, essid, bssid, chan } => {
                    eng.set_current_channel(*chan).unwrap();
                    eng.dispatch(&make_frame(*kind, *src, *essid, *bssid), now);
                }
                Op::Advance(ms) => now += Duration::from_millis(*ms),
                Op::Sweep => {
                    eng.sweep_timeouts(now, Duration::from_secs(10));
                }
            }
            check(&*eng);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// No two nodes share a MAC and the registry never exceeds capacity
        #[test]
        fn prop_unique_and_bounded(ops in prop::collection::vec(op_strategy(), 0..120), capacity in 1usize..8) {
            let config = EngineConfig { node_capacity: capacity, ..Default::default() };
            let mut eng = Engine::new(config, &ChannelDef::default_table()).unwrap();
            let mut ok = true;
            run_ops(&mut eng, &ops, |e| {
                let macs: HashSet<MacAddr> = e.nodes().iter().map(|n| n.mac).collect();
                ok &= macs.len() == e.nodes().len() && e.nodes().len() <= capacity;
            });
            prop_assert!(ok);
        }

        /// Every reachable state satisfies the cross-index invariants
        #[test]
        fn prop_referential_integrity(
            ops in prop::collection::vec(op_strategy(), 0..120),
            probe_only in any::<bool>(),
        ) {
            let split_trigger = if probe_only { SplitTrigger::ProbeResponse } else { SplitTrigger::AnyFrame };
            let config = EngineConfig { node_capacity: 6, split_trigger, ..Default::default() };
            let mut eng = Engine::new(config, &ChannelDef::default_table()).unwrap();
            let mut first_error = None;
            run_ops(&mut eng, &ops, |e| {
                if first_error.is_none() {
                    first_error = e.check_integrity().err();
                }
            });
            prop_assert_eq!(first_error, None);

            let pairs_by_node: usize = eng.nodes().iter().map(|n| n.channels().len()).sum();
            let pairs_by_channel: usize = eng.channels().iter().map(|s| s.num_nodes()).sum();
            prop_assert_eq!(pairs_by_node, pairs_by_channel);

            let members: usize = eng.essids().iter_all().map(|g| g.num_nodes()).sum();
            prop_assert_eq!(members, eng.nodes().len());
        }

        /// Statistics count every dispatched frame, attributable or not
        #[test]
        fn prop_stats_count_every_frame(ops in prop::collection::vec(op_strategy(), 0..80)) {
            let mut eng = engine();
            run_ops(&mut eng, &ops, |_| {});
            let frames = ops.iter().filter(|op| matches!(op, Op::Frame { .. })).count() as u64;
            prop_assert_eq!(eng.stats().total().packets, frames);
            let by_channel: u64 = eng.channels().iter().map(|s| s.packets).sum();
            prop_assert_eq!(by_channel, frames);
            prop_assert_eq!(eng.history().len() as u64, frames.min(eng.history().capacity() as u64));
        }
    }
}
