// Node registry
//
// Deduplicated, bounded table of transmitters keyed by source MAC. Owns the
// per-node aggregate state; the ESSID and channel links stored on each node
// are only ever changed by the engine's linking functions.

use super::essid::EssidId;
use super::ewma::Ewma;
use crate::wlan::{
    MacAddr, PacketRecord, PKT_TYPE_ALL_DATA, PKT_TYPE_BEACON, PKT_TYPE_DATA, PKT_TYPE_PROBE,
    WLAN_MODE_STA,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

/// Handle of a registered node; never reused within one registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Aggregate state of one transmitter
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub mac: MacAddr,
    pub first_seen: Instant,
    pub last_seen: Instant,

    /// Bitmask of every `PKT_TYPE_*` seen from this node
    pub pkt_types: u32,
    pub pkt_count: u64,
    pub beacon_count: u64,
    pub probe_count: u64,
    pub data_count: u64,

    pub last_signal: i32,
    pub signal_avg: Ewma,
    /// Strongest signal seen, 0 until the first non-zero reading
    pub sig_max: i32,
    /// Weakest non-zero SNR seen
    pub snr_min: u32,
    pub snr_max: u32,
    pub snr_avg: Ewma,

    pub bssid: MacAddr,
    /// Channel the node advertises or is associated on
    pub wlan_channel: u32,
    /// Accumulated `WLAN_MODE_*`
    pub mode: u32,
    pub tsf: u64,
    pub bintval: u32,
    pub retries_all: u32,
    pub retries_last: u32,
    pub seqno: u32,
    pub wep: bool,
    pub wpa: bool,
    pub rsn: bool,
    pub ip_src: Option<Ipv4Addr>,
    /// Rate of the last frame (100 kbps units)
    pub last_rate: u32,
    /// Frame type code of the last frame
    pub last_type: u16,

    pub(crate) essid: EssidId,
    pub(crate) ap_node: Option<NodeId>,
    pub(crate) channels: BTreeSet<usize>,
}

impl Node {
    fn new(id: NodeId, mac: MacAddr, now: Instant, ewma_weight: f64, essid: EssidId) -> Self {
        Self {
            id,
            mac,
            first_seen: now,
            last_seen: now,
            pkt_types: 0,
            pkt_count: 0,
            beacon_count: 0,
            probe_count: 0,
            data_count: 0,
            last_signal: 0,
            signal_avg: Ewma::new(ewma_weight),
            sig_max: 0,
            snr_min: 0,
            snr_max: 0,
            snr_avg: Ewma::new(ewma_weight),
            bssid: MacAddr::ZERO,
            wlan_channel: 0,
            mode: 0,
            tsf: 0,
            bintval: 0,
            retries_all: 0,
            retries_last: 0,
            seqno: 0,
            wep: false,
            wpa: false,
            rsn: false,
            ip_src: None,
            last_rate: 0,
            last_type: 0,
            essid,
            ap_node: None,
            channels: BTreeSet::new(),
        }
    }

    /// ESSID group this node is attributed to
    pub fn essid(&self) -> EssidId {
        self.essid
    }

    /// Node acting as this station's access point
    pub fn ap_node(&self) -> Option<NodeId> {
        self.ap_node
    }

    /// Channel indices this node has been captured on
    pub fn channels(&self) -> &BTreeSet<usize> {
        &self.channels
    }

    pub fn is_station(&self) -> bool {
        self.mode & WLAN_MODE_STA != 0
    }

    /// Copy a record's fields into the aggregate
    ///
    /// `ap_channel` is the advertised channel of this node's AP, if linked.
    pub fn apply(&mut self, record: &PacketRecord, now: Instant, ap_channel: Option<u32>) {
        self.last_seen = now;
        self.pkt_count += 1;
        self.pkt_types |= record.pkt_types;
        if record.pkt_types & PKT_TYPE_BEACON != 0 {
            self.beacon_count += 1;
        }
        if record.pkt_types & PKT_TYPE_PROBE != 0 {
            self.probe_count += 1;
        }
        if record.pkt_types & (PKT_TYPE_DATA | PKT_TYPE_ALL_DATA) != 0 {
            self.data_count += 1;
        }

        self.mode |= record.wlan_mode;
        if record.ip_src.is_some() {
            self.ip_src = record.ip_src;
        }
        if !record.wlan_bssid.is_broadcast() && !record.wlan_bssid.is_zero() {
            self.bssid = record.wlan_bssid;
        }

        if record.is_beacon() {
            self.tsf = record.wlan_tsf;
            self.bintval = record.wlan_bintval;
        }
        if record.advertises_network() {
            self.wpa = record.wlan_wpa;
            self.rsn = record.wlan_rsn;
            // channel is only really known from beacons and probe responses
            self.wlan_channel = record.wlan_channel;
        } else if let Some(ch) = ap_channel.filter(|_| self.is_station()) {
            self.wlan_channel = ch;
        } else if self.wlan_channel == 0 && record.wlan_channel != 0 {
            self.wlan_channel = record.wlan_channel;
        }
        if record.wlan_wep {
            self.wep = true;
        }

        self.last_signal = record.phy_signal;
        if record.phy_signal != 0 {
            self.signal_avg.update(f64::from(record.phy_signal));
            if record.phy_signal > self.sig_max || self.sig_max == 0 {
                self.sig_max = record.phy_signal;
            }
        }
        self.snr_avg.update(f64::from(record.phy_snr));
        if record.phy_snr > self.snr_max {
            self.snr_max = record.phy_snr;
        }
        if (self.snr_min == 0 && record.phy_snr > 0) || (record.phy_snr > 0 && record.phy_snr < self.snr_min) {
            self.snr_min = record.phy_snr;
        }

        if record.wlan_seqno != 0 {
            if record.wlan_retry && record.wlan_seqno == self.seqno {
                self.retries_all += 1;
                self.retries_last += 1;
            } else {
                self.retries_last = 0;
            }
            self.seqno = record.wlan_seqno;
        }

        self.last_rate = record.rate();
        self.last_type = record.type_code();
    }

    /// Time since last seen exceeds `timeout`
    pub fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > timeout
    }
}

/// Key-indexed, capacity-bounded node table
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    /// Ids grow monotonically, so iteration is registration order
    nodes: BTreeMap<NodeId, Node>,
    by_mac: HashMap<MacAddr, NodeId>,
    capacity: usize,
    next_id: u64,
}

impl NodeRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: BTreeMap::new(),
            by_mac: HashMap::new(),
            capacity,
            next_id: 0,
        }
    }

    /// Exact-match lookup by MAC
    pub fn lookup(&self, mac: &MacAddr) -> Option<NodeId> {
        self.by_mac.get(mac).copied()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_by_mac(&self, mac: &MacAddr) -> Option<&Node> {
        self.lookup(mac).and_then(|id| self.nodes.get(&id))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Register a new MAC, `None` when the table is full or the MAC exists
    pub(crate) fn insert(
        &mut self,
        mac: MacAddr,
        now: Instant,
        ewma_weight: f64,
        essid: EssidId,
    ) -> Option<NodeId> {
        if self.is_full() || self.by_mac.contains_key(&mac) {
            return None;
        }
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Node::new(id, mac, now, ewma_weight, essid));
        self.by_mac.insert(mac, id);
        Some(id)
    }

    /// Drop a node from the table; the caller retracts its links first
    pub(crate) fn remove(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.remove(&id)?;
        self.by_mac.remove(&node.mac);
        for other in self.nodes.values_mut() {
            if other.ap_node == Some(id) {
                other.ap_node = None;
            }
        }
        Some(node)
    }

    /// Ids of nodes not seen for longer than `timeout`
    pub fn expired(&self, now: Instant, timeout: Duration) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.is_expired(now, timeout))
            .map(|n| n.id)
            .collect()
    }

    /// Nodes in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.nodes.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wlan::{PKT_TYPE_MGMT, WLAN_FRAME_BEACON, WLAN_FRAME_PROBE_RESP, WLAN_MODE_AP};

    fn mac(last: u8) -> MacAddr {
        MacAddr([0xaa, 0xbb, 0xcc, 0xdd, 0xee, last])
    }

    fn beacon(src: MacAddr) -> PacketRecord {
        PacketRecord {
            pkt_types: PKT_TYPE_MGMT | PKT_TYPE_BEACON,
            wlan_type: WLAN_FRAME_BEACON,
            wlan_src: src,
            wlan_bssid: src,
            wlan_mode: WLAN_MODE_AP,
            wlan_channel: 6,
            wlan_tsf: 1000,
            wlan_bintval: 100,
            phy_signal: -40,
            phy_snr: 50,
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_respects_capacity_and_uniqueness() {
        let now = Instant::now();
        let mut reg = NodeRegistry::new(2);
        let a = reg.insert(mac(1), now, 0.125, EssidId::HIDDEN).unwrap();
        assert!(reg.insert(mac(1), now, 0.125, EssidId::HIDDEN).is_none());
        let b = reg.insert(mac(2), now, 0.125, EssidId::HIDDEN).unwrap();
        assert_ne!(a, b);
        assert!(reg.is_full());
        assert!(reg.insert(mac(3), now, 0.125, EssidId::HIDDEN).is_none());
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.lookup(&mac(2)), Some(b));
        assert_eq!(reg.lookup(&mac(3)), None);
    }

    #[test]
    fn test_ids_not_reused_after_remove() {
        let now = Instant::now();
        let mut reg = NodeRegistry::new(4);
        let a = reg.insert(mac(1), now, 0.125, EssidId::HIDDEN).unwrap();
        reg.remove(a);
        let b = reg.insert(mac(1), now, 0.125, EssidId::HIDDEN).unwrap();
        assert_ne!(a, b);
        assert_eq!(reg.iter().count(), 1);
    }

    #[test]
    fn test_apply_beacon_fields() {
        let now = Instant::now();
        let mut reg = NodeRegistry::new(4);
        let id = reg.insert(mac(1), now, 0.125, EssidId::HIDDEN).unwrap();
        let node = reg.get_mut(id).unwrap();
        node.apply(&beacon(mac(1)), now, None);

        assert_eq!(node.pkt_count, 1);
        assert_eq!(node.beacon_count, 1);
        assert_eq!(node.tsf, 1000);
        assert_eq!(node.bintval, 100);
        assert_eq!(node.wlan_channel, 6);
        assert_eq!(node.bssid, mac(1));
        assert_eq!(node.sig_max, -40);
        assert_eq!(node.signal_avg.value(), Some(-40.0));
        assert_eq!(node.mode, WLAN_MODE_AP);
    }

    #[test]
    fn test_apply_keeps_bssid_on_broadcast_and_tsf_on_data() {
        let now = Instant::now();
        let mut reg = NodeRegistry::new(4);
        let id = reg.insert(mac(1), now, 0.125, EssidId::HIDDEN).unwrap();
        let node = reg.get_mut(id).unwrap();
        node.apply(&beacon(mac(1)), now, None);

        let data = PacketRecord {
            pkt_types: PKT_TYPE_DATA,
            wlan_src: mac(1),
            wlan_bssid: MacAddr::BROADCAST,
            wlan_tsf: 9999,
            wlan_mode: WLAN_MODE_STA,
            phy_signal: -30,
            ..Default::default()
        };
        let later = now + Duration::from_secs(1);
        node.apply(&data, later, None);

        assert_eq!(node.bssid, mac(1));
        assert_eq!(node.tsf, 1000);
        assert_eq!(node.last_seen, later);
        assert_eq!(node.pkt_types & PKT_TYPE_DATA, PKT_TYPE_DATA);
        assert_eq!(node.mode, WLAN_MODE_AP | WLAN_MODE_STA);
        assert_eq!(node.data_count, 1);
        assert_eq!(node.sig_max, -30);
    }

    #[test]
    fn test_probe_response_keeps_beacon_timing() {
        let now = Instant::now();
        let mut reg = NodeRegistry::new(4);
        let id = reg.insert(mac(1), now, 0.125, EssidId::HIDDEN).unwrap();
        let node = reg.get_mut(id).unwrap();
        node.apply(&beacon(mac(1)), now, None);
        let (tsf, bintval) = (node.tsf, node.bintval);

        let response = PacketRecord {
            pkt_types: PKT_TYPE_MGMT | PKT_TYPE_PROBE,
            wlan_type: WLAN_FRAME_PROBE_RESP,
            wlan_src: mac(1),
            wlan_bssid: mac(1),
            wlan_essid: "lab-net".to_string(),
            wlan_tsf: 777,
            wlan_bintval: 0,
            wlan_mode: WLAN_MODE_AP,
            wlan_channel: 11,
            wlan_rsn: true,
            ..Default::default()
        };
        node.apply(&response, now + Duration::from_secs(1), None);

        assert_eq!((node.tsf, node.bintval), (tsf, bintval));
        assert_ne!(node.tsf, 777);
        // the rest of the advertisement is still taken
        assert_eq!(node.wlan_channel, 11);
        assert!(node.rsn);
        assert_eq!(node.probe_count, 1);
    }

    #[test]
    fn test_retry_tracking() {
        let now = Instant::now();
        let mut reg = NodeRegistry::new(4);
        let id = reg.insert(mac(1), now, 0.125, EssidId::HIDDEN).unwrap();
        let node = reg.get_mut(id).unwrap();

        let mut rec = PacketRecord {
            pkt_types: PKT_TYPE_DATA,
            wlan_src: mac(1),
            wlan_seqno: 10,
            ..Default::default()
        };
        node.apply(&rec, now, None);
        rec.wlan_retry = true;
        node.apply(&rec, now, None);
        node.apply(&rec, now, None);
        assert_eq!(node.retries_all, 2);
        assert_eq!(node.retries_last, 2);

        rec.wlan_retry = false;
        rec.wlan_seqno = 11;
        node.apply(&rec, now, None);
        assert_eq!(node.retries_all, 2);
        assert_eq!(node.retries_last, 0);
        assert_eq!(node.seqno, 11);
    }

    #[test]
    fn test_station_inherits_ap_channel() {
        let now = Instant::now();
        let mut reg = NodeRegistry::new(4);
        let id = reg.insert(mac(2), now, 0.125, EssidId::HIDDEN).unwrap();
        let node = reg.get_mut(id).unwrap();
        let data = PacketRecord {
            pkt_types: PKT_TYPE_DATA,
            wlan_src: mac(2),
            wlan_mode: WLAN_MODE_STA,
            ..Default::default()
        };
        node.apply(&data, now, Some(11));
        assert_eq!(node.wlan_channel, 11);
    }

    #[test]
    fn test_expired() {
        let now = Instant::now();
        let mut reg = NodeRegistry::new(4);
        let a = reg.insert(mac(1), now, 0.125, EssidId::HIDDEN).unwrap();
        let timeout = Duration::from_secs(60);
        assert!(reg.expired(now + timeout, timeout).is_empty());
        assert_eq!(reg.expired(now + timeout + Duration::from_millis(1), timeout), vec![a]);
    }
}
