// Packet filter
//
// Optional packet-type mask, source MAC allow-list and BSSID applied before
// a record is dispatched.

use crate::wlan::MacAddr;

/// Maximum number of source MACs in the allow-list
pub const MAX_FILTERMAC: usize = 9;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacketFilter {
    /// Accept only frames with one of these `PKT_TYPE_*` bits; 0 = any
    pub pkt_types: u32,
    macs: Vec<MacAddr>,
    /// Accept only frames for this BSSID
    pub bssid: Option<MacAddr>,
}

impl PacketFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source MAC to the allow-list; `false` once the list is full
    pub fn allow_mac(&mut self, mac: MacAddr) -> bool {
        if self.macs.contains(&mac) {
            return true;
        }
        if self.macs.len() >= MAX_FILTERMAC {
            return false;
        }
        self.macs.push(mac);
        true
    }

    pub fn macs(&self) -> &[MacAddr] {
        &self.macs
    }

    pub fn is_active(&self) -> bool {
        self.pkt_types != 0 || !self.macs.is_empty() || self.bssid.is_some()
    }

    pub fn accepts(&self, record: &crate::wlan::PacketRecord) -> bool {
        if self.pkt_types != 0 && record.pkt_types & self.pkt_types == 0 {
            return false;
        }
        if !self.macs.is_empty() && !self.macs.contains(&record.wlan_src) {
            return false;
        }
        match self.bssid {
            Some(bssid) => record.wlan_bssid == bssid,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wlan::{PacketRecord, PKT_TYPE_BEACON, PKT_TYPE_DATA};

    fn rec(types: u32, src: u8, bssid: u8) -> PacketRecord {
        PacketRecord {
            pkt_types: types,
            wlan_src: MacAddr([2, 0, 0, 0, 0, src]),
            wlan_bssid: MacAddr([2, 0, 0, 0, 0, bssid]),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_accepts_all() {
        let filter = PacketFilter::new();
        assert!(!filter.is_active());
        assert!(filter.accepts(&PacketRecord::default()));
    }

    #[test]
    fn test_type_mask() {
        let filter = PacketFilter {
            pkt_types: PKT_TYPE_BEACON,
            ..Default::default()
        };
        assert!(filter.accepts(&rec(PKT_TYPE_BEACON, 1, 1)));
        assert!(!filter.accepts(&rec(PKT_TYPE_DATA, 1, 1)));
    }

    #[test]
    fn test_mac_allow_list() {
        let mut filter = PacketFilter::new();
        assert!(filter.allow_mac(MacAddr([2, 0, 0, 0, 0, 1])));
        assert!(filter.accepts(&rec(PKT_TYPE_DATA, 1, 9)));
        assert!(!filter.accepts(&rec(PKT_TYPE_DATA, 2, 9)));

        for i in 2..=MAX_FILTERMAC as u8 {
            assert!(filter.allow_mac(MacAddr([2, 0, 0, 0, 0, i])));
        }
        assert!(!filter.allow_mac(MacAddr([2, 0, 0, 0, 0, 0x7f])));
        assert_eq!(filter.macs().len(), MAX_FILTERMAC);
    }

    #[test]
    fn test_bssid() {
        let filter = PacketFilter {
            bssid: Some(MacAddr([2, 0, 0, 0, 0, 5])),
            ..Default::default()
        };
        assert!(filter.accepts(&rec(PKT_TYPE_DATA, 1, 5)));
        assert!(!filter.accepts(&rec(PKT_TYPE_DATA, 1, 6)));
    }
}
