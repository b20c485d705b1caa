// 802.11 vocabulary shared by the engine and its collaborators
//
// Frame/packet-type constants, the MAC address type and the classified
// packet record handed over by the protocol parser.

pub mod tables;

use crate::error::Error;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

pub use tables::{
    index_to_rate, kilo_mega_ize, mcs_rate, packet_type_char, packet_type_name, rate_index,
    rate_slot, MAX_RATES,
};

/// Longest ESSID an access point can advertise
pub const MAX_ESSID_LEN: usize = 32;

// ============================================================================
// Packet type bitmask (PacketRecord::pkt_types)
// ============================================================================

pub const PKT_TYPE_CTRL: u32 = 0x00_0001;
pub const PKT_TYPE_MGMT: u32 = 0x00_0002;
pub const PKT_TYPE_DATA: u32 = 0x00_0004;

pub const PKT_TYPE_BADFCS: u32 = 0x00_0008;

pub const PKT_TYPE_BEACON: u32 = 0x00_0010;
pub const PKT_TYPE_PROBE: u32 = 0x00_0020;
pub const PKT_TYPE_ASSOC: u32 = 0x00_0040;
pub const PKT_TYPE_AUTH: u32 = 0x00_0080;
pub const PKT_TYPE_RTS: u32 = 0x00_0100;
pub const PKT_TYPE_CTS: u32 = 0x00_0200;
pub const PKT_TYPE_ACK: u32 = 0x00_0400;
pub const PKT_TYPE_NULL: u32 = 0x00_0800;

pub const PKT_TYPE_ARP: u32 = 0x00_1000;
pub const PKT_TYPE_IP: u32 = 0x00_2000;
pub const PKT_TYPE_ICMP: u32 = 0x00_4000;
pub const PKT_TYPE_UDP: u32 = 0x00_8000;
pub const PKT_TYPE_TCP: u32 = 0x01_0000;
pub const PKT_TYPE_OLSR: u32 = 0x02_0000;
pub const PKT_TYPE_OLSR_LQ: u32 = 0x04_0000;
pub const PKT_TYPE_OLSR_GW: u32 = 0x08_0000;
pub const PKT_TYPE_BATMAN: u32 = 0x10_0000;
pub const PKT_TYPE_MESHZ: u32 = 0x20_0000;
pub const PKT_TYPE_QDATA: u32 = 0x40_0000;

pub const PKT_TYPE_ALL_MGMT: u32 = PKT_TYPE_BEACON | PKT_TYPE_PROBE | PKT_TYPE_ASSOC | PKT_TYPE_AUTH;
pub const PKT_TYPE_ALL_CTRL: u32 = PKT_TYPE_RTS | PKT_TYPE_CTS | PKT_TYPE_ACK;
pub const PKT_TYPE_ALL_DATA: u32 = PKT_TYPE_NULL
    | PKT_TYPE_ARP
    | PKT_TYPE_ICMP
    | PKT_TYPE_IP
    | PKT_TYPE_UDP
    | PKT_TYPE_TCP
    | PKT_TYPE_OLSR
    | PKT_TYPE_OLSR_LQ
    | PKT_TYPE_OLSR_GW
    | PKT_TYPE_BATMAN
    | PKT_TYPE_MESHZ
    | PKT_TYPE_QDATA;

/// Packet types that identify a transmitter
pub const PKT_TYPE_NODE_MASK: u32 = PKT_TYPE_BEACON | PKT_TYPE_PROBE | PKT_TYPE_DATA | PKT_TYPE_ALL_DATA;

// ============================================================================
// Inferred operating mode (bitmask, not exclusive)
// ============================================================================

pub const WLAN_MODE_AP: u32 = 0x01;
pub const WLAN_MODE_IBSS: u32 = 0x02;
pub const WLAN_MODE_STA: u32 = 0x04;
pub const WLAN_MODE_PROBE: u32 = 0x08;

// ============================================================================
// PHY flags
// ============================================================================

pub const PHY_FLAG_SHORTPRE: u32 = 0x0001;
pub const PHY_FLAG_BADFCS: u32 = 0x0002;
pub const PHY_FLAG_A: u32 = 0x0010;
pub const PHY_FLAG_B: u32 = 0x0020;
pub const PHY_FLAG_G: u32 = 0x0040;
pub const PHY_FLAG_MODE_MASK: u32 = 0x00f0;

/// `phy_rate_flags`: frame was sent at an HT (MCS) rate
pub const RATE_FLAG_MCS: u8 = 0x01;
/// `phy_rate_flags`: 40 MHz channel width
pub const RATE_FLAG_HT40: u8 = 0x02;
/// `phy_rate_flags`: short guard interval
pub const RATE_FLAG_SHORT_GI: u8 = 0x04;

// ============================================================================
// Frame control type/subtype codes (first frame-control byte)
// ============================================================================

pub const WLAN_FRAME_FC_TYPE_MASK: u16 = 0x000c;
pub const WLAN_FRAME_FC_STYPE_MASK: u16 = 0x00f0;

pub const WLAN_FRAME_TYPE_MGMT: u16 = 0x0000;
pub const WLAN_FRAME_TYPE_CTRL: u16 = 0x0004;
pub const WLAN_FRAME_TYPE_DATA: u16 = 0x0008;

pub const WLAN_FRAME_ASSOC_REQ: u16 = 0x0000;
pub const WLAN_FRAME_ASSOC_RESP: u16 = 0x0010;
pub const WLAN_FRAME_PROBE_REQ: u16 = 0x0040;
pub const WLAN_FRAME_PROBE_RESP: u16 = 0x0050;
pub const WLAN_FRAME_BEACON: u16 = 0x0080;
pub const WLAN_FRAME_DISASSOC: u16 = 0x00a0;
pub const WLAN_FRAME_AUTH: u16 = 0x00b0;
pub const WLAN_FRAME_DEAUTH: u16 = 0x00c0;

pub const WLAN_FRAME_RTS: u16 = 0x00b4;
pub const WLAN_FRAME_CTS: u16 = 0x00c4;
pub const WLAN_FRAME_ACK: u16 = 0x00d4;

pub const WLAN_FRAME_DATA: u16 = 0x0008;
pub const WLAN_FRAME_NULL: u16 = 0x0048;
pub const WLAN_FRAME_QDATA: u16 = 0x0088;

/// Reserved frame-type code for frames that failed the FCS check
pub const WLAN_FRAME_BADFCS: u16 = 0x0001;

// ============================================================================
// MAC address
// ============================================================================

/// 6-byte IEEE 802 MAC address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xff; 6]);
    pub const ZERO: MacAddr = MacAddr([0; 6]);

    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Neither zero nor broadcast, i.e. usable as an identity
    pub fn is_unicast_identity(&self) -> bool {
        !self.is_zero() && !self.is_broadcast()
    }

    /// Last two bytes, the compact form used in narrow columns
    pub fn short(&self) -> String {
        format!("{:02x}{:02x}", self.0[4], self.0[5])
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = Error;

    /// Parse `aa:bb:cc:dd:ee:ff` (case-insensitive, `-` also accepted)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split([':', '-']).collect();
        if parts.len() != 6 {
            return Err(Error::InvalidMac(s.to_string()));
        }

        let mut bytes = [0u8; 6];
        for (byte, part) in bytes.iter_mut().zip(parts) {
            if part.is_empty() || part.len() > 2 {
                return Err(Error::InvalidMac(s.to_string()));
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| Error::InvalidMac(s.to_string()))?;
        }
        Ok(MacAddr(bytes))
    }
}

// ============================================================================
// Classified packet record
// ============================================================================

/// One captured frame as classified by the protocol parser
///
/// Unparsed fields are zero-valued (`Default`). The engine reads a record
/// during a single dispatch and copies what it needs into its own state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PacketRecord {
    /// Bitmask of `PKT_TYPE_*`
    pub pkt_types: u32,

    // wlan phy (from radiotap)
    /// Signal strength (usually dBm)
    pub phy_signal: i32,
    /// Noise level (usually dBm)
    pub phy_noise: i32,
    /// Signal to noise ratio
    pub phy_snr: u32,
    /// Legacy rate in 100 kbps units
    pub phy_rate: u32,
    /// MCS index (when `RATE_FLAG_MCS` is set)
    pub phy_rate_idx: u8,
    /// `RATE_FLAG_*`
    pub phy_rate_flags: u8,
    /// Frequency reported by the driver (MHz)
    pub phy_freq: u32,
    /// Channel reported by the driver
    pub phy_chan: u32,
    /// `PHY_FLAG_*`
    pub phy_flags: u32,

    // wlan mac
    /// Frame length in bytes
    pub wlan_len: u32,
    /// Frame control type/subtype code
    pub wlan_type: u16,
    pub wlan_src: MacAddr,
    pub wlan_dst: MacAddr,
    pub wlan_bssid: MacAddr,
    /// Advertised network name, empty when absent or hidden
    pub wlan_essid: String,
    /// Timestamp from beacon
    pub wlan_tsf: u64,
    /// Beacon interval
    pub wlan_bintval: u32,
    /// Inferred `WLAN_MODE_*`
    pub wlan_mode: u32,
    /// Channel the transmitter claims (beacon/probe DS parameter)
    pub wlan_channel: u32,
    /// NAV duration
    pub wlan_nav: u32,
    pub wlan_seqno: u32,
    pub wlan_retry: bool,
    pub wlan_wep: bool,
    pub wlan_wpa: bool,
    pub wlan_rsn: bool,

    /// IPv4 source address, when the payload carried one
    pub ip_src: Option<Ipv4Addr>,

    // calculated from other values
    /// Estimated airtime in microseconds
    pub pkt_duration: u32,
    /// Channel index the capture device was tuned to on arrival
    pub pkt_chan_idx: Option<usize>,
    /// Running retry count for this transmitter
    pub wlan_retries: u32,
}

impl PacketRecord {
    /// Frame failed the integrity check
    pub fn is_bad_fcs(&self) -> bool {
        self.phy_flags & PHY_FLAG_BADFCS != 0 || self.pkt_types & PKT_TYPE_BADFCS != 0
    }

    pub fn is_beacon(&self) -> bool {
        self.wlan_type == WLAN_FRAME_BEACON
    }

    pub fn is_probe_response(&self) -> bool {
        self.wlan_type == WLAN_FRAME_PROBE_RESP
    }

    /// Beacons and probe responses carry the AP's view of the network
    pub fn advertises_network(&self) -> bool {
        self.is_beacon() || self.is_probe_response()
    }

    /// Frame type code for statistics and history (`1` for bad FCS)
    pub fn type_code(&self) -> u16 {
        if self.is_bad_fcs() {
            WLAN_FRAME_BADFCS
        } else {
            self.wlan_type & 0x00ff
        }
    }

    /// Whether this frame may create or update a node
    pub fn identifies_node(&self) -> bool {
        self.pkt_types & PKT_TYPE_NODE_MASK != 0
            && !self.is_bad_fcs()
            && self.wlan_src.is_unicast_identity()
    }

    /// Effective rate in 100 kbps units (legacy rate or MCS table)
    pub fn rate(&self) -> u32 {
        if self.phy_rate_flags & RATE_FLAG_MCS != 0 {
            mcs_rate(
                self.phy_rate_idx,
                self.phy_rate_flags & RATE_FLAG_HT40 == 0,
                self.phy_rate_flags & RATE_FLAG_SHORT_GI == 0,
            )
        } else {
            self.phy_rate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_display_and_parse() {
        let mac: MacAddr = "AA:bb:cc:DD:ee:01".parse().unwrap();
        assert_eq!(mac, MacAddr([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01]));
        assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:01");
        assert_eq!(mac.short(), "ee01");
        assert_eq!("aa-bb-cc-dd-ee-01".parse::<MacAddr>().unwrap(), mac);
    }

    #[test]
    fn test_mac_parse_rejects_garbage() {
        assert!("aa:bb:cc".parse::<MacAddr>().is_err());
        assert!("aa:bb:cc:dd:ee:zz".parse::<MacAddr>().is_err());
        assert!("aa:bb:cc:dd:ee:123".parse::<MacAddr>().is_err());
        assert!("".parse::<MacAddr>().is_err());
    }

    #[test]
    fn test_identity_checks() {
        assert!(!MacAddr::ZERO.is_unicast_identity());
        assert!(!MacAddr::BROADCAST.is_unicast_identity());
        assert!(MacAddr([0, 1, 2, 3, 4, 5]).is_unicast_identity());
    }

    #[test]
    fn test_identifies_node() {
        let mut rec = PacketRecord {
            pkt_types: PKT_TYPE_MGMT | PKT_TYPE_BEACON,
            wlan_src: MacAddr([2, 0, 0, 0, 0, 1]),
            ..Default::default()
        };
        assert!(rec.identifies_node());

        // control frames never identify a transmitter
        rec.pkt_types = PKT_TYPE_CTRL | PKT_TYPE_ACK;
        assert!(!rec.identifies_node());

        rec.pkt_types = PKT_TYPE_DATA | PKT_TYPE_IP;
        rec.phy_flags = PHY_FLAG_BADFCS;
        assert!(!rec.identifies_node());
        assert_eq!(rec.type_code(), WLAN_FRAME_BADFCS);
    }

    #[test]
    fn test_rate_prefers_mcs() {
        let rec = PacketRecord {
            phy_rate: 540,
            phy_rate_idx: 7,
            phy_rate_flags: RATE_FLAG_MCS,
            ..Default::default()
        };
        assert_eq!(rec.rate(), 650);

        let legacy = PacketRecord { phy_rate: 540, ..Default::default() };
        assert_eq!(legacy.rate(), 540);
    }
}
