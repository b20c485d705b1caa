// Rate and frame-type lookup tables
//
// Pure functions mapping PHY rate codes, MCS indices and frame-control
// codes to indices, bit rates and display tokens. Unknown inputs map to an
// explicit "unknown" value, never a panic.

use super::{
    WLAN_FRAME_BADFCS, WLAN_FRAME_FC_STYPE_MASK, WLAN_FRAME_FC_TYPE_MASK, WLAN_FRAME_TYPE_CTRL,
    WLAN_FRAME_TYPE_DATA, WLAN_FRAME_TYPE_MGMT,
};

/// Number of legacy (non-HT) rate slots, excluding slot 0
pub const LEGACY_RATES: usize = 12;

/// Number of HT MCS indices covered by the MCS table
pub const MCS_RATES: usize = 32;

/// Rate slots in statistics: 0 = unknown, 1-12 legacy, 13-44 MCS 0-31
pub const MAX_RATES: usize = 1 + LEGACY_RATES + MCS_RATES;

/// Legacy rates in 100 kbps units, indexed by `rate_index - 1`
const LEGACY_RATE_TABLE: [u32; LEGACY_RATES] = [10, 20, 55, 60, 90, 110, 120, 180, 240, 360, 480, 540];

/// Convert a legacy rate (100 kbps units) to its table index, 0 if unknown
pub fn rate_index(rate: u32) -> usize {
    LEGACY_RATE_TABLE
        .iter()
        .position(|&r| r == rate)
        .map_or(0, |pos| pos + 1)
}

/// Inverse of [`rate_index`]; 0 for index 0 or out-of-range indices
pub fn index_to_rate(idx: usize) -> u32 {
    match idx {
        1..=LEGACY_RATES => LEGACY_RATE_TABLE[idx - 1],
        _ => 0,
    }
}

/// HT rates in 100 kbps units: [20MHz LGI, 20MHz SGI, 40MHz LGI, 40MHz SGI]
const MCS_RATE_TABLE: [[u32; 4]; MCS_RATES] = [
    [65, 72, 135, 150],
    [130, 144, 270, 300],
    [195, 217, 405, 450],
    [260, 289, 540, 600],
    [390, 433, 810, 900],
    [520, 578, 1080, 1200],
    [585, 650, 1215, 1350],
    [650, 722, 1350, 1500],
    [130, 144, 270, 300],
    [260, 289, 540, 600],
    [390, 433, 810, 900],
    [520, 578, 1080, 1200],
    [780, 867, 1620, 1800],
    [1040, 1156, 2160, 2400],
    [1170, 1300, 2430, 2700],
    [1300, 1444, 2700, 3000],
    [195, 217, 405, 450],
    [390, 433, 810, 900],
    [585, 650, 1215, 1350],
    [780, 867, 1620, 1800],
    [1170, 1300, 2430, 2700],
    [1560, 1733, 3240, 3600],
    [1755, 1950, 3645, 4050],
    [1950, 2167, 4050, 4500],
    [260, 288, 540, 600],
    [520, 576, 1080, 1200],
    [780, 868, 1620, 1800],
    [1040, 1156, 2160, 2400],
    [1560, 1732, 3240, 3600],
    [2080, 2312, 4320, 4800],
    [2340, 2600, 4860, 5400],
    [2600, 2888, 5400, 6000],
];

/// HT rate in 100 kbps units for an MCS index, 0 outside MCS 0-31
///
/// # Arguments
/// * `mcs` - MCS index
/// * `ht20` - 20 MHz channel (otherwise 40 MHz)
/// * `lgi` - long guard interval (otherwise short)
pub fn mcs_rate(mcs: u8, ht20: bool, lgi: bool) -> u32 {
    let Some(row) = MCS_RATE_TABLE.get(mcs as usize) else {
        return 0;
    };
    let col = match (ht20, lgi) {
        (true, true) => 0,
        (true, false) => 1,
        (false, true) => 2,
        (false, false) => 3,
    };
    row[col]
}

/// Statistics slot for a frame: legacy index, `13 + mcs` for HT, else 0
pub fn rate_slot(rate: u32, mcs: Option<u8>) -> usize {
    match mcs {
        Some(m) if (m as usize) < MCS_RATES => 1 + LEGACY_RATES + m as usize,
        Some(_) => 0,
        None => rate_index(rate),
    }
}

/// Display label for a statistics rate slot
pub fn rate_slot_label(slot: usize) -> String {
    match slot {
        1..=LEGACY_RATES => {
            let rate = index_to_rate(slot);
            if rate % 10 == 0 {
                format!("{}M", rate / 10)
            } else {
                format!("{}.{}M", rate / 10, rate % 10)
            }
        }
        s if s > LEGACY_RATES && s < MAX_RATES => format!("MCS{}", s - LEGACY_RATES - 1),
        _ => "?".to_string(),
    }
}

// ============================================================================
// Frame type tokens
// ============================================================================

struct PktName {
    c: char,
    name: &'static str,
}

const fn pn(c: char, name: &'static str) -> PktName {
    PktName { c, name }
}

/// Management subtypes 0-14
const MGMT_NAMES: [PktName; 15] = [
    pn('a', "ASOCRQ"),
    pn('A', "ASOCRP"),
    pn('a', "REASRQ"),
    pn('A', "REASRP"),
    pn('p', "PROBRQ"),
    pn('P', "PROBRP"),
    pn('T', "TIMING"),
    pn('-', "-RESV-"),
    pn('B', "BEACON"),
    pn('t', "ATIM"),
    pn('D', "DISASC"),
    pn('u', "AUTH"),
    pn('U', "DEAUTH"),
    pn('C', "ACTION"),
    pn('c', "ACTNOA"),
];

/// Control subtypes 7-15
const CTRL_NAMES: [PktName; 9] = [
    pn('w', "CTWRAP"),
    pn('b', "BACKRQ"),
    pn('B', "BACK"),
    pn('s', "PSPOLL"),
    pn('R', "RTS"),
    pn('C', "CTS"),
    pn('K', "ACK"),
    pn('f', "CFEND"),
    pn('f', "CFENDK"),
];

/// First control subtype present in `CTRL_NAMES`
const CTRL_FIRST_SUBTYPE: usize = 7;

/// Data subtypes 0-15
const DATA_NAMES: [PktName; 16] = [
    pn('D', "DATA"),
    pn('F', "DCFACK"),
    pn('F', "DCFPLL"),
    pn('F', "DCFKPL"),
    pn('n', "NULL"),
    pn('f', "CFACK"),
    pn('f', "CFPOLL"),
    pn('f', "CFCKPL"),
    pn('Q', "QDATA"),
    pn('F', "QDCFCK"),
    pn('F', "QDCFPL"),
    pn('F', "QDCFKP"),
    pn('N', "QDNULL"),
    pn('-', "-RESV-"),
    pn('f', "QCFPLL"),
    pn('f', "QCFKPL"),
];

fn lookup_type(code: u16) -> Option<&'static PktName> {
    let subtype = ((code & WLAN_FRAME_FC_STYPE_MASK) >> 4) as usize;
    match code & WLAN_FRAME_FC_TYPE_MASK {
        WLAN_FRAME_TYPE_MGMT => MGMT_NAMES.get(subtype),
        WLAN_FRAME_TYPE_CTRL => subtype
            .checked_sub(CTRL_FIRST_SUBTYPE)
            .and_then(|i| CTRL_NAMES.get(i)),
        WLAN_FRAME_TYPE_DATA => DATA_NAMES.get(subtype),
        _ => None,
    }
}

/// Single display character for a frame type code (`*` bad FCS, `?` unknown)
pub fn packet_type_char(code: u16) -> char {
    if code == WLAN_FRAME_BADFCS {
        return '*';
    }
    lookup_type(code).map_or('?', |n| n.c)
}

/// Short mnemonic for a frame type code (`BADFCS`, `UNKNOWN` sentinels)
pub fn packet_type_name(code: u16) -> &'static str {
    if code == WLAN_FRAME_BADFCS {
        return "BADFCS";
    }
    lookup_type(code).map_or("UNKNOWN", |n| n.name)
}

/// Format a byte count with one decimal and a k/M suffix (binary units)
pub fn kilo_mega_ize(val: u64) -> String {
    let mut val = val;
    let mut rest = 0;
    let mut suffix = None;
    for unit in ['k', 'M'] {
        if val >= 1024 {
            rest = (val & 1023) * 10 / 1024;
            val >>= 10;
            suffix = Some(unit);
        }
    }
    match suffix {
        Some(unit) => format!("{val}.{rest}{unit}"),
        None => val.to_string(),
    }
}
