// Error types
//
// Per-packet dispatch never fails; these errors only surface at the
// configuration seams (channel table, tuning, MAC parsing) and from the
// integrity checker.

use thiserror::Error;

/// Errors raised outside the per-packet path
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Channel index outside the channel table
    #[error("channel index {index} out of range (table has {len} channels)")]
    UnknownChannel { index: usize, len: usize },

    /// Channel table built from an empty channel list
    #[error("channel table is empty")]
    EmptyChannelTable,

    /// Channel number listed twice when building the table
    #[error("channel {0} listed more than once")]
    DuplicateChannel(u32),

    /// String that is not a colon-separated MAC address
    #[error("invalid MAC address: {0}")]
    InvalidMac(String),

    /// Capture device refused to tune
    #[error("cannot tune to channel {channel}: {reason}")]
    Tune { channel: u32, reason: String },

    /// Cross-index invariant broken (engine defect)
    #[error("integrity violation: {0}")]
    Integrity(String),
}

pub type Result<T> = std::result::Result<T, Error>;
