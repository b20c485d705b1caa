// Application configuration types
//
// This module contains configuration structs and constants for:
// - The aggregation engine (capacities, timeouts, smoothing)
// - Channel hopping
// - Refresh intervals

use crate::engine::essid::SplitTrigger;
use crate::engine::ewma::DEFAULT_WEIGHT;
use std::time::{Duration, Instant};

// ============================================================================
// Constants
// ============================================================================

/// Nodes not seen for this long are removed
pub const NODE_TIMEOUT: Duration = Duration::from_secs(60);

/// Dwell time on each channel while hopping
pub const CHANNEL_TIME: Duration = Duration::from_millis(250);

/// Default UI refresh / channel tick interval in milliseconds
pub const DISPLAY_INTERVAL_MS: u64 = 100;

/// How often the node timeout sweep runs
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Node registry capacity
pub const MAX_NODES: usize = 255;

/// History ring capacity
pub const MAX_HISTORY: usize = 255;

/// Smoothing weight for every averaged metric
pub const EWMA_WEIGHT: f64 = DEFAULT_WEIGHT;

/// Minimum refresh interval in milliseconds
pub const MIN_REFRESH_MS: u64 = 50;

/// Maximum refresh interval in milliseconds
pub const MAX_REFRESH_MS: u64 = 10000;

/// Refresh interval adjustment step in milliseconds
pub const REFRESH_STEP: u64 = 50;

/// Duration to highlight recently changed refresh intervals
pub const CHANGE_HIGHLIGHT_DURATION: Duration = Duration::from_millis(500);

// ============================================================================
// Configuration Structs
// ============================================================================

/// Sizing and policy of the aggregation engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Maximum number of tracked nodes; new MACs are dropped when full
    pub node_capacity: usize,

    /// Number of recent packet samples kept for trend display
    pub history_capacity: usize,

    /// Nodes not seen for longer than this are swept
    pub node_timeout: Duration,

    /// EWMA weight given to each new sample
    pub ewma_weight: f64,

    /// Which named frames may correlate a BSSID with a hidden ESSID
    pub split_trigger: SplitTrigger,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            node_capacity: MAX_NODES,
            history_capacity: MAX_HISTORY,
            node_timeout: NODE_TIMEOUT,
            ewma_weight: EWMA_WEIGHT,
            split_trigger: SplitTrigger::default(),
        }
    }
}

/// Channel hopping settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopConfig {
    /// Hop through the channel table (toggle with 'h' key)
    pub enabled: bool,

    /// Time spent on each channel
    pub dwell: Duration,
}

impl Default for HopConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dwell: CHANNEL_TIME,
        }
    }
}

/// Configuration for the refresh interval
///
/// The same interval paces UI redraws and channel ticks, so smoothed
/// per-tick airtime is utilization per refresh.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Refresh interval in milliseconds (50-10000ms)
    pub refresh_ms: u64,

    /// Timestamp of last interval change (for visual feedback)
    pub last_change: Option<Instant>,
}

impl RefreshConfig {
    /// Create a new RefreshConfig with default values
    pub fn new() -> Self {
        Self::with_interval(DISPLAY_INTERVAL_MS)
    }

    /// Start from a given interval, clamped to the allowed range
    pub fn with_interval(refresh_ms: u64) -> Self {
        Self {
            refresh_ms: refresh_ms.clamp(MIN_REFRESH_MS, MAX_REFRESH_MS),
            last_change: None,
        }
    }

    /// Get UI refresh interval as Duration
    pub fn ui_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }

    /// Whether the interval changed recently enough to highlight
    pub fn recently_changed(&self, now: Instant) -> bool {
        self.last_change
            .is_some_and(|t| now.saturating_duration_since(t) < CHANGE_HIGHLIGHT_DURATION)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self::new()
    }
}
