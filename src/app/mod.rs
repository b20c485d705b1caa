// Application state management
//
// This module contains the main AppState struct, which owns the engine,
// the packet source and the channel hopper, and drives them on the
// single-threaded loop: dispatch pending records, run due housekeeping,
// then let the UI draw.

pub mod config;
pub mod event;

// Re-export config types for convenience
pub use config::{EngineConfig, HopConfig, RefreshConfig, CHANGE_HIGHLIGHT_DURATION};

use crate::engine::node::Node;
use crate::engine::Engine;
use crate::error::Result;
use crate::hop::{self, ChannelHopper};
use crate::source::PacketSource;
use config::SWEEP_INTERVAL;
use ratatui::widgets::TableState;
use std::time::Instant;

/// Upper bound on records dispatched per loop iteration
const MAX_RECORDS_PER_STEP: usize = 10_000;

/// Which panel occupies the right-hand side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RightPanel {
    /// ESSID groups (default)
    #[default]
    Essids,
    /// Per-channel spectrum
    Spectrum,
}

/// Main application state
pub struct AppState {
    /// Whether the application is running
    pub running: bool,

    /// Aggregated view of everything captured
    pub engine: Engine,

    source: Box<dyn PacketSource>,

    /// Channel hopping schedule (toggle with 'h' key)
    pub hopper: ChannelHopper,

    /// Refresh interval configuration; also paces channel ticks
    pub refresh_config: RefreshConfig,

    /// Right-hand panel (switch with Tab)
    pub right_panel: RightPanel,

    /// Currently selected row in the node table
    pub selected_node: Option<usize>,

    /// Table state for the node table (enables scrolling)
    pub node_table_state: TableState,

    /// Records dispatched per second over the last tick interval
    pub packet_rate: f64,

    last_tick: Instant,
    last_sweep: Instant,
    packets_at_last_tick: u64,
}

impl AppState {
    /// Create a new AppState around an engine and a packet source
    pub fn new(engine: Engine, source: Box<dyn PacketSource>, hop: &HopConfig, refresh: RefreshConfig) -> Self {
        let now = Instant::now();
        Self {
            running: true,
            engine,
            source,
            hopper: ChannelHopper::new(hop),
            refresh_config: refresh,
            right_panel: RightPanel::default(),
            selected_node: None,
            node_table_state: TableState::default(),
            packet_rate: 0.0,
            last_tick: now,
            last_sweep: now,
            packets_at_last_tick: 0,
        }
    }

    /// Tune to the starting channel index
    pub fn start(&mut self, channel_idx: usize) -> Result<()> {
        hop::change_channel(&mut self.engine, self.source.as_mut(), channel_idx)
    }

    /// Name of the packet source
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Update state on each loop iteration
    pub fn on_tick(&mut self) {
        self.step(Instant::now());
    }

    /// One loop iteration at `now`: records first, then housekeeping
    pub fn step(&mut self, now: Instant) {
        self.pump(now);

        if let Some(idx) = self.hopper.poll(&mut self.engine, self.source.as_mut(), now) {
            tracing::trace!(channel = idx, "hop");
        }

        let since_tick = now.saturating_duration_since(self.last_tick);
        if since_tick >= self.refresh_config.ui_interval() {
            self.engine.tick();
            let total = self.engine.stats().total().packets;
            let delta = total.saturating_sub(self.packets_at_last_tick);
            self.packet_rate = delta as f64 / since_tick.as_secs_f64().max(f64::EPSILON);
            self.packets_at_last_tick = total;
            self.last_tick = now;
        }

        if now.saturating_duration_since(self.last_sweep) >= SWEEP_INTERVAL {
            self.engine.sweep(now);
            self.last_sweep = now;
        }

        self.clamp_selection();
    }

    /// Dispatch every record the source has ready, returning how many
    pub fn pump(&mut self, now: Instant) -> usize {
        let mut count = 0;
        while count < MAX_RECORDS_PER_STEP {
            let Some(record) = self.source.next_record(now) else {
                break;
            };
            self.engine.dispatch(&record, now);
            count += 1;
        }
        count
    }

    /// Pause or resume dispatching ('p' key)
    pub fn toggle_pause(&mut self) {
        let paused = !self.engine.is_paused();
        self.engine.set_paused(paused);
    }

    /// Clear statistics counters ('r' key)
    pub fn reset_stats(&mut self) {
        self.engine.reset_stats();
        self.packets_at_last_tick = 0;
        self.packet_rate = 0.0;
    }

    /// Toggle channel hopping ('h' key)
    pub fn toggle_hop(&mut self) {
        let enabled = !self.hopper.is_enabled();
        self.hopper.set_enabled(enabled);
    }

    /// Switch the right-hand panel (Tab key)
    pub fn switch_panel(&mut self) {
        self.right_panel = match self.right_panel {
            RightPanel::Essids => RightPanel::Spectrum,
            RightPanel::Spectrum => RightPanel::Essids,
        };
    }

    /// Move node selection up (decrease index)
    pub fn select_previous_node(&mut self) {
        let len = self.engine.nodes().len();
        if len == 0 {
            self.set_selection(None);
            return;
        }
        match self.selected_node {
            // Start at the last node
            None => self.set_selection(Some(len - 1)),
            Some(idx) if idx > 0 => self.set_selection(Some(idx - 1)),
            Some(_) => {}
        }
    }

    /// Move node selection down (increase index)
    pub fn select_next_node(&mut self) {
        let len = self.engine.nodes().len();
        if len == 0 {
            self.set_selection(None);
            return;
        }
        match self.selected_node {
            None => self.set_selection(Some(0)),
            Some(idx) if idx + 1 < len => self.set_selection(Some(idx + 1)),
            Some(_) => {}
        }
    }

    /// Node under the selection cursor
    pub fn selected(&self) -> Option<&Node> {
        self.selected_node
            .and_then(|idx| self.engine.nodes().iter().nth(idx))
    }

    fn set_selection(&mut self, idx: Option<usize>) {
        self.selected_node = idx;
        self.node_table_state.select(idx);
    }

    /// Keep the selection inside the table after nodes time out
    fn clamp_selection(&mut self) {
        let len = self.engine.nodes().len();
        match self.selected_node {
            Some(_) if len == 0 => self.set_selection(None),
            Some(idx) if idx >= len => self.set_selection(Some(len - 1)),
            _ => {}
        }
    }

    /// Increase refresh rate (decrease interval by 50ms, clamp to 50ms minimum)
    pub fn increase_refresh_rate(&mut self) {
        let new_interval = self
            .refresh_config
            .refresh_ms
            .saturating_sub(config::REFRESH_STEP);
        self.refresh_config.refresh_ms = new_interval.max(config::MIN_REFRESH_MS);
        self.refresh_config.last_change = Some(Instant::now());
    }

    /// Decrease refresh rate (increase interval by 50ms, clamp to 10s maximum)
    pub fn decrease_refresh_rate(&mut self) {
        let new_interval = self
            .refresh_config
            .refresh_ms
            .saturating_add(config::REFRESH_STEP);
        self.refresh_config.refresh_ms = new_interval.min(config::MAX_REFRESH_MS);
        self.refresh_config.last_change = Some(Instant::now());
    }
}
