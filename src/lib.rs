// wlantop - live 802.11 monitor
//
// Aggregation engine (nodes, ESSIDs, channels, statistics, history) fed
// by a packet source, plus the terminal front end that renders it.

pub mod app;
pub mod engine;
pub mod error;
pub mod hop;
pub mod source;
pub mod theme;
pub mod ui;
pub mod wlan;

pub use error::{Error, Result};
