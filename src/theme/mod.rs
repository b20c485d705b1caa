// Theme module - Color constants and theme re-exports
//
// This module provides the color palette and the color helpers used to
// grade signal strength, channel utilization and refresh speed.

pub mod default;

use ratatui::style::Color;

/// Primary accent color - used for borders, titles, selected items
/// RGB: (187, 154, 247)
pub const NEON_PURPLE: Color = Color::Rgb(187, 154, 247);

/// Warning indicator - used for weak signals, busy channels
/// RGB: (255, 158, 100)
pub const PUMPKIN_ORANGE: Color = Color::Rgb(255, 158, 100);

/// Danger indicator - used for errors, very weak signals, saturated channels
/// RGB: (247, 118, 142)
pub const BLOOD_RED: Color = Color::Rgb(247, 118, 142);

/// Healthy indicator - used for strong signals, active states
/// RGB: (158, 206, 106)
pub const TOXIC_GREEN: Color = Color::Rgb(158, 206, 106);

/// Neutral text - used for general text, idle channels
/// RGB: (169, 177, 214)
pub const BONE_WHITE: Color = Color::Rgb(169, 177, 214);

/// Background of the selected row
pub const DEEP_INDIGO: Color = Color::Rgb(47, 51, 77);

// Re-export theme functions for convenient access
pub use default::*;
