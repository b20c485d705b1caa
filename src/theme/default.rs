// Default theme functions
//
// Color grading for signal strength, channel utilization and the refresh
// interval indicator.

use ratatui::style::Color;

use super::{BLOOD_RED, BONE_WHITE, PUMPKIN_ORANGE, TOXIC_GREEN};

/// Signal at or above this is drawn green (dBm)
pub const SIGNAL_GOOD_DBM: i32 = -60;

/// Signal at or below this is drawn red (dBm)
pub const SIGNAL_POOR_DBM: i32 = -80;

/// Get the color for a signal level in dBm
///
/// 0 means "no reading" and is drawn neutral.
pub fn signal_color(dbm: i32) -> Color {
    match dbm {
        0 => BONE_WHITE,
        d if d >= SIGNAL_GOOD_DBM => TOXIC_GREEN,
        d if d > SIGNAL_POOR_DBM => PUMPKIN_ORANGE,
        _ => BLOOD_RED,
    }
}

/// Get the color for a channel utilization ratio (0.0 ~ 1.0)
///
/// Fades from green through orange to red as the channel fills up.
pub fn utilization_color(ratio: f64) -> Color {
    let ratio = ratio.clamp(0.0, 1.0) as f32;
    if ratio < 0.5 {
        interpolate_color((158, 206, 106), (255, 158, 100), ratio * 2.0)
    } else {
        interpolate_color((255, 158, 100), (247, 118, 142), (ratio - 0.5) * 2.0)
    }
}

/// Interpolate between two RGB colors based on a ratio (0.0 ~ 1.0)
///
/// # Arguments
/// * `color1` - Starting color as (r, g, b) tuple
/// * `color2` - Ending color as (r, g, b) tuple
/// * `ratio` - Interpolation ratio (0.0 = color1, 1.0 = color2)
pub fn interpolate_color(color1: (u8, u8, u8), color2: (u8, u8, u8), ratio: f32) -> Color {
    let ratio = ratio.clamp(0.0, 1.0);
    let r = (color1.0 as f32 + (color2.0 as f32 - color1.0 as f32) * ratio) as u8;
    let g = (color1.1 as f32 + (color2.1 as f32 - color1.1 as f32) * ratio) as u8;
    let b = (color1.2 as f32 + (color2.2 as f32 - color1.2 as f32) * ratio) as u8;
    Color::Rgb(r, g, b)
}

/// Get color for refresh interval based on its value relative to default
///
/// Color coding:
/// - Green (TOXIC_GREEN): Default value or slower
/// - Yellow (PUMPKIN_ORANGE): High frequency (increased performance impact)
/// - Red (BLOOD_RED): Very high frequency (significant performance impact)
///
/// If recently_changed is true, returns a brighter version of the color
pub fn get_refresh_color(interval_ms: u64, default_ms: u64, recently_changed: bool) -> Color {
    let base_color = if interval_ms >= default_ms {
        TOXIC_GREEN
    } else {
        // Faster than default (higher frequency)
        let ratio = (default_ms - interval_ms) as f32 / default_ms as f32;
        if ratio > 0.5 {
            BLOOD_RED
        } else {
            PUMPKIN_ORANGE
        }
    };

    // If recently changed, make the color brighter
    if recently_changed {
        match base_color {
            Color::Rgb(r, g, b) => {
                // Increase brightness by 20%
                let r = ((r as f32 * 1.2).min(255.0)) as u8;
                let g = ((g as f32 * 1.2).min(255.0)) as u8;
                let b = ((b as f32 * 1.2).min(255.0)) as u8;
                Color::Rgb(r, g, b)
            }
            _ => base_color,
        }
    } else {
        base_color
    }
}
