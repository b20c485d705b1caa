// Spectrum panel rendering module
//
// One row per channel that has carried traffic (plus the tuned one):
// packets, smoothed signal, airtime utilization bar and node count.

use crate::app::AppState;
use crate::engine::channel::ChannelSlot;
use crate::theme::{signal_color, utilization_color, BONE_WHITE, NEON_PURPLE, TOXIC_GREEN};
use crate::wlan::kilo_mega_ize;
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, BorderType, Borders, Cell, Row, Table},
    Frame,
};
use std::time::Duration;

const BAR_WIDTH: usize = 10;

/// Horizontal bar of `width` cells filled in proportion to `ratio`
pub fn utilization_bar(ratio: f64, width: usize) -> String {
    let filled = ((ratio.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    let mut bar = "█".repeat(filled);
    bar.push_str(&"░".repeat(width - filled));
    bar
}

fn channel_row<'a>(slot: &ChannelSlot, current: bool, interval: Duration) -> Row<'a> {
    let util = slot.utilization(interval);
    let sig = slot.signal_avg.value().map(|v| v.round() as i32).unwrap_or(0);
    let marker = if current { "▶" } else { " " };
    Row::new(vec![
        Cell::from(marker).style(Style::default().fg(TOXIC_GREEN)),
        Cell::from(format!("{:3}", slot.def.chan)).style(Style::default().fg(Color::Cyan)),
        Cell::from(kilo_mega_ize(slot.packets)),
        Cell::from(format!("{sig:4}")).style(Style::default().fg(signal_color(sig))),
        Cell::from(utilization_bar(util, BAR_WIDTH)).style(Style::default().fg(utilization_color(util))),
        Cell::from(format!("{:3.0}%", util * 100.0)),
        Cell::from(slot.num_nodes().to_string()),
    ])
    .style(if current {
        Style::default().fg(BONE_WHITE).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(BONE_WHITE)
    })
}

pub fn render_spectrum(f: &mut Frame, area: Rect, app: &AppState) {
    let channels = app.engine.channels();
    let current = channels.current_index();
    let interval = app.refresh_config.ui_interval();

    let rows: Vec<Row> = channels
        .iter()
        .enumerate()
        .filter(|(idx, slot)| *idx == current || slot.packets > 0)
        .map(|(idx, slot)| channel_row(slot, idx == current, interval))
        .collect();

    let header = Row::new(vec!["", "Ch", "Pkts", "Sig", "Airtime", "", "Nodes"])
        .style(Style::default().fg(NEON_PURPLE).add_modifier(Modifier::BOLD));

    let widths = [
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Length(6),
        Constraint::Length(4),
        Constraint::Length(BAR_WIDTH as u16),
        Constraint::Length(4),
        Constraint::Length(5),
    ];

    let title = format!(
        "━ 📻 Spectrum (ch {} @ {} MHz) ",
        channels.current().def.chan,
        channels.current().def.freq
    );

    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .title(vec![
                Span::styled(title, Style::default().fg(NEON_PURPLE).add_modifier(Modifier::BOLD)),
                Span::styled("━━━━", Style::default().fg(NEON_PURPLE)),
            ])
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(NEON_PURPLE)),
    );

    f.render_widget(table, area);
}
