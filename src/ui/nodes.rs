// Node table rendering module
//
// Renders the scrollable table of tracked transmitters with signal-based
// coloring, one row per node in registration order.

use super::fit_width;
use crate::app::AppState;
use crate::engine::node::Node;
use crate::engine::Engine;
use crate::theme::{signal_color, BONE_WHITE, DEEP_INDIGO, NEON_PURPLE};
use crate::wlan::{packet_type_char, WLAN_MODE_AP, WLAN_MODE_IBSS, WLAN_MODE_PROBE, WLAN_MODE_STA};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, BorderType, Borders, Cell, Row, Table},
    Frame,
};

const ESSID_COLUMN: usize = 14;

/// Short label for an accumulated mode bitmask
pub fn mode_label(mode: u32) -> String {
    let parts: Vec<&str> = [
        (WLAN_MODE_AP, "AP"),
        (WLAN_MODE_IBSS, "ADH"),
        (WLAN_MODE_STA, "STA"),
        (WLAN_MODE_PROBE, "PRB"),
    ]
    .iter()
    .filter(|(bit, _)| mode & bit != 0)
    .map(|(_, name)| *name)
    .collect();
    if parts.is_empty() {
        "?".to_string()
    } else {
        parts.join(",")
    }
}

fn essid_label(engine: &Engine, node: &Node) -> String {
    match engine.essids().get(node.essid()) {
        Some(group) if !group.is_hidden() => fit_width(group.name(), ESSID_COLUMN),
        _ => "<hidden>".to_string(),
    }
}

fn node_row<'a>(engine: &Engine, node: &Node) -> Row<'a> {
    let sig = node.last_signal;
    Row::new(vec![
        Cell::from(packet_type_char(node.last_type).to_string()),
        Cell::from(node.mac.to_string()).style(Style::default().fg(Color::Cyan)),
        Cell::from(mode_label(node.mode)),
        Cell::from(essid_label(engine, node)),
        Cell::from(if node.wlan_channel == 0 {
            "-".to_string()
        } else {
            node.wlan_channel.to_string()
        }),
        Cell::from(format!("{sig:4}")).style(Style::default().fg(signal_color(sig))),
        Cell::from(format!("{:4.0}", node.signal_avg.get())),
        Cell::from(node.pkt_count.to_string()),
        Cell::from(node.retries_all.to_string()),
        Cell::from(node.channels().len().to_string()),
    ])
    .style(Style::default().fg(BONE_WHITE))
}

pub fn render_nodes(f: &mut Frame, area: Rect, app: &mut AppState) {
    let engine = &app.engine;
    let rows: Vec<Row> = engine.nodes().iter().map(|n| node_row(engine, n)).collect();

    let header = Row::new(vec!["", "MAC", "Mode", "ESSID", "Ch", "Sig", "Avg", "Pkts", "Retry", "Chs"])
        .style(Style::default().fg(NEON_PURPLE).add_modifier(Modifier::BOLD));

    let widths = [
        Constraint::Length(1),
        Constraint::Length(17),
        Constraint::Length(7),
        Constraint::Length(ESSID_COLUMN as u16 + 1),
        Constraint::Length(3),
        Constraint::Length(4),
        Constraint::Length(4),
        Constraint::Length(7),
        Constraint::Length(5),
        Constraint::Length(3),
    ];

    let title = format!(
        "━ 📡 Nodes ({}/{}) ",
        engine.nodes().len(),
        engine.nodes().capacity()
    );

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(vec![
                    Span::styled(title, Style::default().fg(NEON_PURPLE).add_modifier(Modifier::BOLD)),
                    Span::styled("━━━━━━━", Style::default().fg(NEON_PURPLE)),
                ])
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(NEON_PURPLE)),
        )
        .row_highlight_style(Style::default().bg(DEEP_INDIGO));

    f.render_stateful_widget(table, area, &mut app.node_table_state);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_label() {
        assert_eq!(mode_label(0), "?");
        assert_eq!(mode_label(WLAN_MODE_AP), "AP");
        assert_eq!(mode_label(WLAN_MODE_STA | WLAN_MODE_PROBE), "STA,PRB");
        assert_eq!(mode_label(WLAN_MODE_AP | WLAN_MODE_IBSS), "AP,ADH");
    }
}
