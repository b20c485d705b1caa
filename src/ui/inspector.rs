// Node Inspector rendering module
//
// Renders the detail panel for the selected node: identity, ESSID, signal
// and security, the channels it was heard on, and a sparkline of recent
// signal levels across all captured frames.

use crate::app::AppState;
use crate::engine::node::Node;
use crate::engine::Engine;
use crate::theme::{get_refresh_color, signal_color, BONE_WHITE, NEON_PURPLE, PUMPKIN_ORANGE, TOXIC_GREEN};
use crate::ui::nodes::mode_label;
use crate::wlan::{kilo_mega_ize, packet_type_name};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Sparkline},
    Frame,
};
use std::time::Instant;

// ============================================================================
// Node Inspector View Model
// ============================================================================

/// Signal floor mapped to the bottom of the sparkline (dBm)
const SPARK_FLOOR_DBM: i32 = -100;

/// One channel the selected node was heard on
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSighting {
    pub chan: u32,
    pub signal_avg: f64,
    pub packets: u64,
}

/// View model for the inspector panel
///
/// Extracted from AppState so rendering stays free of engine lookups.
#[derive(Debug, Clone)]
pub struct NodeInspectorView {
    /// Whether a node is selected
    pub has_selection: bool,
    pub mac: String,
    pub mode: String,
    pub essid: String,
    pub bssid: String,
    /// MAC of the access point a station is attached to
    pub ap: Option<String>,
    pub signal: i32,
    pub signal_avg: f64,
    pub sig_max: i32,
    pub packets: u64,
    pub retries: u32,
    pub last_type: &'static str,
    pub encryption: &'static str,
    pub idle_secs: u64,
    pub sightings: Vec<ChannelSighting>,
    pub refresh_ms: u64,
}

impl Default for NodeInspectorView {
    fn default() -> Self {
        Self {
            has_selection: false,
            mac: "No node selected".to_string(),
            mode: String::new(),
            essid: String::new(),
            bssid: String::new(),
            ap: None,
            signal: 0,
            signal_avg: 0.0,
            sig_max: 0,
            packets: 0,
            retries: 0,
            last_type: "",
            encryption: "",
            idle_secs: 0,
            sightings: Vec::new(),
            refresh_ms: 100,
        }
    }
}

fn encryption_label(node: &Node) -> &'static str {
    if node.rsn {
        "WPA2"
    } else if node.wpa {
        "WPA"
    } else if node.wep {
        "WEP"
    } else {
        "open"
    }
}

/// Build the inspector view model for the current selection
pub fn build_node_inspector_view(app: &AppState, now: Instant) -> NodeInspectorView {
    let mut view = NodeInspectorView {
        refresh_ms: app.refresh_config.refresh_ms,
        ..Default::default()
    };
    let Some(node) = app.selected() else {
        return view;
    };
    fill_node_view(&mut view, &app.engine, node, now);
    view
}

fn fill_node_view(view: &mut NodeInspectorView, engine: &Engine, node: &Node, now: Instant) {
    view.has_selection = true;
    view.mac = node.mac.to_string();
    view.mode = mode_label(node.mode);
    view.essid = match engine.essids().get(node.essid()) {
        Some(group) if !group.is_hidden() => group.name().to_string(),
        _ => "<hidden>".to_string(),
    };
    view.bssid = node.bssid.to_string();
    view.ap = node
        .ap_node()
        .and_then(|id| engine.nodes().get(id))
        .map(|ap| ap.mac.to_string());
    view.signal = node.last_signal;
    view.signal_avg = node.signal_avg.get();
    view.sig_max = node.sig_max;
    view.packets = node.pkt_count;
    view.retries = node.retries_all;
    view.last_type = packet_type_name(node.last_type);
    view.encryption = encryption_label(node);
    view.idle_secs = now.saturating_duration_since(node.last_seen).as_secs();
    view.sightings = node
        .channels()
        .iter()
        .filter_map(|&idx| {
            let slot = engine.channels().get(idx)?;
            let seen = slot.nodes().get(&node.id)?;
            Some(ChannelSighting {
                chan: slot.def.chan,
                signal_avg: seen.sig_avg.get(),
                packets: seen.packets,
            })
        })
        .collect();
}

/// Recent signal levels, oldest first, shifted so -100 dBm is zero
pub fn signal_sparkline_data(engine: &Engine) -> Vec<u64> {
    let mut data: Vec<u64> = engine
        .history()
        .iter_recent()
        .filter(|s| s.signal != 0)
        .map(|s| (s.signal - SPARK_FLOOR_DBM).clamp(0, 100) as u64)
        .collect();
    data.reverse();
    data
}

pub fn render_inspector(f: &mut Frame, area: Rect, app: &AppState) {
    let now = Instant::now();
    let view = build_node_inspector_view(app, now);

    let inspector_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9), // Node info
            Constraint::Length(5), // Sparkline
            Constraint::Min(0),    // Channel list
        ])
        .split(area);

    let recently_changed = app.refresh_config.recently_changed(now);
    let refresh_color = get_refresh_color(view.refresh_ms, 100, recently_changed);
    let refresh_style = if recently_changed {
        Style::default().fg(refresh_color).add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    } else {
        Style::default().fg(refresh_color)
    };

    let mut top_content = vec![Line::from(vec![
        Span::raw("  NODE: "),
        Span::styled(
            view.mac.clone(),
            Style::default().fg(PUMPKIN_ORANGE).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {}", view.mode), Style::default().fg(Color::Gray)),
    ])];

    if view.has_selection {
        top_content.push(Line::from(vec![
            Span::raw("  ESSID: "),
            Span::styled(view.essid.clone(), Style::default().fg(Color::Cyan)),
            Span::raw(format!("  [{}]", view.encryption)),
        ]));
        top_content.push(Line::from(vec![
            Span::raw("  BSSID: "),
            Span::styled(view.bssid.clone(), Style::default().fg(Color::Gray)),
        ]));
        if let Some(ap) = &view.ap {
            top_content.push(Line::from(vec![
                Span::raw("  AP: "),
                Span::styled(ap.clone(), Style::default().fg(Color::Blue)),
            ]));
        }
        top_content.push(Line::from(vec![
            Span::raw("  SIG: "),
            Span::styled(
                format!("{} dBm", view.signal),
                Style::default().fg(signal_color(view.signal)).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  avg {:.0}  max {}", view.signal_avg, view.sig_max)),
        ]));
        top_content.push(Line::from(vec![
            Span::raw("  PKTS: "),
            Span::styled(kilo_mega_ize(view.packets), Style::default().fg(BONE_WHITE)),
            Span::raw(format!("  retries {}  last {}", view.retries, view.last_type)),
        ]));
        top_content.push(Line::from(vec![
            Span::raw("  IDLE: "),
            Span::styled(format!("{}s", view.idle_secs), Style::default().fg(Color::Gray)),
        ]));
    }
    top_content.push(Line::from(vec![
        Span::raw("  ⚡ Refresh: "),
        Span::styled(format!("{}ms", view.refresh_ms), refresh_style),
    ]));

    let top_paragraph = Paragraph::new(top_content).block(
        Block::default()
            .title(vec![
                Span::styled(
                    "━ 🔮 Inspector ",
                    Style::default().fg(NEON_PURPLE).add_modifier(Modifier::BOLD),
                ),
                Span::styled("━━━━━━", Style::default().fg(NEON_PURPLE)),
            ])
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(NEON_PURPLE)),
    );
    f.render_widget(top_paragraph, inspector_chunks[0]);

    let spark_data = signal_sparkline_data(&app.engine);
    let sparkline = Sparkline::default()
        .block(
            Block::default()
                .title(vec![Span::styled(
                    format!(" 📊 Signal ({} frames) ", spark_data.len()),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )])
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(NEON_PURPLE)),
        )
        .data(&spark_data)
        .style(Style::default().fg(TOXIC_GREEN))
        .max(100);
    f.render_widget(sparkline, inspector_chunks[1]);

    let mut channel_lines = Vec::new();
    if view.sightings.is_empty() {
        channel_lines.push(Line::from(vec![Span::styled(
            "  (no channels)",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )]));
    } else {
        for s in &view.sightings {
            let avg = s.signal_avg.round() as i32;
            channel_lines.push(Line::from(vec![
                Span::raw("  > ch "),
                Span::styled(format!("{:3}", s.chan), Style::default().fg(Color::Cyan)),
                Span::styled(format!("  {avg:4} dBm"), Style::default().fg(signal_color(avg))),
                Span::raw(format!("  {} pkts", kilo_mega_ize(s.packets))),
            ]));
        }
    }

    let channel_paragraph = Paragraph::new(channel_lines).block(
        Block::default()
            .title(vec![Span::styled(
                format!(" 📜 Heard On ({}) ", view.sightings.len()),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )])
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(NEON_PURPLE)),
    );
    f.render_widget(channel_paragraph, inspector_chunks[2]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use std::time::Duration;

    fn warmed_app() -> (AppState, Instant) {
        let mut app = test_app(true);
        let mut now = Instant::now();
        for _ in 0..300 {
            now += Duration::from_millis(10);
            app.step(now);
        }
        (app, now)
    }

    #[test]
    fn test_view_without_selection() {
        let (app, now) = warmed_app();
        let view = build_node_inspector_view(&app, now);
        assert!(!view.has_selection);
        assert_eq!(view.mac, "No node selected");
        assert!(view.sightings.is_empty());
        assert_eq!(view.refresh_ms, app.refresh_config.refresh_ms);
    }

    #[test]
    fn test_view_follows_selection() {
        let (mut app, now) = warmed_app();
        app.select_next_node();
        let Some(node) = app.selected() else {
            return;
        };
        let mac = node.mac.to_string();
        let packets = node.pkt_count;
        let channels = node.channels().len();

        let view = build_node_inspector_view(&app, now);
        assert!(view.has_selection);
        assert_eq!(view.mac, mac);
        assert_eq!(view.packets, packets);
        assert_eq!(view.sightings.len(), channels);
        assert!(view.sightings.iter().all(|s| s.packets > 0));
    }

    #[test]
    fn test_sparkline_data_bounds() {
        let (app, _) = warmed_app();
        let data = signal_sparkline_data(&app.engine);
        assert!(data.len() <= app.engine.history().capacity());
        assert!(data.iter().all(|&v| v <= 100));
    }
}
