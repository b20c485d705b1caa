// Status Bar rendering module
//
// Renders the bottom status bar with keyboard shortcuts and capture
// indicators.

use crate::app::AppState;
use crate::theme::{get_refresh_color, BLOOD_RED, BONE_WHITE, NEON_PURPLE, PUMPKIN_ORANGE, TOXIC_GREEN};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};
use std::time::Instant;

pub fn render_status_bar(f: &mut Frame, area: Rect, app: &AppState) {
    let pause_hint = if app.engine.is_paused() {
        "Resume | "
    } else {
        "Pause | "
    };

    // Calculate available width for hints (subtract borders and icon)
    let available_width = area.width.saturating_sub(4);

    // Define all hints with priority levels
    struct Hint {
        priority: u8,
        key: &'static str,
        desc: &'static str,
        color: Color,
    }

    let hints = [
        Hint {
            priority: 1,
            key: "Q:",
            desc: "Quit ",
            color: Color::Red,
        },
        Hint {
            priority: 1,
            key: "↑↓:",
            desc: "Navigate | ",
            color: NEON_PURPLE,
        },
        Hint {
            priority: 1,
            key: "P:",
            desc: pause_hint,
            color: NEON_PURPLE,
        },
        Hint {
            priority: 2,
            key: "H:",
            desc: "Hop | ",
            color: NEON_PURPLE,
        },
        Hint {
            priority: 2,
            key: "Tab:",
            desc: "Panel | ",
            color: NEON_PURPLE,
        },
        Hint {
            priority: 3,
            key: "R:",
            desc: "Reset | ",
            color: NEON_PURPLE,
        },
        Hint {
            priority: 3,
            key: "+/-:",
            desc: "Speed | ",
            color: NEON_PURPLE,
        },
    ];

    let indicators = build_indicators(app, Instant::now());
    let indicator_len: usize = indicators.iter().map(|s| s.width()).sum();

    // Build status text, adding hints until we run out of space
    let mut spans = vec![Span::styled(" 📡 ", Style::default().fg(NEON_PURPLE))];
    let mut current_length = 4 + indicator_len + 1;

    for priority in 1..=3 {
        for hint in hints.iter().filter(|h| h.priority == priority) {
            let hint_length = hint.key.chars().count() + hint.desc.len();
            if current_length + hint_length <= available_width as usize {
                spans.push(Span::styled(
                    hint.key,
                    Style::default().fg(hint.color).add_modifier(Modifier::BOLD),
                ));
                spans.push(Span::raw(hint.desc));
                current_length += hint_length;
            }
        }
    }

    // Indicators always show
    spans.push(Span::raw(" "));
    spans.extend(indicators);

    let status_bar = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Double)
                .border_style(Style::default().fg(NEON_PURPLE)),
        )
        .alignment(Alignment::Left);

    f.render_widget(status_bar, area);
}

fn bracket(label: &str, value: String, color: Color) -> [Span<'static>; 3] {
    [
        Span::styled(format!("[{label}:"), Style::default().fg(BONE_WHITE)),
        Span::styled(value, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::styled("] ", Style::default().fg(BONE_WHITE)),
    ]
}

/// Build capture indicator spans for the status bar
///
/// Shows pause and hop state, the tuned channel, packet rate, node count,
/// capacity drops and the refresh interval.
pub fn build_indicators(app: &AppState, now: Instant) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let engine = &app.engine;

    if engine.is_paused() {
        spans.push(Span::styled(
            "PAUSED ",
            Style::default().fg(BLOOD_RED).add_modifier(Modifier::BOLD),
        ));
    }

    let (hop_state, hop_color) = if app.hopper.is_enabled() {
        ("ON", TOXIC_GREEN)
    } else {
        ("OFF", BONE_WHITE)
    };
    spans.extend(bracket("HOP", hop_state.to_string(), hop_color));

    let current = engine.channels().current();
    spans.extend(bracket("CH", current.def.chan.to_string(), Color::Cyan));
    spans.extend(bracket("PKT/s", format!("{:.0}", app.packet_rate), PUMPKIN_ORANGE));
    spans.extend(bracket("NODES", engine.nodes().len().to_string(), TOXIC_GREEN));

    if engine.dropped() > 0 {
        spans.extend(bracket("DROP", engine.dropped().to_string(), BLOOD_RED));
    }

    let refresh_ms = app.refresh_config.refresh_ms;
    let refresh_color = get_refresh_color(refresh_ms, 100, app.refresh_config.recently_changed(now));
    spans.extend(bracket("UI", format!("{refresh_ms}ms"), refresh_color));

    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;

    fn text(spans: &[Span]) -> String {
        spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_indicators_reflect_state() {
        let mut app = test_app(true);
        let now = Instant::now();
        let shown = text(&build_indicators(&app, now));
        assert!(shown.contains("[HOP:ON]"));
        assert!(shown.contains("[CH:1]"));
        assert!(!shown.contains("PAUSED"));
        assert!(!shown.contains("DROP"));

        app.toggle_pause();
        app.toggle_hop();
        let shown = text(&build_indicators(&app, now));
        assert!(shown.starts_with("PAUSED"));
        assert!(shown.contains("[HOP:OFF]"));
    }
}
