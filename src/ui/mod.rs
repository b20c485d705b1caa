// UI rendering module
//
// This module contains all UI rendering components for wlantop.
// The main draw() function orchestrates rendering of all UI panels.

mod essids;
mod inspector;
mod nodes;
mod spectrum;
mod status_bar;

use crate::app::{AppState, RightPanel};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};
use unicode_width::UnicodeWidthChar;

use essids::render_essids;
use inspector::render_inspector;
use nodes::render_nodes;
use spectrum::render_spectrum;
use status_bar::render_status_bar;

/// Main UI drawing function
pub fn draw(f: &mut Frame, app: &mut AppState) {
    let size = f.area();

    // Main layout: body, status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Body
            Constraint::Length(3), // Status bar
        ])
        .split(size);

    // Body: node table + right panels
    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(60), // Nodes
            Constraint::Percentage(40), // Right panels
        ])
        .split(chunks[0]);

    render_nodes(f, body_chunks[0], app);

    // Right side: ESSIDs or spectrum + node detail
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(55),
            Constraint::Percentage(45),
        ])
        .split(body_chunks[1]);

    match app.right_panel {
        RightPanel::Essids => render_essids(f, right_chunks[0], app),
        RightPanel::Spectrum => render_spectrum(f, right_chunks[0], app),
    }
    render_inspector(f, right_chunks[1], app);

    render_status_bar(f, chunks[1], app);
}

/// Cut a string to at most `max` terminal columns, marking the cut with '…'
pub(crate) fn fit_width(s: &str, max: usize) -> String {
    let total: usize = s.chars().map(|c| c.width().unwrap_or(0)).sum();
    if total <= max {
        return s.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(c);
        used += w;
    }
    if max > 0 {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use ratatui::{backend::TestBackend, Terminal};
    use std::time::{Duration, Instant};

    #[test]
    fn test_fit_width() {
        assert_eq!(fit_width("lab-net", 10), "lab-net");
        assert_eq!(fit_width("a-very-long-network", 6), "a-ver…");
        // wide characters count double
        assert_eq!(fit_width("日本語ネット", 5), "日本…");
        assert_eq!(fit_width("abc", 0), "");
    }

    #[test]
    fn test_draw_both_panels() {
        let mut app = test_app(true);
        let mut now = Instant::now();
        for _ in 0..200 {
            now += Duration::from_millis(10);
            app.step(now);
        }
        app.select_next_node();

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| draw(f, &mut app)).unwrap();
        app.switch_panel();
        terminal.draw(|f| draw(f, &mut app)).unwrap();

        // tiny terminals must not panic
        let mut small = Terminal::new(TestBackend::new(20, 6)).unwrap();
        small.draw(|f| draw(f, &mut app)).unwrap();
    }
}
