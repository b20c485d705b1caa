// ESSID panel rendering module
//
// Lists named networks in creation order followed by the hidden group,
// with member counts and a marker for networks whose BSSIDs disagree.

use super::fit_width;
use crate::app::AppState;
use crate::engine::essid::EssidGroup;
use crate::theme::{BLOOD_RED, BONE_WHITE, NEON_PURPLE, PUMPKIN_ORANGE};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem},
    Frame,
};

fn essid_item<'a>(group: &EssidGroup, name_width: usize) -> ListItem<'a> {
    let (name, name_style) = if group.is_hidden() {
        (
            "<hidden>".to_string(),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )
    } else {
        (fit_width(group.name(), name_width), Style::default().fg(BONE_WHITE))
    };

    let mut spans = vec![
        Span::raw("  "),
        Span::styled(format!("{name:<name_width$}"), name_style),
        Span::styled(
            format!(" {:3} nodes", group.num_nodes()),
            Style::default().fg(PUMPKIN_ORANGE),
        ),
        Span::styled(
            format!(" {:2} bssid", group.bssids().len()),
            Style::default().fg(Color::Gray),
        ),
    ];
    if group.is_split() {
        spans.push(Span::styled(
            " SPLIT",
            Style::default().fg(BLOOD_RED).add_modifier(Modifier::BOLD),
        ));
    }
    ListItem::new(Line::from(spans))
}

pub fn render_essids(f: &mut Frame, area: Rect, app: &AppState) {
    let essids = app.engine.essids();
    // two spaces of indent, counts take 20 columns, borders 2
    let name_width = (area.width as usize).saturating_sub(24).clamp(4, 32);

    let items: Vec<ListItem> = essids
        .iter_all()
        .filter(|g| !g.is_hidden() || g.num_nodes() > 0)
        .map(|g| essid_item(g, name_width))
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(vec![
                Span::styled(
                    format!("━ 📶 ESSIDs ({}) ", essids.len()),
                    Style::default().fg(NEON_PURPLE).add_modifier(Modifier::BOLD),
                ),
                Span::styled("━━━━━━", Style::default().fg(NEON_PURPLE)),
            ])
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(NEON_PURPLE)),
    );

    f.render_widget(list, area);
}
