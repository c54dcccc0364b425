//! Collection facet overlay.

use crate::api::MarketplaceApi;
use crate::app::App;
use crate::util::card_label;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

pub(super) fn render<A: MarketplaceApi>(f: &mut Frame, app: &App<A>, area: Rect) {
    let Some(picker) = app.picker else {
        return;
    };
    let width = area.width.saturating_sub(4).min(60);
    let height = area.height.saturating_sub(2);
    if width < 10 || height < 3 {
        return;
    }
    let overlay = Rect::new(area.x + (area.width - width) / 2, area.y + 1, width, height);

    let selected = &app.feed.criteria().collections;
    let visible = height.saturating_sub(2) as usize;
    let first = picker.cursor.saturating_sub(visible.saturating_sub(1));
    let label_width = width.saturating_sub(8) as usize;

    let lines: Vec<Line> = if app.catalog.collections().is_empty() {
        let msg = if app.catalog.is_loading() {
            "Loading collections..."
        } else {
            "No collections"
        };
        vec![Line::from(msg)]
    } else {
        app.catalog
            .collections()
            .iter()
            .enumerate()
            .skip(first)
            .take(visible)
            .map(|(i, c)| {
                let mark = if selected.contains(&c.address.to_ascii_lowercase()) {
                    "[x]"
                } else {
                    "[ ]"
                };
                let verified = if c.is_verified { "✔" } else { " " };
                let name = if c.collection_name.is_empty() {
                    &c.address
                } else {
                    &c.collection_name
                };
                let text = format!("{} {} {}", mark, verified, card_label(name, label_width));
                if i == picker.cursor {
                    Line::styled(text, Style::default().add_modifier(Modifier::REVERSED))
                } else {
                    Line::from(text)
                }
            })
            .collect()
    };

    let title = if app.catalog.is_failed() {
        " Collections (refresh failed) "
    } else {
        " Collections "
    };
    f.render_widget(Clear, overlay);
    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(Color::Cyan)),
        ),
        overlay,
    );
}
