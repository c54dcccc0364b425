//! The card grid.

use crate::api::{Item, MarketplaceApi};
use crate::app::{App, CARD_HEIGHT_ROWS};
use crate::util::card_label;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub(super) fn render<A: MarketplaceApi>(f: &mut Frame, app: &App<A>, area: Rect) {
    let window = app.feed.window();
    let title = if window.total() > 0 {
        format!(
            " Explore {}-{} of {} ",
            window.from() + usize::from(!window.is_empty()),
            window.to(),
            window.total()
        )
    } else {
        " Explore ".to_string()
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    if window.is_empty() {
        let msg = if app.feed.is_failed() {
            "Failed to load items. Press r to retry."
        } else if app.feed.is_loaded() {
            "No items match these filters."
        } else {
            "Loading..."
        };
        f.render_widget(Paragraph::new(msg), inner);
        return;
    }

    let per_row = app.items_per_row();
    let card_cols = app.card_cols();
    let card_rows = CARD_HEIGHT_ROWS as u16;

    for (screen_row, row) in (app.scroll_row..app.scroll_row + app.visible_rows()).enumerate() {
        let y = inner.y + screen_row as u16 * card_rows;
        if y + card_rows > inner.y + inner.height {
            break;
        }
        for col in 0..per_row {
            let Some(item) = window.items().get(row * per_row + col) else {
                return;
            };
            let x = inner.x + col as u16 * card_cols;
            if x + card_cols > inner.x + inner.width {
                break;
            }
            render_card(f, item, Rect::new(x, y, card_cols, card_rows));
        }
    }
}

fn render_card(f: &mut Frame, item: &Item, area: Rect) {
    let label_width = area.width.saturating_sub(2) as usize;
    let price = match (item.price, &item.payment_token) {
        (Some(price), _) if price > 0.0 => format!("{:.2}", price),
        _ => "-".to_string(),
    };
    let liked = match item.liked {
        Some(true) => "♥",
        Some(false) => "♡",
        None => " ",
    };
    let detail = match item.bundle_size {
        Some(n) => format!("{} {} · {} items", liked, price, n),
        None => format!("{} {}", liked, price),
    };

    let border = if item.is_bundle() {
        Style::default().fg(Color::Magenta)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let card = Paragraph::new(vec![
        Line::from(card_label(&item.name, label_width)),
        Line::from(card_label(&detail, label_width)),
    ])
    .block(Block::default().borders(Borders::ALL).border_style(border));
    f.render_widget(card, area);
}
