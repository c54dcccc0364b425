//! Screen layout and the facet header.

use crate::api::MarketplaceApi;
use crate::app::App;
use crate::feed::FilterCriteria;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::{grid, picker, status};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 40;
pub(super) const MIN_HEIGHT: u16 = 10;

/// Splits the screen into header, grid block, and status bar.
fn screen_chunks(area: Rect) -> [Rect; 3] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2]]
}

/// Inner area of the card grid, or `None` if the terminal is too small.
pub(super) fn grid_area(area: Rect) -> Option<Rect> {
    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        return None;
    }
    let [_, grid, _] = screen_chunks(area);
    Some(Block::default().borders(Borders::ALL).inner(grid))
}

pub(super) fn render<A: MarketplaceApi>(f: &mut Frame, app: &App<A>) {
    let area = f.area();
    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let [header, body, footer] = screen_chunks(area);
    render_header(f, app.feed.criteria(), header);
    grid::render(f, app, body);
    status::render(f, app, footer);

    if app.picker.is_some() {
        picker::render(f, app, body);
    }
}

fn render_header(f: &mut Frame, criteria: &FilterCriteria, area: Rect) {
    let on = Style::default().fg(Color::Black).bg(Color::Cyan);
    let off = Style::default().fg(Color::DarkGray);
    let flag = |label: &'static str, enabled: bool| {
        Span::styled(label, if enabled { on } else { off })
    };

    let category = criteria
        .category
        .map_or_else(|| "any".to_string(), |c| c.to_string());
    let mut spans = vec![
        Span::styled(
            format!(" {} ", criteria.sort_by.label()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("| {} | cat {} | ", criteria.group_type.label(), category)),
        flag("1 Buy now", criteria.status.buy_now),
        Span::raw(" "),
        flag("2 Bids", criteria.status.has_bids),
        Span::raw(" "),
        flag("3 Offers", criteria.status.has_offers),
        Span::raw(" "),
        flag("4 Auction", criteria.status.on_auction),
    ];
    if !criteria.collections.is_empty() {
        spans.push(Span::raw(format!(
            " | {} collection(s)",
            criteria.collections.len()
        )));
    }
    if let Some(chain) = criteria.chain_id {
        spans.push(Span::raw(format!(" | chain {}", chain)));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
