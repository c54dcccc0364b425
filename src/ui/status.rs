use crate::api::MarketplaceApi;
use crate::app::App;
use crate::feed::Direction;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};
use std::borrow::Cow;

/// Render the status bar
pub(super) fn render<A: MarketplaceApi>(f: &mut Frame, app: &App<A>, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(msg.as_ref())
    } else if app.feed.is_failed() {
        Cow::Borrowed("Loading failed | [r]etry [q]uit")
    } else if app.feed.is_fetching(Direction::Forward) || app.feed.is_fetching(Direction::Backward) {
        Cow::Borrowed("Loading...")
    } else if app.picker.is_some() {
        Cow::Borrowed("[j/k]move [space]toggle [Esc]close")
    } else {
        Cow::Borrowed(
            "[j/k]scroll [s]ort [g]roup [c/C]ategory [1-4]status [t]collections [a]uth [q]uit",
        )
    };

    let style = Style::default().bg(Color::DarkGray).fg(Color::White);
    f.render_widget(Paragraph::new(text).style(style), area);
}
