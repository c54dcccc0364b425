//! Input handling for the TUI.

use crate::api::MarketplaceApi;
use crate::app::{App, AppEvent, CollectionPicker};
use crossterm::event::{KeyCode, KeyModifiers};
use tokio::sync::mpsc;

use super::Action;

/// Main input dispatch function.
pub(super) fn handle_input<A: MarketplaceApi>(
    app: &mut App<A>,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if app.picker.is_some() {
        handle_picker_input(app, code, event_tx);
        return Action::Continue;
    }
    handle_grid_input(app, code, event_tx)
}

fn handle_grid_input<A: MarketplaceApi>(
    app: &mut App<A>,
    code: KeyCode,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    let page = app.visible_rows() as isize;
    match code {
        KeyCode::Char('q') | KeyCode::Esc => return Action::Quit,

        KeyCode::Char('j') | KeyCode::Down => app.scroll_by(1, event_tx),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_by(-1, event_tx),
        KeyCode::PageDown | KeyCode::Char(' ') => app.scroll_by(page, event_tx),
        KeyCode::PageUp => app.scroll_by(-page, event_tx),
        KeyCode::Home => app.scroll_to(0, event_tx),
        KeyCode::End => {
            let last = app.max_scroll_row();
            app.scroll_to(last, event_tx);
        }

        KeyCode::Char('s') => app.update_criteria(event_tx, |c| c.sort_by = c.sort_by.next()),
        KeyCode::Char('g') => {
            app.update_criteria(event_tx, |c| c.group_type = c.group_type.next())
        }
        KeyCode::Char('c') => app.update_criteria(event_tx, |c| {
            c.category = Some(c.category.map_or(0, |n| n.saturating_add(1)))
        }),
        KeyCode::Char('C') => app.update_criteria(event_tx, |c| c.category = None),
        KeyCode::Char('1') => app.update_criteria(event_tx, |c| c.status.buy_now = !c.status.buy_now),
        KeyCode::Char('2') => app.update_criteria(event_tx, |c| c.status.has_bids = !c.status.has_bids),
        KeyCode::Char('3') => app.update_criteria(event_tx, |c| c.status.has_offers = !c.status.has_offers),
        KeyCode::Char('4') => app.update_criteria(event_tx, |c| c.status.on_auction = !c.status.on_auction),
        KeyCode::Char('x') => app.update_criteria(event_tx, |c| c.collections.clear()),

        KeyCode::Char('t') => {
            app.picker = Some(CollectionPicker::default());
            app.needs_redraw = true;
        }
        KeyCode::Char('r') => app.retry(event_tx),
        KeyCode::Char('R') => {
            app.set_status("Refreshing collections...");
            app.refresh_collections(event_tx);
        }
        KeyCode::Char('a') => app.toggle_session(event_tx),
        _ => {}
    }
    Action::Continue
}

/// Handle input while the collection picker is open.
///
/// j/k move, Space/Enter toggle, Esc/t close.
fn handle_picker_input<A: MarketplaceApi>(
    app: &mut App<A>,
    code: KeyCode,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    let count = app.catalog.collections().len();
    let Some(picker) = app.picker.as_mut() else {
        return;
    };
    app.needs_redraw = true;
    match code {
        KeyCode::Esc | KeyCode::Char('t') | KeyCode::Char('q') => app.picker = None,
        KeyCode::Char('j') | KeyCode::Down => {
            picker.cursor = (picker.cursor + 1).min(count.saturating_sub(1));
        }
        KeyCode::Char('k') | KeyCode::Up => {
            picker.cursor = picker.cursor.saturating_sub(1);
        }
        KeyCode::Char(' ') | KeyCode::Enter => app.toggle_picked_collection(event_tx),
        _ => {}
    }
}
