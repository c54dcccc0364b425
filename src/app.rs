use crate::api::{ApiError, AuthToken, Collection, LikedStatus, MarketplaceApi, RangePage};
use crate::cancel::Ticket;
use crate::collections::CollectionCatalog;
use crate::feed::{
    Direction, FeedController, FeedSettings, FetchKind, FilterCriteria, LikedOutcome,
    LikedRequest, RangeOutcome, RangeRequest, ScrollMetrics,
};
use futures::FutureExt;
use std::borrow::Cow;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Horizontal pixels represented by one terminal column.
pub const COLUMN_PX: u32 = 8;
/// Vertical pixels represented by one terminal row.
pub const ROW_PX: u32 = 16;
/// Terminal rows occupied by one card.
pub const CARD_HEIGHT_ROWS: usize = 4;

// ============================================================================
// Events
// ============================================================================

/// Completion events sent by background tasks.
#[derive(Debug)]
pub enum AppEvent {
    RangeLoaded {
        ticket: Ticket,
        kind: FetchKind,
        result: Result<RangePage, ApiError>,
    },
    LikedLoaded {
        ticket: Ticket,
        result: Result<Vec<LikedStatus>, ApiError>,
    },
    CollectionsLoaded(Result<Vec<Collection>, ApiError>),
}

/// Collection facet picker state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CollectionPicker {
    pub cursor: usize,
}

// ============================================================================
// App
// ============================================================================

pub struct App<A> {
    api: Arc<A>,
    pub feed: FeedController,
    pub catalog: CollectionCatalog,

    /// Active session; `None` when signed out.
    auth: Option<AuthToken>,
    /// Token restored when the user signs back in.
    stored_auth: Option<AuthToken>,

    // View geometry, in terminal cells.
    grid_cols: Option<u16>,
    grid_rows: u16,
    /// First visible card row.
    pub scroll_row: usize,

    pub picker: Option<CollectionPicker>,

    /// Only render when state has changed.
    pub needs_redraw: bool,
    pub status_message: Option<(Cow<'static, str>, Instant)>,
}

impl<A: MarketplaceApi> App<A> {
    pub fn new(
        api: Arc<A>,
        settings: FeedSettings,
        auth: Option<AuthToken>,
        criteria: FilterCriteria,
    ) -> Self {
        let mut feed = FeedController::new(settings);
        // No layout yet, so this only records the criteria.
        let _ = feed.resync(criteria);
        Self {
            api,
            feed,
            catalog: CollectionCatalog::new(),
            stored_auth: auth.clone(),
            auth,
            grid_cols: None,
            grid_rows: 0,
            scroll_row: 0,
            picker: None,
            needs_redraw: true,
            status_message: None,
        }
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub fn is_signed_in(&self) -> bool {
        self.auth.is_some()
    }

    /// Card width in terminal columns.
    pub fn card_cols(&self) -> u16 {
        let cols = self.feed.settings().item_width_px / COLUMN_PX;
        cols.clamp(1, u16::MAX as u32) as u16
    }

    pub fn items_per_row(&self) -> usize {
        self.feed.items_per_row().unwrap_or(1)
    }

    /// Number of card rows the window occupies.
    pub fn content_rows(&self) -> usize {
        self.feed.window().len().div_ceil(self.items_per_row())
    }

    /// Number of card rows that fit in the grid.
    pub fn visible_rows(&self) -> usize {
        (self.grid_rows as usize / CARD_HEIGHT_ROWS).max(1)
    }

    pub fn max_scroll_row(&self) -> usize {
        self.content_rows().saturating_sub(self.visible_rows())
    }

    /// Scroll state in pixels, as the controller measures it.
    pub fn scroll_metrics(&self) -> ScrollMetrics {
        let row_px = CARD_HEIGHT_ROWS as u32 * ROW_PX;
        let to_px = |rows: usize| (rows as u32).saturating_mul(row_px);
        ScrollMetrics {
            offset: to_px(self.scroll_row),
            viewport: u32::from(self.grid_rows).saturating_mul(ROW_PX),
            content: to_px(self.content_rows()),
        }
    }

    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    /// Clear status message if expired (older than 3 seconds)
    /// Returns true if a message was actually cleared
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed().as_secs() >= 3 {
                self.status_message = None;
                return true;
            }
        }
        false
    }

    // ------------------------------------------------------------------------
    // Inputs
    // ------------------------------------------------------------------------

    /// Loads the collection list. The feed waits for the first grid size.
    pub fn start(&mut self, tx: &mpsc::Sender<AppEvent>) {
        self.refresh_collections(tx);
        self.sync_liked(tx);
    }

    /// Records the grid's inner size; `cols == 0` means not laid out yet.
    pub fn set_grid_size(&mut self, cols: u16, rows: u16, tx: &mpsc::Sender<AppEvent>) {
        let grid_cols = (cols > 0).then_some(cols);
        let changed = self.grid_cols != grid_cols || self.grid_rows != rows;
        self.grid_cols = grid_cols;
        self.grid_rows = rows;
        let width = grid_cols.map(|cols| u32::from(cols) * COLUMN_PX);
        if !changed {
            return;
        }
        self.needs_redraw = true;

        if let Some(request) = self.feed.set_layout_width(width) {
            self.spawn_range(request, tx);
        }
        self.scroll_row = self.scroll_row.min(self.max_scroll_row());
        self.check_bottom(tx);
    }

    /// Switches the feed to `criteria`, refetching if anything changed.
    pub fn apply_criteria(&mut self, criteria: FilterCriteria, tx: &mpsc::Sender<AppEvent>) {
        if &criteria == self.feed.criteria() {
            return;
        }
        tracing::info!(
            sort = criteria.sort_by.label(),
            group = criteria.group_type.label(),
            category = ?criteria.category,
            collections = criteria.collections.len(),
            "Filter changed"
        );
        self.scroll_row = 0;
        self.needs_redraw = true;
        if let Some(request) = self.feed.resync(criteria) {
            self.spawn_range(request, tx);
        }
    }

    /// Edits a copy of the current criteria and applies it.
    pub fn update_criteria(
        &mut self,
        tx: &mpsc::Sender<AppEvent>,
        edit: impl FnOnce(&mut FilterCriteria),
    ) {
        let mut criteria = self.feed.criteria().clone();
        edit(&mut criteria);
        self.apply_criteria(criteria, tx);
    }

    /// Moves the view by `delta` card rows.
    pub fn scroll_by(&mut self, delta: isize, tx: &mpsc::Sender<AppEvent>) {
        let target = self.scroll_row.saturating_add_signed(delta);
        self.scroll_to(target, tx);
    }

    pub fn scroll_to(&mut self, row: usize, tx: &mpsc::Sender<AppEvent>) {
        self.scroll_row = row.min(self.max_scroll_row());
        self.needs_redraw = true;
        if let Some(request) = self.feed.on_scroll(self.scroll_metrics()) {
            self.spawn_range(request, tx);
        }
        self.check_bottom(tx);
    }

    /// Retries after a failed range fetch.
    pub fn retry(&mut self, tx: &mpsc::Sender<AppEvent>) {
        if !self.feed.is_failed() {
            return;
        }
        if let Some(request) = self.feed.extend(Direction::Forward) {
            self.set_status("Retrying...");
            self.spawn_range(request, tx);
        }
    }

    /// Signs out, or back in with the configured token.
    pub fn toggle_session(&mut self, tx: &mpsc::Sender<AppEvent>) {
        let next = match self.auth {
            Some(_) => None,
            None => self.stored_auth.clone(),
        };
        if next.is_none() && self.auth.is_none() {
            self.set_status("No auth token configured");
            return;
        }
        self.set_auth(next, tx);
    }

    pub fn set_auth(&mut self, auth: Option<AuthToken>, tx: &mpsc::Sender<AppEvent>) {
        if let Some(token) = &auth {
            self.stored_auth = Some(token.clone());
        }
        self.auth = auth;
        self.set_status(if self.auth.is_some() {
            "Signed in"
        } else {
            "Signed out"
        });
        self.sync_liked(tx);
    }

    pub fn refresh_collections(&mut self, tx: &mpsc::Sender<AppEvent>) {
        if !self.catalog.begin_refresh() {
            return;
        }
        let api = Arc::clone(&self.api);
        spawn_task(
            "collections",
            tx.clone(),
            async move { AppEvent::CollectionsLoaded(api.fetch_collections().await) },
            |error| AppEvent::CollectionsLoaded(Err(ApiError::TaskPanicked(error))),
        );
    }

    /// Toggles the collection under the picker cursor in the filter.
    pub fn toggle_picked_collection(&mut self, tx: &mpsc::Sender<AppEvent>) {
        let Some(picker) = self.picker else {
            return;
        };
        let Some(address) = self.catalog.get(picker.cursor).map(|c| c.address.clone()) else {
            return;
        };
        self.update_criteria(tx, |c| c.toggle_collection(&address));
    }

    // ------------------------------------------------------------------------
    // Background events
    // ------------------------------------------------------------------------

    pub fn handle_event(&mut self, event: AppEvent, tx: &mpsc::Sender<AppEvent>) {
        self.needs_redraw = true;
        match event {
            AppEvent::RangeLoaded {
                ticket,
                kind,
                result,
            } => match self.feed.apply_range(ticket, kind, result) {
                RangeOutcome::Applied { added, recenter } => {
                    if kind == FetchKind::Extend(Direction::Backward) {
                        self.scroll_row += added / self.items_per_row();
                    }
                    self.scroll_row = if recenter {
                        self.max_scroll_row() / 2
                    } else {
                        self.scroll_row.min(self.max_scroll_row())
                    };
                    self.sync_liked(tx);
                    self.check_bottom(tx);
                }
                RangeOutcome::Failed => {
                    self.set_status("Failed to load items, press r to retry");
                }
                RangeOutcome::Stale | RangeOutcome::Cancelled => {}
            },
            AppEvent::LikedLoaded { ticket, result } => {
                if let LikedOutcome::Applied(n) = self.feed.apply_liked(ticket, result) {
                    tracing::debug!(updated = n, "Liked state applied");
                }
            }
            AppEvent::CollectionsLoaded(result) => {
                let failed = result.is_err();
                self.catalog.apply(result, chrono::Utc::now());
                if failed {
                    self.set_status("Failed to refresh collections");
                }
                if let Some(picker) = &mut self.picker {
                    picker.cursor = picker
                        .cursor
                        .min(self.catalog.collections().len().saturating_sub(1));
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Spawning
    // ------------------------------------------------------------------------

    /// Fires the reached-bottom signal when the last card row is on screen.
    fn check_bottom(&mut self, tx: &mpsc::Sender<AppEvent>) {
        if self.grid_cols.is_none() || !self.feed.is_loaded() {
            return;
        }
        if self.scroll_row + self.visible_rows() < self.content_rows() {
            return;
        }
        if let Some(request) = self.feed.on_reach_bottom() {
            self.spawn_range(request, tx);
        }
    }

    fn sync_liked(&mut self, tx: &mpsc::Sender<AppEvent>) {
        if let Some(request) = self.feed.sync_liked(self.auth.as_ref()) {
            self.spawn_liked(request, tx);
        }
    }

    fn spawn_range(&self, request: RangeRequest, tx: &mpsc::Sender<AppEvent>) {
        let RangeRequest {
            ticket,
            kind,
            query,
            signal,
        } = request;
        tracing::debug!(?kind, from = query.from, count = query.count, "Spawning range fetch");
        let api = Arc::clone(&self.api);
        spawn_task(
            "range_fetch",
            tx.clone(),
            async move {
                let result = api.fetch_range(query, signal).await;
                AppEvent::RangeLoaded {
                    ticket,
                    kind,
                    result,
                }
            },
            move |error| AppEvent::RangeLoaded {
                ticket,
                kind,
                result: Err(ApiError::TaskPanicked(error)),
            },
        );
    }

    fn spawn_liked(&self, request: LikedRequest, tx: &mpsc::Sender<AppEvent>) {
        let LikedRequest {
            ticket,
            keys,
            auth,
            signal,
        } = request;
        let api = Arc::clone(&self.api);
        spawn_task(
            "liked_lookup",
            tx.clone(),
            async move {
                let result = api.fetch_liked_status(keys, auth, signal).await;
                AppEvent::LikedLoaded { ticket, result }
            },
            move |error| AppEvent::LikedLoaded {
                ticket,
                result: Err(ApiError::TaskPanicked(error)),
            },
        );
    }
}

/// Runs `work` on the runtime and sends its event.
///
/// If `work` panics, the event built by `on_panic` is sent instead, so the
/// request it stood for still settles.
fn spawn_task<F, P>(task: &'static str, tx: mpsc::Sender<AppEvent>, work: F, on_panic: P)
where
    F: std::future::Future<Output = AppEvent> + Send + 'static,
    P: FnOnce(String) -> AppEvent + Send + 'static,
{
    tokio::spawn(async move {
        let event = match catch_task_panic(work).await {
            Ok(event) => event,
            Err(error) => {
                tracing::error!(task, error = %error, "Background task panicked");
                on_panic(error)
            }
        };
        if let Err(e) = tx.send(event).await {
            tracing::warn!(task, error = %e, "Channel send failed (receiver dropped)");
        }
    });
}

/// Awaits `future`, turning a panic into its message.
async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future).catch_unwind().await.map_err(|panic| {
        if let Some(s) = panic.downcast_ref::<&'static str>() {
            s.to_string()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Offline;

    impl MarketplaceApi for Offline {
        async fn fetch_range(
            &self,
            _query: crate::api::RangeQuery,
            _signal: crate::cancel::CancelSignal,
        ) -> Result<RangePage, ApiError> {
            Err(ApiError::HttpStatus(503))
        }

        async fn fetch_liked_status(
            &self,
            _keys: Vec<crate::api::ItemKey>,
            _auth: AuthToken,
            _signal: crate::cancel::CancelSignal,
        ) -> Result<Vec<LikedStatus>, ApiError> {
            Err(ApiError::HttpStatus(503))
        }

        async fn fetch_collections(&self) -> Result<Vec<Collection>, ApiError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_repeated_too_small_resize_is_ignored() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = App::new(
            Arc::new(Offline),
            FeedSettings::default(),
            None,
            FilterCriteria::default(),
        );

        app.set_grid_size(0, 3, &tx);
        app.needs_redraw = false;
        app.set_grid_size(0, 3, &tx);
        assert!(!app.needs_redraw);
        assert_eq!(app.feed.items_per_row(), None);

        app.set_grid_size(0, 5, &tx);
        assert!(app.needs_redraw);
    }

    #[tokio::test]
    async fn test_catch_task_panic_reports_message() {
        let result: Result<(), String> = catch_task_panic(async { panic!("boom") }).await;
        assert_eq!(result.unwrap_err(), "boom");

        let ok = catch_task_panic(async { 5 }).await;
        assert_eq!(ok, Ok(5));
    }
}
