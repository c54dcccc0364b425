//! The windowed feed state machine.
//!
//! [`FeedController`] never performs I/O. Each operation that needs data
//! returns a request description ([`RangeRequest`] or [`LikedRequest`]) for the
//! caller to run; the response is fed back through [`FeedController::apply_range`]
//! or [`FeedController::apply_liked`] together with the request's ticket.
//! Responses whose ticket is no longer current are discarded unchanged.

use super::criteria::FilterCriteria;
use super::layout::{self, DEFAULT_ITEM_WIDTH_PX};
use super::window::{Placement, Window};
use crate::api::{ApiError, AuthToken, ItemKey, LikedStatus, RangePage, RangeQuery};
use crate::cancel::{CancelSignal, RequestSlot, Slot, Ticket};

/// Distance from either scroll edge, in pixels, that triggers a fetch.
pub const SCROLL_THRESHOLD_PX: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// What a range response will be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// Replaces the whole window after a criteria change.
    Reset,
    Extend(Direction),
}

/// A range fetch the caller should run.
#[derive(Debug, Clone)]
pub struct RangeRequest {
    pub ticket: Ticket,
    pub kind: FetchKind,
    pub query: RangeQuery,
    pub signal: CancelSignal,
}

/// A batched liked-status lookup the caller should run.
#[derive(Debug, Clone)]
pub struct LikedRequest {
    pub ticket: Ticket,
    pub keys: Vec<ItemKey>,
    pub auth: AuthToken,
    pub signal: CancelSignal,
}

/// Scroll state reported by the view, all in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollMetrics {
    pub offset: u32,
    pub viewport: u32,
    pub content: u32,
}

impl ScrollMetrics {
    /// Distance left between the bottom of the viewport and the end of the content.
    pub fn remaining(&self) -> u32 {
        self.content
            .saturating_sub(self.viewport)
            .saturating_sub(self.offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOutcome {
    /// The batch was merged. `recenter` asks the view to scroll to the middle
    /// of the content.
    Applied { added: usize, recenter: bool },
    /// Superseded by a newer request for the same slot.
    Stale,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikedOutcome {
    /// Number of window items whose liked state was updated.
    Applied(usize),
    Stale,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedSettings {
    pub item_width_px: u32,
    pub scroll_threshold_px: u32,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            item_width_px: DEFAULT_ITEM_WIDTH_PX,
            scroll_threshold_px: SCROLL_THRESHOLD_PX,
        }
    }
}

#[derive(Debug)]
pub struct FeedController {
    settings: FeedSettings,
    window: Window,
    criteria: FilterCriteria,
    items_per_row: Option<usize>,
    down: RequestSlot,
    up: RequestSlot,
    liked: RequestSlot,
    /// Keys of the liked lookup in flight, in request order.
    liked_batch: Vec<ItemKey>,
    session: Option<AuthToken>,
    /// Every item still needs a lookup for the current session; cleared once
    /// such a lookup is applied.
    full_lookup_pending: bool,
    /// A reset has succeeded for the current criteria.
    loaded: bool,
    failed: bool,
    resync_deferred: bool,
    recenter_on_reset: bool,
}

impl FeedController {
    pub fn new(settings: FeedSettings) -> Self {
        Self {
            settings,
            window: Window::new(),
            criteria: FilterCriteria::default(),
            items_per_row: None,
            down: RequestSlot::new(Slot::Down),
            up: RequestSlot::new(Slot::Up),
            liked: RequestSlot::new(Slot::Liked),
            liked_batch: Vec::new(),
            session: None,
            full_lookup_pending: false,
            loaded: false,
            failed: false,
            resync_deferred: false,
            recenter_on_reset: false,
        }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn items_per_row(&self) -> Option<usize> {
        self.items_per_row
    }

    pub fn settings(&self) -> FeedSettings {
        self.settings
    }

    /// Whether the last range fetch failed. Cleared by the next success.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_fetching(&self, direction: Direction) -> bool {
        match direction {
            Direction::Forward => self.down.is_pending(),
            Direction::Backward => self.up.is_pending(),
        }
    }

    pub fn is_resetting(&self) -> bool {
        !self.loaded && self.down.is_pending()
    }

    pub fn is_liked_pending(&self) -> bool {
        self.liked.is_pending()
    }

    /// Switches to `criteria` and refetches from the start of the collection.
    ///
    /// Returns `None` while the layout is unknown; the reset is then issued by
    /// the first [`set_layout_width`](Self::set_layout_width) that yields a width.
    pub fn resync(&mut self, criteria: FilterCriteria) -> Option<RangeRequest> {
        self.recenter_on_reset |= !self.window.is_empty() && self.window.from() > 0;
        self.criteria = criteria;
        self.down.cancel();
        self.up.cancel();
        self.liked.cancel();
        self.liked_batch.clear();
        self.window.clear();
        self.loaded = false;
        self.failed = false;

        if self.items_per_row.is_none() {
            tracing::debug!("Layout unknown, deferring resync");
            self.resync_deferred = true;
            return None;
        }
        self.issue_reset()
    }

    /// Records the grid's available width; `None` means not yet measured.
    pub fn set_layout_width(&mut self, width_px: Option<u32>) -> Option<RangeRequest> {
        let previous = self.items_per_row;
        self.items_per_row =
            width_px.map(|w| layout::items_per_row(w, self.settings.item_width_px));

        match (previous, self.items_per_row) {
            (_, None) => None,
            (Some(old), Some(new)) => {
                if old != new {
                    tracing::debug!(old, new, "Items per row changed");
                }
                None
            }
            (None, Some(_)) => {
                if self.resync_deferred {
                    self.issue_reset()
                } else {
                    None
                }
            }
        }
    }

    /// Requests the next batch at one end of the window.
    pub fn extend(&mut self, direction: Direction) -> Option<RangeRequest> {
        let items_per_row = self.items_per_row?;

        if !self.loaded {
            if direction == Direction::Forward && !self.down.is_pending() {
                return self.issue_reset();
            }
            return None;
        }

        let slot = match direction {
            Direction::Forward => &self.down,
            Direction::Backward => &self.up,
        };
        if slot.is_pending() {
            return None;
        }

        let size = layout::row_aligned_count(
            layout::fetch_batch_size(items_per_row),
            self.window.len(),
            items_per_row,
        );
        let (start, count) = match direction {
            Direction::Forward => {
                let start = self.window.to();
                if start >= self.window.total() {
                    return None;
                }
                (start, size)
            }
            Direction::Backward => {
                let from = self.window.from();
                if from == 0 {
                    return None;
                }
                let start = from.saturating_sub(size);
                (start, from - start)
            }
        };

        let slot = match direction {
            Direction::Forward => &mut self.down,
            Direction::Backward => &mut self.up,
        };
        let (ticket, signal) = slot.issue();
        tracing::debug!(?direction, start, count, "Extending window");
        Some(RangeRequest {
            ticket,
            kind: FetchKind::Extend(direction),
            query: RangeQuery::new(start, count, &self.criteria),
            signal,
        })
    }

    /// Reacts to a scroll position change.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics) -> Option<RangeRequest> {
        if self.down.is_pending() || self.up.is_pending() {
            return None;
        }
        let threshold = self.settings.scroll_threshold_px;
        if metrics.remaining() < threshold {
            return self.extend(Direction::Forward);
        }
        if metrics.offset < threshold && self.window.from() > 0 {
            return self.extend(Direction::Backward);
        }
        None
    }

    /// The last rendered row became visible.
    pub fn on_reach_bottom(&mut self) -> Option<RangeRequest> {
        if self.down.is_pending() || self.up.is_pending() {
            return None;
        }
        if self.loaded && self.window.at_end() {
            return None;
        }
        self.extend(Direction::Forward)
    }

    /// Applies a range response issued under `ticket`.
    pub fn apply_range(
        &mut self,
        ticket: Ticket,
        kind: FetchKind,
        result: Result<RangePage, ApiError>,
    ) -> RangeOutcome {
        let slot = match ticket.slot {
            Slot::Down => &mut self.down,
            Slot::Up => &mut self.up,
            Slot::Liked => return RangeOutcome::Stale,
        };
        if !slot.settle(ticket) {
            tracing::debug!(?ticket, "Discarding superseded range response");
            return match result {
                Err(ApiError::Cancelled) => RangeOutcome::Cancelled,
                _ => RangeOutcome::Stale,
            };
        }

        let page = match result {
            Ok(page) => page,
            Err(ApiError::Cancelled) => return RangeOutcome::Cancelled,
            Err(e) => {
                tracing::warn!(error = %e, ?kind, "Range fetch failed");
                self.failed = true;
                return RangeOutcome::Failed;
            }
        };

        self.failed = false;
        let (added, recenter) = match kind {
            FetchKind::Reset => {
                let kept = self.window.replace(page.items, page.total);
                self.loaded = true;
                (kept, std::mem::take(&mut self.recenter_on_reset))
            }
            FetchKind::Extend(Direction::Forward) => (
                self.window
                    .merge(page.items, Placement::Append, page.total),
                false,
            ),
            FetchKind::Extend(Direction::Backward) => (
                self.window
                    .merge(page.items, Placement::Prepend, page.total),
                false,
            ),
        };
        tracing::debug!(
            ?kind,
            added,
            from = self.window.from(),
            to = self.window.to(),
            total = self.window.total(),
            "Range applied"
        );
        RangeOutcome::Applied { added, recenter }
    }

    /// Brings liked state in line with the current session.
    ///
    /// Signing out marks every item not liked without a request, but only
    /// when a session was previously seen. A new or changed session looks up
    /// every item, and keeps doing so until one of those lookups is applied;
    /// otherwise only items whose state is still unknown are looked up.
    pub fn sync_liked(&mut self, auth: Option<&AuthToken>) -> Option<LikedRequest> {
        let previous = self.session.take();
        self.liked.cancel();
        self.liked_batch.clear();

        let Some(auth) = auth else {
            self.full_lookup_pending = false;
            if previous.is_some() {
                tracing::info!("Session ended, clearing liked state");
                for item in self.window.iter_mut() {
                    item.liked = Some(false);
                }
            }
            return None;
        };

        if previous.as_ref() != Some(auth) {
            self.full_lookup_pending = true;
        }
        let fresh = self.full_lookup_pending;
        self.session = Some(auth.clone());

        let keys: Vec<ItemKey> = self
            .window
            .items()
            .iter()
            .filter(|item| fresh || item.liked.is_none())
            .map(|item| item.key.clone())
            .collect();
        if keys.is_empty() {
            return None;
        }

        let (ticket, signal) = self.liked.issue();
        self.liked_batch = keys.clone();
        tracing::debug!(count = keys.len(), fresh, "Looking up liked state");
        Some(LikedRequest {
            ticket,
            keys,
            auth: auth.clone(),
            signal,
        })
    }

    /// Applies a liked lookup issued under `ticket`.
    pub fn apply_liked(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<LikedStatus>, ApiError>,
    ) -> LikedOutcome {
        if !self.liked.settle(ticket) {
            return match result {
                Err(ApiError::Cancelled) => LikedOutcome::Cancelled,
                _ => LikedOutcome::Stale,
            };
        }
        let keys = std::mem::take(&mut self.liked_batch);

        let statuses = match result {
            Ok(statuses) => statuses,
            Err(ApiError::Cancelled) => return LikedOutcome::Cancelled,
            Err(e) => {
                tracing::warn!(error = %e, "Liked status lookup failed");
                return LikedOutcome::Failed;
            }
        };

        self.full_lookup_pending = false;
        let mut applied = 0;
        for (key, status) in keys.iter().zip(statuses) {
            if let Some(item) = self.window.get_mut(key) {
                item.liked = Some(status.is_liked);
                applied += 1;
            }
        }
        LikedOutcome::Applied(applied)
    }

    fn issue_reset(&mut self) -> Option<RangeRequest> {
        let items_per_row = self.items_per_row?;
        self.resync_deferred = false;
        self.up.cancel();

        let count = 2 * layout::fetch_batch_size(items_per_row);
        let (ticket, signal) = self.down.issue();
        tracing::debug!(count, items_per_row, "Issuing reset fetch");
        Some(RangeRequest {
            ticket,
            kind: FetchKind::Reset,
            query: RangeQuery::new(self.window.from(), count, &self.criteria),
            signal,
        })
    }
}

impl Default for FeedController {
    fn default() -> Self {
        Self::new(FeedSettings::default())
    }
}
