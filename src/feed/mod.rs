//! The windowed asset feed.
//!
//! [`FeedController`] keeps a de-duplicated [`Window`] over the filtered
//! remote collection and decides which range to fetch next as the view
//! scrolls. It is synchronous; the app runs the requests it hands out and
//! feeds the responses back.

mod controller;
mod criteria;
mod layout;
mod window;

pub use controller::{
    Direction, FeedController, FeedSettings, FetchKind, LikedOutcome, LikedRequest, RangeOutcome,
    RangeRequest, ScrollMetrics, SCROLL_THRESHOLD_PX,
};
pub use criteria::{FilterCriteria, GroupType, SortOrder, StatusFlags};
pub use layout::{fetch_batch_size, items_per_row, row_aligned_count, DEFAULT_ITEM_WIDTH_PX};
pub use window::{Placement, Window};
