//! End-to-end tests for the explorer: `App` driving the feed controller
//! against an in-memory marketplace, with real spawned tasks and the event
//! channel in between.

use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use zoo_explore::api::{
    ApiError, AuthToken, Collection, Item, ItemKey, LikedStatus, MarketplaceApi, RangePage,
    RangeQuery,
};
use zoo_explore::app::{App, AppEvent};
use zoo_explore::cancel::CancelSignal;
use zoo_explore::feed::{Direction, FeedSettings, FilterCriteria, SortOrder};

/// 128 columns of 8px hold four 256px cards; 40 rows hold ten card rows.
const GRID_COLS: u16 = 128;
const GRID_ROWS: u16 = 40;

struct FakeMarketplace {
    total: usize,
    /// Range calls still to fail with a 500.
    failures: AtomicUsize,
    /// Range calls still to panic.
    range_panics: AtomicUsize,
    /// Liked lookups still to panic.
    liked_panics: AtomicUsize,
    ranges: Mutex<Vec<RangeQuery>>,
    liked_calls: Mutex<Vec<Vec<ItemKey>>>,
    collections: Vec<Collection>,
}

impl FakeMarketplace {
    fn new(total: usize) -> Self {
        Self {
            total,
            failures: AtomicUsize::new(0),
            range_panics: AtomicUsize::new(0),
            liked_panics: AtomicUsize::new(0),
            ranges: Mutex::new(Vec::new()),
            liked_calls: Mutex::new(Vec::new()),
            collections: Vec::new(),
        }
    }

    fn range_calls(&self) -> Vec<(usize, usize)> {
        self.ranges
            .lock()
            .unwrap()
            .iter()
            .map(|q| (q.from, q.count))
            .collect()
    }

    fn liked_calls(&self) -> Vec<Vec<ItemKey>> {
        self.liked_calls.lock().unwrap().clone()
    }
}

fn token(id: usize) -> Item {
    Item {
        key: ItemKey::token("0xZOO", id.to_string()),
        name: format!("Zoo #{}", id),
        image_url: None,
        price: Some(id as f64),
        payment_token: None,
        bundle_size: None,
        liked: None,
    }
}

/// Decrements `counter` if it is above zero; true when it did.
fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn is_even(key: &ItemKey) -> bool {
    match key {
        ItemKey::Token { token_id, .. } => token_id.parse::<usize>().is_ok_and(|n| n % 2 == 0),
        ItemKey::Bundle { .. } => false,
    }
}

impl MarketplaceApi for FakeMarketplace {
    async fn fetch_range(
        &self,
        query: RangeQuery,
        signal: CancelSignal,
    ) -> Result<RangePage, ApiError> {
        self.ranges.lock().unwrap().push(query.clone());
        if take_one(&self.range_panics) {
            panic!("range backend crashed");
        }
        let fail = take_one(&self.failures);
        let total = self.total;
        signal
            .guard(async move {
                if fail {
                    return Err(ApiError::HttpStatus(500));
                }
                let end = (query.from + query.count).min(total);
                Ok(RangePage {
                    items: (query.from..end).map(token).collect(),
                    total,
                })
            })
            .await
    }

    async fn fetch_liked_status(
        &self,
        keys: Vec<ItemKey>,
        _auth: AuthToken,
        signal: CancelSignal,
    ) -> Result<Vec<LikedStatus>, ApiError> {
        self.liked_calls.lock().unwrap().push(keys.clone());
        if take_one(&self.liked_panics) {
            panic!("liked backend crashed");
        }
        signal
            .guard(async move {
                Ok(keys
                    .iter()
                    .map(|k| LikedStatus { is_liked: is_even(k) })
                    .collect())
            })
            .await
    }

    async fn fetch_collections(&self) -> Result<Vec<Collection>, ApiError> {
        Ok(self.collections.clone())
    }
}

struct Harness {
    app: App<FakeMarketplace>,
    tx: mpsc::Sender<AppEvent>,
    rx: mpsc::Receiver<AppEvent>,
}

impl Harness {
    fn new(api: FakeMarketplace, auth: Option<AuthToken>) -> Self {
        let (tx, rx) = mpsc::channel(32);
        let app = App::new(
            Arc::new(api),
            FeedSettings::default(),
            auth,
            FilterCriteria::default(),
        );
        Self { app, tx, rx }
    }

    fn api(&self) -> &FakeMarketplace {
        self.app.api()
    }

    fn busy(&self) -> bool {
        let feed = &self.app.feed;
        feed.is_fetching(Direction::Forward)
            || feed.is_fetching(Direction::Backward)
            || feed.is_liked_pending()
            || self.app.catalog.is_loading()
    }

    /// Handles events until nothing the app is waiting for is outstanding.
    async fn settle(&mut self) {
        while self.busy() {
            let event = tokio::time::timeout(Duration::from_secs(5), self.rx.recv())
                .await
                .expect("timed out waiting for a background event")
                .expect("event channel closed");
            self.app.handle_event(event, &self.tx);
        }
    }

    async fn open(&mut self) {
        self.app.start(&self.tx);
        self.app.set_grid_size(GRID_COLS, GRID_ROWS, &self.tx);
        self.settle().await;
    }

    fn bounds(&self) -> (usize, usize, usize) {
        let w = self.app.feed.window();
        (w.from(), w.to(), w.total())
    }
}

#[tokio::test]
async fn test_initial_load_fills_the_screen() {
    let mut h = Harness::new(FakeMarketplace::new(50), None);
    h.open().await;

    // Reset of two batches, then one more batch because the last row was visible.
    assert_eq!(h.api().range_calls(), vec![(0, 32), (32, 16)]);
    assert_eq!(h.bounds(), (0, 48, 50));
    assert!(!h.app.feed.is_failed());
}

#[tokio::test]
async fn test_no_fetch_before_layout_is_known() {
    let mut h = Harness::new(FakeMarketplace::new(50), None);
    h.app.start(&h.tx);
    h.settle().await;
    assert!(h.api().range_calls().is_empty());

    // Too small a terminal reports an unknown layout.
    h.app.set_grid_size(0, 0, &h.tx);
    h.settle().await;
    assert!(h.api().range_calls().is_empty());
}

#[tokio::test]
async fn test_scrolling_to_the_end_loads_the_rest_once() {
    let mut h = Harness::new(FakeMarketplace::new(50), None);
    h.open().await;

    let last = h.app.max_scroll_row();
    h.app.scroll_to(last, &h.tx);
    h.settle().await;
    assert_eq!(h.bounds(), (0, 50, 50));

    let last = h.app.max_scroll_row();
    h.app.scroll_to(last, &h.tx);
    h.app.scroll_by(-1, &h.tx);
    h.settle().await;
    assert_eq!(h.api().range_calls(), vec![(0, 32), (32, 16), (48, 16)]);

    let keys: HashSet<_> = h.app.feed.window().items().iter().map(|i| &i.key).collect();
    assert_eq!(keys.len(), 50);
}

#[tokio::test]
async fn test_filter_change_restarts_from_zero() {
    let mut h = Harness::new(FakeMarketplace::new(200), None);
    h.open().await;
    let last = h.app.max_scroll_row();
    h.app.scroll_to(last, &h.tx);
    h.settle().await;
    assert!(h.app.feed.window().to() > 48);

    h.app.update_criteria(&h.tx, |c| c.sort_by = SortOrder::LowestPrice);
    assert_eq!(h.app.scroll_row, 0);
    h.settle().await;

    let ranges = h.api().ranges.lock().unwrap().clone();
    let reset = ranges
        .iter()
        .find(|q| q.sort_by == SortOrder::LowestPrice)
        .expect("reset issued with the new sort");
    assert_eq!((reset.from, reset.count), (0, 32));
    assert_eq!(h.app.feed.window().from(), 0);
    assert_eq!(h.app.feed.criteria().sort_by, SortOrder::LowestPrice);
}

#[tokio::test]
async fn test_unchanged_filter_does_not_refetch() {
    let mut h = Harness::new(FakeMarketplace::new(50), None);
    h.open().await;
    let before = h.api().range_calls().len();

    let same = h.app.feed.criteria().clone();
    h.app.apply_criteria(same, &h.tx);
    h.settle().await;
    assert_eq!(h.api().range_calls().len(), before);
}

#[tokio::test]
async fn test_failed_load_recovers_on_retry() {
    let api = FakeMarketplace::new(20);
    api.failures.store(1, Ordering::SeqCst);
    let mut h = Harness::new(api, None);
    h.open().await;

    assert!(h.app.feed.is_failed());
    assert!(h.app.feed.window().is_empty());

    h.app.retry(&h.tx);
    h.settle().await;
    assert!(!h.app.feed.is_failed());
    assert_eq!(h.bounds(), (0, 20, 20));
    assert_eq!(h.api().range_calls(), vec![(0, 32), (0, 32)]);
}

#[tokio::test]
async fn test_panicking_fetch_fails_the_feed_and_retry_recovers() {
    let api = FakeMarketplace::new(20);
    api.range_panics.store(1, Ordering::SeqCst);
    let mut h = Harness::new(api, None);
    h.open().await;

    assert!(h.app.feed.is_failed());
    assert!(!h.app.feed.is_fetching(Direction::Forward));

    h.app.retry(&h.tx);
    h.settle().await;
    assert!(!h.app.feed.is_failed());
    assert_eq!(h.bounds(), (0, 20, 20));
}

#[tokio::test]
async fn test_panicking_liked_lookup_frees_the_slot() {
    let api = FakeMarketplace::new(4);
    api.liked_panics.store(1, Ordering::SeqCst);
    let mut h = Harness::new(api, Some(AuthToken::new("session-1")));
    h.open().await;

    assert!(!h.app.feed.is_liked_pending());
    assert!(h.app.feed.window().items().iter().all(|i| i.liked.is_none()));

    h.app.toggle_session(&h.tx);
    h.app.toggle_session(&h.tx);
    h.settle().await;
    assert_eq!(h.api().liked_calls().len(), 2);
    assert_eq!(h.app.feed.window().items()[0].liked, Some(true));
}

#[tokio::test]
async fn test_liked_state_follows_the_session() {
    let mut h = Harness::new(FakeMarketplace::new(8), Some(AuthToken::new("session-1")));
    h.open().await;

    let liked: Vec<_> = h.app.feed.window().items().iter().map(|i| i.liked).collect();
    assert_eq!(liked, (0..8).map(|n| Some(n % 2 == 0)).collect::<Vec<_>>());
    assert_eq!(h.api().liked_calls().len(), 1);

    h.app.toggle_session(&h.tx);
    h.settle().await;
    assert!(!h.app.is_signed_in());
    assert!(h.app.feed.window().items().iter().all(|i| i.liked == Some(false)));
    assert_eq!(h.api().liked_calls().len(), 1);

    // Signing back in is a new session, so everything is looked up again.
    h.app.toggle_session(&h.tx);
    h.settle().await;
    assert_eq!(h.api().liked_calls().len(), 2);
    assert_eq!(h.api().liked_calls()[1].len(), 8);
    assert_eq!(h.app.feed.window().items()[0].liked, Some(true));
}

#[tokio::test]
async fn test_collections_listed_verified_first() {
    let mut api = FakeMarketplace::new(4);
    api.collections = vec![
        Collection {
            address: "0xa".into(),
            collection_name: "Alpha".into(),
            logo_image_hash: None,
            is_verified: false,
        },
        Collection {
            address: "0xb".into(),
            collection_name: "Beta".into(),
            logo_image_hash: None,
            is_verified: true,
        },
    ];
    let mut h = Harness::new(api, None);
    h.open().await;

    let names: Vec<_> = h
        .app
        .catalog
        .collections()
        .iter()
        .map(|c| c.collection_name.as_str())
        .collect();
    assert_eq!(names, vec!["Beta", "Alpha"]);
    assert!(h.app.catalog.refreshed_at().is_some());
}
