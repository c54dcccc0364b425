//! The materialised slice of the remote collection.
//!
//! Items live in an insertion-ordered set: a `Vec` for order plus a
//! `HashSet` of identity keys. Every mutation goes through [`Window::merge`]
//! or [`Window::replace`], both of which de-duplicate, so two items with the
//! same key can never coexist. `to` is always derived as `from + len`.

use crate::api::{Item, ItemKey};
use std::collections::HashSet;

/// Where a fetched batch lands relative to the current items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Append,
    Prepend,
}

#[derive(Debug, Default, Clone)]
pub struct Window {
    items: Vec<Item>,
    keys: HashSet<ItemKey>,
    from: usize,
    total: usize,
}

impl Window {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn from(&self) -> usize {
        self.from
    }

    pub fn to(&self) -> usize {
        self.from + self.items.len()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Whether the window reaches the end of the remote collection.
    pub fn at_end(&self) -> bool {
        self.to() >= self.total
    }

    pub fn contains(&self, key: &ItemKey) -> bool {
        self.keys.contains(key)
    }

    pub fn position(&self, key: &ItemKey) -> Option<usize> {
        if !self.keys.contains(key) {
            return None;
        }
        self.items.iter().position(|item| item.key == *key)
    }

    pub fn get_mut(&mut self, key: &ItemKey) -> Option<&mut Item> {
        let idx = self.position(key)?;
        self.items.get_mut(idx)
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Item> {
        self.items.iter_mut()
    }

    /// Drops all items and rewinds to the start of the collection.
    pub fn clear(&mut self) {
        self.items.clear();
        self.keys.clear();
        self.from = 0;
        self.total = 0;
    }

    /// Replaces the contents with `batch`, keeping `from`.
    ///
    /// Returns the number of distinct items kept.
    pub fn replace(&mut self, batch: Vec<Item>, total: usize) -> usize {
        self.items.clear();
        self.keys.clear();
        for item in batch {
            self.push_unique(item);
        }
        self.set_total(total);
        self.items.len()
    }

    /// Merges `batch` at one end and returns the net number of new items.
    ///
    /// The combined sequence keeps the first occurrence of each key in
    /// sequence order. For an append that means existing items win; for a
    /// prepend the fetched copy wins and the stale one further down is
    /// dropped. `from` moves back by the net growth on a prepend.
    pub fn merge(&mut self, batch: Vec<Item>, placement: Placement, total: usize) -> usize {
        let before = self.items.len();
        match placement {
            Placement::Append => {
                for item in batch {
                    self.push_unique(item);
                }
            }
            Placement::Prepend => {
                let existing = std::mem::take(&mut self.items);
                self.keys.clear();
                for item in batch.into_iter().chain(existing) {
                    self.push_unique(item);
                }
            }
        }

        let added = self.items.len().saturating_sub(before);
        if placement == Placement::Prepend {
            self.from = self.from.saturating_sub(added);
        }
        self.set_total(total);
        added
    }

    #[cfg(test)]
    pub(crate) fn with_range(batch: Vec<Item>, from: usize, total: usize) -> Self {
        let mut window = Self::new();
        window.from = from;
        window.replace(batch, total);
        window
    }

    fn push_unique(&mut self, item: Item) {
        if self.keys.insert(item.key.clone()) {
            self.items.push(item);
        }
    }

    /// Records the server's total, never letting it fall below `to`.
    fn set_total(&mut self, total: usize) {
        let to = self.to();
        if total < to {
            tracing::debug!(total, to, "Server total below materialised range, clamping");
        }
        self.total = total.max(to);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;

    pub(crate) fn item(id: u32) -> Item {
        Item {
            key: ItemKey::token("0xzoo", id.to_string()),
            name: format!("Zoo #{}", id),
            image_url: None,
            price: None,
            payment_token: None,
            bundle_size: None,
            liked: None,
        }
    }

    pub(crate) fn items(ids: impl IntoIterator<Item = u32>) -> Vec<Item> {
        ids.into_iter().map(item).collect()
    }

    fn ids(window: &Window) -> Vec<String> {
        window
            .items()
            .iter()
            .map(|i| match &i.key {
                ItemKey::Token { token_id, .. } => token_id.clone(),
                ItemKey::Bundle { bundle_id } => bundle_id.clone(),
            })
            .collect()
    }

    #[test]
    fn test_replace_dedupes_and_sets_bounds() {
        let mut window = Window::new();
        let kept = window.replace(items([1, 2, 2, 3]), 50);
        assert_eq!(kept, 3);
        assert_eq!((window.from(), window.to(), window.total()), (0, 3, 50));
    }

    #[test]
    fn test_append_keeps_existing_copy() {
        let mut window = Window::new();
        window.replace(items([1, 2, 3]), 10);
        let added = window.merge(items([3, 4, 5]), Placement::Append, 10);
        assert_eq!(added, 2);
        assert_eq!(ids(&window), ["1", "2", "3", "4", "5"]);
        assert_eq!(window.to(), 5);
    }

    #[test]
    fn test_prepend_moves_from_back_by_net_growth() {
        let mut window = Window::new();
        window.replace(items([10, 11, 12]), 20);
        window.from = 10;

        let added = window.merge(items([7, 8, 9, 10]), Placement::Prepend, 20);
        assert_eq!(added, 3);
        assert_eq!(window.from(), 7);
        assert_eq!(window.to(), 13);
        assert_eq!(ids(&window), ["7", "8", "9", "10", "11", "12"]);
    }

    #[test]
    fn test_prepend_fetched_copy_wins() {
        let mut window = Window::new();
        let mut stale = item(5);
        stale.name = "stale".into();
        window.replace(vec![item(4), stale], 10);
        window.from = 2;

        let mut fresh = item(5);
        fresh.name = "fresh".into();
        let added = window.merge(vec![item(3), fresh], Placement::Prepend, 10);

        assert_eq!(added, 1);
        assert_eq!(ids(&window), ["3", "5", "4"]);
        assert_eq!(window.items()[1].name, "fresh");
        assert_eq!(window.from(), 1);
    }

    #[test]
    fn test_prepend_growth_beyond_from_clamps_at_zero() {
        let mut window = Window::new();
        window.replace(items([5, 6]), 10);
        window.from = 1;

        window.merge(items([1, 2, 3]), Placement::Prepend, 10);
        assert_eq!(window.from(), 0);
        assert_eq!(window.to(), window.len());
    }

    #[test]
    fn test_total_never_below_to() {
        let mut window = Window::new();
        window.replace(items(0..8), 4);
        assert_eq!(window.total(), 8);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut window = Window::new();
        window.replace(items([1, 2]), 9);
        window.from = 4;
        window.clear();
        assert!(window.is_empty());
        assert_eq!((window.from(), window.to(), window.total()), (0, 0, 0));
        assert!(!window.contains(&item(1).key));
    }

    #[test]
    fn test_get_mut_by_key() {
        let mut window = Window::new();
        window.replace(items([1, 2]), 2);
        window.get_mut(&item(2).key).unwrap().liked = Some(true);
        assert_eq!(window.items()[1].liked, Some(true));
        assert!(window.get_mut(&item(9).key).is_none());
    }

    proptest! {
        #[test]
        fn prop_merges_never_duplicate(
            batches in prop::collection::vec(
                (prop::collection::vec(0u32..40, 0..20), any::<bool>()),
                1..12,
            )
        ) {
            let mut window = Window::new();
            for (batch, prepend) in batches {
                let placement = if prepend { Placement::Prepend } else { Placement::Append };
                window.merge(items(batch), placement, 40);

                let mut seen = HashSet::new();
                for it in window.items() {
                    prop_assert!(seen.insert(it.key.clone()));
                }
                prop_assert_eq!(window.to() - window.from(), window.len());
                prop_assert!(window.from() <= window.to());
                prop_assert!(window.to() <= window.total());
            }
        }
    }
}
