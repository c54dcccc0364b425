//! Collection catalog backing the collection facet.
//!
//! The list is refetched on a fixed timer. A failed refresh keeps the
//! previous list and marks the catalog failed until the next success.

use crate::api::{ApiError, Collection};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Default collection refresh period.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Orders verified collections first, keeping server order within each group.
pub fn partition_verified(collections: Vec<Collection>) -> Vec<Collection> {
    let (mut verified, unverified): (Vec<_>, Vec<_>) =
        collections.into_iter().partition(|c| c.is_verified);
    verified.extend(unverified);
    verified
}

#[derive(Debug, Default, Clone)]
pub struct CollectionCatalog {
    collections: Vec<Collection>,
    loading: bool,
    failed: bool,
    refreshed_at: Option<DateTime<Utc>>,
}

impl CollectionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn verified_count(&self) -> usize {
        self.collections.iter().take_while(|c| c.is_verified).count()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    pub fn get(&self, index: usize) -> Option<&Collection> {
        self.collections.get(index)
    }

    /// Marks a refresh as started. Returns `false` if one is already running.
    pub fn begin_refresh(&mut self) -> bool {
        if self.loading {
            return false;
        }
        self.loading = true;
        true
    }

    /// Records the outcome of a refresh.
    pub fn apply(&mut self, result: Result<Vec<Collection>, ApiError>, now: DateTime<Utc>) {
        self.loading = false;
        match result {
            Ok(collections) => {
                self.collections = partition_verified(collections);
                self.failed = false;
                self.refreshed_at = Some(now);
                tracing::info!(
                    count = self.collections.len(),
                    verified = self.verified_count(),
                    "Collections refreshed"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "Collection refresh failed");
                self.failed = true;
            }
        }
    }
}
