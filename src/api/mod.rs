//! Marketplace API: the collaborator contract and its HTTP implementation.
//!
//! The explorer only depends on [`MarketplaceApi`]. [`HttpMarketplace`] talks
//! to the marketplace REST endpoints with reqwest; tests substitute in-memory
//! doubles.

mod client;
mod types;

use crate::cancel::CancelSignal;
use crate::util::UrlValidationError;
use secrecy::{ExposeSecret, SecretString};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

pub use client::{build_http_client, HttpMarketplace};
pub use types::{Collection, Item, ItemKey, LikedStatus, RangePage, RangeQuery};

/// Bearer token of a signed-in marketplace session.
///
/// Cheap to clone; the secret is shared, never copied, and `Debug` output is
/// redacted. Two tokens are equal when they hold the same secret, which is
/// how the explorer notices a session change.
#[derive(Clone)]
pub struct AuthToken(Arc<SecretString>);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Arc::new(SecretString::from(token.into())))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl PartialEq for AuthToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for AuthToken {}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken([REDACTED])")
    }
}

/// Errors from marketplace requests.
///
/// `Cancelled` marks a request that was superseded by a newer one for the same
/// slot; every other variant is a genuine failure.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request cancelled")]
    Cancelled,
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Request timed out")]
    Timeout,
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// The envelope's `status` field was not `success`.
    #[error("Marketplace rejected request: {0}")]
    Rejected(String),
    #[error("Invalid response: {0}")]
    Decode(String),
    #[error("Response too large")]
    ResponseTooLarge,
    #[error("Invalid marketplace URL: {0}")]
    InvalidBaseUrl(#[from] UrlValidationError),
    /// The task running the request panicked.
    #[error("Request task panicked: {0}")]
    TaskPanicked(String),
}

impl ApiError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }
}

/// The remote services the explorer depends on.
///
/// Range and liked-status requests take a [`CancelSignal`]; implementations
/// must return [`ApiError::Cancelled`] once it fires.
pub trait MarketplaceApi: Send + Sync + 'static {
    /// Fetches `query.count` items starting at `query.from` of the filtered collection.
    fn fetch_range(
        &self,
        query: RangeQuery,
        signal: CancelSignal,
    ) -> impl Future<Output = Result<RangePage, ApiError>> + Send;

    /// Looks up liked state for `keys`; the result is positionally matched.
    fn fetch_liked_status(
        &self,
        keys: Vec<ItemKey>,
        auth: AuthToken,
        signal: CancelSignal,
    ) -> impl Future<Output = Result<Vec<LikedStatus>, ApiError>> + Send;

    /// Lists every collection known to the marketplace, in server order.
    fn fetch_collections(&self) -> impl Future<Output = Result<Vec<Collection>, ApiError>> + Send;
}
