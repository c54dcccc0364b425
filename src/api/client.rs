use super::types::{Envelope, WireRangePage};
use super::{
    ApiError, AuthToken, Collection, ItemKey, LikedStatus, MarketplaceApi, RangePage, RangeQuery,
};
use crate::cancel::CancelSignal;
use crate::util::{validate_base_url, UrlValidationError};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RESPONSE_SIZE: usize = 8 * 1024 * 1024; // 8MB

const FETCH_TOKENS_PATH: &str = "nftitems/fetchTokens";
const LIKED_PATH: &str = "like/getPageLiked";
const COLLECTIONS_PATH: &str = "info/getcollections";

/// Builds the shared HTTP client: bounded redirects, pooled connections.
pub fn build_http_client() -> Result<reqwest::Client, ApiError> {
    let client = reqwest::Client::builder()
        .redirect(redirect_policy())
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("zoo-explore/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// At most 3 hops, and never the same URL twice.
fn redirect_policy() -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }
        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }
        tracing::debug!(
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );
        attempt.follow()
    })
}

/// reqwest-backed [`MarketplaceApi`].
#[derive(Debug, Clone)]
pub struct HttpMarketplace {
    client: reqwest::Client,
    base: Url,
}

impl HttpMarketplace {
    /// Creates a client for the marketplace at `base_url`.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidBaseUrl`] if the URL fails [`validate_base_url`].
    pub fn new(client: reqwest::Client, base_url: &str) -> Result<Self, ApiError> {
        let base = validate_base_url(base_url)?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|e| ApiError::InvalidBaseUrl(UrlValidationError::InvalidUrl(e)))
    }

    /// Sends `request` and unwraps the `{status, data}` envelope.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &'static str,
    ) -> Result<T, ApiError> {
        let response = tokio::time::timeout(REQUEST_TIMEOUT, request.send())
            .await
            .map_err(|_| ApiError::Timeout)?
            .map_err(ApiError::Network)?;

        if !response.status().is_success() {
            tracing::debug!(endpoint, status = %response.status(), "Marketplace returned error status");
            return Err(ApiError::HttpStatus(response.status().as_u16()));
        }

        let bytes = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;
        let envelope: Envelope<T> =
            serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))?;

        if envelope.status != "success" {
            return Err(ApiError::Rejected(envelope.status));
        }
        envelope
            .data
            .ok_or_else(|| ApiError::Decode(format!("{} response has no data", endpoint)))
    }
}

impl MarketplaceApi for HttpMarketplace {
    async fn fetch_range(
        &self,
        query: RangeQuery,
        signal: CancelSignal,
    ) -> Result<RangePage, ApiError> {
        let url = self.endpoint(FETCH_TOKENS_PATH)?;
        let request = self.client.post(url).json(&query);

        let page: WireRangePage = signal.guard(self.send(request, FETCH_TOKENS_PATH)).await?;

        let received = page.tokens.len();
        let items: Vec<_> = page
            .tokens
            .into_iter()
            .filter_map(|t| t.into_item())
            .collect();
        if items.len() < received {
            tracing::warn!(
                skipped = received - items.len(),
                from = query.from,
                "Tokens without identity skipped"
            );
        }

        tracing::debug!(from = query.from, count = query.count, received, total = page.total, "Range fetched");
        Ok(RangePage {
            items,
            total: page.total,
        })
    }

    async fn fetch_liked_status(
        &self,
        keys: Vec<ItemKey>,
        auth: AuthToken,
        signal: CancelSignal,
    ) -> Result<Vec<LikedStatus>, ApiError> {
        let url = self.endpoint(LIKED_PATH)?;
        let request = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", auth.expose()))
            .json(&serde_json::json!({ "items": keys }));

        let statuses: Vec<LikedStatus> = signal.guard(self.send(request, LIKED_PATH)).await?;
        if statuses.len() != keys.len() {
            return Err(ApiError::Decode(format!(
                "liked lookup answered {} entries for {} items",
                statuses.len(),
                keys.len()
            )));
        }
        Ok(statuses)
    }

    async fn fetch_collections(&self) -> Result<Vec<Collection>, ApiError> {
        let url = self.endpoint(COLLECTIONS_PATH)?;
        self.send(self.client.get(url), COLLECTIONS_PATH).await
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, ApiError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ApiError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}
