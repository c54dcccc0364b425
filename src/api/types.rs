//! Marketplace data types and their wire representation.

use crate::feed::FilterCriteria;
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Items
// ============================================================================

/// Identity of a listed item.
///
/// Serialises to the shape the liked-status endpoint expects:
/// `{"contractAddress": .., "tokenID": ..}` or `{"bundleID": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ItemKey {
    Token {
        #[serde(rename = "contractAddress")]
        contract_address: String,
        #[serde(rename = "tokenID")]
        token_id: String,
    },
    Bundle {
        #[serde(rename = "bundleID")]
        bundle_id: String,
    },
}

impl ItemKey {
    /// Token key with the contract address lowercased, so checksummed and
    /// plain hex spellings of one contract compare equal.
    pub fn token(contract_address: &str, token_id: impl Into<String>) -> Self {
        ItemKey::Token {
            contract_address: contract_address.to_ascii_lowercase(),
            token_id: token_id.into(),
        }
    }

    pub fn bundle(bundle_id: impl Into<String>) -> Self {
        ItemKey::Bundle {
            bundle_id: bundle_id.into(),
        }
    }
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemKey::Token {
                contract_address,
                token_id,
            } => write!(f, "{}/{}", contract_address, token_id),
            ItemKey::Bundle { bundle_id } => write!(f, "bundle/{}", bundle_id),
        }
    }
}

/// One card in the explorer grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub key: ItemKey,
    pub name: String,
    pub image_url: Option<String>,
    pub price: Option<f64>,
    pub payment_token: Option<String>,
    /// Number of tokens in a bundle; `None` for single tokens.
    pub bundle_size: Option<usize>,
    /// `None` until the liked-status lookup has answered for this item.
    pub liked: Option<bool>,
}

impl Item {
    pub fn is_bundle(&self) -> bool {
        matches!(self.key, ItemKey::Bundle { .. })
    }
}

/// Token record as returned by `nftitems/fetchTokens`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireToken {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    #[serde(default)]
    contract_address: Option<String>,
    #[serde(rename = "tokenID", default, deserialize_with = "string_or_number")]
    token_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "imageURL", alias = "thumbnailPath", default)]
    image_url: Option<String>,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    payment_token: Option<String>,
    #[serde(default)]
    items: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    is_liked: Option<bool>,
}

impl WireToken {
    /// Converts to an [`Item`], or `None` if the record carries no identity.
    ///
    /// Records with an `items` array are bundles keyed by `_id`; everything
    /// else is a token keyed by contract address and token id.
    pub(crate) fn into_item(self) -> Option<Item> {
        let (key, bundle_size) = match (&self.items, self.id, self.contract_address, self.token_id) {
            (Some(items), Some(id), _, _) => (ItemKey::bundle(id), Some(items.len())),
            (None, _, Some(address), Some(token_id)) => (ItemKey::token(&address, token_id), None),
            _ => return None,
        };
        let name = self.name.unwrap_or_else(|| match &key {
            ItemKey::Token { token_id, .. } => format!("#{}", token_id),
            ItemKey::Bundle { .. } => "Bundle".to_string(),
        });
        Some(Item {
            key,
            name,
            image_url: self.image_url,
            price: self.price,
            payment_token: self.payment_token,
            bundle_size,
            liked: self.is_liked,
        })
    }
}

/// Token ids arrive as JSON numbers from some endpoints and strings from others.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    }))
}

// ============================================================================
// Range fetch
// ============================================================================

/// Body of a range fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeQuery {
    pub from: usize,
    pub count: usize,
    #[serde(rename = "type")]
    pub group_type: crate::feed::GroupType,
    #[serde(rename = "collectionAddresses")]
    pub collections: Vec<String>,
    pub category: Option<u32>,
    #[serde(rename = "sortby")]
    pub sort_by: crate::feed::SortOrder,
    #[serde(rename = "filterby")]
    pub filter_by: Vec<&'static str>,
    #[serde(rename = "chainId", skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

impl RangeQuery {
    pub fn new(from: usize, count: usize, criteria: &FilterCriteria) -> Self {
        Self {
            from,
            count,
            group_type: criteria.group_type,
            collections: criteria.collections.clone(),
            category: criteria.category,
            sort_by: criteria.sort_by,
            filter_by: criteria.status.filter_by(),
            chain_id: criteria.chain_id,
        }
    }
}

/// One page of the remote collection.
#[derive(Debug, Clone, PartialEq)]
pub struct RangePage {
    pub items: Vec<Item>,
    /// Size of the whole filtered collection.
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireRangePage {
    #[serde(default)]
    pub(crate) tokens: Vec<WireToken>,
    #[serde(default)]
    pub(crate) total: usize,
}

// ============================================================================
// Liked status and collections
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikedStatus {
    #[serde(default)]
    pub is_liked: bool,
}

/// A collection entry used to populate the collection facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    #[serde(alias = "erc721Address")]
    pub address: String,
    #[serde(default)]
    pub collection_name: String,
    #[serde(default)]
    pub logo_image_hash: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
}

/// Response envelope shared by every marketplace endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub(crate) status: String,
    pub(crate) data: Option<T>,
}
