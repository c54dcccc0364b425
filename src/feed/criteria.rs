//! Filter facets that select which ordered collection the window views.

use serde::Serialize;

/// Whether single tokens, bundles, or both are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    #[default]
    All,
    Single,
    Bundle,
}

impl GroupType {
    pub fn next(self) -> Self {
        match self {
            GroupType::All => GroupType::Single,
            GroupType::Single => GroupType::Bundle,
            GroupType::Bundle => GroupType::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GroupType::All => "All items",
            GroupType::Single => "Single items",
            GroupType::Bundle => "Bundles",
        }
    }
}

/// Server-side sort keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "createdAt")]
    RecentlyCreated,
    #[serde(rename = "oldest")]
    Oldest,
    #[serde(rename = "listedAt")]
    RecentlyListed,
    #[serde(rename = "soldAt")]
    RecentlySold,
    #[serde(rename = "saleEndingSoon")]
    EndingSoon,
    #[serde(rename = "price")]
    HighestPrice,
    #[serde(rename = "cheapest")]
    LowestPrice,
    #[serde(rename = "lastSalePrice")]
    HighestLastSale,
    #[serde(rename = "viewed")]
    MostViewed,
}

impl SortOrder {
    const ALL: [SortOrder; 9] = [
        SortOrder::RecentlyCreated,
        SortOrder::Oldest,
        SortOrder::RecentlyListed,
        SortOrder::RecentlySold,
        SortOrder::EndingSoon,
        SortOrder::HighestPrice,
        SortOrder::LowestPrice,
        SortOrder::HighestLastSale,
        SortOrder::MostViewed,
    ];

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            SortOrder::RecentlyCreated => "Recently created",
            SortOrder::Oldest => "Oldest",
            SortOrder::RecentlyListed => "Recently listed",
            SortOrder::RecentlySold => "Recently sold",
            SortOrder::EndingSoon => "Ending soon",
            SortOrder::HighestPrice => "Highest price",
            SortOrder::LowestPrice => "Lowest price",
            SortOrder::HighestLastSale => "Highest last sale",
            SortOrder::MostViewed => "Most viewed",
        }
    }
}

/// Boolean sale-status facets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusFlags {
    pub buy_now: bool,
    pub has_bids: bool,
    pub has_offers: bool,
    pub on_auction: bool,
}

impl StatusFlags {
    /// Wire names of the active flags, in fixed order.
    pub fn filter_by(&self) -> Vec<&'static str> {
        [
            (self.buy_now, "buyNow"),
            (self.has_bids, "hasBids"),
            (self.has_offers, "hasOffers"),
            (self.on_auction, "onAuction"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect()
    }
}

/// The full set of facets. Any change invalidates the current window.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    pub group_type: GroupType,
    pub category: Option<u32>,
    pub sort_by: SortOrder,
    /// Contract addresses; empty means every collection.
    pub collections: Vec<String>,
    pub status: StatusFlags,
    pub chain_id: Option<u64>,
}

impl FilterCriteria {
    /// Adds or removes a collection address from the subset.
    pub fn toggle_collection(&mut self, address: &str) {
        let address = address.to_ascii_lowercase();
        match self.collections.iter().position(|a| *a == address) {
            Some(idx) => {
                self.collections.remove(idx);
            }
            None => self.collections.push(address),
        }
    }
}
