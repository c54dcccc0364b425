//! Terminal explorer for an NFT marketplace.
//!
//! The core is [`feed::FeedController`], a windowed, de-duplicated view over
//! the marketplace's filtered item list. [`app::App`] runs its requests
//! against a [`api::MarketplaceApi`] and [`ui`] draws it in the terminal.
//! [`mint`] holds the token minting workflow.

pub mod api;
pub mod app;
pub mod cancel;
pub mod collections;
pub mod config;
pub mod feed;
pub mod mint;
pub mod ui;
pub mod util;
