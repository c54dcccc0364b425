//! Small helpers shared by the API client and the terminal UI.
//!
//! - **Base URL validation**: the marketplace endpoint must be HTTPS unless it
//!   points at a loopback host (local API servers and test doubles)
//! - **Card labels**: terminal-safe, width-bounded text for grid cards
//!
//! ```
//! use zoo_explore::util::{card_label, validate_base_url};
//!
//! let base = validate_base_url("https://api.example.io/v1").unwrap();
//! assert_eq!(base.as_str(), "https://api.example.io/v1/");
//!
//! assert_eq!(card_label("Genesis Ape #4411", 10), "Genesis...");
//! ```

mod base_url;
mod label;

pub use base_url::{validate_base_url, UrlValidationError};
pub use label::{card_label, sanitize};
