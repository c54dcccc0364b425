//! Configuration file parser for ~/.config/zoo-explore/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are accepted but logged as a warning, since they are usually
//! typos.
use crate::api::AuthToken;
use crate::collections::DEFAULT_REFRESH_INTERVAL;
use crate::feed::{FeedSettings, DEFAULT_ITEM_WIDTH_PX, SCROLL_THRESHOLD_PX};
use crate::mint::DEFAULT_MINT_CHAINS;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable that overrides `auth_token`.
pub const AUTH_TOKEN_ENV: &str = "ZOO_AUTH_TOKEN";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// The `Debug` impl masks `auth_token`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Marketplace REST endpoint. Must be https unless it points at loopback.
    pub api_base_url: String,

    /// Restricts the feed to one chain. `None` lists every chain.
    pub chain_id: Option<u64>,

    /// Card width the grid is laid out with, in pixels.
    pub item_width_px: u32,

    /// Distance from a scroll edge that triggers a fetch, in pixels.
    pub scroll_threshold_px: u32,

    /// Collection list refresh interval in minutes. 0 disables the timer.
    pub collection_refresh_minutes: u64,

    /// Session token for liked-state lookups. `ZOO_AUTH_TOKEN` takes precedence.
    pub auth_token: Option<String>,

    /// Chains minting is permitted on.
    pub allowed_mint_chains: Vec<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5001/".to_string(),
            chain_id: None,
            item_width_px: DEFAULT_ITEM_WIDTH_PX,
            scroll_threshold_px: SCROLL_THRESHOLD_PX,
            collection_refresh_minutes: DEFAULT_REFRESH_INTERVAL.as_secs() / 60,
            auth_token: None,
            allowed_mint_chains: DEFAULT_MINT_CHAINS.to_vec(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_base_url", &self.api_base_url)
            .field("chain_id", &self.chain_id)
            .field("item_width_px", &self.item_width_px)
            .field("scroll_threshold_px", &self.scroll_threshold_px)
            .field("collection_refresh_minutes", &self.collection_refresh_minutes)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("allowed_mint_chains", &self.allowed_mint_chains)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 7] = [
        "api_base_url",
        "chain_id",
        "item_width_px",
        "scroll_threshold_px",
        "collection_refresh_minutes",
        "auth_token",
        "allowed_mint_chains",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            api = %config.api_base_url,
            chain_id = ?config.chain_id,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Resolves the session token, preferring `env_value` (from `ZOO_AUTH_TOKEN`).
    ///
    /// Blank values count as absent.
    pub fn resolve_auth(&self, env_value: Option<String>) -> Option<AuthToken> {
        env_value
            .filter(|v| !v.trim().is_empty())
            .or_else(|| {
                self.auth_token
                    .clone()
                    .filter(|v| !v.trim().is_empty())
            })
            .map(|v| AuthToken::new(v.trim().to_string()))
    }

    pub fn feed_settings(&self) -> FeedSettings {
        FeedSettings {
            item_width_px: self.item_width_px.max(1),
            scroll_threshold_px: self.scroll_threshold_px,
        }
    }

    /// `None` when the refresh timer is disabled.
    pub fn collection_refresh_interval(&self) -> Option<Duration> {
        (self.collection_refresh_minutes > 0)
            .then(|| Duration::from_secs(self.collection_refresh_minutes * 60))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("zoo_explore_config_test_{}", name));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.item_width_px, 256);
        assert_eq!(config.scroll_threshold_px, 100);
        assert_eq!(config.collection_refresh_minutes, 10);
        assert_eq!(config.allowed_mint_chains, vec![888, 999]);
        assert!(config.chain_id.is_none());
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/zoo_explore_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.item_width_px, 256);
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let path = write_config("whitespace", "   \n  \n  ");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.collection_refresh_minutes, 10);
        cleanup(&path);
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let path = write_config("partial", "chain_id = 888\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.chain_id, Some(888));
        assert_eq!(config.item_width_px, 256);
        cleanup(&path);
    }

    #[test]
    fn test_full_config() {
        let content = r#"
api_base_url = "https://api.zoo.example/"
chain_id = 999
item_width_px = 200
scroll_threshold_px = 64
collection_refresh_minutes = 0
auth_token = "tok-123"
allowed_mint_chains = [999]
"#;
        let path = write_config("full", content);
        let config = Config::load(&path).unwrap();
        assert_eq!(config.api_base_url, "https://api.zoo.example/");
        assert_eq!(config.chain_id, Some(999));
        assert_eq!(config.item_width_px, 200);
        assert_eq!(config.scroll_threshold_px, 64);
        assert!(config.collection_refresh_interval().is_none());
        assert_eq!(config.auth_token.as_deref(), Some("tok-123"));
        assert_eq!(config.allowed_mint_chains, vec![999]);
        cleanup(&path);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let path = write_config("invalid", "this is not [valid toml");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
        cleanup(&path);
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let path = write_config("unknown", "chain_id = 1\ntheme = \"dark\"\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.chain_id, Some(1));
        cleanup(&path);
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let path = write_config("wrongtype", "item_width_px = \"wide\"\n");
        assert!(Config::load(&path).is_err());
        cleanup(&path);
    }

    #[test]
    fn test_too_large_file_rejected() {
        let path = write_config("too_large", &"a".repeat(1_048_577));
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));
        cleanup(&path);
    }

    #[test]
    fn test_env_token_wins() {
        let config = Config {
            auth_token: Some("from-file".into()),
            ..Default::default()
        };
        let token = config.resolve_auth(Some("from-env".into())).unwrap();
        assert_eq!(token.expose(), "from-env");

        let token = config.resolve_auth(Some("  ".into())).unwrap();
        assert_eq!(token.expose(), "from-file");

        assert!(Config::default().resolve_auth(None).is_none());
    }

    #[test]
    fn test_refresh_interval_in_minutes() {
        let config = Config::default();
        assert_eq!(
            config.collection_refresh_interval(),
            Some(Duration::from_secs(600))
        );
    }

    #[test]
    fn test_zero_item_width_is_clamped() {
        let config = Config {
            item_width_px: 0,
            ..Default::default()
        };
        assert_eq!(config.feed_settings().item_width_px, 1);
    }

    #[test]
    fn test_debug_masks_auth_token() {
        let config = Config {
            auth_token: Some("super-secret-token".to_string()),
            ..Default::default()
        };
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super-secret-token"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
