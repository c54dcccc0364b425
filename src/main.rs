use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use zoo_explore::api::{build_http_client, HttpMarketplace, MarketplaceApi};
use zoo_explore::app::{App, AppEvent};
use zoo_explore::collections::partition_verified;
use zoo_explore::config::{Config, AUTH_TOKEN_ENV};
use zoo_explore::feed::FilterCriteria;
use zoo_explore::ui;
use zoo_explore::util::sanitize;

/// Get the config directory path (~/.config/zoo-explore/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("zoo-explore"))
}

#[derive(Parser, Debug)]
#[command(name = "zoo-explore", about = "Browse an NFT marketplace from the terminal")]
struct Args {
    /// Config file (default: ~/.config/zoo-explore/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Marketplace API base URL, overriding the config file
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Print the collection list, verified first, and exit
    #[arg(long)]
    list_collections: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout belongs to the TUI
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => get_config_dir()?.join("config.toml"),
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let base_url = args.api_url.as_deref().unwrap_or(&config.api_base_url);
    let client = build_http_client().context("Failed to create HTTP client")?;
    let api = HttpMarketplace::new(client, base_url)
        .with_context(|| format!("Invalid marketplace URL '{}'", base_url))?;
    tracing::info!(base = %api.base_url(), "Using marketplace");

    if args.list_collections {
        let collections = api
            .fetch_collections()
            .await
            .context("Failed to fetch collections")?;
        for collection in partition_verified(collections) {
            println!(
                "{} {} {}",
                if collection.is_verified { "✔" } else { " " },
                collection.address,
                sanitize(&collection.collection_name)
            );
        }
        return Ok(());
    }

    let auth = config.resolve_auth(std::env::var(AUTH_TOKEN_ENV).ok());
    let criteria = FilterCriteria {
        chain_id: config.chain_id,
        ..Default::default()
    };
    let mut app = App::new(Arc::new(api), config.feed_settings(), auth, criteria);

    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);
    ui::run(
        &mut app,
        config.collection_refresh_interval(),
        event_tx,
        event_rx,
    )
    .await?;

    Ok(())
}
