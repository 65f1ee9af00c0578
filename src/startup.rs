//! One-time startup: choose the config source, check credentials, resolve
//! the collection contract and build the collaborators.

use crate::blog::TumblrClient;
use crate::config::{Config, ConfigError};
use crate::marketplace::{FeedError, OpenSeaClient};

/// `--values <file.txt>` selects the values file; otherwise the environment
pub fn load_config(args: &[String]) -> Result<Config, ConfigError> {
    match args.iter().position(|arg| arg == "--values") {
        Some(idx) => {
            let path = args.get(idx + 1).ok_or_else(|| {
                ConfigError::InvalidValue("--values requires a file path".to_string())
            })?;
            log::info!("📄 Loading credentials from values file {}", path);
            Config::from_values_file(path)
        }
        None => Config::from_env(),
    }
}

/// Validated, ready-to-use collaborators
pub struct Collaborators {
    pub feed: OpenSeaClient,
    pub platform: TumblrClient,
    pub blog_user: String,
}

/// Run every startup check and build the clients.
///
/// Fails on a rejected marketplace key, an unknown collection or rejected
/// blog credentials.
pub async fn connect(config: &Config) -> Result<Collaborators, Box<dyn std::error::Error>> {
    log::info!("🔧 Validating configuration...");

    let feed = OpenSeaClient::new(
        &config.opensea_api_url,
        &config.opensea_api_key,
        &config.user_agent,
        config.contract_address.as_deref().unwrap_or_default(),
        config.feed_limit,
        config.feed_timeout,
    )?;

    feed.verify_api_key()
        .await
        .map_err(|e| format!("Invalid marketplace API key: {}", e))?;
    log::info!("   ├─ Marketplace API key validated");

    let feed = match &config.contract_address {
        Some(address) => {
            log::info!("   ├─ Contract address (configured): {}", address);
            feed
        }
        None => {
            let info = feed
                .resolve_collection(&config.collection_slug)
                .await
                .map_err(|e| match e {
                    FeedError::CollectionNotFound(slug) => {
                        format!("The collection '{}' does not exist", slug)
                    }
                    other => format!("Collection lookup failed: {}", other),
                })?;
            log::info!(
                "   ├─ Collection '{}' -> contract {} (supply: {})",
                config.collection_slug,
                info.contract_address,
                info.total_supply
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            );
            feed.with_contract_address(&info.contract_address)
        }
    };

    let platform = TumblrClient::new(
        &config.tumblr_api_url,
        config.credentials.clone(),
        &config.user_agent,
        config.publish_timeout,
    )?;

    let blog_user = platform
        .verify_credentials()
        .await
        .map_err(|e| format!("Invalid blog credentials: {}", e))?;
    log::info!("   └─ Blog credentials validated (user: {})", blog_user);

    Ok(Collaborators {
        feed,
        platform,
        blog_user,
    })
}
