//! salecaster runtime
//!
//! Usage:
//!   cargo run --release --bin salecaster
//!   cargo run --release --bin salecaster -- --values tumblr_values.txt
//!
//! Runs until killed. See `salecaster::config` for the environment variables.

use dotenv::dotenv;
use log::{error, info};
use salecaster::pipeline::{CycleController, PublishTarget, Publisher, SqliteLedger};
use salecaster::startup::{connect, load_config};
use std::env;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    // NOTE: Workaround for rustls issue
    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
    {
        log::debug!("rustls crypto provider already installed");
    }

    info!("🚀 Starting salecaster");

    let args: Vec<String> = env::args().collect();
    let config = load_config(&args)?;

    info!("📊 Configuration:");
    info!("   ├─ Collection: {}", config.collection_slug);
    info!("   ├─ Blog: {}", config.blog_name);
    info!("   ├─ Tags: {:?}", config.post_tags());
    info!("   ├─ Ledger: {}", config.ledger_path);
    info!("   ├─ Feed limit: {} events", config.feed_limit);
    info!(
        "   └─ Backoff: posted {}s, no news {}s, publish error {}s, feed unavailable {}s",
        config.pacing.posted.as_secs(),
        config.pacing.no_news.as_secs(),
        config.pacing.publish_error.as_secs(),
        config.pacing.feed_unavailable.as_secs()
    );

    let collaborators = connect(&config).await?;
    info!("✅ All checks passed, posting as {}", collaborators.blog_user);

    let ledger = SqliteLedger::open(&config.ledger_path)?;
    info!("   └─ {} transactions already announced", ledger.len()?);

    let publisher = Publisher::new(
        collaborators.platform,
        PublishTarget {
            blog: config.blog_name.clone(),
            tags: config.post_tags(),
        },
    );
    let mut controller =
        CycleController::new(collaborators.feed, publisher, ledger, config.pacing.clone());

    tokio::select! {
        _ = controller.run_forever() => {}
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("⚠️  Received CTRL+C, shutting down..."),
                Err(err) => error!("❌ Failed to listen for CTRL+C: {}", err),
            }
        }
    }

    info!(
        "✅ salecaster stopped ({} sales left unannounced in backlog)",
        controller.backlog().iter().filter(|r| !r.is_announced()).count()
    );
    Ok(())
}
