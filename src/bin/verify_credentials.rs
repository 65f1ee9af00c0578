//! Startup validation only: config file format, marketplace key, collection
//! lookup and blog credentials. Exits non-zero on the first failure.
//!
//! Usage:
//!   cargo run --bin verify_credentials
//!   cargo run --bin verify_credentials -- --values tumblr_values.txt

use dotenv::dotenv;
use log::info;
use salecaster::startup::{connect, load_config};
use std::env;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
    {
        log::debug!("rustls crypto provider already installed");
    }

    let args: Vec<String> = env::args().collect();
    let config = load_config(&args)?;
    info!("✅ Configuration format validated");

    let collaborators = connect(&config).await?;

    info!("✅ Validation complete. No errors found.");
    info!("   ├─ Contract: {}", collaborators.feed.contract_address());
    info!("   └─ Blog user: {}", collaborators.blog_user);
    Ok(())
}
