//! Marketplace sale-event feed
//!
//! The pipeline only sees the `SaleFeed` trait; `OpenSeaClient` is the
//! production implementation.

pub mod dto;
pub mod opensea;

use async_trait::async_trait;

pub use dto::RawSaleEvent;
pub use opensea::{CollectionInfo, OpenSeaClient};

#[derive(Debug)]
pub enum FeedError {
    /// Network failure or timeout
    Transport(String),
    /// Feed answered with a non-success status
    Status(u16),
    /// Body could not be decoded
    Decode(String),
    /// Requested collection does not exist or has no contract
    CollectionNotFound(String),
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FeedError::Decode(err.to_string())
        } else {
            FeedError::Transport(err.to_string())
        }
    }
}

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedError::Transport(msg) => write!(f, "Feed transport error: {}", msg),
            FeedError::Status(code) => write!(f, "Feed returned status {}", code),
            FeedError::Decode(msg) => write!(f, "Feed decode error: {}", msg),
            FeedError::CollectionNotFound(slug) => write!(f, "Collection not found: {}", slug),
        }
    }
}

impl std::error::Error for FeedError {}

/// Source of recent successful sales for the configured collection
#[async_trait]
pub trait SaleFeed {
    /// Fetch the most recent batch of sale events, newest first.
    ///
    /// Any failure means "no data this cycle"; the caller backs off.
    async fn fetch_recent_sales(&self) -> Result<Vec<RawSaleEvent>, FeedError>;
}
