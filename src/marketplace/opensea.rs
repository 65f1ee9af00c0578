//! OpenSea v1 API client
//!
//! Endpoints used:
//! - `GET {base}/events/?asset_contract_address=..&event_type=successful&only_opensea=false&offset=0&limit=N`
//! - `GET {base}/collection/{slug}` (startup only, resolves the contract address)
//!
//! All requests carry `Accept: application/json`, `X-API-KEY` and a
//! configurable `User-Agent`, and share one timeout.

use super::dto::{CollectionResponse, EventsResponse, RawSaleEvent};
use super::{FeedError, SaleFeed};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.opensea.io/api/v1";

/// Contract details looked up from a collection slug
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionInfo {
    pub contract_address: String,
    pub total_supply: Option<u64>,
}

pub struct OpenSeaClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    user_agent: String,
    contract_address: String,
    limit: usize,
}

impl OpenSeaClient {
    /// Build a client for one contract.
    ///
    /// `contract_address` may be empty until `resolve_collection` has run;
    /// use `with_contract_address` to set it afterwards.
    pub fn new(
        base_url: &str,
        api_key: &str,
        user_agent: &str,
        contract_address: &str,
        limit: usize,
        timeout: Duration,
    ) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            user_agent: user_agent.to_string(),
            contract_address: contract_address.to_string(),
            limit: limit.max(1),
        })
    }

    pub fn with_contract_address(mut self, contract_address: &str) -> Self {
        self.contract_address = contract_address.to_string();
        self
    }

    pub fn contract_address(&self) -> &str {
        &self.contract_address
    }

    fn events_url(&self) -> String {
        format!("{}/events/", self.base_url)
    }

    fn events_query(&self, limit: usize) -> Vec<(&'static str, String)> {
        vec![
            ("asset_contract_address", self.contract_address.clone()),
            ("event_type", "successful".to_string()),
            ("only_opensea", "false".to_string()),
            ("offset", "0".to_string()),
            ("limit", limit.to_string()),
        ]
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, FeedError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, self.user_agent.as_str())
            .header("X-API-KEY", self.api_key.as_str())
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| FeedError::Decode(e.to_string()))
    }

    /// Look up the primary contract of a collection slug
    pub async fn resolve_collection(&self, slug: &str) -> Result<CollectionInfo, FeedError> {
        let url = format!("{}/collection/{}", self.base_url, slug);

        let response: CollectionResponse = match self.get_json(&url, &[]).await {
            Ok(response) => response,
            Err(FeedError::Status(404)) => {
                return Err(FeedError::CollectionNotFound(slug.to_string()))
            }
            Err(e) => return Err(e),
        };

        collection_info(response).ok_or_else(|| FeedError::CollectionNotFound(slug.to_string()))
    }

    /// Cheap authenticated request; fails when the API key is rejected
    pub async fn verify_api_key(&self) -> Result<(), FeedError> {
        let query = vec![
            ("only_opensea", "false".to_string()),
            ("offset", "0".to_string()),
            ("limit", "1".to_string()),
        ];
        let _: EventsResponse = self.get_json(&self.events_url(), &query).await?;
        Ok(())
    }
}

fn collection_info(response: CollectionResponse) -> Option<CollectionInfo> {
    let contract = response.collection.primary_asset_contracts.into_iter().next()?;
    let total_supply = response
        .collection
        .stats
        .and_then(|stats| stats.total_supply)
        .filter(|supply| *supply >= 0.0)
        .map(|supply| supply as u64);

    Some(CollectionInfo {
        contract_address: contract.address,
        total_supply,
    })
}

#[async_trait]
impl SaleFeed for OpenSeaClient {
    async fn fetch_recent_sales(&self) -> Result<Vec<RawSaleEvent>, FeedError> {
        let query = self.events_query(self.limit);
        let response: EventsResponse = self.get_json(&self.events_url(), &query).await?;

        log::debug!("📡 Fetched {} sale events", response.asset_events.len());
        Ok(response.asset_events)
    }
}
