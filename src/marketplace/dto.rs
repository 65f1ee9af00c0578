//! Wire shapes of the OpenSea v1 API
//!
//! Every field is optional: the normalizer decides what is required, so one
//! malformed event never fails the whole batch.

use serde::{Deserialize, Deserializer, Serialize};

/// Missing key and explicit `null` both mean an empty list
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One raw sale event, exactly as the feed returned it
pub type RawSaleEvent = serde_json::Value;

/// `GET /events/` envelope
#[derive(Debug, Clone, Deserialize)]
pub struct EventsResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub asset_events: Vec<RawSaleEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetEventDto {
    pub transaction: Option<TransactionDto>,
    pub asset: Option<AssetDto>,
    pub asset_bundle: Option<AssetBundleDto>,
    /// Smallest currency unit; OpenSea sends a decimal string
    pub total_price: Option<serde_json::Value>,
    pub payment_token: Option<PaymentTokenDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDto {
    pub transaction_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDto {
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub permalink: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetBundleDto {
    pub name: Option<String>,
    pub permalink: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub assets: Vec<serde_json::Value>,
    pub asset_contract: Option<AssetContractDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetContractDto {
    pub collection: Option<CollectionImageDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionImageDto {
    pub large_image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentTokenDto {
    /// USD exchange rate; string or number depending on the endpoint version
    pub usd_price: Option<serde_json::Value>,
}

/// `GET /collection/{slug}` envelope
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionResponse {
    pub collection: CollectionDto,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionDto {
    pub stats: Option<CollectionStatsDto>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub primary_asset_contracts: Vec<PrimaryAssetContractDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionStatsDto {
    pub total_supply: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrimaryAssetContractDto {
    pub address: String,
}
