//! Sale event normalization: raw feed record -> TransactionRecord
//!
//! Rules, in order:
//! 1. Transaction hash is the identity; ids already in the ledger or the
//!    backlog are skipped.
//! 2. Bundle sales take the collection image, bundle name, bundle permalink
//!    and the number of bundled assets.
//! 3. Everything else is a single-asset sale.
//! 4. Native price = total price / 10^18 rounded to 5 places; USD price =
//!    native x payment token rate rounded to 2 places.
//! 5. Missing or malformed fields skip the record; nothing here fails the batch.

use super::backlog::BacklogQueue;
use super::ledger::DedupLedger;
use super::types::TransactionRecord;
use crate::marketplace::dto::{AssetEventDto, RawSaleEvent};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Smallest-unit exponent of the native currency (wei -> ether)
pub const NATIVE_DECIMALS: u32 = 18;
pub const NATIVE_PRICE_DP: u32 = 5;
pub const USD_PRICE_DP: u32 = 2;

/// Why a raw record did not become a TransactionRecord
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Record is not shaped like a sale event at all
    Malformed(String),
    MissingField(&'static str),
    InvalidPrice(String),
    AlreadyAnnounced,
    AlreadyQueued,
    /// Membership check failed; skipped so it cannot be announced twice
    LedgerUnavailable(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Malformed(msg) => write!(f, "malformed record: {}", msg),
            SkipReason::MissingField(field) => write!(f, "missing field: {}", field),
            SkipReason::InvalidPrice(msg) => write!(f, "invalid price: {}", msg),
            SkipReason::AlreadyAnnounced => write!(f, "already announced"),
            SkipReason::AlreadyQueued => write!(f, "already queued"),
            SkipReason::LedgerUnavailable(msg) => write!(f, "ledger unavailable: {}", msg),
        }
    }
}

impl std::error::Error for SkipReason {}

/// Counts from one normalization pass over a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeSummary {
    pub enqueued: usize,
    pub skipped: usize,
}

/// Normalize a whole batch, appending every new sale to the backlog in
/// batch order.
pub fn normalize_batch<L: DedupLedger + ?Sized>(
    batch: &[RawSaleEvent],
    ledger: &L,
    backlog: &mut BacklogQueue,
) -> NormalizeSummary {
    let mut summary = NormalizeSummary::default();

    for raw in batch {
        match normalize_event(raw, ledger, backlog) {
            Ok(record) => {
                backlog.append(record);
                summary.enqueued += 1;
            }
            Err(SkipReason::AlreadyAnnounced) | Err(SkipReason::AlreadyQueued) => {
                summary.skipped += 1;
            }
            Err(reason) => {
                log::debug!("⏭️  Skipping sale event: {}", reason);
                summary.skipped += 1;
            }
        }
    }

    summary
}

/// Normalize one raw record. No side effects.
pub fn normalize_event<L: DedupLedger + ?Sized>(
    raw: &RawSaleEvent,
    ledger: &L,
    backlog: &BacklogQueue,
) -> Result<TransactionRecord, SkipReason> {
    let event: AssetEventDto = serde_json::from_value(raw.clone())
        .map_err(|e| SkipReason::Malformed(e.to_string()))?;

    let tx_id = event
        .transaction
        .as_ref()
        .and_then(|tx| tx.transaction_hash.clone())
        .filter(|hash| !hash.is_empty())
        .ok_or(SkipReason::MissingField("transaction.transaction_hash"))?;

    match ledger.contains(&tx_id) {
        Ok(true) => return Err(SkipReason::AlreadyAnnounced),
        Ok(false) => {}
        Err(e) => return Err(SkipReason::LedgerUnavailable(e.to_string())),
    }
    if backlog.contains(&tx_id) {
        return Err(SkipReason::AlreadyQueued);
    }

    let (price_native, price_usd) = parse_prices(&event)?;

    if let Some(bundle) = event.asset_bundle {
        let image_url = bundle
            .asset_contract
            .and_then(|contract| contract.collection)
            .and_then(|collection| collection.large_image_url);
        let display_name = bundle.name.ok_or(SkipReason::MissingField("asset_bundle.name"))?;
        let permalink = bundle
            .permalink
            .ok_or(SkipReason::MissingField("asset_bundle.permalink"))?;

        return Ok(TransactionRecord::new(
            tx_id,
            display_name,
            non_empty(image_url),
            price_native,
            price_usd,
            permalink,
            bundle.assets.len(),
        ));
    }

    let asset = event.asset.ok_or(SkipReason::MissingField("asset"))?;
    let display_name = asset.name.ok_or(SkipReason::MissingField("asset.name"))?;
    let permalink = asset
        .permalink
        .ok_or(SkipReason::MissingField("asset.permalink"))?;

    Ok(TransactionRecord::new(
        tx_id,
        display_name,
        non_empty(asset.image_url),
        price_native,
        price_usd,
        permalink,
        1,
    ))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn parse_prices(event: &AssetEventDto) -> Result<(Decimal, Decimal), SkipReason> {
    let total = event
        .total_price
        .as_ref()
        .ok_or(SkipReason::MissingField("total_price"))?;
    let rate = event
        .payment_token
        .as_ref()
        .and_then(|token| token.usd_price.as_ref())
        .ok_or(SkipReason::MissingField("payment_token.usd_price"))?;

    let price_native = native_price(total)?;
    let rate = usd_rate(rate)?;
    let price_usd = usd_price(price_native, rate)?;

    Ok((price_native, price_usd))
}

/// Total price in the smallest unit -> native units, 5 decimal places
pub fn native_price(total: &Value) -> Result<Decimal, SkipReason> {
    let smallest_units: u128 = match total {
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| SkipReason::InvalidPrice(format!("total_price {:?}", s)))?,
        Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| SkipReason::InvalidPrice(format!("total_price {}", n)))?,
        other => return Err(SkipReason::InvalidPrice(format!("total_price {}", other))),
    };

    let smallest_units = i128::try_from(smallest_units)
        .map_err(|_| SkipReason::InvalidPrice("total_price out of range".to_string()))?;
    let native = Decimal::try_from_i128_with_scale(smallest_units, NATIVE_DECIMALS)
        .map_err(|e| SkipReason::InvalidPrice(e.to_string()))?;

    Ok(native.round_dp(NATIVE_PRICE_DP))
}

/// Payment token USD rate, given as a string or a JSON number
pub fn usd_rate(rate: &Value) -> Result<Decimal, SkipReason> {
    let text = match rate {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => return Err(SkipReason::InvalidPrice(format!("usd_price {}", other))),
    };

    let parsed = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| SkipReason::InvalidPrice(format!("usd_price {:?}", text)))?;

    if parsed.is_sign_negative() {
        return Err(SkipReason::InvalidPrice(format!("usd_price {:?}", text)));
    }
    Ok(parsed)
}

/// Native price x rate, 2 decimal places
pub fn usd_price(price_native: Decimal, rate: Decimal) -> Result<Decimal, SkipReason> {
    price_native
        .checked_mul(rate)
        .map(|usd| usd.round_dp(USD_PRICE_DP))
        .ok_or_else(|| SkipReason::InvalidPrice("usd price overflow".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ledger::SqliteLedger;
    use serde_json::json;

    fn single_sale(tx: &str) -> Value {
        json!({
            "transaction": {"transaction_hash": tx},
            "asset_bundle": null,
            "asset": {
                "name": "Widget #7",
                "image_url": "https://img.example/7.png",
                "permalink": "https://opensea.io/assets/0xc/7"
            },
            "total_price": "500000000000000000",
            "payment_token": {"usd_price": "2000.000000000000000000"}
        })
    }

    fn bundle_sale(tx: &str) -> Value {
        json!({
            "transaction": {"transaction_hash": tx},
            "asset": null,
            "asset_bundle": {
                "name": "Foo Pack",
                "permalink": "https://opensea.io/bundles/foo-pack",
                "assets": [{}, {}, {}],
                "asset_contract": {"collection": {"large_image_url": "https://img.example/col.png"}}
            },
            "total_price": "1234560000000000000",
            "payment_token": {"usd_price": 2000.0}
        })
    }

    #[test]
    fn test_single_asset_sale() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let backlog = BacklogQueue::new();

        let record = normalize_event(&single_sale("0x01"), &ledger, &backlog).unwrap();

        assert_eq!(record.tx_id, "0x01");
        assert_eq!(record.display_name, "Widget #7");
        assert_eq!(record.asset_count, 1);
        assert_eq!(record.image_url.as_deref(), Some("https://img.example/7.png"));
        assert_eq!(
            record.caption(),
            "Widget #7 bought for Ξ0.5 ($1000.00)\n\n\nhttps://opensea.io/assets/0xc/7\n\n"
        );
    }

    #[test]
    fn test_bundle_sale() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let backlog = BacklogQueue::new();

        let record = normalize_event(&bundle_sale("0x02"), &ledger, &backlog).unwrap();

        assert_eq!(record.asset_count, 3);
        assert_eq!(record.image_url.as_deref(), Some("https://img.example/col.png"));
        assert_eq!(
            record.caption(),
            "Foo Pack\n3 assets bought for Ξ1.23456 ($2469.12)\n\n\nhttps://opensea.io/bundles/foo-pack\n\n"
        );
    }

    #[test]
    fn test_native_price_rounds_to_five_places() {
        let price = native_price(&json!("1234567890000000000")).unwrap();
        assert_eq!(price, Decimal::from_str("1.23457").unwrap());
    }

    #[test]
    fn test_already_announced_is_skipped() {
        let mut ledger = SqliteLedger::open_in_memory().unwrap();
        ledger.record("0x03").unwrap();
        let backlog = BacklogQueue::new();

        let result = normalize_event(&single_sale("0x03"), &ledger, &backlog);
        assert_eq!(result, Err(SkipReason::AlreadyAnnounced));
    }

    #[test]
    fn test_duplicates_in_batch_enqueued_once() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let mut backlog = BacklogQueue::new();

        let batch = vec![single_sale("0x04"), single_sale("0x04"), bundle_sale("0x05")];
        let summary = normalize_batch(&batch, &ledger, &mut backlog);

        assert_eq!(summary, NormalizeSummary { enqueued: 2, skipped: 1 });
        assert_eq!(backlog.len(), 2);
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let mut backlog = BacklogQueue::new();

        let mut no_price = single_sale("0x10");
        no_price["total_price"] = Value::Null;
        let mut bad_price = single_sale("0x11");
        bad_price["total_price"] = json!("not-a-number");
        let mut bad_rate = single_sale("0x12");
        bad_rate["payment_token"] = json!({"usd_price": "abc"});
        let mut no_tx = single_sale("0x13");
        no_tx["transaction"] = Value::Null;
        let mut no_asset = single_sale("0x14");
        no_asset["asset"] = Value::Null;
        let not_an_object = json!("garbage");

        let batch = vec![
            no_price,
            bad_price,
            bad_rate,
            no_tx,
            no_asset,
            not_an_object,
            single_sale("0x15"),
        ];
        let summary = normalize_batch(&batch, &ledger, &mut backlog);

        assert_eq!(summary.enqueued, 1);
        assert_eq!(summary.skipped, 6);
        assert_eq!(backlog.iter().next().unwrap().tx_id, "0x15");
    }

    #[test]
    fn test_missing_image_means_text_post() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let backlog = BacklogQueue::new();

        let mut sale = single_sale("0x20");
        sale["asset"]["image_url"] = json!("");
        let record = normalize_event(&sale, &ledger, &backlog).unwrap();
        assert!(record.image_url.is_none());

        let mut bundle = bundle_sale("0x21");
        bundle["asset_bundle"]["asset_contract"] = Value::Null;
        let record = normalize_event(&bundle, &ledger, &backlog).unwrap();
        assert!(record.image_url.is_none());
    }

    #[test]
    fn test_numeric_total_price_accepted() {
        let price = native_price(&json!(2_000_000_000_000_000_000u64)).unwrap();
        assert_eq!(price, Decimal::from(2));
        assert!(native_price(&json!(-1)).is_err());
        assert!(native_price(&json!(1.5)).is_err());
    }

    #[test]
    fn test_negative_rate_rejected() {
        assert!(usd_rate(&json!("-3.5")).is_err());
        assert_eq!(usd_rate(&json!("1e3")).unwrap(), Decimal::from(1000));
    }
}
