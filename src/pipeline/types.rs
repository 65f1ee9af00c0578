//! Transaction record shared by the normalizer, backlog and publisher

use rust_decimal::Decimal;

/// One marketplace sale, normalized and ready to announce.
///
/// The caption is rendered once at construction and never changes. The
/// `announced` flag starts false and flips exactly once, after the blogging
/// platform accepted the post.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub tx_id: String,
    pub display_name: String,
    /// `None` means the announcement goes out as a text post
    pub image_url: Option<String>,
    /// Native currency price, 5 fractional digits
    pub price_native: Decimal,
    /// USD price, 2 fractional digits
    pub price_usd: Decimal,
    pub permalink: String,
    /// Greater than 1 for bundle sales
    pub asset_count: usize,
    caption: String,
    announced: bool,
}

impl TransactionRecord {
    pub fn new(
        tx_id: String,
        display_name: String,
        image_url: Option<String>,
        price_native: Decimal,
        price_usd: Decimal,
        permalink: String,
        asset_count: usize,
    ) -> Self {
        let asset_count = asset_count.max(1);
        let caption = render_caption(
            &display_name,
            asset_count,
            price_native,
            price_usd,
            &permalink,
        );

        Self {
            tx_id,
            display_name,
            image_url,
            price_native,
            price_usd,
            permalink,
            asset_count,
            caption,
            announced: false,
        }
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn is_announced(&self) -> bool {
        self.announced
    }

    pub fn is_bundle(&self) -> bool {
        self.asset_count > 1
    }

    /// Only the publisher calls this, after a confirmed post
    pub(crate) fn mark_announced(&mut self) {
        self.announced = true;
    }
}

/// Render the post caption for a sale.
///
/// Single asset: `"{name} bought for Ξ{native} (${usd})\n\n\n{link}\n\n"`
/// Bundle: `"{name}\n{count} assets bought for Ξ{native} (${usd})\n\n\n{link}\n\n"`
pub fn render_caption(
    display_name: &str,
    asset_count: usize,
    price_native: Decimal,
    price_usd: Decimal,
    permalink: &str,
) -> String {
    let native = format_native_price(price_native);
    let usd = format_usd_price(price_usd);

    let headline = if asset_count > 1 {
        format!(
            "{}\n{} assets bought for Ξ{} (${})",
            display_name, asset_count, native, usd
        )
    } else {
        format!("{} bought for Ξ{} (${})", display_name, native, usd)
    };

    format!("{}\n\n\n{}\n\n", headline, permalink)
}

/// Shortest form with at least one fractional digit: `0.5`, `1.23456`, `2.0`
pub fn format_native_price(price: Decimal) -> String {
    let normalized = price.normalize();
    if normalized.scale() == 0 {
        format!("{}.0", normalized)
    } else {
        normalized.to_string()
    }
}

/// Always exactly two fractional digits: `1000.00`, `2469.12`
pub fn format_usd_price(price: Decimal) -> String {
    format!("{:.2}", price.round_dp(2))
}
