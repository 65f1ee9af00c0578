//! Backoff tiers between cycles
//!
//! Short (posted, no news) < medium (publish error) < long (feed unavailable).
//! The two short tiers may differ from each other but never reach the medium one.

use std::time::Duration;
use tokio::time::sleep;

/// Which pause follows a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffTier {
    /// Short: a post went out
    Posted,
    /// Short: nothing new to announce
    NoNews,
    /// Medium: the blogging platform refused or was unreachable
    PublishError,
    /// Long: the sale feed was unreachable
    FeedUnavailable,
}

impl BackoffTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackoffTier::Posted => "posted",
            BackoffTier::NoNews => "no_news",
            BackoffTier::PublishError => "publish_error",
            BackoffTier::FeedUnavailable => "feed_unavailable",
        }
    }
}

#[derive(Debug)]
pub struct PacingOrderError(pub String);

impl std::fmt::Display for PacingOrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Backoff tiers out of order: {}", self.0)
    }
}

impl std::error::Error for PacingOrderError {}

/// Delay per backoff tier. Short tiers stay below the medium one and the
/// medium one stays below the long one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pacing {
    pub posted: Duration,
    pub no_news: Duration,
    pub publish_error: Duration,
    pub feed_unavailable: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            posted: Duration::from_secs(5),
            no_news: Duration::from_secs(5),
            publish_error: Duration::from_secs(15),
            feed_unavailable: Duration::from_secs(30),
        }
    }
}

impl Pacing {
    pub fn new(
        posted: Duration,
        no_news: Duration,
        publish_error: Duration,
        feed_unavailable: Duration,
    ) -> Result<Self, PacingOrderError> {
        let pacing = Self {
            posted,
            no_news,
            publish_error,
            feed_unavailable,
        };
        pacing.validate()?;
        Ok(pacing)
    }

    pub fn validate(&self) -> Result<(), PacingOrderError> {
        let short = self.posted.max(self.no_news);

        if short >= self.publish_error {
            return Err(PacingOrderError(format!(
                "short tier {:?} must be below publish error tier {:?}",
                short, self.publish_error
            )));
        }
        if self.publish_error >= self.feed_unavailable {
            return Err(PacingOrderError(format!(
                "publish error tier {:?} must be below feed unavailable tier {:?}",
                self.publish_error, self.feed_unavailable
            )));
        }
        Ok(())
    }

    pub fn delay_for(&self, tier: BackoffTier) -> Duration {
        match tier {
            BackoffTier::Posted => self.posted,
            BackoffTier::NoNews => self.no_news,
            BackoffTier::PublishError => self.publish_error,
            BackoffTier::FeedUnavailable => self.feed_unavailable,
        }
    }

    pub async fn pause(&self, tier: BackoffTier) {
        let delay = self.delay_for(tier);
        log::debug!("⏳ Sleeping {}s ({})", delay.as_secs_f64(), tier.as_str());
        sleep(delay).await;
    }
}
