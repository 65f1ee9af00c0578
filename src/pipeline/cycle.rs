//! Cycle controller: FETCH -> PARSE_AND_ENQUEUE -> PUBLISH -> PACE, forever
//!
//! One cycle publishes at most one post. A pending backlog is drained before
//! any new feed data is normalized. Ledger writes that failed after a post
//! are retried at the start of every cycle; until then the id is still treated
//! as announced.
//!
//! Pacing per cycle:
//! - feed fetch failed           -> `FeedUnavailable` (long)
//! - nothing to announce         -> `NoNews` (short)
//! - post accepted               -> `Posted` (short)
//! - post failed / not recorded  -> `PublishError` (medium)

use super::backlog::BacklogQueue;
use super::ledger::{BufferedLedger, DedupLedger};
use super::normalizer::{normalize_batch, NormalizeSummary};
use super::pacing::{BackoffTier, Pacing};
use super::publisher::Publisher;
use crate::blog::BlogPlatform;
use crate::marketplace::SaleFeed;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleStatus {
    Posted { tx_id: String },
    NoNews,
    PublishFailed { tx_id: String },
    FeedUnavailable { reason: String },
}

/// What one cycle did and how long to wait before the next
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    pub status: CycleStatus,
    pub backoff: BackoffTier,
    /// False when a pending backlog pre-empted normalization
    pub ingested: bool,
    pub normalized: NormalizeSummary,
    /// Un-announced records left after the cycle
    pub pending: usize,
    /// Announced ids whose ledger write is still outstanding
    pub unrecorded: usize,
}

pub struct CycleController<F, P, L> {
    feed: F,
    publisher: Publisher<P>,
    ledger: BufferedLedger<L>,
    backlog: BacklogQueue,
    pacing: Pacing,
}

impl<F, P, L> CycleController<F, P, L>
where
    F: SaleFeed,
    P: BlogPlatform,
    L: DedupLedger,
{
    pub fn new(feed: F, publisher: Publisher<P>, ledger: L, pacing: Pacing) -> Self {
        Self {
            feed,
            publisher,
            ledger: BufferedLedger::new(ledger),
            backlog: BacklogQueue::new(),
            pacing,
        }
    }

    pub fn backlog(&self) -> &BacklogQueue {
        &self.backlog
    }

    pub fn ledger(&self) -> &L {
        self.ledger.inner()
    }

    pub fn publisher(&self) -> &Publisher<P> {
        &self.publisher
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    pub fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    fn pending(&self) -> usize {
        self.backlog.iter().filter(|r| !r.is_announced()).count()
    }

    fn outcome(
        &self,
        status: CycleStatus,
        backoff: BackoffTier,
        ingested: bool,
        normalized: NormalizeSummary,
    ) -> CycleOutcome {
        CycleOutcome {
            status,
            backoff,
            ingested,
            normalized,
            pending: self.pending(),
            unrecorded: self.ledger.unwritten(),
        }
    }

    /// One full pass without the trailing sleep
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.ledger.flush();

        // FETCH
        let batch = match self.feed.fetch_recent_sales().await {
            Ok(batch) => batch,
            Err(e) => {
                return self.outcome(
                    CycleStatus::FeedUnavailable {
                        reason: e.to_string(),
                    },
                    BackoffTier::FeedUnavailable,
                    false,
                    NormalizeSummary::default(),
                );
            }
        };

        // PARSE_AND_ENQUEUE
        self.backlog.prune_announced();
        let ingested = !self.backlog.has_pending();
        let normalized = if ingested {
            normalize_batch(&batch, &self.ledger, &mut self.backlog)
        } else {
            log::debug!(
                "📦 {} pending in backlog, not ingesting {} fetched events",
                self.backlog.len(),
                batch.len()
            );
            NormalizeSummary::default()
        };

        let Some(candidate) = self.backlog.select_next() else {
            return self.outcome(CycleStatus::NoNews, BackoffTier::NoNews, ingested, normalized);
        };

        // PUBLISH
        let tx_id = candidate.tx_id.clone();
        let posted = self.publisher.announce(candidate, &mut self.ledger).await;

        if posted {
            self.outcome(
                CycleStatus::Posted { tx_id },
                BackoffTier::Posted,
                ingested,
                normalized,
            )
        } else {
            self.outcome(
                CycleStatus::PublishFailed { tx_id },
                BackoffTier::PublishError,
                ingested,
                normalized,
            )
        }
    }

    /// Run cycles until the process is killed
    pub async fn run_forever(&mut self) {
        log::info!("🔁 Starting announcement loop");

        loop {
            let outcome = self.run_cycle().await;
            log_outcome(&outcome);
            self.pacing.pause(outcome.backoff).await;
        }
    }
}

fn log_outcome(outcome: &CycleOutcome) {
    let now = chrono::Local::now().format("%m/%d/%Y %H:%M:%S");

    match &outcome.status {
        CycleStatus::Posted { tx_id } => {
            log::info!(
                "✅ Posted {} at roughly {} ({} still pending)",
                tx_id,
                now,
                outcome.pending
            );
        }
        CycleStatus::NoNews => {
            log::info!("💤 No new post at roughly {}", now);
        }
        CycleStatus::PublishFailed { tx_id } => {
            log::warn!(
                "⚠️  Post error for {} at roughly {}, will retry",
                tx_id,
                now
            );
        }
        CycleStatus::FeedUnavailable { reason } => {
            log::warn!("⚠️  Sale feed unavailable at roughly {}: {}", now, reason);
        }
    }

    if outcome.unrecorded > 0 {
        log::error!(
            "❌ {} announced transactions not yet in the ledger, retrying next cycle",
            outcome.unrecorded
        );
    }

    if outcome.normalized.enqueued > 0 {
        log::debug!(
            "   └─ Enqueued {} new sales, skipped {}",
            outcome.normalized.enqueued,
            outcome.normalized.skipped
        );
    }
}
