//! Sale announcement pipeline
//!
//! ## Data flow
//!
//! ```text
//! SaleFeed ──batch──▶ normalizer ──new sales──▶ BacklogQueue
//!                        ▲                          │ select_next (newest)
//!                        │ contains                 ▼
//!                    DedupLedger ◀──record──── Publisher ──▶ BlogPlatform
//! ```
//!
//! The `CycleController` owns the ledger and the backlog and drives one
//! fetch/enqueue/publish pass per cycle, then sleeps according to the outcome.
//!
//! ## Guarantees
//!
//! - A transaction id is queued at most once per process and is never queued
//!   again once the ledger has it, across restarts.
//! - A record is flagged announced only after the platform accepted the post.
//! - A failed post keeps the record queued for the next cycle.
//!
//! ## Module Organization
//!
//! - `types` - TransactionRecord and caption rendering
//! - `normalizer` - raw feed record -> TransactionRecord
//! - `ledger` - persistent announced-id set (SQLite) with retried writes
//! - `backlog` - in-memory queue, newest first
//! - `publisher` - post rendering and submission
//! - `pacing` - backoff tiers
//! - `cycle` - the outer state machine

pub mod backlog;
pub mod cycle;
pub mod ledger;
pub mod normalizer;
pub mod pacing;
pub mod publisher;
pub mod types;

pub use backlog::BacklogQueue;
pub use cycle::{CycleController, CycleOutcome, CycleStatus};
pub use ledger::{BufferedLedger, DedupLedger, LedgerError, SqliteLedger};
pub use normalizer::{normalize_batch, normalize_event, NormalizeSummary, SkipReason};
pub use pacing::{BackoffTier, Pacing};
pub use publisher::{PublishError, PublishTarget, Publisher, RenderedPost};
pub use types::TransactionRecord;
