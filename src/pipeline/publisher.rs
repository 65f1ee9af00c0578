//! Publisher: render the selected record and submit it to the blog
//!
//! On success the record is flagged announced first, then its id goes into
//! the ledger. A crash between the platform accepting the post and the
//! ledger insert can re-announce that transaction after restart; the insert
//! is issued immediately after the platform answers to keep that window small.

use super::ledger::{DedupLedger, LedgerError};
use super::types::TransactionRecord;
use crate::blog::{BlogError, BlogPlatform, PhotoPost, PostState, TextPost};

/// Where announcements go
#[derive(Debug, Clone, PartialEq)]
pub struct PublishTarget {
    pub blog: String,
    /// Tags without the leading `#`
    pub tags: Vec<String>,
}

#[derive(Debug)]
pub enum PublishError {
    /// Post not accepted; the record stays pending
    Platform(BlogError),
    /// Post accepted but not recorded; the record is announced in memory only
    Ledger(LedgerError),
}

impl From<BlogError> for PublishError {
    fn from(err: BlogError) -> Self {
        PublishError::Platform(err)
    }
}

impl From<LedgerError> for PublishError {
    fn from(err: LedgerError) -> Self {
        PublishError::Ledger(err)
    }
}

impl std::fmt::Display for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishError::Platform(e) => write!(f, "Publish failed: {}", e),
            PublishError::Ledger(e) => write!(f, "Posted but not recorded: {}", e),
        }
    }
}

impl std::error::Error for PublishError {}

/// The post a record turns into
#[derive(Debug, Clone, PartialEq)]
pub enum RenderedPost {
    Text(TextPost),
    Photo(PhotoPost),
}

pub struct Publisher<P> {
    platform: P,
    target: PublishTarget,
}

impl<P: BlogPlatform> Publisher<P> {
    pub fn new(platform: P, target: PublishTarget) -> Self {
        Self { platform, target }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Text post when there is no image, photo post otherwise
    pub fn render(&self, record: &TransactionRecord) -> RenderedPost {
        match &record.image_url {
            None => RenderedPost::Text(TextPost {
                blog: self.target.blog.clone(),
                state: PostState::Published,
                tags: self.target.tags.clone(),
                body: record.caption().to_string(),
            }),
            Some(image_url) => RenderedPost::Photo(PhotoPost {
                blog: self.target.blog.clone(),
                state: PostState::Published,
                tags: self.target.tags.clone(),
                source: image_url.clone(),
                caption: record.caption().to_string(),
            }),
        }
    }

    /// Submit the record and, once accepted, mark it announced and record it.
    ///
    /// On a platform error nothing changes: the record stays un-announced
    /// and the ledger is untouched.
    pub async fn publish<L: DedupLedger + ?Sized>(
        &self,
        record: &mut TransactionRecord,
        ledger: &mut L,
    ) -> Result<(), PublishError> {
        match self.render(record) {
            RenderedPost::Text(post) => self.platform.create_text_post(&post).await?,
            RenderedPost::Photo(post) => self.platform.create_photo_post(&post).await?,
        }

        record.mark_announced();
        ledger.record(&record.tx_id)?;
        Ok(())
    }

    /// `publish` reduced to a success flag, with the failure logged
    pub async fn announce<L: DedupLedger + ?Sized>(
        &self,
        record: &mut TransactionRecord,
        ledger: &mut L,
    ) -> bool {
        match self.publish(record, ledger).await {
            Ok(()) => true,
            Err(PublishError::Ledger(e)) => {
                log::error!(
                    "❌ {} was posted but could not be recorded ({}); it may be re-announced after a restart",
                    record.tx_id,
                    e
                );
                false
            }
            Err(e) => {
                log::warn!("⚠️  {} not posted: {}", record.tx_id, e);
                false
            }
        }
    }
}
