use crate::types::{ArticleRecord, SourceHealth};
use async_trait::async_trait;

/// Capability shared by every upstream news source.
///
/// `fetch` never fails past this boundary: an irrecoverable problem is written
/// to the source's own health record and an empty batch is returned.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Stable identifier stamped on every emitted article, e.g. "Hacker News".
    fn source_name(&self) -> &str;

    /// Whether `page_hint` means anything to this source. Sources that
    /// don't paginate are always asked for a single batch.
    fn paginates(&self) -> bool {
        false
    }

    /// Retrieve a bounded batch of normalized articles.
    async fn fetch(&self, page_hint: u32) -> Vec<ArticleRecord>;

    /// Snapshot of the last completed run. May be stale while a fetch is in flight.
    fn health(&self) -> SourceHealth;
}
