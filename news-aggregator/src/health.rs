use crate::types::{ArticleRecord, HealthStatus, Result, SourceHealth};
use chrono::Utc;
use std::sync::RwLock;
use std::time::Instant;
use tracing::{info, warn};

/// Per-source status record, written once at the end of each run by the
/// owning source and read by anyone.
#[derive(Debug)]
pub struct HealthTracker {
    inner: RwLock<SourceHealth>,
}

impl HealthTracker {
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            inner: RwLock::new(SourceHealth::idle(source_name)),
        }
    }

    pub fn snapshot(&self) -> SourceHealth {
        // A poisoned lock still holds the last complete record.
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Convert the typed outcome of one run into health state and the batch
    /// handed back to the caller.
    pub fn settle(&self, started: Instant, outcome: Result<Vec<ArticleRecord>>) -> Vec<ArticleRecord> {
        let elapsed = started.elapsed().as_secs_f64();
        let duration_seconds = (elapsed * 100.0).round() / 100.0;

        let (articles, status, last_error) = match outcome {
            Ok(articles) => (articles, HealthStatus::Ok, String::new()),
            Err(e) => (Vec::new(), HealthStatus::Error, e.to_string()),
        };

        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.status = status;
        guard.last_run_at = Some(Utc::now());
        guard.duration_seconds = duration_seconds;
        guard.article_count = articles.len();
        guard.last_error = last_error;

        match status {
            HealthStatus::Error => warn!(
                source = %guard.source_name,
                error = %guard.last_error,
                elapsed_ms = (elapsed * 1_000.0) as u64,
                "Source run failed"
            ),
            _ => info!(
                source = %guard.source_name,
                count = articles.len(),
                elapsed_ms = (elapsed * 1_000.0) as u64,
                "Source run finished"
            ),
        }

        articles
    }
}
