pub mod feed;
pub mod hacker_news;
pub mod reddit;

pub use feed::{FeedSource, FeedSourceSpec};
pub use hacker_news::HackerNewsSource;
pub use reddit::RedditSource;

use crate::traits::SourceClient;
use crate::types::{AggregatorError, ArticleRecord, FetchConfig, Result};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

/// The stock source list, in registration order.
pub fn default_sources(fetch_config: &FetchConfig) -> Result<Vec<Arc<dyn SourceClient>>> {
    Ok(vec![
        Arc::new(HackerNewsSource::new(fetch_config.clone())?),
        Arc::new(FeedSource::new(FeedSourceSpec::techcrunch(), fetch_config.clone())?),
        Arc::new(RedditSource::new(fetch_config.clone())?),
        Arc::new(FeedSource::new(FeedSourceSpec::the_verge(), fetch_config.clone())?),
        Arc::new(FeedSource::new(FeedSourceSpec::ars_technica(), fetch_config.clone())?),
    ])
}

fn require_articles(outcome: Result<Vec<ArticleRecord>>) -> Result<Vec<ArticleRecord>> {
    match outcome {
        Ok(articles) if articles.is_empty() => Err(AggregatorError::EmptyFeed),
        other => other,
    }
}

/// Single strategy: an empty batch counts as a failure.
pub async fn primary_only<P>(source: &str, primary: P) -> Result<Vec<ArticleRecord>>
where
    P: Future<Output = Result<Vec<ArticleRecord>>>,
{
    let outcome = require_articles(primary.await);
    if let Err(e) = &outcome {
        warn!(source, error = %e, "Primary retrieval failed and no fallback is configured");
    }
    outcome
}

/// Two-tier retrieval. `fallback` is only polled when `primary` fails or
/// comes back empty, and at most once.
pub async fn with_fallback<P, F>(source: &str, primary: P, fallback: F) -> Result<Vec<ArticleRecord>>
where
    P: Future<Output = Result<Vec<ArticleRecord>>>,
    F: Future<Output = Result<Vec<ArticleRecord>>>,
{
    let primary_error = match require_articles(primary.await) {
        Ok(articles) => return Ok(articles),
        Err(e) => e,
    };
    warn!(source, error = %primary_error, "Primary retrieval failed, falling back");

    match require_articles(fallback.await) {
        Ok(articles) => {
            info!(source, count = articles.len(), "Fallback retrieval succeeded");
            Ok(articles)
        }
        Err(fallback_error) => Err(AggregatorError::FallbackFailed {
            primary: primary_error.to_string(),
            fallback: fallback_error.to_string(),
        }),
    }
}
