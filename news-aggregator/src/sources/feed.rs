use crate::health::HealthTracker;
use crate::parser::{FeedParser, Normalizer};
use crate::sources::{primary_only, with_fallback};
use crate::traits::SourceClient;
use crate::types::{ArticleRecord, FetchConfig, Result, SourceHealth};
use crate::Fetcher;
use async_trait::async_trait;
use std::time::Instant;
use tracing::{info, instrument};

/// Description of an RSS/Atom-backed source.
#[derive(Debug, Clone)]
pub struct FeedSourceSpec {
    pub name: String,
    pub feed_url: String,
    /// Alternate feed tried once when the primary is unusable.
    pub fallback_url: Option<String>,
    pub max_items: usize,
    pub default_author: String,
}

impl FeedSourceSpec {
    pub fn new(name: &str, feed_url: &str, max_items: usize, default_author: &str) -> Self {
        Self {
            name: name.to_string(),
            feed_url: feed_url.to_string(),
            fallback_url: None,
            max_items,
            default_author: default_author.to_string(),
        }
    }

    pub fn with_fallback(mut self, url: &str) -> Self {
        self.fallback_url = Some(url.to_string());
        self
    }

    pub fn techcrunch() -> Self {
        Self::new("TechCrunch", "https://techcrunch.com/feed/", 25, "TechCrunch")
    }

    pub fn the_verge() -> Self {
        Self::new("The Verge", "https://www.theverge.com/rss/index.xml", 15, "The Verge Staff")
    }

    pub fn ars_technica() -> Self {
        Self::new(
            "Ars Technica",
            "https://feeds.arstechnica.com/arstechnica/index",
            15,
            "Ars Staff",
        )
    }
}

/// Generic feed-backed source.
pub struct FeedSource {
    spec: FeedSourceSpec,
    normalizer: Normalizer,
    fetcher: Fetcher,
    health: HealthTracker,
}

impl FeedSource {
    pub fn new(spec: FeedSourceSpec, fetch_config: FetchConfig) -> Result<Self> {
        let normalizer = Normalizer::new(&spec.name, &spec.default_author, "Recent");
        Ok(Self {
            fetcher: Fetcher::new(fetch_config)?,
            health: HealthTracker::new(spec.name.clone()),
            normalizer,
            spec,
        })
    }

    pub fn spec(&self) -> &FeedSourceSpec {
        &self.spec
    }

    async fn fetch_feed(&self, url: &str) -> Result<Vec<ArticleRecord>> {
        let body = self.fetcher.get_text(url).await?;
        let raws = FeedParser::parse(&body)?;
        Ok(self.normalizer.normalize_all(raws, self.spec.max_items))
    }
}

#[async_trait]
impl SourceClient for FeedSource {
    fn source_name(&self) -> &str {
        &self.spec.name
    }

    #[instrument(level = "info", skip(self), fields(source = %self.spec.name))]
    async fn fetch(&self, _page_hint: u32) -> Vec<ArticleRecord> {
        let started = Instant::now();
        info!(url = %self.spec.feed_url, "Starting feed fetch");

        let outcome = match &self.spec.fallback_url {
            Some(fallback_url) => {
                with_fallback(
                    &self.spec.name,
                    self.fetch_feed(&self.spec.feed_url),
                    self.fetch_feed(fallback_url),
                )
                .await
            }
            None => primary_only(&self.spec.name, self.fetch_feed(&self.spec.feed_url)).await,
        };

        self.health.settle(started, outcome)
    }

    fn health(&self) -> SourceHealth {
        self.health.snapshot()
    }
}
