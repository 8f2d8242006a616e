use crate::health::HealthTracker;
use crate::parser::{FeedParser, Normalizer, RawArticle};
use crate::sources::with_fallback;
use crate::traits::SourceClient;
use crate::types::{ArticleRecord, FetchConfig, Result, SourceHealth};
use crate::Fetcher;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Instant;
use tracing::{info, instrument};

pub const SOURCE_NAME: &str = "Reddit";
pub const LISTING_URL: &str = "https://www.reddit.com/r/technology/top.json?t=day&limit=25";
pub const FEED_URL: &str = "https://www.reddit.com/r/technology/top/.rss?t=day";
const MAX_ITEMS: usize = 25;

#[derive(Debug, Deserialize)]
pub struct Listing {
    #[serde(default)]
    data: ListingData,
}

#[derive(Debug, Default, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    #[serde(default)]
    data: Post,
}

#[derive(Debug, Default, Deserialize)]
struct Post {
    title: Option<String>,
    url: Option<String>,
    score: Option<i64>,
    author: Option<String>,
    num_comments: Option<u64>,
}

impl Listing {
    pub fn into_raw(self) -> Vec<RawArticle> {
        self.data
            .children
            .into_iter()
            .map(|child| RawArticle {
                title: child.data.title,
                link: child.data.url,
                score: child.data.score,
                author: child.data.author,
                published: Some("Today".to_string()),
                comments: child.data.num_comments.map(|n| n.to_string()),
            })
            .collect()
    }
}

/// r/technology top posts of the day: the JSON listing first, the RSS
/// rendering of the same listing as fallback.
pub struct RedditSource {
    listing_url: String,
    feed_url: String,
    normalizer: Normalizer,
    fetcher: Fetcher,
    health: HealthTracker,
}

impl RedditSource {
    pub fn new(fetch_config: FetchConfig) -> Result<Self> {
        Self::with_urls(LISTING_URL, FEED_URL, fetch_config)
    }

    pub fn with_urls(listing_url: &str, feed_url: &str, fetch_config: FetchConfig) -> Result<Self> {
        url::Url::parse(listing_url)?;
        url::Url::parse(feed_url)?;
        Ok(Self {
            listing_url: listing_url.to_string(),
            feed_url: feed_url.to_string(),
            normalizer: Normalizer::new(SOURCE_NAME, "Unknown", "Today"),
            fetcher: Fetcher::new(fetch_config)?,
            health: HealthTracker::new(SOURCE_NAME),
        })
    }

    async fn fetch_listing(&self) -> Result<Vec<ArticleRecord>> {
        let listing: Listing = self.fetcher.get_json(&self.listing_url).await?;
        Ok(self.normalizer.normalize_all(listing.into_raw(), MAX_ITEMS))
    }

    async fn fetch_feed(&self) -> Result<Vec<ArticleRecord>> {
        let body = self.fetcher.get_text(&self.feed_url).await?;
        let raws = FeedParser::parse(&body)?;
        Ok(self.normalizer.normalize_all(raws, MAX_ITEMS))
    }
}

#[async_trait]
impl SourceClient for RedditSource {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    #[instrument(level = "info", skip(self), fields(source = SOURCE_NAME))]
    async fn fetch(&self, _page_hint: u32) -> Vec<ArticleRecord> {
        let started = Instant::now();
        info!("Starting JSON fetch");

        let outcome = with_fallback(SOURCE_NAME, self.fetch_listing(), self.fetch_feed()).await;

        self.health.settle(started, outcome)
    }

    fn health(&self) -> SourceHealth {
        self.health.snapshot()
    }
}
