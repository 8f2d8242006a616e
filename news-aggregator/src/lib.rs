pub mod types;
pub mod traits;
pub mod health;
pub mod fetcher;
pub mod parser;
pub mod sources;
pub mod aggregator;
pub mod clustering;
pub mod utils;

pub use types::*;
pub use traits::SourceClient;
pub use health::HealthTracker;
pub use fetcher::{Fetcher, RetryPolicy};
pub use parser::{FeedParser, Normalizer, RawArticle};
pub use sources::{default_sources, FeedSource, FeedSourceSpec, HackerNewsSource, RedditSource};
pub use aggregator::{AggregationCache, Aggregator};
pub use clustering::{ClusterGroup, Clusterer, RelatedArticle, DEFAULT_SIMILARITY_THRESHOLD};
pub use utils::{filter_by_keyword, filter_by_source, sort_articles, trending_topics, SortKey, TrendingTopic};
