use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// One discovered story, normalized to the same shape regardless of origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    pub title: String,
    pub link: String,
    pub score: i64,
    pub author: String,
    pub published_label: String,
    /// Kept as text; always a decimal number or "0".
    pub comment_count: String,
    pub source_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Idle,
    Ok,
    Error,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthStatus::Idle => "idle",
            HealthStatus::Ok => "ok",
            HealthStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Operational status of one source after its most recent run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceHealth {
    pub source_name: String,
    pub status: HealthStatus,
    pub last_run_at: Option<DateTime<Utc>>,
    pub duration_seconds: f64,
    /// Empty unless `status` is `Error`.
    pub last_error: String,
    pub article_count: usize,
}

impl SourceHealth {
    pub fn idle(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            status: HealthStatus::Idle,
            last_run_at: None,
            duration_seconds: 0.0,
            last_error: String::new(),
            article_count: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_attempts: u32,
    pub retry_initial_delay_ms: u64,
    pub retry_multiplier: f64,
    pub max_redirects: usize,
    /// Pause between consecutive page requests to the same paginated source.
    pub page_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            timeout_seconds: 10,
            max_attempts: 3,
            retry_initial_delay_ms: 500,
            retry_multiplier: 2.0,
            max_redirects: 5,
            page_delay_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub cache_ttl: Duration,
    pub max_workers: usize,
    /// Upper bound on how long `run` waits for the whole batch.
    pub batch_timeout: Duration,
    /// Keep the previous non-empty cache when a run produces nothing.
    pub preserve_cache_on_empty: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
            max_workers: 5,
            batch_timeout: Duration::from_secs(60),
            preserve_cache_on_empty: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Request timed out: {url}")]
    Timeout { url: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("no articles in response")]
    EmptyFeed,

    #[error("{primary}; fallback: {fallback}")]
    FallbackFailed { primary: String, fallback: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AggregatorError {
    /// Status codes worth retrying: rate limiting and flaky upstreams.
    pub const TRANSIENT_STATUSES: [u16; 4] = [429, 500, 502, 503];

    pub fn is_transient(&self) -> bool {
        match self {
            AggregatorError::HttpStatus { status, .. } => Self::TRANSIENT_STATUSES.contains(status),
            AggregatorError::Timeout { .. } => true,
            AggregatorError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
