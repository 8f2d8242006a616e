use crate::types::{AggregatorError, FetchConfig, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Bounded retry with exponential backoff for transient failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.retry_initial_delay_ms),
            multiplier: config.retry_multiplier,
        }
    }

    fn backoff(&self) -> ExponentialBackoff<backoff::SystemClock> {
        ExponentialBackoff {
            current_interval: self.initial_delay,
            initial_interval: self.initial_delay,
            randomization_factor: 0.0,
            multiplier: self.multiplier,
            max_interval: self.initial_delay.saturating_mul(32),
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    /// Delays slept between attempts when every attempt fails transiently.
    pub fn schedule(&self) -> Vec<Duration> {
        let mut backoff = self.backoff();
        (1..self.max_attempts)
            .filter_map(|_| backoff.next_backoff())
            .collect()
    }

    /// Run `op` until it succeeds, fails permanently, or the attempt budget is spent.
    pub async fn run<T, F, Fut>(&self, target: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut backoff = self.backoff();
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = backoff.next_backoff().unwrap_or(self.initial_delay);
                    warn!(
                        attempt,
                        max = max_attempts,
                        ?delay,
                        error = %e,
                        target,
                        "Transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if e.is_transient() {
                        error!(attempts = attempt, error = %e, target, "Retries exhausted");
                    }
                    return Err(e);
                }
            }
        }
    }
}

/// HTTP client shared by a source's outbound calls.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;
        let policy = RetryPolicy::from_config(&config);

        Ok(Self { client, config, policy })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        let start = Instant::now();
        let body = self.policy.run(url, || self.get_once(url)).await?;
        debug!(
            url,
            bytes = body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fetched"
        );
        Ok(body)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body).map_err(|e| AggregatorError::Parse(format!("invalid JSON from {url}: {e}")))
    }

    async fn get_once(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await.map_err(|e| classify(e, url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AggregatorError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.text().await.map_err(|e| classify(e, url))
    }
}

fn classify(e: reqwest::Error, url: &str) -> AggregatorError {
    if e.is_timeout() {
        AggregatorError::Timeout { url: url.to_string() }
    } else {
        AggregatorError::Http(e)
    }
}
