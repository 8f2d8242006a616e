use crate::sources::default_sources;
use crate::traits::SourceClient;
use crate::types::{AggregatorConfig, ArticleRecord, FetchConfig, Result, SourceHealth};
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Result set of one completed aggregation run.
#[derive(Debug, Clone)]
pub struct AggregationCache {
    pub run_id: Uuid,
    pub articles: Vec<ArticleRecord>,
    pub captured_at: DateTime<Utc>,
    pub pages_requested: u32,
    captured: Instant,
}

impl AggregationCache {
    fn new(run_id: Uuid, articles: Vec<ArticleRecord>, pages_requested: u32) -> Self {
        Self {
            run_id,
            articles,
            captured_at: Utc::now(),
            pages_requested,
            captured: Instant::now(),
        }
    }

    pub fn age(&self) -> Duration {
        self.captured.elapsed()
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        !self.articles.is_empty() && self.age() < ttl
    }
}

/// Runs every registered source concurrently and caches the merged result.
pub struct Aggregator {
    sources: Vec<Arc<dyn SourceClient>>,
    config: AggregatorConfig,
    workers: Arc<Semaphore>,
    cache: RwLock<Option<Arc<AggregationCache>>>,
    refresh_gate: Mutex<()>,
}

impl Aggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        let workers = Arc::new(Semaphore::new(config.max_workers.max(1)));
        Self {
            sources: Vec::new(),
            config,
            workers,
            cache: RwLock::new(None),
            refresh_gate: Mutex::new(()),
        }
    }

    pub fn with_sources(config: AggregatorConfig, sources: Vec<Arc<dyn SourceClient>>) -> Self {
        let mut aggregator = Self::new(config);
        aggregator.sources = sources;
        aggregator
    }

    pub fn with_default_sources(config: AggregatorConfig, fetch_config: &FetchConfig) -> Result<Self> {
        Ok(Self::with_sources(config, default_sources(fetch_config)?))
    }

    /// Sources run and report in registration order.
    pub fn register(&mut self, source: Arc<dyn SourceClient>) {
        self.sources.push(source);
    }

    pub fn sources(&self) -> &[Arc<dyn SourceClient>] {
        &self.sources
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn cache_snapshot(&self) -> Option<Arc<AggregationCache>> {
        match self.cache.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn fresh_cache(&self) -> Option<Arc<AggregationCache>> {
        self.cache_snapshot().filter(|cache| cache.is_fresh(self.config.cache_ttl))
    }

    fn replace_cache(&self, cache: AggregationCache) {
        let mut guard = match self.cache.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(Arc::new(cache));
    }

    /// Fetch from every source, or serve the cached batch while it is younger
    /// than the TTL. Never fails: a run where nothing worked is just empty.
    #[instrument(level = "info", skip(self))]
    pub async fn run(&self, page_hint: u32, force_refresh: bool) -> Vec<ArticleRecord> {
        if !force_refresh {
            if let Some(cache) = self.fresh_cache() {
                self.log_cache_hit(&cache);
                return cache.articles.clone();
            }
        }

        let _gate = self.refresh_gate.lock().await;

        // Another caller may have refreshed while we waited on the gate.
        if !force_refresh {
            if let Some(cache) = self.fresh_cache() {
                self.log_cache_hit(&cache);
                return cache.articles.clone();
            }
        }

        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let articles = self.fan_out(page_hint, run_id).await;

        info!(
            %run_id,
            count = articles.len(),
            sources = self.sources.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Aggregation run finished"
        );

        let keep_previous = articles.is_empty()
            && self.config.preserve_cache_on_empty
            && self.cache_snapshot().is_some_and(|c| !c.articles.is_empty());
        if keep_previous {
            warn!(%run_id, "Run produced no articles; keeping previous cache");
        } else {
            self.replace_cache(AggregationCache::new(run_id, articles.clone(), page_hint));
        }

        articles
    }

    /// Latest health of every source, in registration order.
    pub fn health(&self) -> Vec<SourceHealth> {
        self.sources.iter().map(|source| source.health()).collect()
    }

    fn log_cache_hit(&self, cache: &AggregationCache) {
        let remaining = self.config.cache_ttl.saturating_sub(cache.age());
        info!(
            run_id = %cache.run_id,
            remaining_secs = remaining.as_secs(),
            count = cache.articles.len(),
            "Cache still valid, skipping fetch"
        );
    }

    async fn fan_out(&self, page_hint: u32, run_id: Uuid) -> Vec<ArticleRecord> {
        let deadline = tokio::time::Instant::now() + self.config.batch_timeout;

        let handles: Vec<(String, JoinHandle<Vec<ArticleRecord>>)> = self
            .sources
            .iter()
            .map(|source| {
                let source = Arc::clone(source);
                let workers = Arc::clone(&self.workers);
                let pages = if source.paginates() { page_hint } else { 1 };
                let name = source.source_name().to_string();

                let handle = tokio::spawn(async move {
                    let Ok(_permit) = workers.acquire_owned().await else {
                        return Vec::new();
                    };
                    source.fetch(pages).await
                });
                (name, handle)
            })
            .collect();

        // Join in registration order so output order never depends on timing.
        let mut merged = Vec::new();
        for (name, handle) in handles {
            match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(mut articles)) => merged.append(&mut articles),
                Ok(Err(e)) => error!(%run_id, source = %name, error = %e, "Source task failed"),
                Err(_) => warn!(
                    %run_id,
                    source = %name,
                    "Source missed the batch deadline; its results are dropped from this run"
                ),
            }
        }
        merged
    }
}
