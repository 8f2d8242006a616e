use anyhow::Context;
use clap::Parser;
use news_aggregator::utils::truncate_chars;
use news_aggregator::{
    filter_by_keyword, filter_by_source, sort_articles, trending_topics, Aggregator, AggregatorConfig,
    ArticleRecord, ClusterGroup, Clusterer, FetchConfig, SortKey, SourceHealth, TrendingTopic,
    DEFAULT_SIMILARITY_THRESHOLD,
};
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "news-aggregator", about = "Aggregate and cluster tech headlines from several sources")]
struct Cli {
    /// Pages to request from sources that paginate
    #[arg(long, env = "NEWS_PAGES", default_value_t = 1)]
    pages: u32,

    /// Ignore the cache for the first run
    #[arg(long)]
    force: bool,

    /// Minimum title similarity for two articles to share a group
    #[arg(long, env = "NEWS_CLUSTER_THRESHOLD", default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
    threshold: f64,

    /// Only keep articles whose title contains this text
    #[arg(long, default_value = "")]
    keyword: String,

    /// Only keep articles from this source ("all" keeps everything)
    #[arg(long, default_value = "all")]
    source: String,

    /// score, comments or source
    #[arg(long, default_value = "score")]
    sort: SortKey,

    /// Maximum number of groups to print
    #[arg(long, default_value_t = 50)]
    limit: usize,

    /// Print a JSON report instead of a table
    #[arg(long)]
    json: bool,

    /// Print per-source health after each run
    #[arg(long)]
    health: bool,

    /// Re-run with a forced refresh every N seconds
    #[arg(long)]
    watch_secs: Option<u64>,

    /// Per-request timeout
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Maximum sources fetched at once
    #[arg(long, default_value_t = 5)]
    workers: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report<'a> {
    article_count: usize,
    groups: &'a [ClusterGroup],
    trending: &'a [TrendingTopic],
    #[serde(skip_serializing_if = "Option::is_none")]
    health: Option<&'a [SourceHealth]>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if !(0.0..=1.0).contains(&cli.threshold) {
        anyhow::bail!("--threshold must be between 0 and 1, got {}", cli.threshold);
    }

    let fetch_config = FetchConfig {
        timeout_seconds: cli.timeout_secs,
        ..FetchConfig::default()
    };
    let config = AggregatorConfig {
        max_workers: cli.workers.max(1),
        ..AggregatorConfig::default()
    };
    let aggregator = Aggregator::with_default_sources(config, &fetch_config)
        .context("Failed to set up sources")?;
    let clusterer = Clusterer::new();

    info!(sources = aggregator.sources().len(), pages = cli.pages, "Starting news aggregator");

    let mut force = cli.force;
    loop {
        let articles = aggregator.run(cli.pages, force).await;
        if let Err(e) = report(&cli, &aggregator, &clusterer, articles) {
            error!(error = %e, "Failed to render report");
        }

        let Some(secs) = cli.watch_secs else {
            break;
        };
        force = true;
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(secs.max(1))) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    Ok(())
}

fn report(cli: &Cli, aggregator: &Aggregator, clusterer: &Clusterer, articles: Vec<ArticleRecord>) -> anyhow::Result<()> {
    let total = articles.len();
    let filtered = filter_by_source(&filter_by_keyword(&articles, &cli.keyword), &cli.source);
    let sorted = sort_articles(filtered, cli.sort);

    let mut groups = clusterer.group(&sorted, cli.threshold);
    // Grouping ranks by score; keep the user's order for the other keys.
    if cli.sort != SortKey::Score {
        let position = |parent: &ArticleRecord| sorted.iter().position(|a| a == parent).unwrap_or(usize::MAX);
        groups.sort_by_key(|g| position(&g.parent));
    }
    groups.truncate(cli.limit);

    let titles: Vec<&str> = sorted.iter().map(|a| a.title.as_str()).collect();
    let trending = trending_topics(&titles, 10);
    let health = aggregator.health();

    if cli.json {
        let report = Report {
            article_count: sorted.len(),
            groups: &groups,
            trending: &trending,
            health: cli.health.then_some(health.as_slice()),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} articles ({} after filters), {} groups", total, sorted.len(), groups.len());
    println!("{:<12} | {:>5} | {:>5} | Title", "Source", "Score", "Cmts");
    println!("{}", "-".repeat(80));
    for group in &groups {
        let parent = &group.parent;
        let extra = if group.related.is_empty() {
            String::new()
        } else {
            format!("  (+{} related)", group.related.len())
        };
        println!(
            "{:<12} | {:>5} | {:>5} | {}{}",
            truncate_chars(&parent.source_name, 12),
            parent.score,
            parent.comment_count,
            truncate_chars(&parent.title, 70),
            extra
        );
        for related in &group.related {
            println!(
                "{:<12} | {:>5} | {:>5} |   ~ {} [{:.2}]",
                truncate_chars(&related.article.source_name, 12),
                related.article.score,
                related.article.comment_count,
                truncate_chars(&related.article.title, 66),
                related.similarity
            );
        }
    }

    if !trending.is_empty() {
        let topics: Vec<String> = trending.iter().map(|t| format!("{} ({})", t.topic, t.count)).collect();
        println!("\nTrending: {}", topics.join(", "));
    }

    if cli.health {
        println!("\n{:<12} | {:<6} | {:>6} | {:>7} | Last error", "Source", "Status", "Count", "Secs");
        for h in &health {
            println!(
                "{:<12} | {:<6} | {:>6} | {:>7.2} | {}",
                truncate_chars(&h.source_name, 12),
                h.status,
                h.article_count,
                h.duration_seconds,
                h.last_error
            );
        }
    }

    Ok(())
}
