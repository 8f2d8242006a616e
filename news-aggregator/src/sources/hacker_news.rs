//! Hacker News: the hnrss.org front-page feed first, then the site's own
//! HTML listing (which is the only strategy that honours `page_hint`).

use crate::health::HealthTracker;
use crate::parser::{FeedParser, Normalizer, RawArticle};
use crate::sources::with_fallback;
use crate::traits::SourceClient;
use crate::types::{AggregatorError, ArticleRecord, FetchConfig, Result, SourceHealth};
use crate::Fetcher;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};
use url::Url;

pub const SOURCE_NAME: &str = "Hacker News";
pub const FEED_URL: &str = "https://hnrss.org/frontpage?count=30";
pub const SITE_URL: &str = "https://news.ycombinator.com/news";
const SITE_BASE: &str = "https://news.ycombinator.com/";
const MAX_FEED_ITEMS: usize = 30;

pub struct HackerNewsSource {
    feed_url: String,
    site_url: String,
    normalizer: Normalizer,
    fetcher: Fetcher,
    health: HealthTracker,
}

impl HackerNewsSource {
    pub fn new(fetch_config: FetchConfig) -> Result<Self> {
        Self::with_urls(FEED_URL, SITE_URL, fetch_config)
    }

    /// Point the source at alternate endpoints (mirrors, local fixtures).
    pub fn with_urls(feed_url: &str, site_url: &str, fetch_config: FetchConfig) -> Result<Self> {
        Url::parse(feed_url)?;
        Url::parse(site_url)?;
        Ok(Self {
            feed_url: feed_url.to_string(),
            site_url: site_url.to_string(),
            normalizer: Normalizer::new(SOURCE_NAME, "Unknown", "Recent"),
            fetcher: Fetcher::new(fetch_config)?,
            health: HealthTracker::new(SOURCE_NAME),
        })
    }

    async fn fetch_feed(&self) -> Result<Vec<ArticleRecord>> {
        let body = self.fetcher.get_text(&self.feed_url).await?;
        let raws = FeedParser::parse(&body)?;
        Ok(self.normalizer.normalize_all(raws, MAX_FEED_ITEMS))
    }

    async fn fetch_listing(&self, pages: u32) -> Result<Vec<ArticleRecord>> {
        let pages = pages.max(1);
        let pause = Duration::from_millis(self.fetcher.config().page_delay_ms);
        let mut articles = Vec::new();

        for page in 1..=pages {
            let url = format!("{}?p={}", self.site_url, page);
            match self.fetcher.get_text(&url).await {
                Ok(html) => {
                    let raws = parse_listing(&html)?;
                    articles.extend(raws.into_iter().filter_map(|raw| self.normalizer.normalize(raw)));
                }
                // Keep what earlier pages produced.
                Err(e) if !articles.is_empty() => {
                    warn!(page, error = %e, "Listing page failed, keeping earlier pages");
                    break;
                }
                Err(e) => return Err(e),
            }
            if page < pages {
                tokio::time::sleep(pause).await;
            }
        }

        Ok(articles)
    }
}

#[async_trait]
impl SourceClient for HackerNewsSource {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    fn paginates(&self) -> bool {
        true
    }

    #[instrument(level = "info", skip(self), fields(source = SOURCE_NAME))]
    async fn fetch(&self, page_hint: u32) -> Vec<ArticleRecord> {
        let started = Instant::now();
        info!("Starting RSS fetch");

        let outcome = with_fallback(SOURCE_NAME, self.fetch_feed(), self.fetch_listing(page_hint)).await;

        self.health.settle(started, outcome)
    }

    fn health(&self) -> SourceHealth {
        self.health.snapshot()
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AggregatorError::Parse(format!("invalid selector {css}: {e}")))
}

/// Extract stories from one page of the HN listing. Rows that don't have the
/// expected shape are skipped.
pub fn parse_listing(html: &str) -> Result<Vec<RawArticle>> {
    let document = Html::parse_document(html);
    let row_sel = selector("tr.athing")?;
    let title_sel = selector("span.titleline > a")?;
    let subtext_sel = selector("td.subtext")?;
    let score_sel = selector("span.score")?;
    let user_sel = selector("a.hnuser")?;
    let age_sel = selector("span.age")?;
    let link_sel = selector("a")?;

    let mut out = Vec::new();
    for row in document.select(&row_sel) {
        let Some(anchor) = row.select(&title_sel).next() else {
            continue;
        };
        let title = anchor.text().collect::<String>();
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let link = if href.starts_with("http") {
            href.to_string()
        } else {
            format!("{SITE_BASE}{}", href.trim_start_matches('/'))
        };

        let subtext = row
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .next()
            .and_then(|meta| meta.select(&subtext_sel).next());

        let mut raw = RawArticle {
            title: Some(title),
            link: Some(link),
            published: Some("Unknown".to_string()),
            ..Default::default()
        };

        if let Some(subtext) = subtext {
            raw.score = subtext
                .select(&score_sel)
                .next()
                .and_then(|s| s.text().collect::<String>().split_whitespace().next().map(str::to_string))
                .and_then(|s| s.parse().ok());
            raw.author = subtext.select(&user_sel).next().map(|a| a.text().collect());
            if let Some(age) = subtext.select(&age_sel).next() {
                raw.published = Some(age.text().collect());
            }
            raw.comments = subtext
                .select(&link_sel)
                .map(|a| a.text().collect::<String>())
                .find(|text| text.contains("comment") || text.trim() == "discuss");
        }

        out.push(raw);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"<html><body><table>
<tr class="athing" id="1">
  <td class="title"><span class="titleline"><a href="https://example.com/m4">Apple unveils new M4 chip</a></span></td>
</tr>
<tr><td class="subtext">
  <span class="score">312 points</span> by <a class="hnuser">pg</a>
  <span class="age"><a>3 hours ago</a></span> | <a href="hide">hide</a> | <a href="item?id=1">128&nbsp;comments</a>
</td></tr>
<tr class="athing" id="2">
  <td class="title"><span class="titleline"><a href="item?id=2">Ask HN: Favourite editor?</a></span></td>
</tr>
<tr><td class="subtext">
  <span class="score">5 points</span> by <a class="hnuser">dang</a>
  <span class="age"><a>1 minute ago</a></span> | <a href="item?id=2">discuss</a>
</td></tr>
<tr class="athing" id="3">
  <td class="title"><span class="titleline"><a href="https://example.com/job">Acme is hiring</a></span></td>
</tr>
<tr><td class="subtext"><span class="age"><a>2 days ago</a></span></td></tr>
</table></body></html>"#;

    #[test]
    fn parses_listing_rows() {
        let n = Normalizer::new(SOURCE_NAME, "Unknown", "Recent");
        let articles: Vec<_> = parse_listing(LISTING)
            .unwrap()
            .into_iter()
            .filter_map(|r| n.normalize(r))
            .collect();
        assert_eq!(articles.len(), 3);

        assert_eq!(articles[0].title, "Apple unveils new M4 chip");
        assert_eq!(articles[0].score, 312);
        assert_eq!(articles[0].author, "pg");
        assert_eq!(articles[0].published_label, "3 hours ago");
        assert_eq!(articles[0].comment_count, "128");

        assert_eq!(articles[1].link, "https://news.ycombinator.com/item?id=2");
        assert_eq!(articles[1].comment_count, "0");

        assert_eq!(articles[2].score, 0);
        assert_eq!(articles[2].author, "Unknown");
        assert_eq!(articles[2].comment_count, "0");
        assert!(articles.iter().all(|a| a.source_name == SOURCE_NAME));
    }

    #[test]
    fn empty_page_yields_nothing() {
        assert!(parse_listing("<html><body></body></html>").unwrap().is_empty());
    }
}
