use crate::types::{AggregatorError, ArticleRecord, Result};
use feed_rs::parser;
use tracing::debug;

/// Marker some sites show instead of a comment count on fresh stories.
pub const NO_DISCUSSION_MARKER: &str = "discuss";

/// Source-supplied fields before normalization. Anything may be missing.
#[derive(Debug, Default, Clone)]
pub struct RawArticle {
    pub title: Option<String>,
    pub link: Option<String>,
    pub score: Option<i64>,
    pub author: Option<String>,
    pub published: Option<String>,
    pub comments: Option<String>,
}

/// Per-source defaults applied while normalizing.
#[derive(Debug, Clone)]
pub struct Normalizer {
    pub source_name: String,
    pub default_author: String,
    pub default_published: String,
}

impl Normalizer {
    pub fn new(source_name: &str, default_author: &str, default_published: &str) -> Self {
        Self {
            source_name: source_name.to_string(),
            default_author: default_author.to_string(),
            default_published: default_published.to_string(),
        }
    }

    /// Returns `None` when the entry has no usable title or link.
    pub fn normalize(&self, raw: RawArticle) -> Option<ArticleRecord> {
        let title = non_blank(raw.title)?;
        let link = non_blank(raw.link)?;

        Some(ArticleRecord {
            title,
            link,
            score: raw.score.unwrap_or(0),
            author: non_blank(raw.author).unwrap_or_else(|| self.default_author.clone()),
            published_label: non_blank(raw.published).unwrap_or_else(|| self.default_published.clone()),
            comment_count: normalize_comment_count(raw.comments.as_deref()),
            source_name: self.source_name.clone(),
        })
    }

    pub fn normalize_all(&self, raws: impl IntoIterator<Item = RawArticle>, cap: usize) -> Vec<ArticleRecord> {
        let mut out = Vec::new();
        for raw in raws {
            if out.len() >= cap {
                break;
            }
            match self.normalize(raw) {
                Some(article) => out.push(article),
                None => debug!(source = %self.source_name, "Dropping entry without title or link"),
            }
        }
        out
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
}

/// Missing, unparseable, and "discuss" all become "0".
pub fn normalize_comment_count(raw: Option<&str>) -> String {
    let Some(token) = raw.and_then(|s| s.split_whitespace().next()) else {
        return "0".to_string();
    };
    if token.eq_ignore_ascii_case(NO_DISCUSSION_MARKER) {
        return "0".to_string();
    }
    token
        .parse::<u64>()
        .map(|n| n.to_string())
        .unwrap_or_else(|_| "0".to_string())
}

/// Pull the value following `label` in a feed description such as
/// `<p>Points: 42</p>`, stopping at the next tag.
pub fn labelled_value<'a>(description: &'a str, label: &str) -> Option<&'a str> {
    let (_, rest) = description.split_once(label)?;
    let value = rest.split('<').next()?.trim();
    (!value.is_empty()).then_some(value)
}

/// RSS / Atom parsing via feed-rs.
pub struct FeedParser;

impl FeedParser {
    pub fn parse(content: &str) -> Result<Vec<RawArticle>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| AggregatorError::Parse(format!("Failed to parse feed: {e}")))?;

        Ok(feed.entries.into_iter().map(Self::raw_entry).collect())
    }

    fn raw_entry(entry: feed_rs::model::Entry) -> RawArticle {
        let summary = entry.summary.map(|s| s.content);
        let published = entry.published.or(entry.updated).map(|dt| dt.to_rfc2822());

        RawArticle {
            title: entry.title.map(|t| t.content),
            link: entry.links.first().map(|l| l.href.clone()),
            score: summary
                .as_deref()
                .and_then(|d| labelled_value(d, "Points:"))
                .and_then(|v| v.parse().ok()),
            author: entry.authors.first().map(|a| a.name.clone()),
            published,
            comments: summary
                .as_deref()
                .and_then(|d| labelled_value(d, "Comments:"))
                .map(str::to_string),
        }
    }
}
