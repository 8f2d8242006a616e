//! Groups near-duplicate headlines from different sources.
//!
//! Articles are ranked by score, then each unclaimed article in turn becomes a
//! parent and claims every other unclaimed article whose title tokens overlap
//! enough (Jaccard similarity). Articles sharing a link with a group member
//! always join that group. The pass is O(n²) in the number of articles,
//! which is fine for the tens-to-hundreds of headlines a single request sees
//! but will not scale to large archives.

use crate::types::ArticleRecord;
use crate::utils::ENGLISH_STOP_WORDS;
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

/// Threshold the dashboard used when rendering grouped stories.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedArticle {
    pub article: ArticleRecord,
    /// Similarity to the parent, rounded to two decimals.
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterGroup {
    pub parent: ArticleRecord,
    pub related: Vec<RelatedArticle>,
}

impl ClusterGroup {
    /// Parent plus related members.
    pub fn len(&self) -> usize {
        1 + self.related.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn articles(&self) -> impl Iterator<Item = &ArticleRecord> {
        std::iter::once(&self.parent).chain(self.related.iter().map(|r| &r.article))
    }
}

/// Stateless between calls; safe to share across threads.
#[derive(Debug, Clone)]
pub struct Clusterer {
    stop_words: HashSet<String>,
}

impl Default for Clusterer {
    fn default() -> Self {
        Self::new()
    }
}

impl Clusterer {
    pub fn new() -> Self {
        Self::with_stop_words(ENGLISH_STOP_WORDS.iter().copied())
    }

    pub fn with_stop_words<'a>(words: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            stop_words: words.into_iter().map(str::to_lowercase).collect(),
        }
    }

    /// Lowercase, strip punctuation, drop stop words and tokens of two
    /// characters or fewer. Tokens made only of decimal digits always survive.
    pub fn tokenize(&self, title: &str) -> HashSet<String> {
        let cleaned: String = title
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
            .collect();

        cleaned
            .split_whitespace()
            .filter(|token| !self.stop_words.contains(*token))
            .filter(|token| token.chars().count() > 2 || token.chars().all(|c| c.is_ascii_digit()))
            .map(str::to_string)
            .collect()
    }

    /// Partition `articles` into parent/related groups.
    pub fn group(&self, articles: &[ArticleRecord], threshold: f64) -> Vec<ClusterGroup> {
        if articles.is_empty() {
            return Vec::new();
        }

        // Stable: equal scores keep their input order.
        let mut ranked: Vec<&ArticleRecord> = articles.iter().collect();
        ranked.sort_by(|a, b| b.score.cmp(&a.score));

        let tokens: Vec<HashSet<String>> = ranked.iter().map(|a| self.tokenize(&a.title)).collect();
        let mut assigned = vec![false; ranked.len()];
        let mut groups = Vec::new();

        for i in 0..ranked.len() {
            if assigned[i] {
                continue;
            }
            assigned[i] = true;

            let mut related = Vec::new();
            let mut links: HashSet<&str> = HashSet::from([ranked[i].link.as_str()]);
            for j in (i + 1)..ranked.len() {
                if assigned[j] {
                    continue;
                }
                // A link already in this group is the same story under another headline.
                let same_link = links.contains(ranked[j].link.as_str());
                let similarity = if same_link {
                    1.0
                } else {
                    jaccard_similarity(&tokens[i], &tokens[j])
                };
                if same_link || similarity >= threshold {
                    assigned[j] = true;
                    links.insert(ranked[j].link.as_str());
                    related.push(RelatedArticle {
                        article: ranked[j].clone(),
                        similarity: (similarity * 100.0).round() / 100.0,
                    });
                }
            }

            // Earlier candidates skipped before a matching link joined.
            for k in (i + 1)..ranked.len() {
                if !assigned[k] && links.contains(ranked[k].link.as_str()) {
                    assigned[k] = true;
                    related.push(RelatedArticle {
                        article: ranked[k].clone(),
                        similarity: 1.0,
                    });
                }
            }

            groups.push(ClusterGroup {
                parent: ranked[i].clone(),
                related,
            });
        }

        debug!(articles = articles.len(), groups = groups.len(), threshold, "Clustered articles");
        groups
    }
}

/// |A ∩ B| / |A ∪ B|, defined as 0.0 when both sets are empty.
pub fn jaccard_similarity(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}
