use crate::types::{AggregatorError, ArticleRecord};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// English stop words (the NLTK list).
pub const ENGLISH_STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
];

/// Headline filler that says nothing about a topic. Only used for trending.
pub const HEADLINE_FILLER_WORDS: &[&str] = &[
    "new", "says", "first", "get", "one", "two", "could", "would", "also", "may", "use", "using",
    "make", "like", "much", "us", "want", "still", "year", "years", "going", "big", "best", "way",
];

/// Check if a word is a common stop word
pub fn is_stop_word(word: &str) -> bool {
    ENGLISH_STOP_WORDS.contains(&word)
}

fn is_trending_stop_word(word: &str) -> bool {
    is_stop_word(word) || HEADLINE_FILLER_WORDS.contains(&word)
}

/// Case-insensitive title substring match. An empty keyword keeps everything.
pub fn filter_by_keyword(articles: &[ArticleRecord], keyword: &str) -> Vec<ArticleRecord> {
    let needle = keyword.trim().to_lowercase();
    if needle.is_empty() {
        return articles.to_vec();
    }
    articles
        .iter()
        .filter(|a| a.title.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Exact source match; "all" or an empty filter keeps everything.
pub fn filter_by_source(articles: &[ArticleRecord], source: &str) -> Vec<ArticleRecord> {
    let source = source.trim();
    if source.is_empty() || source.eq_ignore_ascii_case("all") {
        return articles.to_vec();
    }
    articles
        .iter()
        .filter(|a| a.source_name == source)
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Score,
    Comments,
    /// Keep aggregation order (grouped by source).
    Source,
}

impl FromStr for SortKey {
    type Err = AggregatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "score" => Ok(SortKey::Score),
            "comments" => Ok(SortKey::Comments),
            "source" => Ok(SortKey::Source),
            other => Err(AggregatorError::Config(format!(
                "unknown sort key '{other}' (expected score, comments or source)"
            ))),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SortKey::Score => "score",
            SortKey::Comments => "comments",
            SortKey::Source => "source",
        };
        f.write_str(s)
    }
}

fn comment_total(article: &ArticleRecord) -> u64 {
    article.comment_count.parse().unwrap_or(0)
}

/// Stable descending sort by the chosen key.
pub fn sort_articles(mut articles: Vec<ArticleRecord>, key: SortKey) -> Vec<ArticleRecord> {
    match key {
        SortKey::Score => articles.sort_by(|a, b| b.score.cmp(&a.score)),
        SortKey::Comments => articles.sort_by_key(|a| std::cmp::Reverse(comment_total(a))),
        SortKey::Source => {}
    }
    articles
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TrendingTopic {
    pub topic: String,
    pub count: usize,
}

fn title_words(title: &str) -> Vec<String> {
    title
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| w.len() >= 3 && !is_trending_stop_word(w))
        .map(str::to_string)
        .collect()
}

/// Most frequent words and adjacent word pairs across titles. Only topics
/// seen at least twice are reported. Filters the English stop words plus
/// [`HEADLINE_FILLER_WORDS`], so it is stricter than the clustering tokenizer.
pub fn trending_topics<S: AsRef<str>>(titles: &[S], limit: usize) -> Vec<TrendingTopic> {
    // Insertion order breaks count ties.
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut bump = |term: String| match index.get(&term) {
        Some(&i) => counts[i].1 += 1,
        None => {
            index.insert(term.clone(), counts.len());
            counts.push((term, 1));
        }
    };

    let words: Vec<Vec<String>> = titles.iter().map(|t| title_words(t.as_ref())).collect();
    for title in &words {
        for word in title {
            bump(word.clone());
        }
    }
    for title in &words {
        for pair in title.windows(2) {
            bump(format!("{} {}", pair[0], pair[1]));
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(limit)
        .filter(|(_, count)| *count >= 2)
        .map(|(topic, count)| TrendingTopic { topic, count })
        .collect()
}

/// Truncate to at most `max` characters, for fixed-width table output.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
