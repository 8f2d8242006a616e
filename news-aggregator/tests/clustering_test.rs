use news_aggregator::clustering::jaccard_similarity;
use news_aggregator::{ArticleRecord, Clusterer, DEFAULT_SIMILARITY_THRESHOLD};
use std::collections::HashSet;

fn article(title: &str, score: i64, source: &str) -> ArticleRecord {
    ArticleRecord {
        title: title.to_string(),
        link: format!("https://{}.example/{}", source.to_lowercase(), title.replace(' ', "-")),
        score,
        author: "Unknown".to_string(),
        published_label: "Recent".to_string(),
        comment_count: "0".to_string(),
        source_name: source.to_string(),
    }
}

fn headlines() -> Vec<ArticleRecord> {
    vec![
        article("Apple unveils new M4 chip", 120, "HN"),
        article("SpaceX launches satellite", 300, "Reddit"),
        article("Apple announces M4 chip today", 80, "Verge"),
        article("Local bakery wins award", 5, "Ars"),
        article("SpaceX launches another Starlink satellite", 40, "TechCrunch"),
        article("Rust 1.80 released", 60, "HN"),
        article("Rust 1.80 released with new features", 20, "Reddit"),
        article("", 0, "Empty"),
    ]
}

#[test]
fn groups_partition_the_input() {
    let articles = headlines();
    let groups = Clusterer::new().group(&articles, DEFAULT_SIMILARITY_THRESHOLD);

    let total: usize = groups.iter().map(|g| g.len()).sum();
    assert_eq!(total, articles.len());

    let mut seen = HashSet::new();
    for link in groups.iter().flat_map(|g| g.articles()).map(|a| a.link.as_str()) {
        assert!(seen.insert(link), "{link} appears twice");
    }
}

#[test]
fn same_story_from_two_sources_is_grouped() {
    let articles = vec![
        article("Apple unveils new M4 chip", 10, "HN"),
        article("Apple announces M4 chip today", 5, "Verge"),
    ];
    let groups = Clusterer::new().group(&articles, 0.2);

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].parent.title, "Apple unveils new M4 chip");
    assert_eq!(groups[0].related.len(), 1);
    assert_eq!(groups[0].related[0].similarity, 0.33);
}

#[test]
fn unrelated_stories_stay_apart() {
    let articles = vec![
        article("SpaceX launches satellite", 10, "HN"),
        article("Local bakery wins award", 5, "Ars"),
    ];
    let groups = Clusterer::new().group(&articles, 0.2);

    assert_eq!(groups.len(), 2);
    assert!(groups.iter().all(|g| g.related.is_empty()));
}

#[test]
fn highest_score_becomes_parent() {
    let articles = vec![
        article("Rust 1.80 released with new features", 20, "Reddit"),
        article("Rust 1.80 released", 60, "HN"),
    ];
    let groups = Clusterer::new().group(&articles, 0.2);

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].parent.source_name, "HN");
    assert_eq!(groups[0].related[0].article.source_name, "Reddit");
}

#[test]
fn equal_scores_keep_input_order() {
    let articles = vec![
        article("Quantum networking milestone", 7, "A"),
        article("Browser engine rewrite ships", 7, "B"),
        article("Solar panel efficiency record", 7, "C"),
    ];
    let groups = Clusterer::new().group(&articles, 0.2);
    let parents: Vec<_> = groups.iter().map(|g| g.parent.source_name.as_str()).collect();

    assert_eq!(parents, ["A", "B", "C"]);
}

#[test]
fn every_qualifying_candidate_joins_the_first_parent() {
    let articles = vec![
        article("OpenAI model launch", 100, "A"),
        article("OpenAI model launch delayed", 50, "B"),
        article("OpenAI launch event", 40, "C"),
    ];
    let groups = Clusterer::new().group(&articles, 0.2);

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 3);
    let related: Vec<_> = groups[0].related.iter().map(|r| r.article.source_name.as_str()).collect();
    assert_eq!(related, ["B", "C"]);
}

#[test]
fn threshold_of_one_only_groups_identical_token_sets() {
    let articles = vec![
        article("Rust 1.80 released!", 10, "A"),
        article("rust 1.80 released", 5, "B"),
        article("Rust 1.80 released with new features", 1, "C"),
    ];
    let groups = Clusterer::new().group(&articles, 1.0);

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].related.len(), 1);
    assert_eq!(groups[0].related[0].similarity, 1.0);
}

#[test]
fn titles_without_tokens_never_match() {
    let articles = vec![article("The", 2, "A"), article("An", 1, "B")];
    let groups = Clusterer::new().group(&articles, 0.0);

    // Similarity 0.0 still meets a zero threshold.
    assert_eq!(groups.len(), 1);

    let groups = Clusterer::new().group(&articles, 0.01);
    assert_eq!(groups.len(), 2);
}

fn linked(title: &str, link: &str, score: i64, source: &str) -> ArticleRecord {
    ArticleRecord {
        link: link.to_string(),
        ..article(title, score, source)
    }
}

#[test]
fn same_link_under_different_headlines_is_one_group() {
    let articles = vec![
        linked("Show HN: I built a tiny database engine", "https://example.com/db", 200, "HN"),
        linked("Developer releases minimalist storage layer", "https://example.com/db", 900, "Reddit"),
    ];
    let groups = Clusterer::new().group(&articles, 0.2);

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].parent.source_name, "Reddit");
    assert_eq!(groups[0].related.len(), 1);
    assert_eq!(groups[0].related[0].similarity, 1.0);
}

#[test]
fn duplicate_link_follows_a_related_member() {
    let articles = vec![
        linked("Rust 1.80 released", "https://example.com/rust", 100, "HN"),
        linked("Bakery wins award", "https://example.com/shared", 50, "Ars"),
        linked("Rust 1.80 released today", "https://example.com/shared", 10, "Reddit"),
    ];
    let groups = Clusterer::new().group(&articles, 0.2);

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 3);
    let related: Vec<_> = groups[0].related.iter().map(|r| r.article.source_name.as_str()).collect();
    assert_eq!(related, ["Reddit", "Ars"]);
    assert_eq!(groups[0].related[1].similarity, 1.0);
}

#[test]
fn links_stay_unique_across_groups_with_repeats() {
    let mut articles = headlines();
    let apple = articles[0].link.clone();
    let bakery = articles[3].link.clone();
    articles.push(linked("Completely different words here", &apple, 1, "Dup"));
    articles.push(linked("Yet another unrelated headline", &bakery, 500, "Dup"));
    let groups = Clusterer::new().group(&articles, DEFAULT_SIMILARITY_THRESHOLD);

    let total: usize = groups.iter().map(|g| g.len()).sum();
    assert_eq!(total, articles.len());

    let mut owner = std::collections::HashMap::new();
    for (index, group) in groups.iter().enumerate() {
        for link in group.articles().map(|a| a.link.as_str()) {
            assert_eq!(*owner.entry(link).or_insert(index), index, "{link} is split across groups");
        }
    }
}

#[test]
fn empty_input_yields_no_groups() {
    assert!(Clusterer::new().group(&[], 0.2).is_empty());
}

#[test]
fn jaccard_is_symmetric_and_bounded() {
    let clusterer = Clusterer::new();
    let titles: Vec<_> = headlines().into_iter().map(|a| clusterer.tokenize(&a.title)).collect();

    for a in &titles {
        for b in &titles {
            let ab = jaccard_similarity(a, b);
            assert_eq!(ab, jaccard_similarity(b, a));
            assert!((0.0..=1.0).contains(&ab));
        }
    }
    let empty = HashSet::new();
    assert_eq!(jaccard_similarity(&empty, &empty), 0.0);
}

#[test]
fn numeric_tokens_survive() {
    let tokens = Clusterer::new().tokenize("iPhone 16 vs 15");
    assert!(tokens.contains("16"));
    assert!(tokens.contains("15"));
    assert!(!tokens.contains("vs"));
}

#[test]
fn clusterer_can_be_shared_across_threads() {
    let clusterer = std::sync::Arc::new(Clusterer::new());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let clusterer = std::sync::Arc::clone(&clusterer);
            std::thread::spawn(move || clusterer.group(&headlines(), 0.2).len())
        })
        .collect();
    let counts: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(counts.windows(2).all(|w| w[0] == w[1]));
}
