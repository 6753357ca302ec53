// src/ingest/mod.rs
//! Post acquisition: the `PostSource` trait plus the text hygiene applied to
//! everything a source hands back before it reaches the scorer.

pub mod reddit;

use anyhow::Result;
use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use std::collections::HashSet;

/// Anything that can produce text snippets for a topic (a coin symbol or
/// name). Implementations own their authentication, retries, and rate
/// limits; the scorer only ever sees the finished list of strings.
#[async_trait::async_trait]
pub trait PostSource: Send + Sync {
    async fn fetch_posts(&self, topic: &str) -> Result<Vec<String>>;
    fn name(&self) -> &'static str;
}

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "source_posts_fetched_total",
            "Posts returned by the post source before hygiene."
        );
        describe_counter!(
            "source_posts_kept_total",
            "Posts kept after combining, cleaning and dedup."
        );
        describe_counter!(
            "source_dedup_total",
            "Posts dropped as exact duplicates of an earlier post."
        );
        describe_counter!("source_errors_total", "Post source fetch/auth errors.");
        describe_histogram!(
            "source_fetch_seconds",
            "Wall time of one fetch_posts call."
        );
    });
}

/// Normalize fetched text: decode HTML entities, strip tags, straighten
/// typographic quotes, collapse whitespace, cap the length. Case and
/// punctuation are left to the scoring tokenizer.
pub fn normalize_post(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 5) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Fold a post's title and body into the single lowercased snippet the
/// scorer consumes. The body is skipped when it is empty or repeats the
/// title verbatim; a post with no usable text yields `None`.
pub fn combine_title_body(title: &str, body: &str) -> Option<String> {
    let title = title.trim().to_lowercase();
    let body = body.trim().to_lowercase();

    let mut combined = title.clone();
    if !body.is_empty() && body != title {
        if !combined.is_empty() {
            combined.push(' ');
        }
        combined.push_str(&body);
    }

    let cleaned = normalize_post(&combined);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Drop exact duplicate texts, keeping first occurrences in order.
/// Returns the kept posts and how many were removed.
pub fn dedup_posts(posts: Vec<String>) -> (Vec<String>, usize) {
    let mut seen: HashSet<String> = HashSet::with_capacity(posts.len());
    let mut kept = Vec::with_capacity(posts.len());
    let mut removed = 0usize;

    for post in posts {
        if seen.insert(post.clone()) {
            kept.push(post);
        } else {
            removed += 1;
        }
    }

    (kept, removed)
}

/// Short, stable hash id for a post so logs never carry raw text.
pub fn anon_id(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
