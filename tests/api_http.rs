// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot, with a
// stub post source standing in for Reddit.
//
// Covered:
// - GET /api/health    (source up, down, and absent)
// - GET /api/analyze   (scored, default coin, empty, source error)
// - GET /api/trending  (failed and empty coins are skipped)

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::Request,
    Router,
};
use http::StatusCode;
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use crypto_sentiment_analyzer::api::{self, AppState};
use crypto_sentiment_analyzer::config::AnalyzerConfig;
use crypto_sentiment_analyzer::ingest::PostSource;
use crypto_sentiment_analyzer::sentiment::SentimentAnalyzer;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

/// Canned per-topic posts; topics listed in `failing` error instead.
#[derive(Default)]
struct StubSource {
    by_topic: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
}

impl StubSource {
    fn with_topic(mut self, topic: &str, posts: &[&str]) -> Self {
        self.by_topic
            .insert(topic.to_string(), posts.iter().map(|s| s.to_string()).collect());
        self
    }

    fn with_failing(mut self, topic: &str) -> Self {
        self.failing.insert(topic.to_string());
        self
    }
}

#[async_trait]
impl PostSource for StubSource {
    async fn fetch_posts(&self, topic: &str) -> Result<Vec<String>> {
        if self.failing.contains(topic) {
            anyhow::bail!("simulated outage for {topic}");
        }
        Ok(self.by_topic.get(topic).cloned().unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "Reddit"
    }
}

/// Build the same Router the binary uses.
fn test_router(source: Option<Arc<dyn PostSource>>, config: AnalyzerConfig) -> Router {
    let state = AppState::new(Arc::new(SentimentAnalyzer::new()), source, Arc::new(config));
    api::create_router(state)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let v: Json = serde_json::from_slice(&bytes).expect("parse json");
    (status, v)
}

#[tokio::test]
async fn health_reports_source_status() {
    let source = StubSource::default().with_topic("bitcoin", &["hodl"]);
    let app = test_router(Some(Arc::new(source)), AnalyzerConfig::default());

    let (status, v) = get_json(app, "/api/health").await;
    assert_eq!(status, StatusCode::OK, "health should be 200");
    assert_eq!(v["status"], "healthy");
    assert_eq!(v["services"]["reddit"], true, "probe should succeed");
    assert_eq!(v["data_source"], "Reddit (r/CryptoCurrency)");
    assert!(v.get("timestamp").is_some(), "missing 'timestamp'");
}

#[tokio::test]
async fn health_reports_source_down_when_probe_fails() {
    let source = StubSource::default().with_failing("bitcoin");
    let app = test_router(Some(Arc::new(source)), AnalyzerConfig::default());

    let (status, v) = get_json(app, "/api/health").await;
    assert_eq!(status, StatusCode::OK, "health stays 200 when the source is down");
    assert_eq!(v["status"], "healthy");
    assert_eq!(v["services"]["reddit"], false);
}

#[tokio::test]
async fn health_reports_source_down_when_absent() {
    let app = test_router(None, AnalyzerConfig::default());

    let (status, v) = get_json(app, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["services"]["reddit"], false);
}

#[tokio::test]
async fn analyze_scores_posts_and_reports_direction() {
    // moon*3 caps at +5, dump*2 caps at -5, the third post scores 0 and is
    // excluded from the average: (+5 - 5) / 2 = 0 -> 50%.
    let source = StubSource::default()
        .with_topic("bitcoin", &["moon moon moon", "dump dump", "the weather is nice"])
        .with_topic("ethereum", &["very bullish today"]);
    let app = test_router(Some(Arc::new(source)), AnalyzerConfig::default());

    let (status, v) = get_json(app.clone(), "/api/analyze?coin=bitcoin").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["coin"], "bitcoin");
    assert_eq!(v["sentimentPercent"].as_f64(), Some(50.0));
    assert_eq!(v["sentimentDirection"], "Neutral");
    assert_eq!(v["posts"], 3, "all fetched posts are counted, zero scores included");
    assert!(v.get("message").is_none(), "no message on a scored response");

    // very(1.5) * bullish(4) = 6, capped to +5 -> 100%.
    let (status, v) = get_json(app, "/api/analyze?coin=ethereum").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["sentimentPercent"].as_f64(), Some(100.0));
    assert_eq!(v["sentimentDirection"], "Bullish");
}

#[tokio::test]
async fn analyze_falls_back_to_configured_default_coin() {
    let mut config = AnalyzerConfig::default();
    config.default_coin = "solana".to_string();
    let source = StubSource::default().with_topic("solana", &["surge incoming"]);
    let app = test_router(Some(Arc::new(source)), config);

    let (status, v) = get_json(app, "/api/analyze").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["coin"], "solana");
    // surge = +4 -> 90%.
    assert_eq!(v["sentimentPercent"].as_f64(), Some(90.0));
    assert_eq!(v["sentimentDirection"], "Bullish");
}

#[tokio::test]
async fn analyze_with_no_posts_returns_neutral_and_message() {
    let source = StubSource::default(); // every topic resolves to zero posts
    let app = test_router(Some(Arc::new(source)), AnalyzerConfig::default());

    let (status, v) = get_json(app, "/api/analyze?coin=dogecoin").await;
    assert_eq!(status, StatusCode::OK, "empty result is not an error");
    assert_eq!(v["coin"], "dogecoin");
    assert_eq!(v["sentimentPercent"].as_f64(), Some(50.0));
    assert_eq!(v["sentimentDirection"], "Neutral");
    assert_eq!(v["posts"], 0);
    assert_eq!(v["message"], "No recent posts found for this cryptocurrency");
}

#[tokio::test]
async fn analyze_maps_source_failure_to_500() {
    let source = StubSource::default().with_failing("bitcoin");
    let app = test_router(Some(Arc::new(source)), AnalyzerConfig::default());

    let (status, v) = get_json(app, "/api/analyze?coin=bitcoin").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let msg = v["error"].as_str().expect("error message");
    assert!(
        msg.starts_with("Failed to fetch Reddit data"),
        "unexpected error message: {msg}"
    );
}

#[tokio::test]
async fn analyze_without_source_returns_500() {
    let app = test_router(None, AnalyzerConfig::default());

    let (status, v) = get_json(app, "/api/analyze?coin=bitcoin").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let msg = v["error"].as_str().expect("error message");
    assert!(
        msg.starts_with("Reddit service unavailable"),
        "unexpected error message: {msg}"
    );
}

#[tokio::test]
async fn trending_skips_failed_and_empty_coins() {
    let mut config = AnalyzerConfig::default();
    config.trending_coins = vec![
        "bitcoin".to_string(),
        "ethereum".to_string(),
        "cardano".to_string(),
        "solana".to_string(),
    ];
    let source = StubSource::default()
        .with_topic("bitcoin", &["buy buy"])
        .with_failing("ethereum")
        // cardano resolves to zero posts
        .with_topic("solana", &["crash dump panic", "crash dump"]);
    let app = test_router(Some(Arc::new(source)), config);

    let (status, v) = get_json(app, "/api/trending").await;
    assert_eq!(status, StatusCode::OK);

    let entries = v["trending"].as_array().expect("trending array");
    assert_eq!(entries.len(), 2, "failed and empty coins must be skipped");

    assert_eq!(entries[0]["coin"], "bitcoin");
    // buy + buy = +6, capped to +5 -> 100%.
    assert_eq!(entries[0]["sentiment"].as_f64(), Some(100.0));
    assert_eq!(entries[0]["direction"], "Bullish");
    assert_eq!(entries[0]["posts"], 1);

    assert_eq!(entries[1]["coin"], "solana");
    // crash/dump/panic pile up past the cap, so both posts land at -5 -> 0%.
    assert_eq!(entries[1]["sentiment"].as_f64(), Some(0.0));
    assert_eq!(entries[1]["direction"], "Bearish");
    assert_eq!(entries[1]["posts"], 2);

    assert_eq!(v["data_source"], "Reddit (r/CryptoCurrency)");
}
