use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use metrics::{counter, gauge};
use tower_http::cors::CorsLayer;

use crate::config::AnalyzerConfig;
use crate::ingest::{anon_id, PostSource};
use crate::sentiment::{Direction, SentimentAnalyzer};

#[derive(Clone)]
pub struct AppState {
    analyzer: Arc<SentimentAnalyzer>,
    /// None when the post source could not be constructed (missing
    /// credentials). Requests then fail per call instead of at startup.
    source: Option<Arc<dyn PostSource>>,
    config: Arc<AnalyzerConfig>,
}

impl AppState {
    pub fn new(
        analyzer: Arc<SentimentAnalyzer>,
        source: Option<Arc<dyn PostSource>>,
        config: Arc<AnalyzerConfig>,
    ) -> Self {
        Self {
            analyzer,
            source,
            config,
        }
    }

    fn data_source(&self) -> String {
        let name = self.source.as_ref().map(|s| s.name()).unwrap_or("Reddit");
        format!("{} (r/{})", name, self.config.subreddit)
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/analyze", get(analyze))
        .route("/api/trending", get(trending))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Serialize)]
struct AnalysisResp {
    coin: String,
    #[serde(rename = "sentimentPercent")]
    sentiment_percent: f64,
    #[serde(rename = "sentimentDirection")]
    sentiment_direction: Direction,
    posts: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    data_source: String,
    timestamp: String,
}

#[derive(serde::Serialize)]
struct TrendingEntry {
    coin: String,
    sentiment: f64,
    direction: Direction,
    posts: usize,
}

#[derive(serde::Serialize)]
struct TrendingResp {
    trending: Vec<TrendingEntry>,
    data_source: String,
    timestamp: String,
}

#[derive(serde::Serialize)]
struct HealthResp {
    status: &'static str,
    services: HashMap<String, bool>,
    data_source: String,
    timestamp: String,
}

#[derive(serde::Serialize)]
struct ErrorResp {
    error: String,
}

async fn analyze(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    counter!("analyze_requests_total", "endpoint" => "analyze").increment(1);

    let coin = match q.get("coin").map(|c| c.trim()) {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => state.config.default_coin.clone(),
    };

    let Some(source) = state.source.as_ref() else {
        counter!("analyze_failures_total").increment(1);
        return service_unavailable();
    };

    let posts = match source.fetch_posts(&coin).await {
        Ok(posts) => posts,
        Err(e) => {
            counter!("analyze_failures_total").increment(1);
            tracing::warn!(target: "api", coin = %coin, error = %e, "post fetch failed");
            return error_response(format!("Failed to fetch Reddit data: {e}"));
        }
    };

    if posts.is_empty() {
        return Json(AnalysisResp {
            coin,
            sentiment_percent: 50.0,
            sentiment_direction: Direction::Neutral,
            posts: 0,
            message: Some("No recent posts found for this cryptocurrency"),
            data_source: state.data_source(),
            timestamp: now_rfc3339(),
        })
        .into_response();
    }

    let summary = state.analyzer.summarize(&posts);
    // Per-post trace carries hash ids, never the post text itself.
    if tracing::enabled!(tracing::Level::DEBUG) {
        for (post, score) in posts.iter().zip(&summary.post_scores) {
            tracing::debug!(target: "api", id = %anon_id(post), score, "post scored");
        }
    }
    tracing::info!(
        target: "api",
        coin = %coin,
        posts = summary.post_count,
        percent = summary.percentage,
        direction = %summary.direction,
        "analysis complete"
    );
    gauge!("analyze_last_success_timestamp_seconds").set(Utc::now().timestamp() as f64);

    Json(AnalysisResp {
        coin,
        sentiment_percent: summary.percentage,
        sentiment_direction: summary.direction,
        posts: summary.post_count,
        message: None,
        data_source: state.data_source(),
        timestamp: now_rfc3339(),
    })
    .into_response()
}

async fn trending(State(state): State<AppState>) -> Response {
    counter!("analyze_requests_total", "endpoint" => "trending").increment(1);

    let Some(source) = state.source.as_ref() else {
        counter!("analyze_failures_total").increment(1);
        return service_unavailable();
    };

    let mut entries = Vec::new();
    for coin in &state.config.trending_coins {
        // A failed or empty coin is skipped, not fatal for the whole list.
        let posts = match source.fetch_posts(coin).await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::warn!(target: "api", coin = %coin, error = %e, "skipping coin");
                continue;
            }
        };
        if posts.is_empty() {
            continue;
        }

        let summary = state.analyzer.summarize(&posts);
        entries.push(TrendingEntry {
            coin: coin.clone(),
            sentiment: summary.percentage,
            direction: summary.direction,
            posts: summary.post_count,
        });
    }

    Json(TrendingResp {
        trending: entries,
        data_source: state.data_source(),
        timestamp: now_rfc3339(),
    })
    .into_response()
}

async fn health(State(state): State<AppState>) -> Response {
    counter!("analyze_requests_total", "endpoint" => "health").increment(1);

    let reddit_ok = match state.source.as_ref() {
        Some(source) => source
            .fetch_posts(&state.config.default_coin)
            .await
            .is_ok(),
        None => false,
    };

    let mut services = HashMap::new();
    let key = state
        .source
        .as_ref()
        .map(|s| s.name().to_lowercase())
        .unwrap_or_else(|| "reddit".to_string());
    services.insert(key, reddit_ok);

    Json(HealthResp {
        status: "healthy",
        services,
        data_source: state.data_source(),
        timestamp: now_rfc3339(),
    })
    .into_response()
}

fn service_unavailable() -> Response {
    error_response("Reddit service unavailable: api credentials not configured".to_string())
}

fn error_response(error: String) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResp { error })).into_response()
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
