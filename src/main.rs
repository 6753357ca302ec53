//! Binary entrypoint. Boots the Axum HTTP server, wiring routes, shared
//! state, and middleware.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crypto_sentiment_analyzer::api::{self, AppState};
use crypto_sentiment_analyzer::config::AnalyzerConfig;
use crypto_sentiment_analyzer::ingest::reddit::RedditClient;
use crypto_sentiment_analyzer::ingest::PostSource;
use crypto_sentiment_analyzer::metrics::Metrics;
use crypto_sentiment_analyzer::sentiment::{Lexicon, SentimentAnalyzer};

const ENV_PORT: &str = "PORT";
const DEFAULT_PORT: u16 = 8080;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Arc::new(AnalyzerConfig::load().context("loading analyzer config")?);
    let lexicon = Lexicon::from_env_or_builtin().context("loading sentiment lexicon")?;
    let (weights, negations, intensifiers) = lexicon.table_sizes();
    tracing::info!(weights, negations, intensifiers, "lexicon loaded");

    let metrics = Metrics::init(&lexicon);
    let analyzer = Arc::new(SentimentAnalyzer::with_lexicon(lexicon));

    // Missing credentials degrade the service instead of killing it: health
    // reports the source down and analysis endpoints return errors.
    let source: Option<Arc<dyn PostSource>> = match RedditClient::from_env(
        &config.subreddit,
        config.search_limit,
        config.request_timeout(),
    ) {
        Ok(client) => {
            // Startup connection test, logged but never fatal.
            match client.probe(&config.default_coin).await {
                Ok(()) => tracing::info!("reddit api connection verified"),
                Err(e) => tracing::warn!(error = %e, "reddit api connection failed"),
            }
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "reddit source disabled; analysis endpoints will fail");
            None
        }
    };

    let state = AppState::new(analyzer, source, config.clone());
    let router = api::create_router(state).merge(metrics.router());

    let port = std::env::var(ENV_PORT)
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("binding 0.0.0.0:{port}"))?;
    tracing::info!(port, subreddit = %config.subreddit, "listening");

    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
