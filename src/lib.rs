// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod sentiment;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::config::AnalyzerConfig;
pub use crate::ingest::PostSource;
pub use crate::sentiment::{Direction, Lexicon, SentimentAnalyzer, SentimentSummary};
