// src/config.rs
//! Runtime configuration: subreddit, coin lists, HTTP timeout.
//!
//! Loaded from `config/analyzer.toml` (or `$ANALYZER_CONFIG_PATH`), with
//! every field optional and falling back to built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

pub const ENV_CONFIG_PATH: &str = "ANALYZER_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config/analyzer.toml";

const DEFAULT_SUBREDDIT: &str = "CryptoCurrency";
const DEFAULT_SEARCH_LIMIT: u32 = 100;
const DEFAULT_COIN: &str = "bitcoin";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_TRENDING: &[&str] = &[
    "bitcoin",
    "ethereum",
    "solana",
    "cardano",
    "polkadot",
    "chainlink",
];

// Reddit caps listing requests at 100 entries.
const MAX_SEARCH_LIMIT: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Subreddit searched for posts.
    pub subreddit: String,
    /// Max posts requested per search, clamped to 1..=100.
    pub search_limit: u32,
    /// Coin analyzed when the request names none.
    pub default_coin: String,
    /// Coins covered by the trending endpoint, in display order.
    pub trending_coins: Vec<String>,
    /// Outbound HTTP timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            subreddit: DEFAULT_SUBREDDIT.to_string(),
            search_limit: DEFAULT_SEARCH_LIMIT,
            default_coin: DEFAULT_COIN.to_string(),
            trending_coins: DEFAULT_TRENDING.iter().map(|s| s.to_string()).collect(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AnalyzerConfig {
    /// Load using env var + fallbacks:
    /// 1) $ANALYZER_CONFIG_PATH
    /// 2) config/analyzer.toml
    /// 3) built-in defaults
    pub fn load() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::from_toml(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::from_toml(&default_p);
        }
        Ok(Self::default())
    }

    pub fn from_toml(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading analyzer config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: AnalyzerConfig = toml::from_str(s).context("parsing analyzer config")?;
        Ok(cfg.normalized())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Clamp and tidy values so the rest of the app can trust them.
    fn normalized(mut self) -> Self {
        self.search_limit = self.search_limit.clamp(1, MAX_SEARCH_LIMIT);
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = DEFAULT_TIMEOUT_SECS;
        }

        let subreddit = self.subreddit.trim();
        self.subreddit = if subreddit.is_empty() {
            DEFAULT_SUBREDDIT.to_string()
        } else {
            subreddit.to_string()
        };

        let coin = self.default_coin.trim().to_lowercase();
        self.default_coin = if coin.is_empty() {
            DEFAULT_COIN.to_string()
        } else {
            coin
        };

        let mut seen = std::collections::HashSet::new();
        let mut coins = Vec::new();
        for raw in &self.trending_coins {
            let c = raw.trim().to_lowercase();
            if !c.is_empty() && seen.insert(c.clone()) {
                coins.push(c);
            }
        }
        if coins.is_empty() {
            coins = DEFAULT_TRENDING.iter().map(|s| s.to_string()).collect();
        }
        self.trending_coins = coins;

        self
    }
}
