// src/ingest/reddit.rs
//! Reddit post source: OAuth2 client-credentials flow plus subreddit search.
//!
//! Listing JSON is flattened by a pure helper (`parse_search_listing`) so the
//! wire format can be tested from fixtures without any HTTP.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::ingest::{combine_title_body, dedup_posts, ensure_metrics_described, PostSource};

pub const ENV_CLIENT_ID: &str = "REDDIT_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "REDDIT_CLIENT_SECRET";

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";
const USER_AGENT: &str = concat!("crypto-sentiment-analyzer/", env!("CARGO_PKG_VERSION"));

/// Authenticated Reddit search client. The bearer token is fetched lazily
/// and refreshed once when a request comes back 401.
#[derive(Debug)]
pub struct RedditClient {
    client: Client,
    client_id: String,
    client_secret: String,
    subreddit: String,
    search_limit: u32,
    token: Mutex<Option<String>>,
}

impl RedditClient {
    pub fn new(
        client_id: String,
        client_secret: String,
        subreddit: String,
        search_limit: u32,
        timeout: Duration,
    ) -> Result<Self> {
        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            bail!("reddit api credentials not set ({ENV_CLIENT_ID} / {ENV_CLIENT_SECRET})");
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building reddit http client")?;
        Ok(Self {
            client,
            client_id: client_id.trim().to_string(),
            client_secret: client_secret.trim().to_string(),
            subreddit,
            search_limit,
            token: Mutex::new(None),
        })
    }

    /// Credentials from `REDDIT_CLIENT_ID` / `REDDIT_CLIENT_SECRET`.
    pub fn from_env(subreddit: &str, search_limit: u32, timeout: Duration) -> Result<Self> {
        let client_id = std::env::var(ENV_CLIENT_ID).unwrap_or_default();
        let client_secret = std::env::var(ENV_CLIENT_SECRET).unwrap_or_default();
        Self::new(
            client_id,
            client_secret,
            subreddit.to_string(),
            search_limit,
            timeout,
        )
    }

    /// Cheap connectivity check: authenticate and run one search.
    pub async fn probe(&self, topic: &str) -> Result<()> {
        self.fetch_posts(topic).await.map(|_| ())
    }

    /// Current bearer token, authenticating on first use. `force` drops the
    /// cached token first (after a 401).
    async fn access_token(&self, force: bool) -> Result<String> {
        let mut token = self.token.lock().await;
        if force {
            *token = None;
        }
        match token.as_ref() {
            Some(t) => Ok(t.clone()),
            None => {
                let fresh = self.authenticate().await?;
                *token = Some(fresh.clone());
                Ok(fresh)
            }
        }
    }

    async fn authenticate(&self) -> Result<String> {
        let resp = self
            .client
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("requesting reddit access token")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("reddit authentication failed ({status}): {body}");
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        let parsed: TokenResponse = resp
            .json()
            .await
            .context("decoding reddit token response")?;
        if parsed.access_token.is_empty() {
            bail!("reddit returned an empty access token");
        }
        Ok(parsed.access_token)
    }

    /// Run the subreddit search and return the raw listing JSON.
    async fn search(&self, topic: &str) -> Result<String> {
        let mut refreshed = false;
        loop {
            let token = self.access_token(refreshed).await?;
            let url = format!("{API_BASE}/r/{}/search.json", self.subreddit);
            let limit = self.search_limit.to_string();

            let resp = self
                .client
                .get(&url)
                .query(&[
                    ("q", topic),
                    ("restrict_sr", "1"),
                    ("limit", limit.as_str()),
                    ("sort", "new"),
                ])
                .bearer_auth(&token)
                .header(reqwest::header::USER_AGENT, USER_AGENT)
                .send()
                .await
                .context("requesting reddit search")?;

            // Expired token: refresh once, then retry the request.
            if resp.status() == StatusCode::UNAUTHORIZED && !refreshed {
                refreshed = true;
                continue;
            }

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                bail!("reddit api error ({status}): {body}");
            }

            return resp.text().await.context("reading reddit search response");
        }
    }
}

#[async_trait]
impl PostSource for RedditClient {
    async fn fetch_posts(&self, topic: &str) -> Result<Vec<String>> {
        ensure_metrics_described();
        let t0 = Instant::now();

        let raw = match self.search(topic).await {
            Ok(raw) => raw,
            Err(e) => {
                counter!("source_errors_total").increment(1);
                return Err(e);
            }
        };
        let parsed = match parse_search_listing(&raw) {
            Ok(p) => p,
            Err(e) => {
                counter!("source_errors_total").increment(1);
                return Err(e);
            }
        };

        histogram!("source_fetch_seconds").record(t0.elapsed().as_secs_f64());
        counter!("source_posts_fetched_total").increment(parsed.fetched as u64);
        counter!("source_posts_kept_total").increment(parsed.posts.len() as u64);
        counter!("source_dedup_total").increment(parsed.duplicates as u64);

        tracing::debug!(
            target: "ingest",
            topic,
            fetched = parsed.fetched,
            kept = parsed.posts.len(),
            dedup = parsed.duplicates,
            "reddit search complete"
        );

        Ok(parsed.posts)
    }

    fn name(&self) -> &'static str {
        "Reddit"
    }
}

/// What a search listing boils down to after combining and dedup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedListing {
    pub posts: Vec<String>,
    /// Children present in the listing before any filtering.
    pub fetched: usize,
    /// Posts dropped as exact duplicates.
    pub duplicates: usize,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: PostData,
}

#[derive(Debug, Deserialize)]
struct PostData {
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
}

/// Flatten a search listing into scorer-ready snippets: per post, title and
/// selftext are combined and cleaned, empty posts are skipped and exact
/// duplicates dropped. Pure; exercised from fixtures in tests.
pub fn parse_search_listing(raw: &str) -> Result<ParsedListing> {
    let listing: Listing = serde_json::from_str(raw).context("parsing reddit listing json")?;
    let fetched = listing.data.children.len();

    let combined: Vec<String> = listing
        .data
        .children
        .into_iter()
        .filter_map(|child| combine_title_body(&child.data.title, &child.data.selftext))
        .collect();

    let (posts, duplicates) = dedup_posts(combined);
    Ok(ParsedListing {
        posts,
        fetched,
        duplicates,
    })
}
