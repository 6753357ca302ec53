//! Sentiment lexicon tables: weighted keywords, negation tokens, and
//! intensifier multipliers.
//!
//! The tables are plain data loaded from JSON once at startup and shared
//! read-only afterwards. Validation is strict on purpose: a lexicon typo
//! should fail the boot, not silently skew every score after it.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;

/// Env var pointing at an alternative lexicon JSON file.
pub const ENV_LEXICON_PATH: &str = "SENTIMENT_LEXICON_PATH";

/// On-disk schema of `sentiment_lexicon.json`.
#[derive(Debug, Clone, Deserialize)]
struct LexiconFile {
    weights: HashMap<String, i32>,
    #[serde(default)]
    negations: Vec<String>,
    #[serde(default)]
    intensifiers: HashMap<String, f64>,
}

/// Immutable lookup tables for the scorer.
///
/// Tokens are case-folded at build time, so lookups expect already-lowercased
/// input (the tokenizer guarantees that). A token may live in at most one
/// table; overlaps are rejected when the lexicon is built.
#[derive(Debug, Clone)]
pub struct Lexicon {
    weights: HashMap<String, i32>,
    negations: HashSet<String>,
    intensifiers: HashMap<String, f64>,
}

static BUILTIN: Lazy<Arc<Lexicon>> = Lazy::new(|| {
    let raw = include_str!("../../sentiment_lexicon.json");
    Arc::new(Lexicon::from_json_str(raw).expect("valid built-in sentiment lexicon"))
});

impl Lexicon {
    /// The lexicon embedded in the binary (`sentiment_lexicon.json`).
    pub fn builtin() -> Arc<Lexicon> {
        Arc::clone(&BUILTIN)
    }

    /// Load and validate a lexicon from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Lexicon> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading sentiment lexicon from {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("invalid sentiment lexicon at {}", path.display()))
    }

    /// Resolve the lexicon for this process: `$SENTIMENT_LEXICON_PATH` if set,
    /// otherwise the built-in tables. A broken override file is a hard error.
    pub fn from_env_or_builtin() -> Result<Arc<Lexicon>> {
        match std::env::var(ENV_LEXICON_PATH) {
            Ok(path) if !path.trim().is_empty() => Ok(Arc::new(Self::from_json_file(path)?)),
            _ => Ok(Self::builtin()),
        }
    }

    /// Parse and validate a lexicon from a JSON string.
    pub fn from_json_str(raw: &str) -> Result<Lexicon> {
        let file: LexiconFile =
            serde_json::from_str(raw).context("parsing sentiment lexicon JSON")?;
        Self::build(file)
    }

    fn build(file: LexiconFile) -> Result<Lexicon> {
        let mut weights: HashMap<String, i32> = HashMap::with_capacity(file.weights.len());
        for (token, weight) in file.weights {
            let token = fold_token(&token)?;
            if weight == 0 {
                bail!("lexicon word `{token}` has weight 0; drop the entry instead");
            }
            if weights.insert(token.clone(), weight).is_some() {
                bail!("duplicate lexicon word `{token}` after case folding");
            }
        }

        let mut negations: HashSet<String> = HashSet::with_capacity(file.negations.len());
        for token in file.negations {
            let token = fold_token(&token)?;
            if !negations.insert(token.clone()) {
                bail!("duplicate negation token `{token}` after case folding");
            }
        }

        let mut intensifiers: HashMap<String, f64> =
            HashMap::with_capacity(file.intensifiers.len());
        for (token, multiplier) in file.intensifiers {
            let token = fold_token(&token)?;
            if !multiplier.is_finite() || multiplier <= 1.0 {
                bail!("intensifier `{token}` must have a finite multiplier > 1.0, got {multiplier}");
            }
            if intensifiers.insert(token.clone(), multiplier).is_some() {
                bail!("duplicate intensifier `{token}` after case folding");
            }
        }

        // A token in two tables would be silently shadowed by the scan order;
        // reject it here so the config is unambiguous.
        for token in negations.iter() {
            if weights.contains_key(token) {
                bail!("token `{token}` is both a negation and a lexicon word");
            }
            if intensifiers.contains_key(token) {
                bail!("token `{token}` is both a negation and an intensifier");
            }
        }
        for token in intensifiers.keys() {
            if weights.contains_key(token) {
                bail!("token `{token}` is both an intensifier and a lexicon word");
            }
        }

        Ok(Lexicon {
            weights,
            negations,
            intensifiers,
        })
    }

    /// Weight for a lexicon word, `None` when the token carries no sentiment.
    #[inline]
    pub fn weight(&self, token: &str) -> Option<i32> {
        self.weights.get(token).copied()
    }

    #[inline]
    pub fn is_negation(&self, token: &str) -> bool {
        self.negations.contains(token)
    }

    /// Multiplier for an intensifier token, `None` when not one.
    #[inline]
    pub fn intensifier(&self, token: &str) -> Option<f64> {
        self.intensifiers.get(token).copied()
    }

    /// Table sizes as `(words, negations, intensifiers)`, for startup logging.
    pub fn table_sizes(&self) -> (usize, usize, usize) {
        (
            self.weights.len(),
            self.negations.len(),
            self.intensifiers.len(),
        )
    }
}

/// Case-fold a configured token and reject shapes that could never match the
/// whitespace tokenizer (empty, or containing whitespace).
fn fold_token(raw: &str) -> Result<String> {
    let token = raw.trim().to_lowercase();
    if token.is_empty() {
        bail!("empty token in sentiment lexicon");
    }
    if token.chars().any(char::is_whitespace) {
        bail!("lexicon token `{token}` contains whitespace and can never match");
    }
    Ok(token)
}
