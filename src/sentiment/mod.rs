//! # Sentiment Scoring Engine
//! Pure, testable logic that maps raw post text to a capped per-post score
//! and reduces many posts into one bounded 0–100 percentage. No I/O; safe to
//! call concurrently because the lexicon is immutable and all scan state is
//! local to a single call.
//!
//! Scoring model: whitespace tokens are matched against a weighted keyword
//! lexicon. A negation token flips the sign of the next three keyword hits;
//! an intensifier scales the next two. Each post's total is clamped to
//! [-5, +5], and the aggregate percentage is the mean of the nonzero post
//! scores mapped onto 50 ± 10·avg.

pub mod lexicon;

pub use lexicon::Lexicon;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// How many upcoming keyword hits a negation token affects.
const NEGATION_WINDOW: usize = 3;
/// How many upcoming keyword hits an intensifier token affects.
const INTENSITY_WINDOW: usize = 2;
/// Per-post scores are clamped to ±`POST_SCORE_CAP` so a single rant cannot
/// drown out the rest of the sample.
const POST_SCORE_CAP: i64 = 5;
/// Returned when there is no scoring evidence at all.
const NEUTRAL_PERCENT: f64 = 50.0;

/// Percentage at or above which the direction reads "Bullish".
pub const BULLISH_THRESHOLD: f64 = 60.0;
/// Percentage at or below which the direction reads "Bearish".
pub const BEARISH_THRESHOLD: f64 = 40.0;

/// Punctuation stripped from token edges; interior characters survive, so
/// contractions like `don't` keep their apostrophe.
const EDGE_PUNCT: &[char] = &[
    '.', ',', '!', '?', ';', ':', '(', ')', '[', ']', '{', '}', '"', '\'',
];

/// Tokenize one post: split on whitespace runs, strip edge punctuation,
/// lower-case, drop tokens that end up empty. Pure and deterministic.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|raw| raw.trim_matches(EDGE_PUNCT).to_lowercase())
        .filter(|tok| !tok.is_empty())
}

/// Market direction label derived from the aggregate percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Direction {
    /// Three-band split: `>= 60` bullish, `<= 40` bearish, neutral between.
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= BULLISH_THRESHOLD {
            Direction::Bullish
        } else if percentage <= BEARISH_THRESHOLD {
            Direction::Bearish
        } else {
            Direction::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Bullish => "Bullish",
            Direction::Bearish => "Bearish",
            Direction::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the serving layer needs for one topic: the percentage, its
/// label, and the per-post scores (zero-score posts stay in the list even
/// though they are excluded from the percentage denominator).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentSummary {
    pub percentage: f64,
    pub direction: Direction,
    pub post_count: usize,
    pub post_scores: Vec<i32>,
}

/// Lexicon-driven scorer. Cheap to clone; the tables behind the `Arc` are
/// built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct SentimentAnalyzer {
    lexicon: Arc<Lexicon>,
}

impl SentimentAnalyzer {
    /// Analyzer over the built-in lexicon.
    pub fn new() -> Self {
        Self {
            lexicon: Lexicon::builtin(),
        }
    }

    /// Analyzer over substitute tables (tests, experiments).
    pub fn with_lexicon(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    /// Score one post: scan tokens left to right with the negation and
    /// intensity windows, then clamp the total to [-5, +5].
    ///
    /// Window rules, in match order (a token is exactly one of these):
    /// - negation token: re-arms the negation window to 3 upcoming keyword
    ///   hits and scores nothing itself; the intensity window is untouched.
    /// - intensifier token: arms the intensity window for 2 keyword hits with
    ///   its multiplier.
    /// - keyword: negation applies before intensity, so the already-negated
    ///   value is scaled, with ties rounded away from zero.
    /// - anything else: ignored, consumes no window.
    pub fn score_post(&self, text: &str) -> i32 {
        let mut total: i64 = 0;
        let mut negate_window: usize = 0;
        let mut intensity_window: usize = 0;
        let mut multiplier: f64 = 1.0;

        for token in tokenize(text) {
            let token = token.as_str();

            if self.lexicon.is_negation(token) {
                negate_window = NEGATION_WINDOW;
                continue;
            }

            if let Some(mult) = self.lexicon.intensifier(token) {
                intensity_window = INTENSITY_WINDOW;
                multiplier = mult;
                continue;
            }

            let Some(weight) = self.lexicon.weight(token) else {
                continue;
            };

            let mut score = weight;
            if negate_window > 0 {
                score = -score;
                negate_window -= 1;
            }
            if intensity_window > 0 {
                // f64::round ties away from zero, which keeps the scaling
                // symmetric for negative scores.
                score = (f64::from(score) * multiplier).round() as i32;
                intensity_window -= 1;
                if intensity_window == 0 {
                    multiplier = 1.0;
                }
            }

            total += i64::from(score);
        }

        total.clamp(-POST_SCORE_CAP, POST_SCORE_CAP) as i32
    }

    /// Capped score per post, in input order. Zeros are kept so callers can
    /// show "this post said nothing" alongside the rest.
    pub fn score_posts<S: AsRef<str>>(&self, posts: &[S]) -> Vec<i32> {
        posts.iter().map(|p| self.score_post(p.as_ref())).collect()
    }

    /// The headline number: 0–100 percentage over a batch of posts.
    /// Any batch, including an empty one, yields a valid percentage.
    pub fn compute_sentiment<S: AsRef<str>>(&self, posts: &[S]) -> f64 {
        aggregate_percentage(&self.score_posts(posts))
    }

    /// One-call summary for the serving layer.
    pub fn summarize<S: AsRef<str>>(&self, posts: &[S]) -> SentimentSummary {
        let post_scores = self.score_posts(posts);
        let percentage = aggregate_percentage(&post_scores);
        SentimentSummary {
            percentage,
            direction: Direction::from_percentage(percentage),
            post_count: posts.len(),
            post_scores,
        }
    }
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Reduce capped post scores to the 0–100 percentage.
///
/// A score of 0 is "no evidence", not "neutral evidence": it is excluded
/// from the denominator entirely. No nonzero scores at all (or an empty
/// slice) yields exactly 50.0. The mean of the nonzero scores is mapped
/// linearly, `50 + avg * 10`, then clamped to [0, 100].
pub fn aggregate_percentage(post_scores: &[i32]) -> f64 {
    let mut total: i64 = 0;
    let mut scored: i64 = 0;
    for &score in post_scores {
        if score != 0 {
            scored += 1;
            total += i64::from(score);
        }
    }
    if scored == 0 {
        return NEUTRAL_PERCENT;
    }
    let avg = total as f64 / scored as f64;
    (50.0 + avg * 10.0).clamp(0.0, 100.0)
}
