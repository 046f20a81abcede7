//! Decides whether a negative keyword blocks a positive keyword.
//!
//! All comparisons run on normalized text (lower-cased, trimmed):
//!
//! | Negative match | Blocks the positive when…                                   |
//! |----------------|-------------------------------------------------------------|
//! | `EXACT`        | both texts are equal                                        |
//! | `PHRASE`       | the negative is a contiguous substring of the positive      |
//! | `BROAD`        | every word of the negative appears among the positive words |
//!
//! `PHRASE` is a plain substring test, not word-boundary phrase matching, so
//! `"shoe"` as a phrase negative blocks `"shoes sale"`. Empty text on either
//! side never conflicts.

use std::collections::HashSet;
use std::sync::LazyLock;

use adscope_core::MatchType;
use regex::Regex;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid word regex"));

/// Lower-cases and trims `text`.
#[must_use]
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Text normalized once and tokenized once, for repeated comparisons.
#[derive(Debug, Clone)]
pub struct PreparedText {
    normalized: String,
    words: HashSet<String>,
}

impl PreparedText {
    #[must_use]
    pub fn new(text: &str) -> Self {
        let normalized = normalize(text);
        let words = WORD_RE
            .find_iter(&normalized)
            .map(|m| m.as_str().to_owned())
            .collect();
        Self { normalized, words }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }
}

/// Returns `true` when a negative with `negative_text` and
/// `negative_match_type` would suppress `positive_text`.
#[must_use]
pub fn is_conflict(positive_text: &str, negative_text: &str, negative_match_type: MatchType) -> bool {
    is_conflict_prepared(
        &PreparedText::new(positive_text),
        &PreparedText::new(negative_text),
        negative_match_type,
    )
}

/// [`is_conflict`] over pre-normalized text.
#[must_use]
pub fn is_conflict_prepared(
    positive: &PreparedText,
    negative: &PreparedText,
    negative_match_type: MatchType,
) -> bool {
    if positive.is_empty() || negative.is_empty() {
        return false;
    }
    match negative_match_type {
        MatchType::Exact => positive.normalized == negative.normalized,
        MatchType::Phrase => positive.normalized.contains(&negative.normalized),
        MatchType::Broad => {
            !negative.words.is_empty() && negative.words.is_subset(&positive.words)
        }
    }
}
