//! Serializable output of one analysis.

use adscope_core::{Keyword, MatchType};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::resolver::{Provenance, SkippedSource};

/// The blocked positive keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordRef {
    pub id: String,
    pub text: String,
    pub match_type: MatchType,
    pub ad_group_id: String,
    pub ad_group_name: String,
}

impl From<&Keyword> for KeywordRef {
    fn from(keyword: &Keyword) -> Self {
        Self {
            id: keyword.id.clone(),
            text: keyword.text.clone(),
            match_type: keyword.match_type,
            ad_group_id: keyword.ad_group_id.clone(),
            ad_group_name: keyword.ad_group_name.clone(),
        }
    }
}

/// The blocking negative, in normalized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NegativeRef {
    pub text: String,
    pub match_type: MatchType,
}

/// One negative keyword suppressing one active keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub keyword: KeywordRef,
    pub negative: NegativeRef,
    /// First place (in discovery order) the negative is attached that
    /// reaches this keyword.
    pub provenance: Provenance,
    /// Other attachments of the same negative that also reach the keyword.
    pub additional_sources: usize,
    pub campaign_id: String,
    pub campaign_name: String,
    pub estimated_revenue_loss: Decimal,
    pub impressions_lost: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImplementationStep {
    pub order: usize,
    pub title: String,
    pub detail: String,
    pub conflict_count: usize,
    pub estimated_revenue_recovery: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConflictReport {
    pub customer_id: String,
    pub generated_at: DateTime<Utc>,
    pub total_keywords_analyzed: usize,
    pub total_negatives_considered: usize,
    /// Ranked by revenue loss, then impressions lost.
    pub conflicts: Vec<Conflict>,
    /// Each blocked keyword counted once, however many negatives block it.
    pub estimated_monthly_revenue_recovery: Decimal,
    pub implementation_steps: Vec<ImplementationStep>,
    pub skipped_sources: Vec<SkippedSource>,
    pub shared_list_fetch_timed_out: bool,
}

impl ConflictReport {
    /// `true` when some negative source was unavailable, so the conflict
    /// list may be incomplete.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.shared_list_fetch_timed_out || !self.skipped_sources.is_empty()
    }
}
