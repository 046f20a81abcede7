//! Account entities exchanged between the ads data source and the conflict engine.
//!
//! Field names follow the JSON shape served by the ads API adapter
//! (`snake_case`, match types as `"EXACT"` / `"PHRASE"` / `"BROAD"`). Money
//! values are [`Decimal`] and travel as strings on the wire.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How literally a keyword must match a query (or another keyword).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    Exact,
    Phrase,
    Broad,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchType::Exact => write!(f, "EXACT"),
            MatchType::Phrase => write!(f, "PHRASE"),
            MatchType::Broad => write!(f, "BROAD"),
        }
    }
}

/// Where a negative keyword is attached in the account hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegativeLevel {
    Campaign,
    AdGroup,
    SharedList,
}

impl std::fmt::Display for NegativeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NegativeLevel::Campaign => write!(f, "campaign"),
            NegativeLevel::AdGroup => write!(f, "ad group"),
            NegativeLevel::SharedList => write!(f, "shared list"),
        }
    }
}

/// Performance of a keyword over the analyzed window (typically 30 days).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordMetrics {
    #[serde(default)]
    pub impressions: u64,
    #[serde(default)]
    pub clicks: u64,
    #[serde(default)]
    pub cost: Decimal,
    #[serde(default)]
    pub conversion_value: Decimal,
}

/// An active (positive) keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    /// Upstream criterion id; the keyword's identity within one account.
    pub id: String,
    pub text: String,
    pub match_type: MatchType,
    pub campaign_id: String,
    #[serde(default)]
    pub campaign_name: String,
    pub ad_group_id: String,
    #[serde(default)]
    pub ad_group_name: String,
    #[serde(default)]
    pub metrics: KeywordMetrics,
}

/// A negative keyword as stored upstream, without provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegativeKeyword {
    pub text: String,
    pub match_type: MatchType,
}

/// A shared negative keyword list, identified by its shared set id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SharedListRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Negatives attached directly to one ad group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdGroupNegatives {
    pub ad_group_id: String,
    #[serde(default)]
    pub ad_group_name: String,
    #[serde(default)]
    pub negatives: Vec<NegativeKeyword>,
}

/// Negatives attached directly to one campaign and its ad groups.
///
/// Shared lists are not included; they are discovered separately through
/// the campaign's shared set attachments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignNegatives {
    pub campaign_id: String,
    #[serde(default)]
    pub campaign_name: String,
    #[serde(default)]
    pub negatives: Vec<NegativeKeyword>,
    #[serde(default)]
    pub ad_groups: Vec<AdGroupNegatives>,
}

/// One page of an offset-paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total row count, when the upstream reports one.
    #[serde(default)]
    pub total: Option<u64>,
}
