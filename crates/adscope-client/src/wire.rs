//! Response bodies of the ads API, one struct per endpoint.

use adscope_core::{CampaignNegatives, Keyword, NegativeKeyword, SharedListRef};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct KeywordsResponse {
    #[serde(default)]
    pub keywords: Vec<Keyword>,
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SharedListsResponse {
    #[serde(default)]
    pub shared_lists: Vec<SharedListRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SharedSetsResponse {
    #[serde(default)]
    pub shared_sets: Vec<SharedListRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NegativesResponse {
    #[serde(default)]
    pub negatives: Vec<NegativeKeyword>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CampaignNegativesResponse {
    #[serde(default)]
    pub campaigns: Vec<CampaignNegatives>,
}

/// `{"error": {"code": "...", "message": "..."}}` on non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}
