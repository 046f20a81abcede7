//! The capability the engine needs from an ads account backend.

use adscope_core::{CampaignNegatives, Keyword, NegativeKeyword, Page, SharedListRef};
use async_trait::async_trait;

use crate::error::SourceError;

/// Read access to one ads account backend.
///
/// Implementations perform exactly one upstream request per call. Retries,
/// pagination, and concurrency limits are the engine's job, so adapters
/// should surface transient failures as the matching [`SourceError`] variant
/// instead of retrying internally.
#[async_trait]
pub trait AdsDataSource: Send + Sync {
    /// Returns one page of active keywords, `page_size` rows starting at `offset`.
    async fn fetch_keywords(
        &self,
        customer_id: &str,
        campaign_ids: Option<&[String]>,
        page_size: u32,
        offset: u64,
    ) -> Result<Page<Keyword>, SourceError>;

    /// Lists every shared negative keyword list in the account.
    async fn fetch_shared_negative_lists(
        &self,
        customer_id: &str,
    ) -> Result<Vec<SharedListRef>, SourceError>;

    /// Lists the shared negative lists attached to one campaign.
    async fn fetch_campaign_shared_sets(
        &self,
        customer_id: &str,
        campaign_id: &str,
    ) -> Result<Vec<SharedListRef>, SourceError>;

    /// Returns the member negatives of one shared list.
    async fn fetch_shared_set_negatives(
        &self,
        customer_id: &str,
        shared_set_id: &str,
    ) -> Result<Vec<NegativeKeyword>, SourceError>;

    /// Returns campaign- and ad-group-level negatives for the given campaigns.
    ///
    /// Callers keep `campaign_ids` within the request cap; campaigns without
    /// any direct negatives may be omitted from the result.
    async fn fetch_campaign_negatives(
        &self,
        customer_id: &str,
        campaign_ids: &[String],
    ) -> Result<Vec<CampaignNegatives>, SourceError>;
}
