//! Sequential offset pagination over a customer's active keywords.

use std::sync::Arc;

use adscope_core::Keyword;

use crate::error::EngineError;
use crate::guard::RateLimitGuard;
use crate::retry::{retry, RetryHook, RetryPolicy};
use crate::source::AdsDataSource;

/// Default ceiling on keywords fetched in one load.
///
/// The page budget is derived from it, `MAX_KEYWORDS / page_size` plus the
/// trailing empty page, so small pages do not cap a large account.
pub const MAX_KEYWORDS: u64 = 2_000_000;

/// Pages through active keywords one request at a time.
pub struct KeywordLoader {
    source: Arc<dyn AdsDataSource>,
    guard: RateLimitGuard,
    policy: RetryPolicy,
    on_retry: RetryHook,
    max_keywords: u64,
}

impl KeywordLoader {
    #[must_use]
    pub fn new(
        source: Arc<dyn AdsDataSource>,
        guard: RateLimitGuard,
        policy: RetryPolicy,
        on_retry: RetryHook,
    ) -> Self {
        Self {
            source,
            guard,
            policy,
            on_retry,
            max_keywords: MAX_KEYWORDS,
        }
    }

    #[must_use]
    pub fn with_max_keywords(mut self, max_keywords: u64) -> Self {
        self.max_keywords = max_keywords;
        self
    }

    /// Loads every active keyword, optionally restricted to `campaign_ids`.
    ///
    /// Page *i* is requested at offset `i * page_size`, strictly in order, so
    /// a failed load can be resumed from a known offset. Loading stops at the
    /// first short page, or once the upstream-reported total is reached.
    ///
    /// **All-or-nothing**: if any page fails after retries, keywords from
    /// earlier pages are discarded and the error is returned. A partial
    /// keyword set would under-report conflicts without any signal.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Validation`] if `page_size` or `campaign_ids` break
    ///   the guard's caps (before any request).
    /// - [`EngineError::KeywordPage`] if a page fails permanently or
    ///   exhausts its retries.
    /// - [`EngineError::PaginationLimit`] once more than the keyword ceiling
    ///   ([`MAX_KEYWORDS`] by default) would be fetched.
    pub async fn load(
        &self,
        customer_id: &str,
        campaign_ids: Option<&[String]>,
        page_size: u32,
    ) -> Result<Vec<Keyword>, EngineError> {
        self.guard.validate_page_size(page_size)?;
        if let Some(ids) = campaign_ids {
            self.guard.validate_ids("campaign_ids", ids)?;
        }

        let max_pages = self.max_keywords.div_ceil(u64::from(page_size)) + 1;
        let mut keywords: Vec<Keyword> = Vec::new();
        for page_index in 0..max_pages {
            let offset = page_index * u64::from(page_size);
            let page = retry(&self.policy, &*self.on_retry, || {
                self.source
                    .fetch_keywords(customer_id, campaign_ids, page_size, offset)
            })
            .await
            .map_err(|failure| EngineError::KeywordPage {
                offset,
                attempts: failure.attempts,
                source: failure.error,
            })?;

            let received = page.items.len();
            keywords.extend(page.items);
            tracing::debug!(
                customer_id,
                page = page_index,
                offset,
                received,
                "loaded keyword page"
            );

            let short_page = received < page_size as usize;
            let reached_total = page
                .total
                .is_some_and(|total| offset + received as u64 >= total);
            if short_page || reached_total {
                tracing::info!(
                    customer_id,
                    pages = page_index + 1,
                    keywords = keywords.len(),
                    "keyword load complete"
                );
                return Ok(keywords);
            }
        }

        Err(EngineError::PaginationLimit {
            customer_id: customer_id.to_owned(),
            max_keywords: self.max_keywords,
        })
    }
}
