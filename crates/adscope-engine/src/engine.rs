//! Orchestrates one conflict analysis end to end.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use adscope_core::{CampaignNegatives, EngineSettings, Keyword};
use chrono::Utc;

use crate::aggregate::{find_conflicts, implementation_plan, rank_conflicts, revenue_recovery};
use crate::error::EngineError;
use crate::guard::RateLimitGuard;
use crate::loader::KeywordLoader;
use crate::report::ConflictReport;
use crate::resolver::{NegativeResolver, SharedListCache};
use crate::retry::{logging_hook, retry, RetryHook, RetryPolicy};
use crate::source::AdsDataSource;

/// Per-call knobs for [`ConflictEngine::analyze`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Restrict the audit to these campaigns; `None` audits every campaign
    /// with active keywords.
    pub campaign_ids: Option<Vec<String>>,
    pub concurrency_limit: usize,
    pub keywords_page_size: u32,
    pub max_conflicts_per_campaign: usize,
    pub max_total_conflicts: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::from(&EngineSettings::default())
    }
}

impl From<&EngineSettings> for AnalysisOptions {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            campaign_ids: None,
            concurrency_limit: settings.concurrency_limit,
            keywords_page_size: settings.keywords_page_size,
            max_conflicts_per_campaign: settings.max_conflicts_per_campaign,
            max_total_conflicts: settings.max_total_conflicts,
        }
    }
}

/// Finds negative keywords that block active keywords in one account.
///
/// The engine holds no per-run state. Unless a [`SharedListCache`] is
/// injected with [`with_shared_list_cache`](Self::with_shared_list_cache),
/// every analysis fetches shared lists afresh.
pub struct ConflictEngine {
    source: Arc<dyn AdsDataSource>,
    guard: RateLimitGuard,
    policy: RetryPolicy,
    on_retry: RetryHook,
    shared_list_timeout: Option<Duration>,
    analysis_timeout: Option<Duration>,
    cache: Option<SharedListCache>,
}

fn secs(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

impl ConflictEngine {
    #[must_use]
    pub fn new(source: Arc<dyn AdsDataSource>, settings: &EngineSettings) -> Self {
        Self {
            source,
            guard: RateLimitGuard::from(settings),
            policy: RetryPolicy::from(settings),
            on_retry: logging_hook(),
            shared_list_timeout: secs(settings.shared_list_timeout_secs),
            analysis_timeout: secs(settings.analysis_timeout_secs),
            cache: None,
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_retry_hook(mut self, on_retry: RetryHook) -> Self {
        self.on_retry = on_retry;
        self
    }

    /// Reuses `cache` across analyses run by this engine.
    #[must_use]
    pub fn with_shared_list_cache(mut self, cache: SharedListCache) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn with_shared_list_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.shared_list_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_analysis_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.analysis_timeout = timeout;
        self
    }

    /// Runs one analysis to completion or deadline.
    ///
    /// # Errors
    ///
    /// See [`analyze_until`](Self::analyze_until).
    pub async fn analyze(
        &self,
        customer_id: &str,
        options: &AnalysisOptions,
    ) -> Result<ConflictReport, EngineError> {
        self.analyze_until(customer_id, options, std::future::pending())
            .await
    }

    /// Runs one analysis, abandoning it as soon as `cancel` resolves.
    ///
    /// Cancellation drops every in-flight request; no partial report is
    /// produced.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Validation`] for bad input, before any request.
    /// - [`EngineError::KeywordPage`] / [`EngineError::PaginationLimit`] when
    ///   keywords cannot be loaded completely.
    /// - [`EngineError::CampaignNegatives`] when direct negatives cannot be read.
    /// - [`EngineError::Timeout`] when the analysis deadline passes.
    /// - [`EngineError::Cancelled`] when `cancel` resolves first.
    pub async fn analyze_until<C>(
        &self,
        customer_id: &str,
        options: &AnalysisOptions,
        cancel: C,
    ) -> Result<ConflictReport, EngineError>
    where
        C: Future<Output = ()>,
    {
        let bounded = async {
            match self.analysis_timeout {
                Some(after) => tokio::time::timeout(after, self.run(customer_id, options))
                    .await
                    .unwrap_or(Err(EngineError::Timeout { after })),
                None => self.run(customer_id, options).await,
            }
        };

        tokio::select! {
            biased;
            () = cancel => {
                tracing::warn!(customer_id, "analysis cancelled; discarding partial results");
                Err(EngineError::Cancelled)
            }
            result = bounded => {
                if let Err(EngineError::Timeout { after }) = &result {
                    tracing::warn!(customer_id, timeout_secs = after.as_secs(), "analysis deadline exceeded");
                }
                result
            }
        }
    }

    async fn run(
        &self,
        customer_id: &str,
        options: &AnalysisOptions,
    ) -> Result<ConflictReport, EngineError> {
        let customer_id = self.guard.validate_customer_id(customer_id)?;
        self.guard.validate_concurrency(options.concurrency_limit)?;
        self.guard.validate_page_size(options.keywords_page_size)?;
        if let Some(ids) = &options.campaign_ids {
            self.guard.validate_ids("campaign_ids", ids)?;
        }

        tracing::info!(
            customer_id = %customer_id,
            campaigns = options.campaign_ids.as_ref().map_or(0, Vec::len),
            "starting conflict analysis"
        );

        let loader = KeywordLoader::new(
            Arc::clone(&self.source),
            self.guard,
            self.policy.clone(),
            Arc::clone(&self.on_retry),
        );
        let keywords = loader
            .load(
                &customer_id,
                options.campaign_ids.as_deref(),
                options.keywords_page_size,
            )
            .await?;

        let campaign_ids = match &options.campaign_ids {
            Some(ids) => distinct(ids.iter().map(String::as_str)),
            None => distinct(keywords.iter().map(|k| k.campaign_id.as_str())),
        };
        let campaigns = self
            .campaign_negatives(&customer_id, &campaign_ids, &keywords)
            .await?;

        let resolver = NegativeResolver::new(
            Arc::clone(&self.source),
            self.policy.clone(),
            Arc::clone(&self.on_retry),
            self.cache.clone().unwrap_or_default(),
        )
        .with_concurrency_limit(options.concurrency_limit)
        .with_batch_timeout(self.shared_list_timeout);
        let resolution = resolver.resolve(&customer_id, &campaigns).await;

        let raw = find_conflicts(&keywords, &resolution.surface);
        let raw_count = raw.len();
        let conflicts = rank_conflicts(
            raw,
            options.max_conflicts_per_campaign,
            options.max_total_conflicts,
        );
        let report = ConflictReport {
            estimated_monthly_revenue_recovery: revenue_recovery(&conflicts),
            implementation_steps: implementation_plan(&conflicts),
            customer_id,
            generated_at: Utc::now(),
            total_keywords_analyzed: keywords.len(),
            total_negatives_considered: resolution.surface.len(),
            conflicts,
            skipped_sources: resolution.skipped,
            shared_list_fetch_timed_out: resolution.timed_out,
        };

        tracing::info!(
            customer_id = %report.customer_id,
            keywords = report.total_keywords_analyzed,
            negatives = report.total_negatives_considered,
            conflicts_found = raw_count,
            conflicts_reported = report.conflicts.len(),
            recovery = %report.estimated_monthly_revenue_recovery,
            partial = report.is_partial(),
            "conflict analysis complete"
        );
        Ok(report)
    }

    /// Direct negatives for `campaign_ids`, in that order.
    ///
    /// Campaigns the source returns nothing for get an empty entry named
    /// after their keywords, so their shared lists are still resolved.
    async fn campaign_negatives(
        &self,
        customer_id: &str,
        campaign_ids: &[String],
        keywords: &[Keyword],
    ) -> Result<Vec<CampaignNegatives>, EngineError> {
        let mut found: HashMap<String, CampaignNegatives> = HashMap::new();
        for chunk in self.guard.chunk_ids(campaign_ids) {
            let batch = retry(&self.policy, &*self.on_retry, || {
                self.source.fetch_campaign_negatives(customer_id, chunk)
            })
            .await
            .map_err(|failure| EngineError::CampaignNegatives {
                campaign_count: chunk.len(),
                attempts: failure.attempts,
                source: failure.error,
            })?;
            for campaign in batch {
                found.insert(campaign.campaign_id.clone(), campaign);
            }
        }

        let campaigns: Vec<CampaignNegatives> = campaign_ids
            .iter()
            .map(|id| {
                found.remove(id).unwrap_or_else(|| CampaignNegatives {
                    campaign_id: id.clone(),
                    campaign_name: keywords
                        .iter()
                        .find(|k| &k.campaign_id == id)
                        .map(|k| k.campaign_name.clone())
                        .unwrap_or_default(),
                    negatives: Vec::new(),
                    ad_groups: Vec::new(),
                })
            })
            .collect();
        tracing::debug!(
            customer_id,
            campaigns = campaigns.len(),
            "loaded campaign and ad group negatives"
        );
        Ok(campaigns)
    }
}

fn distinct<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).map(str::to_owned).collect()
}
