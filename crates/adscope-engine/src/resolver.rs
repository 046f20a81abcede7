//! Builds the deduplicated negative keyword surface for a set of campaigns.
//!
//! Sources, in discovery order per campaign:
//! 1. campaign-level negatives,
//! 2. ad-group-level negatives,
//! 3. shared negative lists attached to the campaign, in attachment order.
//!
//! Entries are keyed by `(normalized text, match type)`. The first
//! provenance seen for a key stays first; later arrivals are appended to the
//! entry's provenance list rather than creating a new negative.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use adscope_core::{CampaignNegatives, Keyword, MatchType, NegativeKeyword, NegativeLevel, SharedListRef};
use serde::Serialize;
use tokio::time::Instant;

use crate::fetcher::fetch_all;
use crate::matcher::{normalize, PreparedText};
use crate::retry::{retry, RetryHook, RetryPolicy};
use crate::source::AdsDataSource;

/// Where one negative keyword is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub level: NegativeLevel,
    pub campaign_id: String,
    pub campaign_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ad_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ad_group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_list: Option<SharedListRef>,
}

impl Provenance {
    /// Whether a negative attached here suppresses `keyword`.
    #[must_use]
    pub fn applies_to(&self, keyword: &Keyword) -> bool {
        if self.campaign_id != keyword.campaign_id {
            return false;
        }
        match self.level {
            NegativeLevel::Campaign | NegativeLevel::SharedList => true,
            NegativeLevel::AdGroup => self.ad_group_id.as_deref() == Some(keyword.ad_group_id.as_str()),
        }
    }
}

/// One distinct negative and every place it is attached.
#[derive(Debug, Clone)]
pub struct NegativeEntry {
    pub text: PreparedText,
    pub match_type: MatchType,
    /// Discovery order; never empty.
    pub provenances: Vec<Provenance>,
}

/// All distinct negatives that can affect the analyzed campaigns.
#[derive(Debug, Default)]
pub struct NegativeSurface {
    entries: Vec<NegativeEntry>,
    index: HashMap<(String, MatchType), usize>,
}

impl NegativeSurface {
    /// Adds `negative` with `provenance`.
    ///
    /// Returns `true` when this created a new entry. Blank negatives are
    /// ignored since they can never conflict.
    pub fn insert(&mut self, negative: &NegativeKeyword, provenance: Provenance) -> bool {
        let key = (normalize(&negative.text), negative.match_type);
        if key.0.is_empty() {
            return false;
        }
        if let Some(&idx) = self.index.get(&key) {
            let entry = &mut self.entries[idx];
            if !entry.provenances.contains(&provenance) {
                entry.provenances.push(provenance);
            }
            return false;
        }
        self.index.insert(key, self.entries.len());
        self.entries.push(NegativeEntry {
            text: PreparedText::new(&negative.text),
            match_type: negative.match_type,
            provenances: vec![provenance],
        });
        true
    }

    #[must_use]
    pub fn entries(&self) -> &[NegativeEntry] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, text: &str, match_type: MatchType) -> Option<&NegativeEntry> {
        self.index
            .get(&(normalize(text), match_type))
            .map(|&idx| &self.entries[idx])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Memoized shared-list contents, keyed by shared set id.
///
/// Owned by whoever constructs the resolver: a fresh cache per analysis
/// gives no cross-run reuse, a long-lived one is shared until
/// [`invalidate`](Self::invalidate) or [`clear`](Self::clear). Only
/// successful fetches are stored.
#[derive(Debug, Clone, Default)]
pub struct SharedListCache {
    inner: Arc<Mutex<HashMap<String, Arc<Vec<NegativeKeyword>>>>>,
}

impl SharedListCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, shared_set_id: &str) -> Option<Arc<Vec<NegativeKeyword>>> {
        self.lock().get(shared_set_id).cloned()
    }

    pub fn insert(&self, shared_set_id: String, negatives: Arc<Vec<NegativeKeyword>>) {
        self.lock().insert(shared_set_id, negatives);
    }

    /// Drops one list so the next resolution refetches it.
    pub fn invalidate(&self, shared_set_id: &str) -> bool {
        self.lock().remove(shared_set_id).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Vec<NegativeKeyword>>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A negative source that could not be read and was left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSource {
    /// Human-readable resource, e.g. `shared list 42 (Brand exclusions)`.
    pub resource: String,
    pub attempts: u32,
    pub reason: String,
}

/// Negative surface plus everything that went missing while building it.
#[derive(Debug, Default)]
pub struct Resolution {
    pub surface: NegativeSurface,
    pub skipped: Vec<SkippedSource>,
    /// `true` if the shared-list batch deadline cut fetching short.
    pub timed_out: bool,
    /// Distinct shared lists whose contents made it into the surface.
    pub shared_lists_considered: usize,
}

/// Assembles campaign, ad-group, and shared-list negatives.
pub struct NegativeResolver {
    source: Arc<dyn AdsDataSource>,
    policy: RetryPolicy,
    on_retry: RetryHook,
    concurrency_limit: usize,
    batch_timeout: Option<Duration>,
    cache: SharedListCache,
}

impl NegativeResolver {
    #[must_use]
    pub fn new(
        source: Arc<dyn AdsDataSource>,
        policy: RetryPolicy,
        on_retry: RetryHook,
        cache: SharedListCache,
    ) -> Self {
        Self {
            source,
            policy,
            on_retry,
            concurrency_limit: 5,
            batch_timeout: None,
            cache,
        }
    }

    #[must_use]
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit.max(1);
        self
    }

    /// Deadline shared by the attachment and list-content fetch batches.
    #[must_use]
    pub fn with_batch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.batch_timeout = timeout;
        self
    }

    #[must_use]
    pub fn cache(&self) -> &SharedListCache {
        &self.cache
    }

    /// Builds the negative surface for `campaigns`.
    ///
    /// Never fails: unreadable shared lists and campaign attachments are
    /// logged and reported in [`Resolution::skipped`], leaving a possibly
    /// incomplete (and therefore conservative) surface.
    pub async fn resolve(&self, customer_id: &str, campaigns: &[CampaignNegatives]) -> Resolution {
        let mut resolution = Resolution::default();
        if campaigns.is_empty() {
            return resolution;
        }
        let deadline = self.batch_timeout.map(|t| Instant::now() + t);

        let inventory = self.list_inventory(customer_id).await;

        // Shared set attachments, one call per campaign.
        let campaign_ids: Vec<String> = campaigns.iter().map(|c| c.campaign_id.clone()).collect();
        let source = &self.source;
        let attachments = fetch_all(
            &campaign_ids,
            self.concurrency_limit,
            deadline,
            &self.policy,
            &*self.on_retry,
            |campaign_id| async move {
                source
                    .fetch_campaign_shared_sets(customer_id, &campaign_id)
                    .await
            },
        )
        .await;
        resolution.timed_out |= attachments.timed_out;

        let mut attached: HashMap<String, Vec<SharedListRef>> = HashMap::new();
        for (campaign_id, result) in attachments.results {
            match result {
                Ok(lists) => {
                    attached.insert(campaign_id, lists);
                }
                Err(failure) => {
                    tracing::warn!(
                        customer_id,
                        campaign_id = %campaign_id,
                        attempts = failure.attempts,
                        error = %failure.error,
                        "skipping shared lists of campaign: attachments unreadable"
                    );
                    resolution.skipped.push(SkippedSource {
                        resource: format!("shared set attachments of campaign {campaign_id}"),
                        attempts: failure.attempts,
                        reason: failure.error.to_string(),
                    });
                }
            }
        }
        for campaign_id in attachments.pending {
            resolution.skipped.push(SkippedSource {
                resource: format!("shared set attachments of campaign {campaign_id}"),
                attempts: 0,
                reason: "shared list batch deadline exceeded".to_owned(),
            });
        }

        let contents = self
            .fetch_list_contents(customer_id, campaigns, &attached, &inventory, deadline, &mut resolution)
            .await;
        resolution.shared_lists_considered = contents.len();

        for campaign in campaigns {
            add_direct_negatives(&mut resolution.surface, campaign);
            let Some(lists) = attached.get(&campaign.campaign_id) else {
                continue;
            };
            for list in lists {
                let Some(negatives) = contents.get(&list.id) else {
                    continue;
                };
                let shared_list = SharedListRef {
                    id: list.id.clone(),
                    name: list_name(list, &inventory),
                };
                for negative in negatives.iter() {
                    resolution.surface.insert(
                        negative,
                        Provenance {
                            level: NegativeLevel::SharedList,
                            campaign_id: campaign.campaign_id.clone(),
                            campaign_name: campaign.campaign_name.clone(),
                            ad_group_id: None,
                            ad_group_name: None,
                            shared_list: Some(shared_list.clone()),
                        },
                    );
                }
            }
        }

        tracing::info!(
            customer_id,
            campaigns = campaigns.len(),
            negatives = resolution.surface.len(),
            shared_lists = resolution.shared_lists_considered,
            skipped = resolution.skipped.len(),
            timed_out = resolution.timed_out,
            "negative surface resolved"
        );
        resolution
    }

    /// Account-wide shared list names; only used to label provenances.
    async fn list_inventory(&self, customer_id: &str) -> HashMap<String, String> {
        match retry(&self.policy, &*self.on_retry, || {
            self.source.fetch_shared_negative_lists(customer_id)
        })
        .await
        {
            Ok(lists) => lists.into_iter().map(|l| (l.id, l.name)).collect(),
            Err(failure) => {
                tracing::warn!(
                    customer_id,
                    attempts = failure.attempts,
                    error = %failure.error,
                    "shared list inventory unavailable; list names may be missing"
                );
                HashMap::new()
            }
        }
    }

    /// Fetches (or reads from cache) the contents of every attached list once.
    async fn fetch_list_contents(
        &self,
        customer_id: &str,
        campaigns: &[CampaignNegatives],
        attached: &HashMap<String, Vec<SharedListRef>>,
        inventory: &HashMap<String, String>,
        deadline: Option<Instant>,
        resolution: &mut Resolution,
    ) -> HashMap<String, Arc<Vec<NegativeKeyword>>> {
        let mut seen = HashSet::new();
        let mut wanted: Vec<&SharedListRef> = Vec::new();
        for campaign in campaigns {
            for list in attached.get(&campaign.campaign_id).into_iter().flatten() {
                if seen.insert(list.id.as_str()) {
                    wanted.push(list);
                }
            }
        }

        let mut contents = HashMap::with_capacity(wanted.len());
        let mut to_fetch = Vec::new();
        for list in &wanted {
            match self.cache.get(&list.id) {
                Some(cached) => {
                    contents.insert(list.id.clone(), cached);
                }
                None => to_fetch.push(list.id.clone()),
            }
        }
        if to_fetch.is_empty() {
            return contents;
        }

        let source = &self.source;
        let fetched = fetch_all(
            &to_fetch,
            self.concurrency_limit,
            deadline,
            &self.policy,
            &*self.on_retry,
            |shared_set_id| async move {
                source
                    .fetch_shared_set_negatives(customer_id, &shared_set_id)
                    .await
            },
        )
        .await;
        resolution.timed_out |= fetched.timed_out;

        let label = |id: &str| {
            let name = wanted
                .iter()
                .find(|l| l.id == id)
                .map(|l| list_name(l, inventory))
                .unwrap_or_default();
            if name.is_empty() {
                format!("shared list {id}")
            } else {
                format!("shared list {id} ({name})")
            }
        };

        for (id, result) in fetched.results {
            match result {
                Ok(negatives) => {
                    let negatives = Arc::new(negatives);
                    self.cache.insert(id.clone(), Arc::clone(&negatives));
                    contents.insert(id, negatives);
                }
                Err(failure) => {
                    tracing::warn!(
                        customer_id,
                        shared_set_id = %id,
                        attempts = failure.attempts,
                        exhausted = failure.exhausted,
                        error = %failure.error,
                        "skipping unreadable shared negative list"
                    );
                    resolution.skipped.push(SkippedSource {
                        resource: label(&id),
                        attempts: failure.attempts,
                        reason: failure.error.to_string(),
                    });
                }
            }
        }
        for id in fetched.pending {
            resolution.skipped.push(SkippedSource {
                resource: label(&id),
                attempts: 0,
                reason: "shared list batch deadline exceeded".to_owned(),
            });
        }
        contents
    }
}

fn add_direct_negatives(surface: &mut NegativeSurface, campaign: &CampaignNegatives) {
    for negative in &campaign.negatives {
        surface.insert(
            negative,
            Provenance {
                level: NegativeLevel::Campaign,
                campaign_id: campaign.campaign_id.clone(),
                campaign_name: campaign.campaign_name.clone(),
                ad_group_id: None,
                ad_group_name: None,
                shared_list: None,
            },
        );
    }
    for ad_group in &campaign.ad_groups {
        for negative in &ad_group.negatives {
            surface.insert(
                negative,
                Provenance {
                    level: NegativeLevel::AdGroup,
                    campaign_id: campaign.campaign_id.clone(),
                    campaign_name: campaign.campaign_name.clone(),
                    ad_group_id: Some(ad_group.ad_group_id.clone()),
                    ad_group_name: Some(ad_group.ad_group_name.clone()),
                    shared_list: None,
                },
            );
        }
    }
}

fn list_name(list: &SharedListRef, inventory: &HashMap<String, String>) -> String {
    if list.name.is_empty() {
        inventory.get(&list.id).cloned().unwrap_or_default()
    } else {
        list.name.clone()
    }
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod tests;
