//! End-to-end analysis against an in-memory account.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use adscope_core::{
    AdGroupNegatives, CampaignNegatives, EngineSettings, Keyword, KeywordMetrics, MatchType,
    NegativeKeyword, NegativeLevel, Page, SharedListRef,
};
use adscope_engine::{
    AdsDataSource, AnalysisOptions, ConflictEngine, EngineError, RetryPolicy, SharedListCache,
    SourceError, ValidationError,
};
use async_trait::async_trait;
use rust_decimal::Decimal;

#[derive(Default)]
struct MemoryAccount {
    keywords: Vec<Keyword>,
    campaigns: Vec<CampaignNegatives>,
    attachments: HashMap<String, Vec<SharedListRef>>,
    lists: HashMap<String, Vec<NegativeKeyword>>,
    campaign_negatives_error: Option<SourceError>,
    /// Every keyword page takes this long.
    page_latency: Option<Duration>,
    calls: AtomicUsize,
}

#[async_trait]
impl AdsDataSource for MemoryAccount {
    async fn fetch_keywords(
        &self,
        _customer_id: &str,
        campaign_ids: Option<&[String]>,
        page_size: u32,
        offset: u64,
    ) -> Result<Page<Keyword>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.page_latency {
            tokio::time::sleep(latency).await;
        }
        let items: Vec<Keyword> = self
            .keywords
            .iter()
            .filter(|k| campaign_ids.is_none_or(|ids| ids.contains(&k.campaign_id)))
            .skip(usize::try_from(offset).unwrap())
            .take(page_size as usize)
            .cloned()
            .collect();
        Ok(Page { items, total: None })
    }

    async fn fetch_shared_negative_lists(
        &self,
        _customer_id: &str,
    ) -> Result<Vec<SharedListRef>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.attachments.values().flatten().cloned().collect())
    }

    async fn fetch_campaign_shared_sets(
        &self,
        _customer_id: &str,
        campaign_id: &str,
    ) -> Result<Vec<SharedListRef>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.attachments.get(campaign_id).cloned().unwrap_or_default())
    }

    async fn fetch_shared_set_negatives(
        &self,
        _customer_id: &str,
        shared_set_id: &str,
    ) -> Result<Vec<NegativeKeyword>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.lists
            .get(shared_set_id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                resource: format!("shared set {shared_set_id}"),
            })
    }

    async fn fetch_campaign_negatives(
        &self,
        _customer_id: &str,
        campaign_ids: &[String],
    ) -> Result<Vec<CampaignNegatives>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.campaign_negatives_error {
            return Err(err.clone());
        }
        Ok(self
            .campaigns
            .iter()
            .filter(|c| campaign_ids.contains(&c.campaign_id))
            .cloned()
            .collect())
    }
}

fn keyword(id: &str, text: &str, campaign_id: &str, ad_group_id: &str, value: i64) -> Keyword {
    Keyword {
        id: id.to_owned(),
        text: text.to_owned(),
        match_type: MatchType::Broad,
        campaign_id: campaign_id.to_owned(),
        campaign_name: format!("Campaign {campaign_id}"),
        ad_group_id: ad_group_id.to_owned(),
        ad_group_name: format!("Ad group {ad_group_id}"),
        metrics: KeywordMetrics {
            impressions: 1_200,
            clicks: 80,
            cost: Decimal::new(4_000, 2),
            conversion_value: Decimal::from(value),
        },
    }
}

fn neg(text: &str, match_type: MatchType) -> NegativeKeyword {
    NegativeKeyword {
        text: text.to_owned(),
        match_type,
    }
}

fn campaign(id: &str, negatives: Vec<NegativeKeyword>) -> CampaignNegatives {
    CampaignNegatives {
        campaign_id: id.to_owned(),
        campaign_name: format!("Campaign {id}"),
        negatives,
        ad_groups: Vec::new(),
    }
}

fn engine(account: &Arc<MemoryAccount>) -> ConflictEngine {
    ConflictEngine::new(Arc::clone(account) as Arc<dyn AdsDataSource>, &EngineSettings::default())
        .with_retry_policy(RetryPolicy::immediate(3))
}

#[tokio::test]
async fn exact_pizza_negative_leaves_pizza_delivery_alone() {
    let account = Arc::new(MemoryAccount {
        keywords: vec![keyword("k1", "pizza delivery", "1", "10", 640)],
        campaigns: vec![campaign("1", vec![neg("pizza", MatchType::Exact)])],
        ..MemoryAccount::default()
    });

    let report = engine(&account)
        .analyze("123-456-7890", &AnalysisOptions::default())
        .await
        .unwrap();

    assert_eq!(report.customer_id, "1234567890");
    assert_eq!(report.total_keywords_analyzed, 1);
    assert_eq!(report.total_negatives_considered, 1);
    assert!(report.conflicts.is_empty());
    assert!(report.implementation_steps.is_empty());
    assert_eq!(report.estimated_monthly_revenue_recovery, Decimal::ZERO);
}

#[tokio::test]
async fn broad_pizza_negative_blocks_pizza_delivery() {
    let account = Arc::new(MemoryAccount {
        keywords: vec![keyword("k1", "pizza delivery", "1", "10", 640)],
        campaigns: vec![campaign("1", vec![neg("pizza", MatchType::Broad)])],
        ..MemoryAccount::default()
    });

    let report = engine(&account)
        .analyze("1234567890", &AnalysisOptions::default())
        .await
        .unwrap();

    assert_eq!(report.conflicts.len(), 1);
    let conflict = &report.conflicts[0];
    assert_eq!(conflict.keyword.id, "k1");
    assert_eq!(conflict.estimated_revenue_loss, Decimal::from(640));
    assert_eq!(conflict.impressions_lost, 1_200);
    assert_eq!(report.estimated_monthly_revenue_recovery, Decimal::from(640));
    // One individual step plus the closing re-run.
    assert_eq!(report.implementation_steps.len(), 2);
    assert!(!report.is_partial());
}

#[tokio::test]
async fn every_negative_level_is_considered() {
    let mut direct = campaign("1", Vec::new());
    direct.ad_groups.push(AdGroupNegatives {
        ad_group_id: "10".to_owned(),
        ad_group_name: "Shoes".to_owned(),
        negatives: vec![neg("cheap", MatchType::Phrase)],
    });
    let account = Arc::new(MemoryAccount {
        keywords: vec![
            keyword("k1", "cheap shoes", "1", "10", 300),
            keyword("k2", "cheap boots", "1", "11", 200),
            keyword("k3", "free returns shoes", "2", "20", 100),
        ],
        campaigns: vec![direct],
        attachments: HashMap::from([(
            "2".to_owned(),
            vec![SharedListRef {
                id: "77".to_owned(),
                name: "Freebies".to_owned(),
            }],
        )]),
        lists: HashMap::from([("77".to_owned(), vec![neg("free", MatchType::Broad)])]),
        ..MemoryAccount::default()
    });

    let report = engine(&account)
        .analyze("1234567890", &AnalysisOptions::default())
        .await
        .unwrap();

    let found: Vec<_> = report
        .conflicts
        .iter()
        .map(|c| (c.keyword.id.as_str(), c.provenance.level))
        .collect();
    assert_eq!(
        found,
        vec![("k1", NegativeLevel::AdGroup), ("k3", NegativeLevel::SharedList)]
    );
    assert_eq!(report.total_negatives_considered, 2);
}

#[tokio::test]
async fn missing_shared_list_is_reported_not_fatal() {
    let account = Arc::new(MemoryAccount {
        keywords: vec![keyword("k1", "running shoes", "1", "10", 90)],
        campaigns: vec![campaign("1", vec![neg("shoes", MatchType::Broad)])],
        attachments: HashMap::from([(
            "1".to_owned(),
            vec![SharedListRef {
                id: "404".to_owned(),
                name: "Deleted".to_owned(),
            }],
        )]),
        ..MemoryAccount::default()
    });

    let report = engine(&account)
        .analyze("1234567890", &AnalysisOptions::default())
        .await
        .unwrap();

    assert_eq!(report.conflicts.len(), 1);
    assert!(report.is_partial());
    assert_eq!(report.skipped_sources.len(), 1);
    assert_eq!(report.skipped_sources[0].resource, "shared list 404 (Deleted)");
}

#[tokio::test]
async fn invalid_input_is_rejected_before_any_request() {
    let account = Arc::new(MemoryAccount::default());
    let engine = engine(&account);

    let oversized = AnalysisOptions {
        keywords_page_size: 20_000,
        ..AnalysisOptions::default()
    };
    let too_many = AnalysisOptions {
        campaign_ids: Some((0..201).map(|i| i.to_string()).collect()),
        ..AnalysisOptions::default()
    };
    let too_parallel = AnalysisOptions {
        concurrency_limit: 50,
        ..AnalysisOptions::default()
    };

    for options in [oversized, too_many, too_parallel] {
        let err = engine.analyze("1234567890", &options).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)), "{err:?}");
    }
    let err = engine
        .analyze("not-a-customer", &AnalysisOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(account.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn campaign_negative_failure_aborts_with_attempt_count() {
    let account = Arc::new(MemoryAccount {
        keywords: vec![keyword("k1", "pizza", "1", "10", 5)],
        campaign_negatives_error: Some(SourceError::Status {
            status: 503,
            message: "unavailable".to_owned(),
        }),
        ..MemoryAccount::default()
    });

    let err = engine(&account)
        .analyze("1234567890", &AnalysisOptions::default())
        .await
        .unwrap_err();
    assert!(
        matches!(err, EngineError::CampaignNegatives { campaign_count: 1, attempts: 3, .. }),
        "{err:?}"
    );
}

#[tokio::test]
async fn caps_apply_per_campaign_then_globally() {
    let keywords: Vec<Keyword> = (0..3)
        .flat_map(|c| {
            (0..20).map(move |i| {
                keyword(&format!("{c}-{i}"), "free pizza", &c.to_string(), "10", c * 100 + i)
            })
        })
        .collect();
    let campaigns = (0..3)
        .map(|c| campaign(&c.to_string(), vec![neg("free", MatchType::Broad)]))
        .collect();
    let account = Arc::new(MemoryAccount {
        keywords,
        campaigns,
        ..MemoryAccount::default()
    });
    let options = AnalysisOptions {
        max_conflicts_per_campaign: 2,
        max_total_conflicts: 5,
        keywords_page_size: 7,
        ..AnalysisOptions::default()
    };

    let report = engine(&account).analyze("1234567890", &options).await.unwrap();

    assert_eq!(report.total_keywords_analyzed, 60);
    let ids: Vec<_> = report.conflicts.iter().map(|c| c.keyword.id.as_str()).collect();
    assert_eq!(ids, vec!["2-19", "2-18", "1-19", "1-18", "0-19"]);
}

#[tokio::test]
async fn campaign_filter_limits_keywords_and_negatives() {
    let account = Arc::new(MemoryAccount {
        keywords: vec![
            keyword("k1", "free pizza", "1", "10", 5),
            keyword("k2", "free pizza", "2", "20", 5),
        ],
        campaigns: vec![
            campaign("1", vec![neg("free", MatchType::Broad)]),
            campaign("2", vec![neg("free", MatchType::Broad)]),
        ],
        ..MemoryAccount::default()
    });
    let options = AnalysisOptions {
        campaign_ids: Some(vec!["2".to_owned()]),
        ..AnalysisOptions::default()
    };

    let report = engine(&account).analyze("1234567890", &options).await.unwrap();
    assert_eq!(report.total_keywords_analyzed, 1);
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].campaign_id, "2");
}

#[tokio::test]
async fn empty_campaign_filter_is_rejected_instead_of_auditing_nothing() {
    let account = Arc::new(MemoryAccount {
        keywords: vec![
            keyword("k1", "free pizza", "1", "10", 5),
            keyword("k2", "free delivery", "1", "10", 5),
        ],
        campaigns: vec![campaign("1", vec![neg("free", MatchType::Broad)])],
        ..MemoryAccount::default()
    });
    let options = AnalysisOptions {
        campaign_ids: Some(Vec::new()),
        ..AnalysisOptions::default()
    };

    let err = engine(&account).analyze("1234567890", &options).await.unwrap_err();
    assert!(
        matches!(
            err,
            EngineError::Validation(ValidationError::EmptyIdList { ref field }) if field == "campaign_ids"
        ),
        "{err:?}"
    );
    assert_eq!(account.calls.load(Ordering::SeqCst), 0);

    let unfiltered = engine(&account)
        .analyze("1234567890", &AnalysisOptions::default())
        .await
        .unwrap();
    assert_eq!(unfiltered.conflicts.len(), 2);
}

#[tokio::test]
async fn injected_cache_is_reused_across_analyses() {
    let account = Arc::new(MemoryAccount {
        keywords: vec![keyword("k1", "free pizza", "1", "10", 5)],
        attachments: HashMap::from([(
            "1".to_owned(),
            vec![SharedListRef {
                id: "77".to_owned(),
                name: String::new(),
            }],
        )]),
        lists: HashMap::from([("77".to_owned(), vec![neg("free", MatchType::Broad)])]),
        ..MemoryAccount::default()
    });
    let cache = SharedListCache::new();
    let engine = engine(&account).with_shared_list_cache(cache.clone());

    let first = engine.analyze("1234567890", &AnalysisOptions::default()).await.unwrap();
    let calls_after_first = account.calls.load(Ordering::SeqCst);
    let second = engine.analyze("1234567890", &AnalysisOptions::default()).await.unwrap();
    let calls_for_second = account.calls.load(Ordering::SeqCst) - calls_after_first;

    assert_eq!(first.conflicts.len(), 1);
    assert_eq!(second.conflicts.len(), 1);
    assert_eq!(cache.len(), 1);
    // keywords, campaign negatives, inventory, attachments; no list fetch.
    assert_eq!(calls_for_second, calls_after_first - 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_returns_cancelled_not_a_partial_report() {
    let account = Arc::new(MemoryAccount {
        keywords: vec![keyword("k1", "pizza", "1", "10", 5)],
        page_latency: Some(Duration::from_secs(10)),
        ..MemoryAccount::default()
    });

    let err = engine(&account)
        .analyze_until(
            "1234567890",
            &AnalysisOptions::default(),
            tokio::time::sleep(Duration::from_secs(1)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn analysis_deadline_is_enforced() {
    let account = Arc::new(MemoryAccount {
        keywords: vec![keyword("k1", "pizza", "1", "10", 5)],
        page_latency: Some(Duration::from_secs(600)),
        ..MemoryAccount::default()
    });

    let err = engine(&account)
        .with_analysis_timeout(Some(Duration::from_secs(300)))
        .analyze("1234567890", &AnalysisOptions::default())
        .await
        .unwrap_err();
    assert!(
        matches!(err, EngineError::Timeout { after } if after == Duration::from_secs(300)),
        "{err:?}"
    );
}
