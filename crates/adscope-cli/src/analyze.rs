//! `analyze` command: wires config, HTTP client and engine together.

use std::fmt::Write as _;
use std::future::Future;
use std::sync::Arc;

use adscope_client::AdsApiClient;
use adscope_core::AppConfig;
use adscope_engine::{AnalysisOptions, ConflictEngine, ConflictReport};
use anyhow::Context;

/// Command-line overrides on top of the configured defaults.
#[derive(Debug, Clone, Default)]
pub(crate) struct AnalyzeRequest {
    pub customer_id: String,
    pub campaign_ids: Vec<String>,
    pub max_total: Option<usize>,
    pub max_per_campaign: Option<usize>,
}

impl AnalyzeRequest {
    pub(crate) fn options(&self, config: &AppConfig) -> AnalysisOptions {
        let defaults = AnalysisOptions::from(&config.engine);
        AnalysisOptions {
            campaign_ids: (!self.campaign_ids.is_empty()).then(|| self.campaign_ids.clone()),
            max_total_conflicts: self.max_total.unwrap_or(defaults.max_total_conflicts),
            max_conflicts_per_campaign: self
                .max_per_campaign
                .unwrap_or(defaults.max_conflicts_per_campaign),
            ..defaults
        }
    }
}

pub(crate) async fn run(
    config: &AppConfig,
    request: &AnalyzeRequest,
    cancel: impl Future<Output = ()>,
) -> anyhow::Result<ConflictReport> {
    let client = AdsApiClient::from_config(config).context("failed to build ads API client")?;
    let engine = ConflictEngine::new(Arc::new(client), &config.engine);
    let options = request.options(config);

    engine
        .analyze_until(&request.customer_id, &options, cancel)
        .await
        .with_context(|| format!("analysis of customer {} failed", request.customer_id))
}

/// Human-readable summary of `report`.
pub(crate) fn render_text(report: &ConflictReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Customer {}", report.customer_id);
    let _ = writeln!(
        out,
        "Analyzed {} keywords against {} negatives",
        report.total_keywords_analyzed, report.total_negatives_considered
    );
    let _ = writeln!(
        out,
        "Estimated monthly revenue recovery: {}",
        report.estimated_monthly_revenue_recovery
    );

    if report.conflicts.is_empty() {
        let _ = writeln!(out, "\nNo conflicts found.");
    } else {
        let _ = writeln!(out, "\nConflicts:");
        for (i, c) in report.conflicts.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:>3}. \"{}\" ({}) blocked by \"{}\" ({}) at {} level in {}: {} revenue, {} impressions",
                i + 1,
                c.keyword.text,
                c.keyword.match_type,
                c.negative.text,
                c.negative.match_type,
                c.provenance.level,
                c.campaign_name,
                c.estimated_revenue_loss,
                c.impressions_lost,
            );
        }
    }

    if !report.implementation_steps.is_empty() {
        let _ = writeln!(out, "\nPlan:");
        for step in &report.implementation_steps {
            let _ = writeln!(out, "{:>3}. {}", step.order, step.title);
            let _ = writeln!(out, "     {}", step.detail);
        }
    }

    if report.is_partial() {
        let _ = writeln!(out, "\nWarning: some negative sources were unavailable; results may be incomplete.");
        if report.shared_list_fetch_timed_out {
            let _ = writeln!(out, "  - shared list fetching hit its deadline");
        }
        for skipped in &report.skipped_sources {
            let _ = writeln!(out, "  - {}: {}", skipped.resource, skipped.reason);
        }
    }
    out
}
