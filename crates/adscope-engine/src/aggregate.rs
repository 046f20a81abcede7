//! Conflict detection, ranking, and the remediation plan.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use adscope_core::{Keyword, NegativeLevel};
use rust_decimal::Decimal;

use crate::matcher::{is_conflict_prepared, PreparedText};
use crate::report::{Conflict, ImplementationStep, KeywordRef, NegativeRef};
use crate::resolver::{NegativeSurface, Provenance};

/// Conflicts listed as individual steps before the rest is batched.
const INDIVIDUAL_STEPS: usize = 3;

/// Tests every keyword against every negative that can reach it.
///
/// Output is in discovery order: keywords in load order, and per keyword,
/// negatives in surface order. A keyword id seen twice is only checked once.
#[must_use]
pub fn find_conflicts(keywords: &[Keyword], surface: &NegativeSurface) -> Vec<Conflict> {
    // Entries with at least one attachment in the campaign.
    let mut by_campaign: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, entry) in surface.entries().iter().enumerate() {
        let mut campaigns = HashSet::new();
        for provenance in &entry.provenances {
            if campaigns.insert(provenance.campaign_id.as_str()) {
                by_campaign
                    .entry(provenance.campaign_id.as_str())
                    .or_default()
                    .push(idx);
            }
        }
    }

    let mut seen = HashSet::new();
    let mut conflicts = Vec::new();
    for keyword in keywords {
        if !seen.insert(keyword.id.as_str()) {
            continue;
        }
        let Some(candidates) = by_campaign.get(keyword.campaign_id.as_str()) else {
            continue;
        };
        let positive = PreparedText::new(&keyword.text);
        for &idx in candidates {
            let entry = &surface.entries()[idx];
            let mut applicable = entry.provenances.iter().filter(|p| p.applies_to(keyword));
            let Some(first) = applicable.next() else {
                continue;
            };
            if !is_conflict_prepared(&positive, &entry.text, entry.match_type) {
                continue;
            }
            conflicts.push(Conflict {
                keyword: KeywordRef::from(keyword),
                negative: NegativeRef {
                    text: entry.text.as_str().to_owned(),
                    match_type: entry.match_type,
                },
                provenance: first.clone(),
                additional_sources: applicable.count(),
                campaign_id: keyword.campaign_id.clone(),
                campaign_name: keyword.campaign_name.clone(),
                estimated_revenue_loss: keyword.metrics.conversion_value,
                impressions_lost: keyword.metrics.impressions,
            });
        }
    }
    conflicts
}

/// Higher revenue loss first, then more impressions lost.
fn by_impact(a: &Conflict, b: &Conflict) -> Ordering {
    b.estimated_revenue_loss
        .cmp(&a.estimated_revenue_loss)
        .then_with(|| b.impressions_lost.cmp(&a.impressions_lost))
}

/// Applies the per-campaign cap, then the global cap.
///
/// Within a campaign the highest-impact conflicts survive; the merged list is
/// ordered by [`by_impact`] and full ties keep discovery order, since
/// `sort_by` is stable.
#[must_use]
pub fn rank_conflicts(
    mut conflicts: Vec<Conflict>,
    max_per_campaign: usize,
    max_total: usize,
) -> Vec<Conflict> {
    conflicts.sort_by(by_impact);

    let mut kept_per_campaign: HashMap<String, usize> = HashMap::new();
    conflicts.retain(|conflict| {
        let kept = kept_per_campaign
            .entry(conflict.campaign_id.clone())
            .or_default();
        *kept += 1;
        *kept <= max_per_campaign
    });
    conflicts.truncate(max_total);
    conflicts
}

/// Sum of revenue loss over the distinct keywords in `conflicts`.
#[must_use]
pub fn revenue_recovery(conflicts: &[Conflict]) -> Decimal {
    distinct_keyword_revenue(conflicts.iter())
}

fn distinct_keyword_revenue<'a>(conflicts: impl Iterator<Item = &'a Conflict>) -> Decimal {
    let mut seen = HashSet::new();
    conflicts
        .filter(|c| seen.insert(c.keyword.id.as_str()))
        .map(|c| c.estimated_revenue_loss)
        .sum()
}

/// Ordered remediation steps for ranked `conflicts`.
///
/// The top conflicts each get their own step, the rest are grouped into one
/// step per campaign (campaigns ordered by their highest-ranked remaining
/// conflict), and a closing step re-runs the audit. No conflicts, no steps.
#[must_use]
pub fn implementation_plan(conflicts: &[Conflict]) -> Vec<ImplementationStep> {
    if conflicts.is_empty() {
        return Vec::new();
    }

    let split = conflicts.len().min(INDIVIDUAL_STEPS);
    let (top, rest) = conflicts.split_at(split);
    let mut steps: Vec<ImplementationStep> = top
        .iter()
        .map(|conflict| ImplementationStep {
            order: 0,
            title: removal_title(conflict),
            detail: format!(
                "Unblocks \"{}\" ({}) in campaign {}: {} impressions, {} conversion value.",
                conflict.keyword.text,
                conflict.keyword.match_type,
                display_campaign(conflict),
                conflict.impressions_lost,
                conflict.estimated_revenue_loss,
            ),
            conflict_count: 1,
            estimated_revenue_recovery: conflict.estimated_revenue_loss,
        })
        .collect();

    let mut campaign_order: Vec<&str> = Vec::new();
    let mut batches: HashMap<&str, Vec<&Conflict>> = HashMap::new();
    for conflict in rest {
        let batch = batches.entry(conflict.campaign_id.as_str()).or_default();
        if batch.is_empty() {
            campaign_order.push(conflict.campaign_id.as_str());
        }
        batch.push(conflict);
    }
    for campaign_id in campaign_order {
        let batch = &batches[campaign_id];
        let mut negatives: Vec<String> = Vec::new();
        for conflict in batch {
            let label = format!("\"{}\" ({})", conflict.negative.text, conflict.negative.match_type);
            if !negatives.contains(&label) {
                negatives.push(label);
            }
        }
        steps.push(ImplementationStep {
            order: 0,
            title: format!(
                "Review {} remaining conflict(s) in campaign {}",
                batch.len(),
                display_campaign(batch[0])
            ),
            detail: format!("Negatives involved: {}.", negatives.join(", ")),
            conflict_count: batch.len(),
            estimated_revenue_recovery: distinct_keyword_revenue(batch.iter().copied()),
        });
    }

    steps.push(ImplementationStep {
        order: 0,
        title: "Re-run the conflict audit".to_owned(),
        detail: "Confirm the removed negatives no longer block active keywords and that no new conflicts appeared."
            .to_owned(),
        conflict_count: 0,
        estimated_revenue_recovery: Decimal::ZERO,
    });

    for (i, step) in steps.iter_mut().enumerate() {
        step.order = i + 1;
    }
    steps
}

fn removal_title(conflict: &Conflict) -> String {
    let negative = format!("\"{}\" ({})", conflict.negative.text, conflict.negative.match_type);
    let Provenance {
        level,
        shared_list,
        ad_group_name,
        ad_group_id,
        ..
    } = &conflict.provenance;
    match level {
        NegativeLevel::Campaign => {
            format!("Remove campaign negative {negative} from campaign {}", display_campaign(conflict))
        }
        NegativeLevel::AdGroup => format!(
            "Remove ad group negative {negative} from ad group {}",
            ad_group_name
                .as_deref()
                .filter(|n| !n.is_empty())
                .or(ad_group_id.as_deref())
                .unwrap_or_default()
        ),
        NegativeLevel::SharedList => {
            let list = shared_list.as_ref().map_or_else(String::new, |l| {
                if l.name.is_empty() {
                    l.id.clone()
                } else {
                    l.name.clone()
                }
            });
            format!(
                "Remove {negative} from shared list {list} or detach the list from campaign {}",
                display_campaign(conflict)
            )
        }
    }
}

fn display_campaign(conflict: &Conflict) -> &str {
    if conflict.campaign_name.is_empty() {
        &conflict.campaign_id
    } else {
        &conflict.campaign_name
    }
}

#[cfg(test)]
#[path = "aggregate_test.rs"]
mod tests;
