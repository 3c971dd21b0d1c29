//! Dashboard KPIs: overall payment metrics, per-provider and per-merchant health, top errors

use crate::engine::normalizer::normalize;
use crate::engine::resolver::RecommendationCatalog;
use crate::types::event::{EventRecord, EventStatus};
use crate::types::recommendation::Recommendation;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Aggregate payment metrics over a record set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentKpis {
    pub succeeded: u64,
    /// Failed records, excluding user-attributed ones
    pub failed: u64,
    /// User-attributed records
    pub cancelled: u64,
    pub total: u64,
    pub success_rate: f64,
    pub failure_rate: f64,
    pub total_volume: f64,
    pub avg_latency_secs: f64,
    pub distinct_providers: usize,
}

impl PaymentKpis {
    /// Compute KPIs; an empty input yields the all-zero state.
    pub fn compute(records: &[EventRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let total = records.len() as u64;
        let succeeded = records
            .iter()
            .filter(|r| r.status() == EventStatus::Succeeded)
            .count() as u64;
        let cancelled = records.iter().filter(|r| r.is_user_attributed()).count() as u64;
        let failed = records.iter().filter(|r| r.counted_failures() > 0).count() as u64;

        let latency_sum: f64 = records
            .iter()
            .map(|r| {
                if r.processing_time_sec > 0.0 {
                    r.processing_time_sec
                } else {
                    r.latency_ms / 1000.0
                }
            })
            .sum();

        Self {
            succeeded,
            failed,
            cancelled,
            total,
            success_rate: succeeded as f64 / total as f64 * 100.0,
            failure_rate: failed as f64 / total as f64 * 100.0,
            total_volume: records.iter().map(|r| r.amount).sum(),
            avg_latency_secs: latency_sum / total as f64,
            distinct_providers: records
                .iter()
                .map(|r| r.provider.as_str())
                .filter(|p| !p.is_empty())
                .collect::<HashSet<_>>()
                .len(),
        }
    }
}

/// Health of one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub provider: String,
    pub total: u64,
    pub failed: u64,
    pub failure_rate: f64,
    pub healthy: bool,
    /// Error codes of counted failures, in arrival order
    pub error_codes: Vec<String>,
}

/// Per-provider breakdown in discovery order.
pub fn provider_breakdown(records: &[EventRecord]) -> Vec<ProviderStatus> {
    let mut statuses: Vec<ProviderStatus> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for record in records {
        let slot = *index.entry(record.provider.as_str()).or_insert_with(|| {
            statuses.push(ProviderStatus {
                provider: record.provider.clone(),
                total: 0,
                failed: 0,
                failure_rate: 0.0,
                healthy: true,
                error_codes: Vec::new(),
            });
            statuses.len() - 1
        });

        let status = &mut statuses[slot];
        status.total += 1;
        if record.counted_failures() > 0 {
            status.failed += 1;
            if let Some(code) = record.code() {
                status.error_codes.push(code.to_string());
            }
        }
    }

    for status in &mut statuses {
        status.failure_rate = status.failed as f64 / status.total as f64 * 100.0;
        status.healthy = status.failed == 0;
    }

    statuses
}

/// KPIs of one merchant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantKpis {
    pub merchant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,
    pub kpis: PaymentKpis,
}

/// Per-merchant KPIs in discovery order; records without a merchant are skipped.
pub fn merchant_breakdown(records: &[EventRecord]) -> Vec<MerchantKpis> {
    let mut order: Vec<&str> = Vec::new();
    let mut members: HashMap<&str, Vec<EventRecord>> = HashMap::new();
    let mut names: HashMap<&str, String> = HashMap::new();

    for record in records {
        let Some(merchant) = record
            .merchant_id
            .as_deref()
            .or(record.merchant_name.as_deref())
            .filter(|m| !m.trim().is_empty())
        else {
            continue;
        };
        members
            .entry(merchant)
            .or_insert_with(|| {
                order.push(merchant);
                Vec::new()
            })
            .push(record.clone());
        if let Some(name) = &record.merchant_name {
            names.entry(merchant).or_insert_with(|| name.clone());
        }
    }

    order
        .into_iter()
        .map(|merchant| MerchantKpis {
            merchant_id: merchant.to_string(),
            merchant_name: names.remove(merchant),
            kpis: members
                .get(merchant)
                .map(|group| PaymentKpis::compute(group))
                .unwrap_or_default(),
        })
        .collect()
}

/// A frequent error code with its remediation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopError {
    pub code: String,
    pub count: u64,
    pub recommendation: Recommendation,
}

/// Most frequent failure codes that have a kind-specific recommendation.
///
/// Ties keep the order in which codes first appeared.
pub fn top_errors(
    records: &[EventRecord],
    catalog: &RecommendationCatalog,
    limit: usize,
) -> Vec<TopError> {
    let mut counts: Vec<(String, u64)> = Vec::new();
    for code in records
        .iter()
        .filter(|r| r.counted_failures() > 0)
        .filter_map(|r| r.code())
    {
        match counts.iter_mut().find(|(c, _)| c == code) {
            Some((_, count)) => *count += 1,
            None => counts.push((code.to_string(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    counts
        .into_iter()
        .take(limit)
        .filter_map(|(code, count)| {
            let recommendation = normalize(Some(code.as_str())).and_then(|k| catalog.for_kind(k))?;
            Some(TopError {
                recommendation: recommendation.clone(),
                code,
                count,
            })
        })
        .collect()
}
