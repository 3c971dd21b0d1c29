//! Incident aggregation: records in, sorted alert summaries out.

use crate::engine::classifier::{classify_group, ScoreWeights, SecurityScore, SeverityThresholds};
use crate::engine::normalizer::normalize;
use crate::engine::resolver::RecommendationCatalog;
use crate::types::alert::{AlertSummary, Severity};
use crate::types::event::EventRecord;
use crate::types::recommendation::Recommendation;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// Dimension records are grouped by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    Provider,
    Merchant,
    ProviderInCountry,
    ProviderInMerchant,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GroupKey {
    provider: String,
    merchant: Option<String>,
    country: Option<String>,
}

impl GroupKey {
    fn of(record: &EventRecord, group_by: GroupBy) -> Self {
        let merchant = record
            .merchant_id
            .clone()
            .or_else(|| record.merchant_name.clone());
        match group_by {
            GroupBy::Provider => Self {
                provider: record.provider.clone(),
                merchant: None,
                country: None,
            },
            GroupBy::Merchant => Self {
                provider: String::new(),
                merchant,
                country: None,
            },
            GroupBy::ProviderInCountry => Self {
                provider: record.provider.clone(),
                merchant: None,
                country: record.country_code.clone(),
            },
            GroupBy::ProviderInMerchant => Self {
                provider: record.provider.clone(),
                merchant,
                country: None,
            },
        }
    }

    fn label(&self) -> String {
        [
            Some(self.provider.as_str()).filter(|p| !p.is_empty()),
            self.merchant.as_deref(),
            self.country.as_deref(),
        ]
        .iter()
        .flatten()
        .copied()
        .collect::<Vec<_>>()
        .join("-")
    }
}

fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

/// Groups records and produces one alert summary per failing group.
#[derive(Debug, Clone, Default)]
pub struct IncidentAggregator {
    group_by: GroupBy,
    weights: ScoreWeights,
    thresholds: SeverityThresholds,
}

impl IncidentAggregator {
    pub fn new(group_by: GroupBy, weights: ScoreWeights, thresholds: SeverityThresholds) -> Self {
        Self {
            group_by,
            weights,
            thresholds,
        }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Aggregate using the overall score of the same record set.
    pub fn aggregate(
        &self,
        records: &[EventRecord],
        catalog: &RecommendationCatalog,
    ) -> Vec<AlertSummary> {
        let overall = SecurityScore::from_records(records, &self.weights);
        self.aggregate_with_score(records, overall.score, catalog)
    }

    /// Aggregate with a precomputed overall score.
    ///
    /// Groups without counted failures produce no summary. Output is sorted
    /// by severity; ties keep group discovery order.
    pub fn aggregate_with_score(
        &self,
        records: &[EventRecord],
        overall_score: f64,
        catalog: &RecommendationCatalog,
    ) -> Vec<AlertSummary> {
        let mut order: Vec<GroupKey> = Vec::new();
        let mut groups: HashMap<GroupKey, Vec<&EventRecord>> = HashMap::new();

        for record in records {
            let key = GroupKey::of(record, self.group_by);
            groups
                .entry(key.clone())
                .or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                })
                .push(record);
        }

        let mut alerts: Vec<AlertSummary> = order
            .iter()
            .filter_map(|key| {
                let members = groups.get(key)?;
                self.summarize(key, members, overall_score, catalog)
            })
            .collect();

        // sort_by_key is stable
        alerts.sort_by_key(|a| a.severity.rank());

        debug!(
            records = records.len(),
            groups = order.len(),
            alerts = alerts.len(),
            "Aggregated incidents"
        );

        alerts
    }

    fn summarize(
        &self,
        key: &GroupKey,
        members: &[&EventRecord],
        overall_score: f64,
        catalog: &RecommendationCatalog,
    ) -> Option<AlertSummary> {
        let failed: Vec<&EventRecord> = members
            .iter()
            .copied()
            .filter(|r| r.counted_failures() > 0)
            .collect();
        let representative = *failed.first()?;

        let total_events: u64 = members.iter().map(|r| r.attempts()).sum();
        let failure_count: u64 = failed.iter().map(|r| r.counted_failures()).sum();
        let failure_rate = if total_events > 0 {
            failure_count as f64 / total_events as f64 * 100.0
        } else {
            0.0
        };
        let total_impact: f64 = failed.iter().map(|r| r.amount).sum();

        let severity = classify_group(overall_score, failure_rate, &self.thresholds);

        let error_code = representative.code().map(str::to_string);
        // Attempts behind the worst incident, or the group's repeated failures
        let attempts = failed
            .iter()
            .map(|r| r.attempts())
            .max()
            .unwrap_or(1)
            .max(failure_count);
        let recommendation = catalog.resolve_record(representative, attempts).cloned();
        let actions = Recommendation::actions_or_default(recommendation.as_ref());

        let id = format!(
            "{}-{}",
            slug(&key.label()),
            slug(error_code.as_deref().unwrap_or("unknown"))
        );

        Some(AlertSummary {
            id,
            provider: representative.provider.clone(),
            merchant_id: key.merchant.as_ref().and(representative.merchant_id.clone()),
            merchant_name: key.merchant.as_ref().and(representative.merchant_name.clone()),
            country_code: key.country.clone(),
            severity,
            error_kind: normalize(error_code.as_deref()),
            error_code,
            error_message: representative.error_message.clone(),
            failure_count,
            total_events,
            failure_rate,
            total_impact,
            actions,
            recommendation,
            first_seen: failed.iter().filter_map(|r| r.first_seen.or(r.last_seen)).min(),
            last_seen: failed.iter().filter_map(|r| r.last_seen.or(r.first_seen)).max(),
            affected_records: failed.into_iter().cloned().collect(),
        })
    }
}

/// Case-insensitive substring filters over alert summaries
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertFilter {
    pub provider: Option<String>,
    pub incident_type: Option<String>,
    pub merchant: Option<String>,
    pub country: Option<String>,
}

fn field_matches(needle: &Option<String>, haystack: Option<&str>) -> bool {
    match needle.as_deref().map(str::trim) {
        None | Some("") => true,
        Some(needle) => haystack
            .map(|h| h.to_lowercase().contains(&needle.to_lowercase()))
            .unwrap_or(false),
    }
}

impl AlertFilter {
    pub fn matches(&self, alert: &AlertSummary) -> bool {
        field_matches(&self.provider, Some(alert.provider.as_str()))
            && field_matches(&self.incident_type, alert.error_code.as_deref())
            && field_matches(
                &self.merchant,
                alert.merchant_name.as_deref().or(alert.merchant_id.as_deref()),
            )
            && field_matches(&self.country, alert.country_code.as_deref())
    }

    /// Keep the matching alerts, in their original order.
    pub fn apply(&self, alerts: Vec<AlertSummary>) -> Vec<AlertSummary> {
        alerts.into_iter().filter(|a| self.matches(a)).collect()
    }

    /// Whether any criterion is set.
    pub fn is_active(&self) -> bool {
        [&self.provider, &self.incident_type, &self.merchant, &self.country]
            .iter()
            .any(|f| f.as_deref().map_or(false, |v| !v.trim().is_empty()))
    }
}

/// The first `limit` critical alerts, in output order.
pub fn critical_alerts(alerts: &[AlertSummary], limit: usize) -> Vec<&AlertSummary> {
    alerts
        .iter()
        .filter(|a| a.severity == Severity::Critical)
        .take(limit)
        .collect()
}
