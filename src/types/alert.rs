//! Alert data structures produced by the incident aggregator

use crate::engine::classifier::SecurityScore;
use crate::engine::aggregator::critical_alerts;
use crate::engine::kpi::{MerchantKpis, PaymentKpis, ProviderStatus, TopError};
use crate::engine::normalizer::ErrorKind;
use crate::types::event::EventRecord;
use crate::types::recommendation::Recommendation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity bucket of an incident
///
/// Variants are declared in rank order, so `Ord` sorts the most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    /// Sort rank: CRITICAL=0, WARNING=1, INFO=2
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::Warning => 1,
            Severity::Info => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

/// One incident summary per group of records
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSummary {
    /// Deterministic identifier derived from the group and error code
    pub id: String,

    pub provider: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,

    pub severity: Severity,

    /// Representative error code of the group
    pub error_code: Option<String>,

    pub error_message: Option<String>,

    /// Canonical kind of `error_code`, when it normalizes
    pub error_kind: Option<ErrorKind>,

    /// Failed attempts, excluding user-attributed ones
    pub failure_count: u64,

    /// All attempts in the group, including user-attributed ones
    pub total_events: u64,

    /// Percentage in [0, 100]
    pub failure_rate: f64,

    /// Sum of amounts over records with counted failures
    pub total_impact: f64,

    pub actions: Vec<String>,

    pub recommendation: Option<Recommendation>,

    pub affected_records: Vec<EventRecord>,

    pub first_seen: Option<DateTime<Utc>>,

    pub last_seen: Option<DateTime<Utc>>,
}

/// Envelope published for every recomputation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertReport {
    pub report_id: String,
    pub generated_at: DateTime<Utc>,
    pub score: SecurityScore,
    pub kpis: PaymentKpis,
    #[serde(default)]
    pub providers: Vec<ProviderStatus>,
    #[serde(default)]
    pub merchants: Vec<MerchantKpis>,
    #[serde(default)]
    pub top_errors: Vec<TopError>,
    /// Ids of the leading critical alerts, for headline display
    #[serde(default)]
    pub top_critical: Vec<String>,
    pub alerts: Vec<AlertSummary>,
}

impl AlertReport {
    pub fn new(score: SecurityScore, kpis: PaymentKpis, alerts: Vec<AlertSummary>) -> Self {
        Self {
            report_id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            score,
            kpis,
            providers: Vec::new(),
            merchants: Vec::new(),
            top_errors: Vec::new(),
            top_critical: Vec::new(),
            alerts,
        }
    }

    /// Attach the per-provider and per-merchant breakdowns and the most
    /// frequent errors.
    pub fn with_breakdown(
        mut self,
        providers: Vec<ProviderStatus>,
        merchants: Vec<MerchantKpis>,
        top_errors: Vec<TopError>,
    ) -> Self {
        self.providers = providers;
        self.merchants = merchants;
        self.top_errors = top_errors;
        self
    }

    /// Record the ids of the first `limit` critical alerts.
    pub fn with_top_critical(mut self, limit: usize) -> Self {
        self.top_critical = critical_alerts(&self.alerts, limit)
            .into_iter()
            .map(|a| a.id.clone())
            .collect();
        self
    }

    /// Number of alerts with the given severity
    pub fn count(&self, severity: Severity) -> usize {
        self.alerts.iter().filter(|a| a.severity == severity).count()
    }
}
