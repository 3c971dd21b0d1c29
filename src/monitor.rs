//! Full report computation over a record set

use crate::config::{AppConfig, ReportConfig};
use crate::engine::aggregator::IncidentAggregator;
use crate::engine::classifier::SecurityScore;
use crate::engine::kpi::{merchant_breakdown, provider_breakdown, top_errors, PaymentKpis};
use crate::engine::resolver::RecommendationCatalog;
use crate::types::alert::AlertReport;
use crate::types::event::EventRecord;
use anyhow::Result;
use tracing::info;

/// Recomputes score, KPIs and alerts from scratch for each record snapshot.
pub struct HealthMonitor {
    catalog: RecommendationCatalog,
    aggregator: IncidentAggregator,
    options: ReportConfig,
}

impl HealthMonitor {
    pub fn new(
        catalog: RecommendationCatalog,
        aggregator: IncidentAggregator,
        options: ReportConfig,
    ) -> Self {
        Self {
            catalog,
            aggregator,
            options,
        }
    }

    /// Build from configuration, loading the recommendation catalog.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let catalog = RecommendationCatalog::load(&config.catalog)?;
        let aggregator = IncidentAggregator::new(
            config.feed.group_by,
            config.scoring.weights.clone(),
            config.scoring.thresholds.clone(),
        );
        if config.report.filter.is_active() {
            info!(filter = ?config.report.filter, "Publishing filtered alerts only");
        }
        Ok(Self::new(catalog, aggregator, config.report.clone()))
    }

    pub fn catalog(&self) -> &RecommendationCatalog {
        &self.catalog
    }

    /// Compute a fresh report.
    ///
    /// The score and KPIs always cover the whole snapshot; the alert filter
    /// only narrows the alert list.
    pub fn report(&self, records: &[EventRecord]) -> AlertReport {
        let score = SecurityScore::from_records(records, self.aggregator.weights());
        let alerts = self
            .aggregator
            .aggregate_with_score(records, score.score, &self.catalog);
        let alerts = self.options.filter.apply(alerts);

        AlertReport::new(score, PaymentKpis::compute(records), alerts)
            .with_breakdown(
                provider_breakdown(records),
                merchant_breakdown(records),
                top_errors(records, &self.catalog, self.options.top_errors_limit),
            )
            .with_top_critical(self.options.critical_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::aggregator::AlertFilter;
    use crate::types::alert::Severity;
    use crate::types::event::EventStatus;
    use serde_json::json;

    fn monitor() -> HealthMonitor {
        HealthMonitor::from_config(&AppConfig::default()).unwrap()
    }

    #[test]
    fn test_report_for_mixed_records() {
        let records: Vec<EventRecord> = serde_json::from_value(json!([
            {"provider": "A", "status": "FAILED", "mainErrorCategory": "PROVIDER",
             "errorCode": "PROVIDER_TIMEOUT", "totalEvents": 1, "failedEvents": 1},
            {"provider": "A", "status": "SUCCEEDED", "totalEvents": 1, "failedEvents": 0}
        ]))
        .unwrap();

        let report = monitor().report(&records);

        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.alerts[0].failure_rate, 50.0);
        assert_eq!(report.kpis.total, 2);
        assert_eq!(report.providers.len(), 1);
        assert_eq!(report.top_errors.len(), 1);
        assert_eq!(report.top_errors[0].code, "PROVIDER_TIMEOUT");
        assert_eq!(report.top_critical, vec![report.alerts[0].id.clone()]);
        // 50% success, no risk checks, half timeouts, one provider
        assert!(report.score.score < 60.0);
        assert_eq!(report.alerts[0].severity, Severity::Critical);
    }

    #[test]
    fn test_report_for_empty_snapshot() {
        let report = monitor().report(&[]);
        assert!(report.alerts.is_empty());
        assert!(report.providers.is_empty());
        assert_eq!(report.score, SecurityScore::empty());
        assert_eq!(report.kpis, PaymentKpis::default());
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let records = vec![EventRecord::new("A", EventStatus::Failed)
            .with_error("DECLINED", "PROVIDER")];
        let report = monitor().report(&records);
        let value = serde_json::to_value(&report).unwrap();

        assert!(value.get("reportId").is_some());
        assert!(value.get("topErrors").is_some());
        assert!(value.get("topCritical").is_some());
        assert!(value["alerts"][0].get("failureRate").is_some());
        assert_eq!(value["alerts"][0]["severity"], "critical");
        assert_eq!(value["alerts"][0]["errorKind"], "PROVIDER_DECLINED");
    }

    #[test]
    fn test_top_critical_is_limited() {
        let records: Vec<EventRecord> = ["A", "B", "C", "D", "E"]
            .iter()
            .map(|p| EventRecord::new(*p, EventStatus::Failed).with_error("DECLINED", "PROVIDER"))
            .collect();

        let report = monitor().report(&records);
        assert_eq!(report.count(Severity::Critical), 5);
        assert_eq!(
            report.top_critical,
            vec!["a-declined", "b-declined", "c-declined"]
        );
    }

    #[test]
    fn test_filter_narrows_alerts_but_not_score() {
        let records = vec![
            EventRecord::new("STRIPE", EventStatus::Failed)
                .with_error("BANK_TIMEOUT", "PROVIDER")
                .with_merchant("m_travel"),
            EventRecord::new("PAYU", EventStatus::Failed).with_error("DECLINED", "PROVIDER"),
        ];
        let mut config = AppConfig::default();
        config.report.filter = AlertFilter {
            provider: Some("stripe".to_string()),
            ..AlertFilter::default()
        };
        let filtered = HealthMonitor::from_config(&config).unwrap().report(&records);
        let unfiltered = monitor().report(&records);

        assert_eq!(unfiltered.alerts.len(), 2);
        assert_eq!(filtered.alerts.len(), 1);
        assert_eq!(filtered.alerts[0].provider, "STRIPE");
        assert_eq!(filtered.score, unfiltered.score);
        assert_eq!(filtered.kpis, unfiltered.kpis);
        assert_eq!(filtered.merchants.len(), 1);
        assert_eq!(filtered.merchants[0].merchant_id, "m_travel");
    }
}
