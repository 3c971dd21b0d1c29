//! Security/health scoring and incident severity classification

use crate::engine::normalizer::{normalize, ErrorKind};
use crate::types::alert::Severity;
use crate::types::event::{EventRecord, EventStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Number of distinct providers that earns the full diversification bonus
const FULL_DIVERSIFICATION_PROVIDERS: f64 = 3.0;

/// Point budgets of the security score components
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreWeights {
    /// Points at stake for the success rate
    pub success_rate: f64,
    /// Points at stake for risk-check coverage
    pub risk_checks: f64,
    /// Maximum penalty for provider timeouts
    pub latency: f64,
    /// Maximum bonus for using several providers
    pub diversification: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            success_rate: 40.0,
            risk_checks: 30.0,
            latency: 20.0,
            diversification: 10.0,
        }
    }
}

/// Breakpoints for per-group severity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeverityThresholds {
    /// Overall score below this is critical
    pub critical_score: f64,
    /// Group failure rate (%) above this is critical
    pub critical_failure_rate: f64,
    /// Group failure rate (%) above this is a warning
    pub warning_failure_rate: f64,
    /// Overall score below this is a warning
    pub warning_score: f64,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            critical_score: 60.0,
            critical_failure_rate: 50.0,
            warning_failure_rate: 25.0,
            warning_score: 80.0,
        }
    }
}

/// Letter grade of a security score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    C,
    F,
}

impl Grade {
    pub fn from_score(score: f64) -> Self {
        if score >= 95.0 {
            Grade::APlus
        } else if score >= 90.0 {
            Grade::A
        } else if score >= 80.0 {
            Grade::BPlus
        } else if score >= 70.0 {
            Grade::B
        } else if score >= 60.0 {
            Grade::C
        } else {
            Grade::F
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::C => "C",
            Grade::F => "F",
        }
    }
}

/// Points earned by each score component
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScoreFactors {
    pub success: f64,
    pub risk: f64,
    /// Latency budget left after the timeout penalty
    pub latency: f64,
    pub diversification: f64,
}

/// Composite health score in [0, 100]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecurityScore {
    pub score: f64,
    pub grade: Grade,
    pub factors: ScoreFactors,
}

impl SecurityScore {
    /// Score of an empty record set.
    pub fn empty() -> Self {
        Self {
            score: 0.0,
            grade: Grade::F,
            factors: ScoreFactors::default(),
        }
    }

    /// Score a record set.
    ///
    /// User-attributed records are left out of the population. An empty
    /// population scores 0 (grade F).
    pub fn from_records(records: &[EventRecord], weights: &ScoreWeights) -> Self {
        let population: Vec<&EventRecord> =
            records.iter().filter(|r| !r.is_user_attributed()).collect();
        if population.is_empty() {
            return Self::empty();
        }

        let total = population.len() as f64;
        let succeeded = population
            .iter()
            .filter(|r| r.status() == EventStatus::Succeeded)
            .count() as f64;
        let checked = population
            .iter()
            .filter(|r| !r.risk_checks.is_empty())
            .count() as f64;
        let timeouts = population
            .iter()
            .filter(|r| normalize(r.code()) == Some(ErrorKind::ProviderTimeout))
            .count() as f64;
        let providers = population
            .iter()
            .map(|r| r.provider.as_str())
            .filter(|p| !p.is_empty())
            .collect::<HashSet<_>>()
            .len();

        security_score(
            succeeded / total * 100.0,
            checked / total,
            timeouts / total,
            providers,
            weights,
        )
    }
}

fn sanitize(value: f64, max: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, max)
    }
}

/// Compute the health score from its inputs.
///
/// Starts at 100, subtracts the shortfall of the success and risk-check
/// components, subtracts the timeout penalty, adds the diversification
/// bonus, and clamps the result to [0, 100].
pub fn security_score(
    success_rate_percent: f64,
    risk_checks_passed_fraction: f64,
    timeout_fraction: f64,
    distinct_providers: usize,
    weights: &ScoreWeights,
) -> SecurityScore {
    let success_rate = sanitize(success_rate_percent, 100.0);
    let risk_fraction = sanitize(risk_checks_passed_fraction, 1.0);
    let timeout_fraction = sanitize(timeout_fraction, 1.0);

    let success = success_rate / 100.0 * weights.success_rate;
    let risk = risk_fraction * weights.risk_checks;
    let latency_penalty = timeout_fraction * weights.latency;
    let diversification = (distinct_providers as f64 / FULL_DIVERSIFICATION_PROVIDERS).min(1.0)
        * weights.diversification;

    let raw = 100.0 - (weights.success_rate - success) - (weights.risk_checks - risk)
        - latency_penalty
        + diversification;
    let score = sanitize(raw, 100.0);

    SecurityScore {
        score,
        grade: Grade::from_score(score),
        factors: ScoreFactors {
            success,
            risk,
            latency: weights.latency - latency_penalty,
            diversification,
        },
    }
}

/// Severity of one incident group.
pub fn classify_group(
    overall_score: f64,
    group_failure_rate: f64,
    thresholds: &SeverityThresholds,
) -> Severity {
    if overall_score < thresholds.critical_score
        || group_failure_rate > thresholds.critical_failure_rate
    {
        Severity::Critical
    } else if group_failure_rate > thresholds.warning_failure_rate
        || overall_score < thresholds.warning_score
    {
        Severity::Warning
    } else {
        Severity::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(success: f64, risk: f64, timeout: f64, providers: usize) -> f64 {
        security_score(success, risk, timeout, providers, &ScoreWeights::default()).score
    }

    #[test]
    fn test_perfect_inputs() {
        let result = security_score(100.0, 1.0, 0.0, 3, &ScoreWeights::default());
        assert_eq!(result.score, 100.0);
        assert_eq!(result.grade, Grade::APlus);
        assert_eq!(result.factors.success, 40.0);
        assert_eq!(result.factors.latency, 20.0);
        assert_eq!(result.factors.diversification, 10.0);
    }

    #[test]
    fn test_component_arithmetic() {
        // 100 - (40 - 36) - (30 - 15) - 0.1*20 + (1/3)*10
        let expected = 100.0 - 4.0 - 15.0 - 2.0 + 10.0 / 3.0;
        assert!((score(90.0, 0.5, 0.1, 1) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_score_is_clamped() {
        assert_eq!(score(0.0, 0.0, 1.0, 0), 10.0);
        let worst = security_score(
            0.0,
            0.0,
            1.0,
            0,
            &ScoreWeights {
                success_rate: 60.0,
                risk_checks: 40.0,
                latency: 20.0,
                diversification: 10.0,
            },
        );
        assert_eq!(worst.score, 0.0);
        assert_eq!(worst.grade, Grade::F);

        assert!(score(500.0, 7.0, -3.0, 100) <= 100.0);
        assert!(score(-50.0, -1.0, 9.0, 0) >= 0.0);
        assert!(!score(f64::NAN, f64::NAN, f64::NAN, 0).is_nan());
    }

    #[test]
    fn test_score_is_monotonic_in_success_rate() {
        let mut previous = f64::MIN;
        for step in 0..=100 {
            let current = score(step as f64, 0.4, 0.2, 2);
            assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn test_diversification_is_capped() {
        assert_eq!(score(100.0, 1.0, 0.0, 3), score(100.0, 1.0, 0.0, 12));
        assert!(score(50.0, 0.5, 0.0, 2) > score(50.0, 0.5, 0.0, 1));
    }

    #[test]
    fn test_grade_breakpoints() {
        assert_eq!(Grade::from_score(100.0), Grade::APlus);
        assert_eq!(Grade::from_score(95.0), Grade::APlus);
        assert_eq!(Grade::from_score(94.9), Grade::A);
        assert_eq!(Grade::from_score(90.0), Grade::A);
        assert_eq!(Grade::from_score(89.5), Grade::BPlus);
        assert_eq!(Grade::from_score(70.0), Grade::B);
        assert_eq!(Grade::from_score(60.0), Grade::C);
        assert_eq!(Grade::from_score(59.99), Grade::F);
        assert_eq!(serde_json::to_string(&Grade::APlus).unwrap(), "\"A+\"");
    }

    #[test]
    fn test_classify_group() {
        let thresholds = SeverityThresholds::default();

        assert_eq!(classify_group(55.0, 0.0, &thresholds), Severity::Critical);
        assert_eq!(classify_group(99.0, 50.1, &thresholds), Severity::Critical);
        assert_eq!(classify_group(99.0, 50.0, &thresholds), Severity::Warning);
        assert_eq!(classify_group(99.0, 25.1, &thresholds), Severity::Warning);
        assert_eq!(classify_group(79.9, 0.0, &thresholds), Severity::Warning);
        assert_eq!(classify_group(80.0, 25.0, &thresholds), Severity::Info);
    }

    #[test]
    fn test_from_records_empty_is_zero_state() {
        let result = SecurityScore::from_records(&[], &ScoreWeights::default());
        assert_eq!(result, SecurityScore::empty());
    }

    #[test]
    fn test_from_records_ignores_user_attributed() {
        let mut ok = EventRecord::new("A", EventStatus::Succeeded);
        ok.risk_checks = vec!["velocity".to_string()];
        let timeout = EventRecord::new("B", EventStatus::Failed).with_error("BANK_TIMEOUT", "PROVIDER");
        let base = vec![ok.clone(), timeout.clone()];

        let mut with_user = base.clone();
        with_user.push(
            EventRecord::new("A", EventStatus::Failed)
                .with_error("CANCELLED_BY_PAYER", "USER")
                .with_events(5, 5),
        );

        let weights = ScoreWeights::default();
        assert_eq!(
            SecurityScore::from_records(&base, &weights),
            SecurityScore::from_records(&with_user, &weights)
        );

        // 50% success, 50% checked, 50% timeouts, 2 providers
        let expected = security_score(50.0, 0.5, 0.5, 2, &weights);
        assert_eq!(SecurityScore::from_records(&base, &weights), expected);
    }

    #[test]
    fn test_from_records_only_user_records() {
        let records = vec![EventRecord::new("A", EventStatus::Cancelled)];
        let result = SecurityScore::from_records(&records, &ScoreWeights::default());
        assert_eq!(result.score, 0.0);
        assert_eq!(result.grade, Grade::F);
    }
}
