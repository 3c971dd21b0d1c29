//! Remediation guidance attached to incidents

use serde::{Deserialize, Serialize};

/// Actions shown when no recommendation matches an incident
pub const DEFAULT_ACTIONS: [&str; 2] = ["Review detailed error logs", "Contact technical support"];

/// Severity carried by a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSeverity {
    Critical,
    Error,
    #[default]
    Warning,
    Info,
}

/// One entry of the recommendation catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Recommendation {
    pub title: String,
    /// Message suitable for the merchant or end user
    pub user_message: String,
    /// Operator-facing summary of what to do
    pub what_to_do: String,
    /// Ordered remediation steps
    pub actions: Vec<String>,
    pub estimated_resolution_time: String,
    pub severity: RecommendationSeverity,
}

impl Recommendation {
    /// Remediation steps of an optional recommendation, or the generic fallback.
    pub fn actions_or_default(recommendation: Option<&Recommendation>) -> Vec<String> {
        match recommendation {
            Some(rec) if !rec.actions.is_empty() => rec.actions.clone(),
            _ => DEFAULT_ACTIONS.iter().map(|a| a.to_string()).collect(),
        }
    }
}
