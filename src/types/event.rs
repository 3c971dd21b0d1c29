//! Payment event / incident records as delivered by the data source.
//!
//! Records arrive from several producers (raw payin events, aggregated
//! incident lists, the real-time feed) that disagree on field names and
//! sometimes send nulls or strings where numbers are expected. Parsing is
//! deliberately lenient: a malformed field falls back to its zero value
//! instead of rejecting the whole record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Accepted spellings per field, preferred first
const FIELD_SPELLINGS: &[&[&str]] = &[
    &["errorCode", "error_code"],
    &["incidentTag", "incident_tag"],
    &["errorMessage", "error_message", "title"],
    &["mainErrorCategory", "main_error_category", "category"],
    &["mainErrorType", "main_error_type", "errorType"],
    &["totalEvents", "total_events"],
    &["failedEvents", "failed_events"],
    &["merchantId", "merchant_id", "merchant"],
    &["merchantName", "merchant_name"],
    &["countryCode", "country_code", "country"],
    &["firstSeen", "first_seen"],
    &["lastSeen", "last_seen", "timestamp"],
    &["riskChecks", "risk_checks"],
    &["processingTimeSec", "processing_time_sec"],
    &["latencyMs", "latency_ms"],
];

/// Lifecycle status of a payment event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Succeeded,
    Failed,
    Cancelled,
    Pending,
    #[default]
    Unknown,
}

impl EventStatus {
    /// Parse a status string, accepting the spellings seen across producers.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "SUCCEEDED" | "SUCCESSFUL" | "SUCCESS" | "APPROVED" | "COMPLETED" => Self::Succeeded,
            "FAILED" | "FAILURE" | "DECLINED" | "ERROR" | "REJECTED" => Self::Failed,
            "CANCELLED" | "CANCELED" => Self::Cancelled,
            "PENDING" | "PROCESSING" | "CREATED" => Self::Pending,
            _ => Self::Unknown,
        }
    }
}

/// Coarse origin of a failure
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Provider,
    Merchant,
    User,
    Other(String),
}

impl ErrorCategory {
    /// Parse a category, returning `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_uppercase();
        match key.as_str() {
            "" => None,
            "PROVIDER" => Some(Self::Provider),
            "MERCHANT" => Some(Self::Merchant),
            "USER" => Some(Self::User),
            _ => Some(Self::Other(key)),
        }
    }

    /// Catalog key for this category.
    pub fn as_key(&self) -> &str {
        match self {
            Self::Provider => "PROVIDER",
            Self::Merchant => "MERCHANT",
            Self::User => "USER",
            Self::Other(key) => key,
        }
    }
}

/// A single payment event or a pre-aggregated incident.
///
/// An incident may stand for several retried attempts (`total_events`), of
/// which `failed_events` failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Payment provider identifier
    #[serde(default, deserialize_with = "lenient_string")]
    pub provider: String,

    /// Raw status string (see [`EventRecord::status`])
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,

    /// Free-form error code
    #[serde(default, alias = "error_code", deserialize_with = "lenient_opt_string")]
    pub error_code: Option<String>,

    /// Incident tag, used when no error code is present
    #[serde(default, alias = "incident_tag", deserialize_with = "lenient_opt_string")]
    pub incident_tag: Option<String>,

    /// Human-readable error message
    #[serde(
        default,
        alias = "error_message",
        alias = "title",
        deserialize_with = "lenient_opt_string"
    )]
    pub error_message: Option<String>,

    /// PROVIDER / MERCHANT / USER, or unset
    #[serde(
        default,
        alias = "main_error_category",
        alias = "category",
        deserialize_with = "lenient_opt_string"
    )]
    pub main_error_category: Option<String>,

    /// Error type hint such as "timeout"
    #[serde(
        default,
        alias = "main_error_type",
        alias = "errorType",
        deserialize_with = "lenient_opt_string"
    )]
    pub main_error_type: Option<String>,

    /// Attempts underlying this record
    #[serde(default, alias = "total_events", deserialize_with = "lenient_u64")]
    pub total_events: u64,

    /// Failed attempts within `total_events`
    #[serde(default, alias = "failed_events", deserialize_with = "lenient_u64")]
    pub failed_events: u64,

    /// Payment amount
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: f64,

    #[serde(
        default,
        alias = "merchant_id",
        alias = "merchant",
        deserialize_with = "lenient_opt_string"
    )]
    pub merchant_id: Option<String>,

    #[serde(default, alias = "merchant_name", deserialize_with = "lenient_opt_string")]
    pub merchant_name: Option<String>,

    #[serde(
        default,
        alias = "country_code",
        alias = "country",
        deserialize_with = "lenient_opt_string"
    )]
    pub country_code: Option<String>,

    #[serde(default, alias = "first_seen", deserialize_with = "lenient_datetime")]
    pub first_seen: Option<DateTime<Utc>>,

    #[serde(
        default,
        alias = "last_seen",
        alias = "timestamp",
        deserialize_with = "lenient_datetime"
    )]
    pub last_seen: Option<DateTime<Utc>>,

    /// Names of the risk validations this payment passed
    #[serde(default, alias = "risk_checks", deserialize_with = "lenient_string_list")]
    pub risk_checks: Vec<String>,

    #[serde(default, alias = "processing_time_sec", deserialize_with = "lenient_f64")]
    pub processing_time_sec: f64,

    #[serde(default, alias = "latency_ms", deserialize_with = "lenient_f64")]
    pub latency_ms: f64,
}

impl EventRecord {
    /// Decode a record from JSON, tolerating several spellings of one field.
    ///
    /// Plain `serde` deserialization rejects an object that carries two
    /// spellings of the same field (`errorCode` and `error_code`) as a
    /// duplicate. Here only one spelling is kept: the first non-null one in
    /// preference order.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        match value {
            Value::Object(mut fields) => {
                collapse_spellings(&mut fields);
                serde_json::from_value(Value::Object(fields))
            }
            other => serde_json::from_value(other),
        }
    }

    /// Create a record for a provider with a status; other fields default.
    pub fn new(provider: impl Into<String>, status: EventStatus) -> Self {
        let status = match status {
            EventStatus::Succeeded => "SUCCEEDED",
            EventStatus::Failed => "FAILED",
            EventStatus::Cancelled => "CANCELLED",
            EventStatus::Pending => "PENDING",
            EventStatus::Unknown => "",
        };
        Self {
            provider: provider.into(),
            status: status.to_string(),
            ..Self::default()
        }
    }

    pub fn with_error(mut self, code: impl Into<String>, category: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self.main_error_category = Some(category.into());
        self
    }

    pub fn with_events(mut self, total: u64, failed: u64) -> Self {
        self.total_events = total;
        self.failed_events = failed;
        self
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_merchant(mut self, merchant_id: impl Into<String>) -> Self {
        self.merchant_id = Some(merchant_id.into());
        self
    }

    pub fn with_country(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = Some(country_code.into());
        self
    }

    pub fn status(&self) -> EventStatus {
        EventStatus::parse(&self.status)
    }

    pub fn category(&self) -> Option<ErrorCategory> {
        self.main_error_category
            .as_deref()
            .and_then(ErrorCategory::parse)
    }

    /// Whether the record names a provider, a status or an error code.
    pub fn is_identifiable(&self) -> bool {
        !self.provider.trim().is_empty() || !self.status.trim().is_empty() || self.code().is_some()
    }

    /// User cancellations are not system faults and never count as failures.
    pub fn is_user_attributed(&self) -> bool {
        self.category() == Some(ErrorCategory::User) || self.status() == EventStatus::Cancelled
    }

    /// Error code, falling back to the incident tag.
    pub fn code(&self) -> Option<&str> {
        self.error_code
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .or_else(|| self.incident_tag.as_deref().filter(|t| !t.trim().is_empty()))
    }

    /// Failed attempts as reported, or one for a bare FAILED event.
    pub fn failed_attempts(&self) -> u64 {
        if self.failed_events > 0 {
            self.failed_events
        } else if self.status() == EventStatus::Failed {
            1
        } else {
            0
        }
    }

    /// Attempts represented by this record; never less than its failures.
    pub fn attempts(&self) -> u64 {
        self.total_events.max(self.failed_attempts()).max(1)
    }

    /// Failures that count toward failure rates and severity.
    pub fn counted_failures(&self) -> u64 {
        if self.is_user_attributed() {
            0
        } else {
            self.failed_attempts()
        }
    }
}

fn collapse_spellings(fields: &mut Map<String, Value>) {
    for spellings in FIELD_SPELLINGS {
        let present: Vec<&str> = spellings
            .iter()
            .copied()
            .filter(|key| fields.contains_key(*key))
            .collect();
        if present.len() < 2 {
            continue;
        }
        let keep = present
            .iter()
            .copied()
            .find(|key| fields.get(*key).map_or(false, |v| !v.is_null()))
            .unwrap_or(present[0]);
        for key in present {
            if key != keep {
                fields.remove(key);
            }
        }
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(lenient_opt_string(deserializer)?.unwrap_or_default())
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn number_from(value: Option<Value>) -> f64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(number_from(Option::<Value>::deserialize(deserializer)?))
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let n = number_from(Option::<Value>::deserialize(deserializer)?);
    Ok(if n > 0.0 { n as u64 } else { 0 })
}

fn lenient_datetime<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .ok(),
        _ => None,
    })
}

fn lenient_string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_camel_and_snake_case_fields() {
        let camel: EventRecord = serde_json::from_value(json!({
            "provider": "STRIPE",
            "status": "FAILED",
            "errorCode": "BANK_TIMEOUT",
            "mainErrorCategory": "PROVIDER",
            "totalEvents": 3,
            "failedEvents": 2,
            "merchantId": "m_1"
        }))
        .unwrap();
        let snake: EventRecord = serde_json::from_value(json!({
            "provider": "STRIPE",
            "status": "FAILED",
            "error_code": "BANK_TIMEOUT",
            "main_error_category": "PROVIDER",
            "total_events": 3,
            "failed_events": 2,
            "merchant_id": "m_1"
        }))
        .unwrap();

        assert_eq!(camel, snake);
        assert_eq!(camel.code(), Some("BANK_TIMEOUT"));
        assert_eq!(camel.category(), Some(ErrorCategory::Provider));
    }

    #[test]
    fn test_duplicate_spellings() {
        let both = json!({
            "provider": "STRIPE",
            "errorCode": "BANK_TIMEOUT",
            "error_code": "DECLINED",
            "title": "Bank timed out",
            "mainErrorCategory": null,
            "category": "PROVIDER"
        });

        // Derived deserialization treats the second spelling as a duplicate
        assert!(serde_json::from_value::<EventRecord>(both.clone()).is_err());

        let record = EventRecord::from_value(both).unwrap();
        assert_eq!(record.code(), Some("BANK_TIMEOUT"));
        assert_eq!(record.error_message.as_deref(), Some("Bank timed out"));
        assert_eq!(record.category(), Some(ErrorCategory::Provider));
    }

    #[test]
    fn test_identifiable() {
        assert!(!EventRecord::default().is_identifiable());
        assert!(EventRecord::new("A", EventStatus::Unknown).is_identifiable());
        assert!(EventRecord::new("", EventStatus::Failed).is_identifiable());

        let stats = EventRecord::from_value(json!({"totalVolume": 5, "amount": 3})).unwrap();
        assert!(!stats.is_identifiable());

        let tagged = EventRecord::from_value(json!({"incidentTag": "INC-1"})).unwrap();
        assert!(tagged.is_identifiable());
    }

    #[test]
    fn test_malformed_fields_fall_back_to_zero_values() {
        let record: EventRecord = serde_json::from_value(json!({
            "provider": null,
            "totalEvents": "not a number",
            "failedEvents": null,
            "amount": "12.5",
            "lastSeen": "yesterday",
            "riskChecks": "none"
        }))
        .unwrap();

        assert_eq!(record.provider, "");
        assert_eq!(record.total_events, 0);
        assert_eq!(record.failed_events, 0);
        assert_eq!(record.amount, 12.5);
        assert!(record.last_seen.is_none());
        assert!(record.risk_checks.is_empty());
        assert_eq!(record.status(), EventStatus::Unknown);
    }

    #[test]
    fn test_empty_object_parses() {
        let record: EventRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(record, EventRecord::default());
        assert_eq!(record.attempts(), 1);
        assert_eq!(record.failed_attempts(), 0);
    }

    #[test]
    fn test_timestamps_parse() {
        let record: EventRecord = serde_json::from_value(json!({
            "firstSeen": "2024-07-01T10:00:00Z",
            "lastSeen": "2024-07-01T12:30:00+02:00"
        }))
        .unwrap();

        assert_eq!(
            record.first_seen.unwrap().to_rfc3339(),
            "2024-07-01T10:00:00+00:00"
        );
        assert_eq!(
            record.last_seen.unwrap().to_rfc3339(),
            "2024-07-01T10:30:00+00:00"
        );
    }

    #[test]
    fn test_failed_attempts() {
        let bare = EventRecord::new("A", EventStatus::Failed);
        assert_eq!(bare.failed_attempts(), 1);
        assert_eq!(bare.attempts(), 1);

        let incident = EventRecord::new("A", EventStatus::Failed).with_events(4, 3);
        assert_eq!(incident.failed_attempts(), 3);
        assert_eq!(incident.attempts(), 4);

        // Inconsistent counts never yield more failures than attempts
        let inconsistent = EventRecord::new("A", EventStatus::Failed).with_events(2, 5);
        assert_eq!(inconsistent.attempts(), 5);

        let ok = EventRecord::new("A", EventStatus::Succeeded);
        assert_eq!(ok.failed_attempts(), 0);
    }

    #[test]
    fn test_user_attributed_failures_are_not_counted() {
        let user = EventRecord::new("A", EventStatus::Failed)
            .with_error("USER_CANCELLED", "user")
            .with_events(5, 5);
        assert!(user.is_user_attributed());
        assert_eq!(user.failed_attempts(), 5);
        assert_eq!(user.counted_failures(), 0);

        let cancelled = EventRecord::new("A", EventStatus::Cancelled).with_events(1, 1);
        assert_eq!(cancelled.counted_failures(), 0);
    }

    #[test]
    fn test_code_falls_back_to_incident_tag() {
        let mut record = EventRecord::new("A", EventStatus::Failed);
        record.error_code = Some("  ".to_string());
        record.incident_tag = Some("INC-PE-CARD-003".to_string());
        assert_eq!(record.code(), Some("INC-PE-CARD-003"));
    }

    #[test]
    fn test_status_spellings() {
        assert_eq!(EventStatus::parse("successful"), EventStatus::Succeeded);
        assert_eq!(EventStatus::parse(" Failed "), EventStatus::Failed);
        assert_eq!(EventStatus::parse("CANCELED"), EventStatus::Cancelled);
        assert_eq!(EventStatus::parse("whatever"), EventStatus::Unknown);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(ErrorCategory::parse(""), None);
        assert_eq!(ErrorCategory::parse(" merchant "), Some(ErrorCategory::Merchant));
        assert_eq!(
            ErrorCategory::parse("network"),
            Some(ErrorCategory::Other("NETWORK".to_string()))
        );
        assert_eq!(ErrorCategory::parse("network").unwrap().as_key(), "NETWORK");
    }
}
