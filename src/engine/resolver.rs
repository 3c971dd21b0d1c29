//! Recommendation catalog and resolution rules.
//!
//! The catalog is loaded once at startup and never mutated. Resolution picks
//! a single entry from it for an incident, preferring retry-aware guidance
//! for provider timeouts and category-level guidance for everything else.

use crate::config::CatalogConfig;
use crate::engine::normalizer::{normalize, ErrorKind};
use crate::types::event::{ErrorCategory, EventRecord};
use crate::types::recommendation::Recommendation;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Catalog shipped with the binary
const BUNDLED_CATALOG: &str = include_str!("../../config/recommendations.json");

/// Category key for a provider timeout seen on a single attempt
pub const PROVIDER_TIMEOUT_SINGLE_ATTEMPT: &str = "PROVIDER_TIMEOUT_SINGLE_ATTEMPT";
/// Category key for a provider timeout repeated across attempts
pub const PROVIDER_TIMEOUT_MULTIPLE_ATTEMPTS: &str = "PROVIDER_TIMEOUT_MULTIPLE_ATTEMPTS";

/// Static remediation catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationCatalog {
    /// Entries keyed by canonical error kind
    #[serde(default)]
    pub error_recommendations: HashMap<ErrorKind, Recommendation>,
    /// Entries keyed by uppercase error category
    #[serde(default)]
    pub error_category_recommendations: HashMap<String, Recommendation>,
}

impl RecommendationCatalog {
    /// Parse the catalog embedded in the binary.
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_CATALOG).context("Failed to parse bundled recommendation catalog")
    }

    /// Parse a catalog from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut catalog: Self =
            serde_json::from_str(json).context("Invalid recommendation catalog JSON")?;
        catalog.error_category_recommendations = catalog
            .error_category_recommendations
            .into_iter()
            .map(|(key, rec)| (key.trim().to_uppercase(), rec))
            .collect();
        Ok(catalog)
    }

    /// Load a catalog from a JSON file.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read recommendation catalog {:?}", path))?;
        Self::from_json(&json)
            .with_context(|| format!("Failed to load recommendation catalog {:?}", path))
    }

    /// Load the configured catalog, or the bundled one when no path is set.
    pub fn load(config: &CatalogConfig) -> Result<Self> {
        let catalog = match &config.path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::bundled()?,
        };
        info!(
            kinds = catalog.error_recommendations.len(),
            categories = catalog.error_category_recommendations.len(),
            source = config.path.as_deref().unwrap_or("bundled"),
            "Recommendation catalog loaded"
        );
        Ok(catalog)
    }

    /// Kind-specific entry
    pub fn for_kind(&self, kind: ErrorKind) -> Option<&Recommendation> {
        self.error_recommendations.get(&kind)
    }

    /// Category-level entry
    pub fn for_category(&self, key: &str) -> Option<&Recommendation> {
        self.error_category_recommendations.get(key)
    }

    /// Select the recommendation for an incident.
    ///
    /// Rules, first match wins:
    /// 1. provider timeout seen on several attempts: multiple-attempts entry,
    ///    else the generic PROVIDER entry
    /// 2. provider timeout on a single attempt: single-attempt entry, else the
    ///    PROVIDER_TIMEOUT kind entry
    /// 3. any other PROVIDER error: the PROVIDER entry
    /// 4. another category with a catalog entry: that entry
    /// 5. the kind entry for the normalized code
    ///
    /// `None` is a valid outcome and means no guidance is available.
    pub fn resolve(
        &self,
        raw_code: Option<&str>,
        category: Option<&str>,
        total_attempts: u64,
        error_type: Option<&str>,
    ) -> Option<&Recommendation> {
        let category = category.and_then(ErrorCategory::parse);
        let kind = normalize(raw_code);

        let is_timeout = raw_code
            .map(|code| code.trim().to_uppercase().contains("TIMEOUT"))
            .unwrap_or(false)
            || error_type
                .map(|t| t.trim().to_lowercase() == "timeout")
                .unwrap_or(false)
            || kind == Some(ErrorKind::ProviderTimeout);

        match category {
            Some(ErrorCategory::Provider) if is_timeout => {
                if total_attempts > 1 {
                    self.for_category(PROVIDER_TIMEOUT_MULTIPLE_ATTEMPTS)
                        .or_else(|| self.for_category("PROVIDER"))
                } else {
                    self.for_category(PROVIDER_TIMEOUT_SINGLE_ATTEMPT)
                        .or_else(|| self.for_kind(ErrorKind::ProviderTimeout))
                }
            }
            Some(ErrorCategory::Provider) => self.for_category("PROVIDER"),
            Some(ref other) if self.for_category(other.as_key()).is_some() => {
                self.for_category(other.as_key())
            }
            _ => {
                let found = kind.and_then(|k| self.for_kind(k));
                if found.is_none() {
                    debug!(code = ?raw_code, "No recommendation for incident");
                }
                found
            }
        }
    }

    /// Resolve using the fields of a record.
    pub fn resolve_record(&self, record: &EventRecord, total_attempts: u64) -> Option<&Recommendation> {
        self.resolve(
            record.code(),
            record.main_error_category.as_deref(),
            total_attempts,
            record.main_error_type.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(title: &str) -> Recommendation {
        Recommendation {
            title: title.to_string(),
            ..Recommendation::default()
        }
    }

    fn catalog() -> RecommendationCatalog {
        let mut catalog = RecommendationCatalog::default();
        catalog
            .error_recommendations
            .insert(ErrorKind::ProviderTimeout, entry("kind:timeout"));
        catalog
            .error_recommendations
            .insert(ErrorKind::InsufficientBalance, entry("kind:balance"));
        for key in [
            "PROVIDER",
            "MERCHANT",
            "USER",
            PROVIDER_TIMEOUT_SINGLE_ATTEMPT,
            PROVIDER_TIMEOUT_MULTIPLE_ATTEMPTS,
        ] {
            catalog
                .error_category_recommendations
                .insert(key.to_string(), entry(&format!("category:{}", key)));
        }
        catalog
    }

    fn title(rec: Option<&Recommendation>) -> Option<&str> {
        rec.map(|r| r.title.as_str())
    }

    #[test]
    fn test_provider_timeout_depends_on_attempts() {
        let catalog = catalog();

        let multiple = catalog.resolve(Some("X"), Some("PROVIDER"), 3, Some("timeout"));
        assert_eq!(title(multiple), Some("category:PROVIDER_TIMEOUT_MULTIPLE_ATTEMPTS"));

        let single = catalog.resolve(Some("X"), Some("PROVIDER"), 1, Some("timeout"));
        assert_eq!(title(single), Some("category:PROVIDER_TIMEOUT_SINGLE_ATTEMPT"));

        let none_reported = catalog.resolve(Some("X"), Some("PROVIDER"), 0, Some("timeout"));
        assert_eq!(title(none_reported), Some("category:PROVIDER_TIMEOUT_SINGLE_ATTEMPT"));
    }

    #[test]
    fn test_timeout_detection_sources() {
        let catalog = catalog();

        // By code name
        let by_name = catalog.resolve(Some("mx_stripe_timeout"), Some("provider"), 2, None);
        assert_eq!(title(by_name), Some("category:PROVIDER_TIMEOUT_MULTIPLE_ATTEMPTS"));

        // By normalization only
        let by_mapping = catalog.resolve(Some("Response-Time-Exceeded"), Some("PROVIDER"), 1, None);
        assert_eq!(title(by_mapping), Some("category:PROVIDER_TIMEOUT_SINGLE_ATTEMPT"));

        // By error type, case-insensitive
        let by_type = catalog.resolve(Some("E42"), Some("PROVIDER"), 1, Some(" TimeOut "));
        assert_eq!(title(by_type), Some("category:PROVIDER_TIMEOUT_SINGLE_ATTEMPT"));
    }

    #[test]
    fn test_timeout_fallbacks() {
        let mut catalog = catalog();
        catalog
            .error_category_recommendations
            .remove(PROVIDER_TIMEOUT_MULTIPLE_ATTEMPTS);
        catalog
            .error_category_recommendations
            .remove(PROVIDER_TIMEOUT_SINGLE_ATTEMPT);

        let multiple = catalog.resolve(Some("TIMEOUT"), Some("PROVIDER"), 5, None);
        assert_eq!(title(multiple), Some("category:PROVIDER"));

        let single = catalog.resolve(Some("TIMEOUT"), Some("PROVIDER"), 1, None);
        assert_eq!(title(single), Some("kind:timeout"));
    }

    #[test]
    fn test_non_timeout_provider_error() {
        let catalog = catalog();
        let rec = catalog.resolve(Some("INSUFFICIENT_FUNDS"), Some("PROVIDER"), 4, None);
        assert_eq!(title(rec), Some("category:PROVIDER"));
    }

    #[test]
    fn test_other_categories_use_category_entry() {
        let catalog = catalog();

        let merchant = catalog.resolve(Some("TIMEOUT"), Some("merchant"), 3, None);
        assert_eq!(title(merchant), Some("category:MERCHANT"));

        let user = catalog.resolve(Some("INSUFFICIENT_FUNDS"), Some("USER"), 1, None);
        assert_eq!(title(user), Some("category:USER"));
    }

    #[test]
    fn test_falls_back_to_kind_entry() {
        let catalog = catalog();

        let uncategorized = catalog.resolve(Some("insufficient funds"), None, 1, None);
        assert_eq!(title(uncategorized), Some("kind:balance"));

        // Unknown category without an entry also falls through
        let unknown = catalog.resolve(Some("INSUFFICIENT"), Some("NETWORK"), 1, None);
        assert_eq!(title(unknown), Some("kind:balance"));

        let blank = catalog.resolve(Some("INSUFFICIENT"), Some("  "), 1, None);
        assert_eq!(title(blank), Some("kind:balance"));
    }

    #[test]
    fn test_no_recommendation() {
        let catalog = catalog();
        assert!(catalog.resolve(Some("SOMETHING_ODD"), None, 1, None).is_none());
        assert!(catalog.resolve(None, None, 0, None).is_none());
        assert!(catalog
            .resolve(Some("ACCOUNT_BLOCKED"), None, 1, None)
            .is_none());
    }

    #[test]
    fn test_resolve_record() {
        let catalog = catalog();
        let record: EventRecord = serde_json::from_value(json!({
            "provider": "PAYU",
            "status": "FAILED",
            "incidentTag": "BANK_TIMEOUT",
            "mainErrorCategory": "PROVIDER",
            "totalEvents": 4,
            "failedEvents": 4
        }))
        .unwrap();

        let rec = catalog.resolve_record(&record, record.attempts());
        assert_eq!(title(rec), Some("category:PROVIDER_TIMEOUT_MULTIPLE_ATTEMPTS"));
    }

    #[test]
    fn test_category_keys_are_normalized_on_load() {
        let catalog = RecommendationCatalog::from_json(
            &json!({
                "errorRecommendations": {
                    "PROVIDER_TIMEOUT": { "title": "Timeout" }
                },
                "errorCategoryRecommendations": {
                    " merchant ": { "title": "Merchant" }
                }
            })
            .to_string(),
        )
        .unwrap();

        assert_eq!(title(catalog.for_category("MERCHANT")), Some("Merchant"));
        assert_eq!(title(catalog.for_kind(ErrorKind::ProviderTimeout)), Some("Timeout"));
    }

    #[test]
    fn test_invalid_catalog_is_an_error() {
        assert!(RecommendationCatalog::from_json("{ not json").is_err());
        assert!(RecommendationCatalog::from_json(
            &json!({ "errorRecommendations": { "NOT_A_KIND": {} } }).to_string()
        )
        .is_err());
    }

    #[test]
    fn test_bundled_catalog_covers_every_kind() {
        let catalog = RecommendationCatalog::bundled().unwrap();
        for kind in ErrorKind::ALL {
            let rec = catalog.for_kind(kind);
            assert!(rec.is_some(), "missing entry for {}", kind);
            assert!(!rec.unwrap().actions.is_empty());
        }
        for key in [
            "PROVIDER",
            "MERCHANT",
            "USER",
            PROVIDER_TIMEOUT_SINGLE_ATTEMPT,
            PROVIDER_TIMEOUT_MULTIPLE_ATTEMPTS,
        ] {
            assert!(catalog.for_category(key).is_some(), "missing category {}", key);
        }
    }

    #[test]
    fn test_load_missing_file_fails() {
        let config = CatalogConfig {
            path: Some("/nonexistent/recommendations.json".to_string()),
        };
        assert!(RecommendationCatalog::load(&config).is_err());
        assert!(RecommendationCatalog::load(&CatalogConfig::default()).is_ok());
    }
}
