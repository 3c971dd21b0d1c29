//! Configuration management for the payment health monitor

use crate::engine::aggregator::{AlertFilter, GroupBy};
use crate::engine::classifier::{ScoreWeights, SeverityThresholds};
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming event records
    pub record_subject: String,
    /// Subject for outgoing alert reports
    pub alert_subject: String,
}

/// Recommendation catalog source
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    /// JSON catalog file; the bundled catalog is used when unset
    pub path: Option<String>,
}

/// Score weights and severity breakpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: ScoreWeights,
    #[serde(default)]
    pub thresholds: SeverityThresholds,
}

/// Real-time feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Maximum records kept in memory
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,
    /// Dimension alerts are grouped by
    #[serde(default)]
    pub group_by: GroupBy,
}

fn default_window_capacity() -> usize {
    10_000
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            window_capacity: default_window_capacity(),
            group_by: GroupBy::Provider,
        }
    }
}

/// Report contents
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Critical alerts listed as headline incidents
    #[serde(default = "default_critical_limit")]
    pub critical_limit: usize,
    /// Error codes listed in the top-errors section
    #[serde(default = "default_top_errors_limit")]
    pub top_errors_limit: usize,
    /// Only alerts matching this filter are published
    #[serde(default)]
    pub filter: AlertFilter,
}

fn default_critical_limit() -> usize {
    3
}

fn default_top_errors_limit() -> usize {
    5
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            critical_limit: default_critical_limit(),
            top_errors_limit: default_top_errors_limit(),
            filter: AlertFilter::default(),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Seconds between metrics summaries
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
}

fn default_report_interval() -> u64 {
    30
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: default_report_interval(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path, with `PHM__` environment overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("PHM").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                record_subject: "payments.events".to_string(),
                alert_subject: "payments.alerts".to_string(),
            },
            catalog: CatalogConfig::default(),
            scoring: ScoringConfig::default(),
            feed: FeedConfig::default(),
            report: ReportConfig::default(),
            pipeline: PipelineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
