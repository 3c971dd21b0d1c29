//! Payment Health Monitor Library
//!
//! Classifies payment incidents, scores overall payment health and attaches
//! remediation guidance, from either batch snapshots or a real-time feed.

pub mod config;
pub mod consumer;
pub mod engine;
pub mod feed;
pub mod metrics;
pub mod monitor;
pub mod producer;
pub mod types;

pub use config::AppConfig;
pub use consumer::RecordConsumer;
pub use engine::{IncidentAggregator, RecommendationCatalog, SecurityScore};
pub use feed::{FeedMessage, RecordWindow};
pub use monitor::HealthMonitor;
pub use producer::AlertProducer;
pub use types::{alert::AlertSummary, event::EventRecord};
