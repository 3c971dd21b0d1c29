//! Type definitions for the incident engine

pub mod alert;
pub mod event;
pub mod recommendation;

pub use alert::{AlertReport, AlertSummary, Severity};
pub use event::{ErrorCategory, EventRecord, EventStatus};
pub use recommendation::{Recommendation, RecommendationSeverity};
