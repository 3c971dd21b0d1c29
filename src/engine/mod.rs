//! Incident classification engine
//!
//! Pure, synchronous functions over in-memory record sets. Every call
//! recomputes its result from scratch.

pub mod aggregator;
pub mod classifier;
pub mod kpi;
pub mod normalizer;
pub mod resolver;

pub use aggregator::{critical_alerts, AlertFilter, GroupBy, IncidentAggregator};
pub use classifier::{classify_group, security_score, ScoreWeights, SecurityScore, SeverityThresholds};
pub use kpi::{merchant_breakdown, provider_breakdown, top_errors, PaymentKpis};
pub use normalizer::{normalize, ErrorKind};
pub use resolver::RecommendationCatalog;
