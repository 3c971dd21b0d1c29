//! Runtime statistics for the monitor service.

use crate::types::alert::{AlertReport, Severity};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for the ingest/recompute loop
pub struct PipelineMetrics {
    /// Feed messages received
    pub messages_received: AtomicU64,
    /// Messages that failed to decode
    pub malformed_messages: AtomicU64,
    /// Records taken into the window
    pub records_ingested: AtomicU64,
    /// Reports produced
    pub reports_generated: AtomicU64,
    /// Alert counts of the latest report, by severity
    latest_alerts: RwLock<HashMap<Severity, u64>>,
    /// Recompute durations (in microseconds)
    recompute_times: RwLock<Vec<u64>>,
    /// Latest security score, stored as f64 bits
    latest_score: AtomicU64,
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            malformed_messages: AtomicU64::new(0),
            records_ingested: AtomicU64::new(0),
            reports_generated: AtomicU64::new(0),
            latest_alerts: RwLock::new(HashMap::new()),
            recompute_times: RwLock::new(Vec::with_capacity(1000)),
            latest_score: AtomicU64::new(0f64.to_bits()),
            start_time: Instant::now(),
        }
    }

    /// Record a decoded feed message
    pub fn record_message(&self, records: usize) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.records_ingested
            .fetch_add(records as u64, Ordering::Relaxed);
    }

    /// Record a message that could not be decoded
    pub fn record_malformed(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.malformed_messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a recomputed report
    pub fn record_report(&self, report: &AlertReport, recompute_time: Duration) {
        self.reports_generated.fetch_add(1, Ordering::Relaxed);
        self.latest_score
            .store(report.score.score.to_bits(), Ordering::Relaxed);

        if let Ok(mut latest) = self.latest_alerts.write() {
            latest.clear();
            for severity in [Severity::Critical, Severity::Warning, Severity::Info] {
                latest.insert(severity, report.count(severity) as u64);
            }
        }

        if let Ok(mut times) = self.recompute_times.write() {
            times.push(recompute_time.as_micros() as u64);
            // Keep only last 10000
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    pub fn latest_score(&self) -> f64 {
        f64::from_bits(self.latest_score.load(Ordering::Relaxed))
    }

    pub fn latest_alerts(&self, severity: Severity) -> u64 {
        self.latest_alerts
            .read()
            .map(|latest| latest.get(&severity).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Get recompute time statistics
    pub fn get_recompute_stats(&self) -> RecomputeStats {
        let times = match self.recompute_times.read() {
            Ok(times) => times,
            Err(_) => return RecomputeStats::default(),
        };
        if times.is_empty() {
            return RecomputeStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        RecomputeStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[((count as f64 * 0.95) as usize).min(count - 1)],
            p99_us: sorted[((count as f64 * 0.99) as usize).min(count - 1)],
            max_us: sorted[count - 1],
        }
    }

    /// Messages per second since start
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.messages_received.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let messages = self.messages_received.load(Ordering::Relaxed);
        let malformed = self.malformed_messages.load(Ordering::Relaxed);
        let records = self.records_ingested.load(Ordering::Relaxed);
        let reports = self.reports_generated.load(Ordering::Relaxed);
        let recompute = self.get_recompute_stats();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║            PAYMENT HEALTH MONITOR - METRICS SUMMARY          ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Messages: {:>8} (malformed {:>6})  │  {:>6.1} msg/s        ║",
            messages,
            malformed,
            self.get_throughput()
        );
        info!(
            "║ Records Ingested: {:>8}  │  Reports: {:>8}              ║",
            records, reports
        );
        info!(
            "║ Recompute (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5}   ║",
            recompute.mean_us, recompute.p50_us, recompute.p95_us, recompute.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Security Score: {:>5.1}                                        ║",
            self.latest_score()
        );
        info!(
            "║ Alerts: critical={:>4} warning={:>4} info={:>4}                 ║",
            self.latest_alerts(Severity::Critical),
            self.latest_alerts(Severity::Warning),
            self.latest_alerts(Severity::Info)
        );
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Recompute time statistics
#[derive(Debug, Default)]
pub struct RecomputeStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodic metrics reporter
pub struct MetricsReporter {
    metrics: std::sync::Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: std::sync::Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs: interval_secs.max(1),
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
