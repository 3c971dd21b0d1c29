//! Payment Health Monitor - Main Entry Point
//!
//! With a file argument, scores the records in that file once and prints the
//! report. Without one, consumes event records from NATS, recomputes the
//! report on every delivery and publishes it.

use anyhow::{Context, Result};
use futures::StreamExt;
use payment_health_monitor::{
    config::{AppConfig, LoggingConfig},
    consumer::RecordConsumer,
    feed::{self, RecordWindow},
    metrics::{MetricsReporter, PipelineMetrics},
    monitor::HealthMonitor,
    producer::AlertProducer,
    types::Severity,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().or_else(|_| {
        tracing_subscriber::EnvFilter::try_new(format!(
            "payment_health_monitor={}",
            logging.level
        ))
    })?;

    if logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

fn run_once(monitor: &HealthMonitor, path: &Path) -> Result<()> {
    let payload =
        std::fs::read(path).with_context(|| format!("Failed to read records from {:?}", path))?;
    let records = feed::parse_records(&payload)?;
    info!(records = records.len(), path = %path.display(), "Records loaded");

    let report = monitor.report(&records);
    info!(
        score = report.score.score,
        grade = report.score.grade.as_str(),
        alerts = report.alerts.len(),
        critical = report.count(Severity::Critical),
        "Report computed"
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path =
        std::env::var("PHM_CONFIG").unwrap_or_else(|_| "config/config.toml".to_string());
    let config = if Path::new(&config_path).exists() {
        AppConfig::load_from_path(&config_path)?
    } else {
        AppConfig::default()
    };

    init_logging(&config.logging)?;
    info!("Starting Payment Health Monitor");
    info!(
        "Severity thresholds: critical score<{:.0} or rate>{:.0}%, warning score<{:.0} or rate>{:.0}%",
        config.scoring.thresholds.critical_score,
        config.scoring.thresholds.critical_failure_rate,
        config.scoring.thresholds.warning_score,
        config.scoring.thresholds.warning_failure_rate
    );

    let monitor = HealthMonitor::from_config(&config)?;

    if let Some(path) = std::env::args().nth(1) {
        return run_once(&monitor, Path::new(&path));
    }

    let metrics = Arc::new(PipelineMetrics::new());

    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = RecordConsumer::new(client.clone(), &config.nats.record_subject);
    let producer = AlertProducer::new(client.clone(), &config.nats.alert_subject);
    info!("Publishing alert reports to: {}", producer.subject());

    let metrics_clone = metrics.clone();
    let interval = config.pipeline.report_interval_secs;
    tokio::spawn(async move {
        let reporter = MetricsReporter::new(metrics_clone, interval);
        reporter.start().await;
    });

    let mut window = RecordWindow::new(config.feed.window_capacity);
    let mut deliveries = consumer.subscribe().await?;

    // Deliveries are applied in order and each triggers a full recompute
    while let Some(delivery) = deliveries.next().await {
        let message = match delivery {
            Ok(message) => message,
            Err(e) => {
                metrics.record_malformed();
                warn!(error = ?e, "Skipping feed delivery");
                continue;
            }
        };

        let ingested = window.apply(message);
        metrics.record_message(ingested);

        let start_time = Instant::now();
        let report = monitor.report(&window.snapshot());
        let recompute_time = start_time.elapsed();
        metrics.record_report(&report, recompute_time);

        match producer.publish(&report).await {
            Ok(()) => {
                let critical = report.count(Severity::Critical);
                if critical > 0 {
                    info!(
                        report_id = %report.report_id,
                        critical,
                        score = report.score.score,
                        grade = report.score.grade.as_str(),
                        "Critical incidents active"
                    );
                } else {
                    debug!(
                        report_id = %report.report_id,
                        alerts = report.alerts.len(),
                        window = window.len(),
                        recompute_us = recompute_time.as_micros(),
                        "Report published"
                    );
                }
            }
            Err(e) => {
                error!(report_id = %report.report_id, error = %e, "Failed to publish alert report");
            }
        }
    }

    info!("Monitor shutting down...");
    metrics.print_summary();

    Ok(())
}
