//! Test Event Producer
//!
//! Generates and publishes synthetic payment event records to NATS for
//! exercising the monitor.

use chrono::{Duration as ChronoDuration, Utc};
use payment_health_monitor::types::event::{EventRecord, EventStatus};
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

const PROVIDERS: &[&str] = &["stripe", "adyen", "checkout", "paypal", "worldpay"];
const COUNTRIES: &[&str] = &["US", "GB", "DE", "FR", "BR", "IN"];

/// (error code, category, error type, message)
const FAILURES: &[(&str, &str, &str, &str)] = &[
    ("DECLINED", "PROVIDER", "decline", "Payment declined by issuer"),
    ("PROVIDER_TIMEOUT", "PROVIDER", "timeout", "Provider did not respond in time"),
    ("INSUFFICIENT_FUNDS", "USER", "decline", "Insufficient funds"),
    ("CARD_EXPIRED", "USER", "validation", "Card expired"),
    ("FRAUD_SUSPECTED", "PROVIDER", "risk", "Blocked by fraud screening"),
    ("3DS_FAILED", "USER", "authentication", "3-D Secure authentication failed"),
    ("INVALID_MERCHANT", "MERCHANT", "configuration", "Merchant account misconfigured"),
    ("RATE_LIMIT_EXCEEDED", "PROVIDER", "throttling", "Too many requests"),
    ("NETWORK_ERROR", "PROVIDER", "connectivity", "Connection reset"),
];

/// Event generator for testing
struct EventGenerator {
    rng: rand::rngs::ThreadRng,
    /// Provider currently suffering an outage
    degraded_provider: &'static str,
}

impl EventGenerator {
    fn new() -> Self {
        let mut rng = rand::thread_rng();
        let degraded_provider = PROVIDERS[rng.gen_range(0..PROVIDERS.len())];
        Self {
            rng,
            degraded_provider,
        }
    }

    fn base_record(&mut self, provider: &str, status: EventStatus) -> EventRecord {
        let now = Utc::now();
        let merchant = format!("merchant_{}", self.rng.gen_range(1..50));
        let country = self.random_choice(COUNTRIES);

        let mut record = EventRecord::new(provider, status)
            .with_amount((self.rng.gen_range(5.0..800.0_f64) * 100.0).round() / 100.0)
            .with_merchant(merchant.clone())
            .with_country(country);
        record.merchant_name = Some(format!("Merchant {}", &merchant[9..]));
        record.first_seen = Some(now - ChronoDuration::seconds(self.rng.gen_range(0..600)));
        record.last_seen = Some(now);
        record.processing_time_sec = self.rng.gen_range(0.2..4.0);
        record.latency_ms = self.rng.gen_range(40.0..1500.0);
        if self.rng.gen_bool(0.7) {
            record.risk_checks = vec!["velocity".to_string(), "avs".to_string()];
        }
        record
    }

    /// Generate a successful payment
    fn generate_success(&mut self) -> EventRecord {
        let provider = self.random_choice(PROVIDERS);
        self.base_record(provider, EventStatus::Succeeded)
            .with_events(1, 0)
    }

    /// Generate a failed payment, biased towards the degraded provider
    fn generate_failure(&mut self) -> EventRecord {
        let provider = if self.rng.gen_bool(0.6) {
            self.degraded_provider
        } else {
            self.random_choice(PROVIDERS)
        };
        let (code, category, error_type, message) =
            FAILURES[self.rng.gen_range(0..FAILURES.len())];
        let attempts = self.rng.gen_range(1..4);

        let mut record = self
            .base_record(provider, EventStatus::Failed)
            .with_error(code, category)
            .with_events(attempts, attempts);
        record.main_error_type = Some(error_type.to_string());
        record.error_message = Some(message.to_string());
        record
    }

    /// Generate a payment abandoned by the customer
    fn generate_cancelled(&mut self) -> EventRecord {
        let provider = self.random_choice(PROVIDERS);
        self.base_record(provider, EventStatus::Cancelled)
            .with_events(1, 0)
    }

    fn random_choice(&mut self, choices: &[&'static str]) -> &'static str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Event Producer");

    let args: Vec<String> = std::env::args().collect();
    let nats_url = args
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("payments.events");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let failure_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.2);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);
    let failure_rate = failure_rate.clamp(0.0, 1.0);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        failure_rate = failure_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, failure_rate, delay_ms).await;
        }
    };

    let mut generator = EventGenerator::new();
    info!(
        provider = generator.degraded_provider,
        "Simulating degraded provider"
    );
    info!("Starting to publish {} events...", count);

    let mut succeeded = 0;
    let mut failed = 0;
    let mut cancelled = 0;

    for i in 0..count {
        let record = next_record(
            &mut generator,
            failure_rate,
            &mut succeeded,
            &mut failed,
            &mut cancelled,
        );
        let payload = serde_json::to_vec(&record)?;

        client.publish(subject.to_string(), payload.into()).await?;

        if (i + 1) % 10 == 0 {
            info!(
                "Published {}/{} events ({} succeeded, {} failed, {} cancelled)",
                i + 1,
                count,
                succeeded,
                failed,
                cancelled
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    client.flush().await?;

    info!(
        "Completed! Published {} events ({} succeeded, {} failed, {} cancelled)",
        count, succeeded, failed, cancelled
    );

    Ok(())
}

fn next_record(
    generator: &mut EventGenerator,
    failure_rate: f64,
    succeeded: &mut u64,
    failed: &mut u64,
    cancelled: &mut u64,
) -> EventRecord {
    let roll: f64 = generator.rng.gen();
    if roll < failure_rate {
        *failed += 1;
        generator.generate_failure()
    } else if roll < failure_rate + 0.05 {
        *cancelled += 1;
        generator.generate_cancelled()
    } else {
        *succeeded += 1;
        generator.generate_success()
    }
}

async fn run_dry_mode(count: u64, failure_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = EventGenerator::new();
    let (mut succeeded, mut failed, mut cancelled) = (0, 0, 0);

    for i in 0..count {
        let record = next_record(
            &mut generator,
            failure_rate,
            &mut succeeded,
            &mut failed,
            &mut cancelled,
        );
        let json = serde_json::to_string_pretty(&record)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample event {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
