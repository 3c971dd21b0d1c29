//! NATS consumer for the real-time event feed

use crate::feed::FeedMessage;
use anyhow::{bail, Context, Result};
use async_nats::{Client, Message};
use futures::{Stream, StreamExt};
use tracing::info;

/// Consumer that turns record-subject deliveries into feed messages
pub struct RecordConsumer {
    client: Client,
    subject: String,
}

impl RecordConsumer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the record subject.
    ///
    /// Each item is one decoded delivery; undecodable payloads surface as
    /// errors so the caller can count and skip them.
    pub async fn subscribe(&self) -> Result<impl Stream<Item = Result<FeedMessage>> + Unpin> {
        let subscriber = self
            .client
            .subscribe(self.subject.clone())
            .await
            .with_context(|| format!("Failed to subscribe to {}", self.subject))?;
        info!(subject = %self.subject, "Subscribed to record subject");

        let subject = self.subject.clone();
        Ok(subscriber.map(move |message: Message| decode_delivery(&subject, &message.payload)))
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Decode one delivery from `subject`.
pub fn decode_delivery(subject: &str, payload: &[u8]) -> Result<FeedMessage> {
    if payload.iter().all(u8::is_ascii_whitespace) {
        bail!("Empty delivery on {}", subject);
    }
    FeedMessage::from_slice(payload)
        .with_context(|| format!("Malformed delivery on {} ({} bytes)", subject, payload.len()))
}
