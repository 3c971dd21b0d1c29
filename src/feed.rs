//! Record window for push-delivered events.
//!
//! Real-time deliveries are folded into the same `Vec<EventRecord>` snapshot
//! a batch fetch would produce, so the engine never knows how records
//! arrived.

use crate::types::event::EventRecord;
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::VecDeque;
use tracing::debug;

const OVERVIEW_KEYS: [&str; 2] = ["activeIssues", "active_issues"];

/// Payload shapes accepted from the feed
#[derive(Debug, Clone)]
pub enum FeedMessage {
    /// Overview response wrapping an incident list
    Overview { active_issues: Vec<EventRecord> },
    /// Full snapshot
    Batch(Vec<EventRecord>),
    /// Single new record
    Record(Box<EventRecord>),
}

impl FeedMessage {
    pub fn from_slice(payload: &[u8]) -> Result<Self> {
        let value: Value =
            serde_json::from_slice(payload).context("Failed to decode feed message")?;
        Self::from_value(value)
    }

    /// Classify a decoded payload.
    ///
    /// An object carrying `activeIssues` is an overview; a null or non-list
    /// value there means no active issues. Any other object must identify
    /// itself as a record by provider, status or error code.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => Ok(FeedMessage::Batch(records_from(items))),
            Value::Object(mut fields) => {
                if let Some(key) = OVERVIEW_KEYS
                    .iter()
                    .copied()
                    .find(|key| fields.contains_key(*key))
                {
                    let active_issues = match fields.remove(key) {
                        Some(Value::Array(items)) => records_from(items),
                        _ => Vec::new(),
                    };
                    return Ok(FeedMessage::Overview { active_issues });
                }

                let record = EventRecord::from_value(Value::Object(fields))
                    .context("Failed to decode event record")?;
                if !record.is_identifiable() {
                    bail!("Feed object has no provider, status or error code");
                }
                Ok(FeedMessage::Record(Box::new(record)))
            }
            other => bail!("Unsupported feed payload: {}", json_kind(&other)),
        }
    }

    /// Records carried by the message
    pub fn into_records(self) -> Vec<EventRecord> {
        match self {
            FeedMessage::Overview { active_issues } => active_issues,
            FeedMessage::Batch(records) => records,
            FeedMessage::Record(record) => vec![*record],
        }
    }
}

/// Decode list entries, skipping those that are not usable records.
fn records_from(items: Vec<Value>) -> Vec<EventRecord> {
    let total = items.len();
    let records: Vec<EventRecord> = items
        .into_iter()
        .filter_map(|item| EventRecord::from_value(item).ok())
        .filter(EventRecord::is_identifiable)
        .collect();
    if records.len() < total {
        debug!(skipped = total - records.len(), "Dropped unusable list entries");
    }
    records
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Decode a record list from any accepted payload shape.
pub fn parse_records(payload: &[u8]) -> Result<Vec<EventRecord>> {
    Ok(FeedMessage::from_slice(payload)?.into_records())
}

/// Bounded in-memory window of the most recent records
#[derive(Debug)]
pub struct RecordWindow {
    records: VecDeque<EventRecord>,
    capacity: usize,
}

impl RecordWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Apply a delivery: single records append, batches replace the window.
    ///
    /// Returns the number of records taken in.
    pub fn apply(&mut self, message: FeedMessage) -> usize {
        match message {
            FeedMessage::Record(record) => {
                self.push(*record);
                1
            }
            batch => {
                let records = batch.into_records();
                let count = records.len();
                self.records.clear();
                for record in records {
                    self.push(record);
                }
                debug!(records = count, retained = self.records.len(), "Window replaced");
                count
            }
        }
    }

    pub fn push(&mut self, record: EventRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Records in arrival order
    pub fn snapshot(&self) -> Vec<EventRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
