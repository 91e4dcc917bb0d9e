//! Payload handling common to every transport.
//!
//! Listeners hand raw payload bytes to [`Ingestor::handle_payload`], which decodes them as
//! a JSON object, normalizes the fields, and upserts the result. Malformed payloads and
//! rejected messages are dropped here; nothing is reported back to the producer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use serde_json::{Map, Value};

use crate::model::normalizer;
use crate::model::store::QuoteStore;

/// Bytes of a dropped payload echoed into the debug log.
const LOG_PREFIX_BYTES: usize = 128;

/// What happened to a single payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Normalized and stored under this key.
    Stored(String),
    /// Not a JSON object.
    Malformed,
    /// Decoded, but no usable instrument key.
    Rejected,
}

/// Counters of payload outcomes since start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Payloads that produced a store update.
    pub stored: u64,
    /// Payloads that failed to decode.
    pub malformed: u64,
    /// Payloads rejected for a missing key.
    pub rejected: u64,
}

/// Shared decode → normalize → upsert pipeline.
#[derive(Debug)]
pub struct Ingestor {
    store: Arc<QuoteStore>,
    stored: AtomicU64,
    malformed: AtomicU64,
    rejected: AtomicU64,
}

impl Ingestor {
    /// Build an ingestor feeding `store`.
    pub fn new(store: Arc<QuoteStore>) -> Self {
        Self {
            store,
            stored: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// The store this ingestor writes to.
    pub fn store(&self) -> &Arc<QuoteStore> {
        &self.store
    }

    /// Process one raw payload.
    pub fn handle_payload(&self, payload: &[u8]) -> Outcome {
        let Some(message) = decode(payload) else {
            debug!(
                "Dropping malformed payload ({} bytes): {}",
                payload.len(),
                String::from_utf8_lossy(log_prefix(payload))
            );
            self.malformed.fetch_add(1, Ordering::Relaxed);
            return Outcome::Malformed;
        };

        match normalizer::normalize(&message) {
            Some(quote) => {
                let key = quote.key.clone();
                if !self.store.upsert(quote) {
                    debug!("Store refused quote for key {:?}", key);
                    self.rejected.fetch_add(1, Ordering::Relaxed);
                    return Outcome::Rejected;
                }
                self.stored.fetch_add(1, Ordering::Relaxed);
                Outcome::Stored(key)
            }
            None => {
                debug!("Dropping message without instrument key: {:?}", message);
                self.rejected.fetch_add(1, Ordering::Relaxed);
                Outcome::Rejected
            }
        }
    }

    /// Outcome counters so far.
    pub fn stats(&self) -> IngestStats {
        IngestStats {
            stored: self.stored.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Leading bytes of a payload, short enough for a log line.
fn log_prefix(payload: &[u8]) -> &[u8] {
    &payload[..payload.len().min(LOG_PREFIX_BYTES)]
}

fn decode(payload: &[u8]) -> Option<Map<String, Value>> {
    match serde_json::from_slice::<Value>(payload) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}
