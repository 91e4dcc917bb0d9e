//! Quote board ingestion engine.
//!
//! Listens for price quotes on one or more transports, reconciles the field names
//! different producers use, and keeps the latest quote per instrument in memory for
//! snapshot readers.
//!
//! Data flow: producer → transport → [`listener`] → [`ingest::Ingestor`] →
//! [`model::normalizer`] → [`model::store::QuoteStore`], read back through
//! [`model::store::QuoteStore::snapshot`].
//!
//! - `args` — command-line configuration.
//! - `ingest` — decode/normalize/upsert pipeline shared by every listener.
//! - `listener` — AMQP, ZeroMQ and raw TCP transports behind one trait.
//! - `model` — normalizer and store.
//! - `shutdown` — cooperative stop token.
//! - `supervisor` — listener threads, restart policy, exit reporting.
#![warn(missing_docs)]

pub mod args;
pub mod ingest;
pub mod listener;
pub mod model;
pub mod shutdown;
pub mod supervisor;

pub use ingest::{Ingestor, Outcome};
pub use model::store::QuoteStore;
