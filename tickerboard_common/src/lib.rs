//!
//! Common types and utilities shared by the tickerboard server and publisher.
//!
//! This crate aggregates:
//! - `error` — unified error type `FeedError` used across the workspace.
//! - `result` — handy `Result<T, FeedError>` alias.
//! - `quote` — the canonical `Quote` record and the wire field names producers use.
//! - `transport` — the transport kinds selectable on both command lines.
//! - `net` — default endpoints and small helpers.
#![warn(missing_docs)]
pub mod error;
pub mod net;
pub mod quote;
pub mod result;
pub mod transport;

pub use error::FeedError;
pub use quote::Quote;
pub use result::Result;
pub use transport::Transport;
