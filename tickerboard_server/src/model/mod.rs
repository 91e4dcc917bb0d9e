//! Domain models for the quote board server.
//!
//! - `normalizer` — resolves heterogeneous producer fields into a canonical `Quote`.
//! - `store` — the concurrent latest-quote-per-instrument map readers snapshot.

pub mod normalizer;
pub mod store;
