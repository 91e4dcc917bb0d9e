//! Transport listeners.
//!
//! Every transport implements [`Listener`]: connect, receive raw payloads, and hand each
//! one to the shared [`Ingestor`]. A listener knows nothing about normalization or the
//! store beyond that call.
//!
//! - `broker` — durable AMQP queue consumer (auto-acknowledging).
//! - `pubsub` — ZeroMQ subscriber with an empty topic filter.
//! - `tcp` — raw newline-delimited JSON over TCP, one thread per connection.

use std::sync::Arc;
use std::time::Duration;

use tickerboard_common::Result;

use crate::ingest::Ingestor;
use crate::shutdown::Shutdown;

pub mod broker;
pub mod pubsub;
pub mod tcp;

pub use broker::AmqpListener;
pub use pubsub::ZmqListener;
pub use tcp::TcpQuoteListener;

/// Upper bound on any blocking receive, so loops notice shutdown promptly.
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// A long-running source of raw quote payloads.
pub trait Listener: Send {
    /// Short transport name used in logs and thread names.
    fn name(&self) -> &'static str;

    /// Connect and pump payloads into `ingestor` until shutdown.
    ///
    /// Returns `Ok(())` once `shutdown` is observed, `Err` when the transport fails.
    /// Calling `run` again after an error reconnects from scratch.
    fn run(&mut self, ingestor: &Arc<Ingestor>, shutdown: &Shutdown) -> Result<()>;
}
