//! ZeroMQ subscriber.
//!
//! Connects a SUB socket to the publisher endpoint with an empty filter, so every topic is
//! received. Pub/sub has no acknowledgment: a frame missed while disconnected is gone.

use std::sync::Arc;

use log::{debug, info};
use tickerboard_common::{FeedError, Result};

use crate::ingest::Ingestor;
use crate::listener::{Listener, POLL_INTERVAL};
use crate::shutdown::Shutdown;

const NAME: &str = "zmq";

/// Pub/sub listener.
pub struct ZmqListener {
    context: zmq::Context,
    endpoint: String,
}

impl ZmqListener {
    /// Listener subscribing to `endpoint` (e.g. `tcp://localhost:5555`) in a fresh context.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_context(zmq::Context::new(), endpoint)
    }

    /// Listener sharing an existing context, required for `inproc://` endpoints.
    pub fn with_context(context: zmq::Context, endpoint: impl Into<String>) -> Self {
        Self {
            context,
            endpoint: endpoint.into(),
        }
    }

    fn subscribe(&self) -> Result<zmq::Socket> {
        let socket = self.context.socket(zmq::SUB).map_err(zmq_error)?;
        socket.set_linger(0).map_err(zmq_error)?;
        socket
            .set_rcvtimeo(POLL_INTERVAL.as_millis() as i32)
            .map_err(zmq_error)?;
        socket.connect(&self.endpoint).map_err(zmq_error)?;
        socket.set_subscribe(b"").map_err(zmq_error)?;
        Ok(socket)
    }
}

impl Listener for ZmqListener {
    fn name(&self) -> &'static str {
        NAME
    }

    fn run(&mut self, ingestor: &Arc<Ingestor>, shutdown: &Shutdown) -> Result<()> {
        let socket = self.subscribe()?;
        info!("Subscribed to all topics on {}", self.endpoint);

        while !shutdown.is_triggered() {
            match socket.recv_bytes(0) {
                Ok(frame) => {
                    let outcome = ingestor.handle_payload(&frame);
                    debug!("zmq frame: {:?}", outcome);
                }
                Err(zmq::Error::EAGAIN) | Err(zmq::Error::EINTR) => continue,
                Err(e) => return Err(zmq_error(e)),
            }
        }
        Ok(())
    }
}

fn zmq_error(err: zmq::Error) -> FeedError {
    FeedError::transport(NAME, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::store::QuoteStore;
    use crate::shutdown;

    #[test]
    fn test_invalid_endpoint_is_a_transport_failure() {
        let ingestor = Arc::new(Ingestor::new(Arc::new(QuoteStore::new())));
        let (_trigger, shutdown) = shutdown::channel();
        let mut listener = ZmqListener::new("nonsense://endpoint");

        let err = listener.run(&ingestor, &shutdown).unwrap_err();
        assert!(matches!(err, FeedError::Transport { transport: "zmq", .. }));
    }

    #[test]
    fn test_returns_ok_once_shutdown_is_triggered() {
        let ingestor = Arc::new(Ingestor::new(Arc::new(QuoteStore::new())));
        let (trigger, shutdown) = shutdown::channel();
        trigger.trigger();
        let mut listener = ZmqListener::new("tcp://127.0.0.1:5599");

        assert!(listener.run(&ingestor, &shutdown).is_ok());
    }
}
