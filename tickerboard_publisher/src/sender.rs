//! Sending quote payloads over each transport.
//!
//! `QuoteSender` owns one open transport: a TCP stream (one line per payload), a bound
//! ZeroMQ PUB socket (one frame per payload), or an AMQP channel publishing to the durable
//! queue through the default exchange.
use std::io::Write;
use std::net::TcpStream;

use amiquip::{Channel, Connection, Exchange, Publish, QueueDeclareOptions};
use log::{debug, info};
use tickerboard_common::net::{DEFAULT_AMQP_URL, LINE_PORT, PUBSUB_PORT, addr};
use tickerboard_common::{FeedError, Result, Transport};

/// Endpoint used when `--endpoint` is not given.
pub fn default_endpoint(transport: Transport) -> String {
    match transport {
        Transport::Amqp => DEFAULT_AMQP_URL.to_string(),
        Transport::Zmq => format!("tcp://*:{}", PUBSUB_PORT),
        Transport::Tcp => addr("127.0.0.1", LINE_PORT),
    }
}

/// An open transport ready to carry payloads.
pub enum QuoteSender {
    /// Line-delimited JSON over TCP.
    Tcp(TcpStream),
    /// PUB socket bound to the endpoint.
    Zmq {
        /// Kept alive for the socket's lifetime.
        _context: zmq::Context,
        /// Publisher socket.
        socket: zmq::Socket,
    },
    /// Broker channel publishing to `queue`.
    Amqp {
        /// Broker connection, closed by [`QuoteSender::close`].
        connection: Connection,
        /// Channel on `connection`.
        channel: Channel,
        /// Routing key, equal to the queue name.
        queue: String,
    },
}

impl QuoteSender {
    /// Open `transport` at `endpoint`. `queue` is only used by AMQP.
    pub fn connect(transport: Transport, endpoint: &str, queue: &str) -> Result<Self> {
        let sender = match transport {
            Transport::Tcp => {
                let stream = TcpStream::connect(endpoint).map_err(|e| {
                    FeedError::Format(format!("Failed to connect to {}: {}", endpoint, e))
                })?;
                stream.set_nodelay(true)?;
                QuoteSender::Tcp(stream)
            }
            Transport::Zmq => {
                let context = zmq::Context::new();
                let socket = context
                    .socket(zmq::PUB)
                    .map_err(|e| FeedError::transport("zmq", e))?;
                socket
                    .bind(endpoint)
                    .map_err(|e| FeedError::transport("zmq", e))?;
                QuoteSender::Zmq {
                    _context: context,
                    socket,
                }
            }
            Transport::Amqp => {
                let mut connection =
                    Connection::insecure_open(endpoint).map_err(|e| FeedError::transport("amqp", e))?;
                let channel = connection
                    .open_channel(None)
                    .map_err(|e| FeedError::transport("amqp", e))?;
                channel
                    .queue_declare(
                        queue,
                        QueueDeclareOptions {
                            durable: true,
                            ..QueueDeclareOptions::default()
                        },
                    )
                    .map_err(|e| FeedError::transport("amqp", e))?;
                QuoteSender::Amqp {
                    connection,
                    channel,
                    queue: queue.to_string(),
                }
            }
        };
        info!("{} publisher ready on {}", transport, endpoint);
        Ok(sender)
    }

    /// Send one JSON payload.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        match self {
            QuoteSender::Tcp(stream) => {
                stream.write_all(payload)?;
                stream.write_all(b"\n")?;
            }
            QuoteSender::Zmq { socket, .. } => {
                socket
                    .send(payload, 0)
                    .map_err(|e| FeedError::transport("zmq", e))?;
            }
            QuoteSender::Amqp { channel, queue, .. } => {
                Exchange::direct(channel)
                    .publish(Publish::new(payload, queue.as_str()))
                    .map_err(|e| FeedError::transport("amqp", e))?;
            }
        }
        debug!("Sent {}", String::from_utf8_lossy(payload));
        Ok(())
    }

    /// Flush and close the transport.
    pub fn close(self) -> Result<()> {
        match self {
            QuoteSender::Tcp(mut stream) => stream.flush()?,
            QuoteSender::Zmq { .. } => {}
            QuoteSender::Amqp { connection, .. } => connection
                .close()
                .map_err(|e| FeedError::transport("amqp", e))?,
        }
        Ok(())
    }
}
