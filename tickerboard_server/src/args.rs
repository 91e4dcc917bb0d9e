//! Command-line arguments for the quote board server.
//!
//! This module defines the CLI interface using `clap` and turns it into listeners and a
//! restart policy. See `main` for end-to-end usage.
use std::time::Duration;

use clap::Parser;
use tickerboard_common::Transport;
use tickerboard_common::net::{DEFAULT_AMQP_URL, DEFAULT_ZMQ_ENDPOINT, LINE_PORT, QUEUE_NAME, addr};

use crate::listener::{AmqpListener, Listener, TcpQuoteListener, ZmqListener};
use crate::supervisor::RestartPolicy;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Transport to ingest from. Repeat to run several listeners side by side.
    #[clap(long = "transport", value_enum, default_values_t = [Transport::Tcp])]
    pub transports: Vec<Transport>,

    /// Broker URL for the amqp transport.
    #[clap(long, default_value = DEFAULT_AMQP_URL)]
    pub amqp_url: String,

    /// Durable queue consumed by the amqp transport.
    #[clap(long, default_value = QUEUE_NAME)]
    pub queue: String,

    /// Publisher endpoint the zmq transport subscribes to.
    #[clap(long, default_value = DEFAULT_ZMQ_ENDPOINT)]
    pub zmq_endpoint: String,

    /// Address the tcp transport binds.
    #[clap(long, default_value_t = addr("0.0.0.0", LINE_PORT))]
    pub tcp_bind: String,

    /// Reconnect failed transports with exponential backoff instead of stopping them.
    #[clap(long)]
    pub reconnect: bool,

    /// First reconnect delay in milliseconds.
    #[clap(long, default_value_t = 500)]
    pub reconnect_initial_ms: u64,

    /// Largest reconnect delay in milliseconds.
    #[clap(long, default_value_t = 30_000)]
    pub reconnect_max_ms: u64,

    /// Seconds between snapshot reports in the log; 0 disables them.
    #[clap(long, default_value_t = 10)]
    pub report_interval_secs: u64,
}

impl Args {
    /// Requested transports, duplicates removed, in command-line order.
    pub fn unique_transports(&self) -> Vec<Transport> {
        let mut unique = Vec::with_capacity(self.transports.len());
        for transport in &self.transports {
            if !unique.contains(transport) {
                unique.push(*transport);
            }
        }
        unique
    }

    /// Restart policy selected by `--reconnect`.
    pub fn restart_policy(&self) -> RestartPolicy {
        if !self.reconnect {
            return RestartPolicy::Never;
        }
        let initial = Duration::from_millis(self.reconnect_initial_ms);
        RestartPolicy::Backoff {
            initial,
            max: Duration::from_millis(self.reconnect_max_ms).max(initial),
        }
    }

    /// Snapshot report period, if enabled.
    pub fn report_interval(&self) -> Option<Duration> {
        (self.report_interval_secs > 0).then(|| Duration::from_secs(self.report_interval_secs))
    }

    /// Build the listener for `transport` from the configured endpoints.
    pub fn listener(&self, transport: Transport) -> Box<dyn Listener> {
        match transport {
            Transport::Amqp => Box::new(AmqpListener::new(&self.amqp_url, &self.queue)),
            Transport::Zmq => Box::new(ZmqListener::new(&self.zmq_endpoint)),
            Transport::Tcp => Box::new(TcpQuoteListener::new(&self.tcp_bind)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["tickerboard_server"]);
        assert_eq!(args.transports, vec![Transport::Tcp]);
        assert_eq!(args.queue, "quotes");
        assert_eq!(args.tcp_bind, "0.0.0.0:6565");
        assert_eq!(args.zmq_endpoint, "tcp://localhost:5555");
        assert_eq!(args.restart_policy(), RestartPolicy::Never);
        assert_eq!(args.report_interval(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_repeated_transports_are_deduplicated() {
        let args = Args::parse_from([
            "tickerboard_server",
            "--transport",
            "zmq",
            "--transport",
            "amqp",
            "--transport",
            "zmq",
        ]);
        assert_eq!(args.unique_transports(), vec![Transport::Zmq, Transport::Amqp]);
    }

    #[test]
    fn test_reconnect_enables_backoff() {
        let args = Args::parse_from([
            "tickerboard_server",
            "--reconnect",
            "--reconnect-initial-ms",
            "250",
            "--reconnect-max-ms",
            "100",
        ]);
        assert_eq!(
            args.restart_policy(),
            RestartPolicy::Backoff {
                initial: Duration::from_millis(250),
                max: Duration::from_millis(250),
            }
        );
    }

    #[test]
    fn test_zero_report_interval_disables_reports() {
        let args = Args::parse_from(["tickerboard_server", "--report-interval-secs", "0"]);
        assert_eq!(args.report_interval(), None);
    }

    #[test]
    fn test_listener_names_match_transport() {
        let args = Args::parse_from(["tickerboard_server"]);
        for transport in [Transport::Amqp, Transport::Zmq, Transport::Tcp] {
            assert_eq!(args.listener(transport).name(), transport.to_string());
        }
    }

    #[test]
    fn test_unknown_transport_is_rejected() {
        assert!(Args::try_parse_from(["tickerboard_server", "--transport", "udp"]).is_err());
    }
}
