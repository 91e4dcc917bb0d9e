//! Transport kinds shared between server and publisher command lines.

use clap::ValueEnum;
use strum_macros::{Display, EnumString};

/// Message transports a quote can travel over.
#[derive(Debug, Clone, Copy, ValueEnum, Display, EnumString, Hash, Eq, PartialEq)]
#[clap(rename_all = "lower")]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum Transport {
    /// Durable broker queue (RabbitMQ).
    Amqp,
    /// ZeroMQ publish/subscribe.
    Zmq,
    /// Newline-delimited JSON over raw TCP.
    Tcp,
}
