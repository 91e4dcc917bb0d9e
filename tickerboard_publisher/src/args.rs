//! Command-line arguments for the quote publisher.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use clap::Parser;
use tickerboard_common::Transport;
use tickerboard_common::net::QUEUE_NAME;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Transport to publish over.
    #[clap(long, value_enum, default_value_t = Transport::Tcp)]
    pub transport: Transport,

    /// Server address (tcp), bind endpoint (zmq), or broker URL (amqp).
    /// Defaults to the standard endpoint of the chosen transport.
    #[clap(long)]
    pub endpoint: Option<String>,

    /// Queue to declare and route to (amqp only).
    #[clap(long, default_value = QUEUE_NAME)]
    pub queue: String,

    /// Comma-separated symbols to quote.
    #[clap(long, value_delimiter = ',', default_value = "GCZ5,EURUSD-X")]
    pub symbols: Vec<String>,

    /// Delay between rounds of quotes, in milliseconds.
    #[clap(long, default_value_t = 1000)]
    pub interval_ms: u64,

    /// Rounds to send; 0 keeps going until Ctrl+C.
    #[clap(long, default_value_t = 0)]
    pub count: u64,

    /// Use `symbol`/`bid`/`ask` instead of `local_symbol`/`bidprice`/`askprice`.
    #[clap(long)]
    pub short_fields: bool,
}

impl Args {
    /// Symbols with whitespace trimmed and blanks removed.
    pub fn clean_symbols(&self) -> Vec<String> {
        self.symbols
            .iter()
            .map(|s| s.trim().trim_matches('"').to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}
