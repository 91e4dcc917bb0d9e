//! Quote Publisher — a test producer that streams synthetic quotes to the quote board
//! server over TCP, ZeroMQ, or AMQP.
//!
//! Every round it moves each symbol's mid price by a small random step and sends one
//! JSON quote per symbol, then sleeps for `--interval-ms`.
//!
//! Usage example (CLI):
//! ```bash
//! tickerboard_publisher --transport zmq --symbols GCZ5,ESZ5 --interval-ms 250
//! tickerboard_publisher --transport tcp --endpoint 10.0.0.5:6565 --short-fields --count 10
//! ```
#![warn(missing_docs)]
mod args;
mod model;
mod sender;

use crate::args::Args;
use crate::model::quote::{INITIAL_PRICE, OutboundQuote};
use crate::sender::{QuoteSender, default_endpoint};
use clap::Parser;
use log::{error, info};
use std::collections::HashMap;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;
use tickerboard_common::{FeedError, Result};

fn main() -> Result<()> {
    init_logger();
    let args = Args::parse();
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            info!("Ctrl+C received. Stopping publisher...");
            shutdown.store(true, Ordering::SeqCst);
        })
        .map_err(|e| FeedError::Format(format!("Failed to set Ctrl+C handler: {}", e)))?;
    }

    let symbols = args.clean_symbols();
    if symbols.is_empty() {
        return Err(FeedError::Format("no symbols to publish".to_string()));
    }
    let endpoint = args
        .endpoint
        .clone()
        .unwrap_or_else(|| default_endpoint(args.transport));

    let mut sender = QuoteSender::connect(args.transport, &endpoint, &args.queue)?;
    let mut prices: HashMap<String, f64> = symbols
        .iter()
        .map(|s| (s.clone(), INITIAL_PRICE))
        .collect();
    let interval = Duration::from_millis(args.interval_ms);

    info!("Publishing {:?}. Press Ctrl+C to exit.", symbols);
    let mut rounds = 0u64;
    while !shutdown.load(Ordering::Relaxed) && (args.count == 0 || rounds < args.count) {
        for symbol in &symbols {
            let mid = prices.entry(symbol.clone()).or_insert(INITIAL_PRICE);
            *mid = OutboundQuote::next_price(*mid);
            let quote = OutboundQuote::around(symbol, *mid);

            if let Err(e) = sender.send(&quote.to_json_bytes(args.short_fields)?) {
                error!("Failed to send quote for {}: {}", symbol, e);
                return Err(e);
            }
            info!("QUOTE: {} Bid={:.2} Ask={:.2}", quote.symbol, quote.bid, quote.ask);
        }
        rounds += 1;
        thread::sleep(interval);
    }

    info!("Sent {} rounds", rounds);
    sender.close()
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
