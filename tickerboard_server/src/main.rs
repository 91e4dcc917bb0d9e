//! Quote board server.
//!
//! This binary ingests price quotes from the configured transports and keeps the latest
//! quote for every instrument in memory. Internally, it wires together:
//!
//! - `Listener`s — one per transport (`amqp`, `zmq`, `tcp`), each in its own thread,
//!   handing raw payloads to the shared `Ingestor`.
//! - `Ingestor` — decodes JSON, normalizes field names, and upserts into the `QuoteStore`.
//! - `Supervisor` — owns the listener threads, applies the restart policy, and reports
//!   listener exits on a channel.
//!
//! Concurrency and shutdown:
//! - Crossbeam `select!` multiplexes Ctrl+C, listener exits, and the periodic snapshot
//!   report.
//! - Ctrl+C raises the shared shutdown token; listeners return at their next poll, open
//!   TCP connections are joined, and final ingestion counters are logged.
//! - Without `--reconnect`, a transport failure stops that listener; the process exits once
//!   no listener is left.
//!
//! Example:
//! ```bash
//! RUST_LOG=debug tickerboard_server --transport tcp --transport zmq --zmq-endpoint tcp://feed:5555
//! ```
#![warn(missing_docs)]
use std::sync::Arc;

use clap::Parser;
use crossbeam_channel::{bounded, never, select, tick};
use log::{error, info, warn};
use tickerboard_common::{FeedError, Result};
use tickerboard_server::args::Args;
use tickerboard_server::supervisor::{ExitReason, Supervisor};
use tickerboard_server::{Ingestor, QuoteStore};

fn main() -> Result<()> {
    init_logger();
    let args = Args::parse();

    let store = Arc::new(QuoteStore::new());
    let ingestor = Arc::new(Ingestor::new(Arc::clone(&store)));
    let mut supervisor = Supervisor::new(Arc::clone(&ingestor));

    let (signal_tx, signal_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = signal_tx.try_send(());
    })
    .map_err(|e| FeedError::Format(format!("Failed to set Ctrl+C handler: {}", e)))?;

    let policy = args.restart_policy();
    for transport in args.unique_transports() {
        supervisor.spawn(args.listener(transport), policy)?;
    }

    let report = match args.report_interval() {
        Some(interval) => tick(interval),
        None => never(),
    };
    let mut running = supervisor.len();
    let mut failed = false;
    info!("Quote board running with {} listener(s). Press Ctrl+C to exit.", running);

    while running > 0 {
        select! {
            recv(signal_rx) -> _ => {
                info!("Ctrl+C received. Shutting down...");
                break;
            },
            recv(supervisor.exits()) -> exit => match exit {
                Ok(exit) => {
                    running -= 1;
                    if let ExitReason::Failed(reason) = exit.reason {
                        warn!("{} listener is down: {}", exit.name, reason);
                        failed = true;
                    }
                }
                Err(e) => {
                    error!("Listener exit channel closed: {}", e);
                    break;
                }
            },
            recv(report) -> _ => {
                let stats = ingestor.stats();
                info!(
                    "{} instruments; stored={} malformed={} rejected={}",
                    store.len(), stats.stored, stats.malformed, stats.rejected
                );
            },
        }
    }

    supervisor.shutdown();
    let stats = ingestor.stats();
    info!(
        "Stopped with {} instruments; stored={} malformed={} rejected={}",
        store.len(),
        stats.stored,
        stats.malformed,
        stats.rejected
    );

    if failed && running == 0 {
        return Err(FeedError::Format("all listeners stopped".to_string()));
    }
    Ok(())
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
