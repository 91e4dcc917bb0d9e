//! Raw TCP listener for newline-delimited JSON.
//!
//! Accepts connections on a non-blocking socket and spawns one thread per connection.
//! Each connection owns a private [`LineFramer`], so a record split across reads is
//! buffered until its `\n` arrives. A connection that closes or fails ends only its own
//! thread; the accept loop keeps going.

use std::io::{ErrorKind, Read};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, error, info, warn};
use tickerboard_common::Result;

use crate::ingest::Ingestor;
use crate::listener::{Listener, POLL_INTERVAL};
use crate::shutdown::Shutdown;

/// Bytes requested per socket read.
const READ_CHUNK: usize = 4096;
/// A pending line longer than this is dropped.
pub const MAX_LINE_BYTES: usize = 1 << 20;

/// Splits a byte stream into `\n`-terminated records.
///
/// Bytes after the last newline stay buffered until the next [`push`](Self::push). A line
/// longer than [`MAX_LINE_BYTES`] is dropped whole, including any part still to arrive.
#[derive(Debug, Default)]
pub struct LineFramer {
    pending: Vec<u8>,
    discarding: bool,
}

impl LineFramer {
    /// Append `chunk` and call `on_line` for every completed line, without its `\n`.
    pub fn push<F>(&mut self, chunk: &[u8], mut on_line: F)
    where
        F: FnMut(&[u8]),
    {
        let mut chunk = chunk;
        if self.discarding {
            let Some(newline) = chunk.iter().position(|b| *b == b'\n') else {
                return;
            };
            self.discarding = false;
            chunk = &chunk[newline + 1..];
        }
        self.pending.extend_from_slice(chunk);

        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            if offset > MAX_LINE_BYTES {
                warn!("Discarding a {} byte line", offset);
            } else {
                on_line(&self.pending[start..end]);
            }
            start = end + 1;
        }
        self.pending.drain(..start);

        if self.pending.len() > MAX_LINE_BYTES {
            warn!(
                "Discarding {} buffered bytes without a newline",
                self.pending.len()
            );
            self.pending.clear();
            self.discarding = true;
        }
    }

    /// Bytes of the current incomplete line.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Line-delimited JSON listener.
#[derive(Debug)]
pub struct TcpQuoteListener {
    bind_addr: String,
    socket: Option<TcpListener>,
    connections: Vec<JoinHandle<()>>,
}

impl TcpQuoteListener {
    /// Listener that binds `bind_addr` when it starts running.
    pub fn new(bind_addr: impl Into<String>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            socket: None,
            connections: Vec::new(),
        }
    }

    /// Bind immediately, so the caller can learn the local address (port `0` allowed).
    pub fn bind(bind_addr: &str) -> Result<Self> {
        let socket = TcpListener::bind(bind_addr)?;
        Ok(Self {
            bind_addr: bind_addr.to_string(),
            socket: Some(socket),
            connections: Vec::new(),
        })
    }

    /// Address of the bound socket, if already bound.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    fn accept_loop(
        socket: &TcpListener,
        ingestor: &Arc<Ingestor>,
        shutdown: &Shutdown,
        connections: &mut Vec<JoinHandle<()>>,
    ) -> Result<()> {
        while !shutdown.is_triggered() {
            match socket.accept() {
                Ok((stream, peer)) => {
                    info!("New TCP connection from: {}", peer);
                    let ingestor = Arc::clone(ingestor);
                    let shutdown = shutdown.clone();
                    let spawned = thread::Builder::new()
                        .name(format!("tcp-{}", peer))
                        .spawn(move || {
                            if let Err(e) = handle_connection(stream, peer, &ingestor, &shutdown) {
                                warn!("Connection handler error for {}: {}", peer, e);
                            }
                        });
                    match spawned {
                        Ok(handle) => connections.push(handle),
                        Err(e) => error!("Failed to spawn handler for {}: {}", peer, e),
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    connections.retain(|handle| !handle.is_finished());
                    shutdown.sleep(POLL_INTERVAL);
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::Interrupted
                            | ErrorKind::ConnectionAborted
                            | ErrorKind::ConnectionReset
                    ) =>
                {
                    debug!("Transient accept error: {}", e);
                }
                Err(e) => {
                    error!("Failed to accept TCP connection: {}", e);
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }
}

impl Listener for TcpQuoteListener {
    fn name(&self) -> &'static str {
        "tcp"
    }

    fn run(&mut self, ingestor: &Arc<Ingestor>, shutdown: &Shutdown) -> Result<()> {
        let socket = match self.socket.take() {
            Some(socket) => socket,
            None => TcpListener::bind(&self.bind_addr)?,
        };
        socket.set_nonblocking(true)?;
        info!("Line TCP server is started on {}", socket.local_addr()?);

        let result = Self::accept_loop(&socket, ingestor, shutdown, &mut self.connections);

        if shutdown.is_triggered() {
            for handle in self.connections.drain(..) {
                if handle.join().is_err() {
                    error!("TCP connection thread panicked");
                }
            }
        } else if !self.connections.is_empty() {
            // Kept for the next run; open connections stop on shutdown.
            warn!(
                "Leaving {} open TCP connections running",
                self.connections.len()
            );
        }
        result
    }
}

/// Read one connection to EOF, ingesting every complete line.
fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    ingestor: &Ingestor,
    shutdown: &Shutdown,
) -> Result<()> {
    // Accepted sockets may inherit non-blocking mode from the listener on some platforms.
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(POLL_INTERVAL))?;

    let mut framer = LineFramer::default();
    let mut buf = [0u8; READ_CHUNK];

    while !shutdown.is_triggered() {
        match stream.read(&mut buf) {
            Ok(0) => {
                if framer.pending() > 0 {
                    debug!(
                        "Client {} closed with {} bytes of unterminated input",
                        peer,
                        framer.pending()
                    );
                }
                info!("Client {} closed connection", peer);
                return Ok(());
            }
            Ok(size) => framer.push(&buf[..size], |line| {
                if line.trim_ascii().is_empty() {
                    return;
                }
                let outcome = ingestor.handle_payload(line);
                debug!("tcp line from {}: {:?}", peer, outcome);
            }),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::store::QuoteStore;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn collect(framer: &mut LineFramer, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        framer.push(chunk, |line| {
            lines.push(String::from_utf8_lossy(line).into_owned())
        });
        lines
    }

    #[test]
    fn test_complete_line() {
        let mut framer = LineFramer::default();
        assert_eq!(collect(&mut framer, b"{\"symbol\":\"A\"}\n"), vec!["{\"symbol\":\"A\"}"]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_line_split_across_reads() {
        let mut framer = LineFramer::default();
        assert!(collect(&mut framer, b"{\"symbol\":\"A\",").is_empty());
        assert_eq!(framer.pending(), 14);
        assert_eq!(collect(&mut framer, b"\"bid\":1}\n"), vec!["{\"symbol\":\"A\",\"bid\":1}"]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_multiple_lines_and_remainder() {
        let mut framer = LineFramer::default();
        let lines = collect(&mut framer, b"a\nb\nc");
        assert_eq!(lines, vec!["a", "b"]);
        assert_eq!(framer.pending(), 1);
        assert_eq!(collect(&mut framer, b"\n"), vec!["c"]);
    }

    #[test]
    fn test_split_multibyte_character() {
        let mut framer = LineFramer::default();
        let text = "{\"symbol\":\"Ö\"}\n".as_bytes();
        let split = text.iter().position(|b| *b == 0xC3).unwrap() + 1;

        assert!(collect(&mut framer, &text[..split]).is_empty());
        assert_eq!(collect(&mut framer, &text[split..]), vec!["{\"symbol\":\"Ö\"}"]);
    }

    #[test]
    fn test_oversized_line_is_dropped() {
        let mut framer = LineFramer::default();
        let big = vec![b'x'; MAX_LINE_BYTES + 1];
        assert!(collect(&mut framer, &big).is_empty());
        assert_eq!(framer.pending(), 0);
        assert!(collect(&mut framer, b"tail\n").is_empty());
        assert_eq!(collect(&mut framer, b"ok\n"), vec!["ok"]);
    }

    #[test]
    fn test_oversized_line_tail_is_not_ingested() {
        let ingestor = Ingestor::new(Arc::new(QuoteStore::new()));
        let mut framer = LineFramer::default();
        let mut outcomes = Vec::new();

        let prefix = vec![b'x'; MAX_LINE_BYTES + 1];
        let chunks: [&[u8]; 3] = [&prefix, br#"{"symbol":"EVIL","bid":1}"#, b"\n"];
        for chunk in chunks {
            framer.push(chunk, |line| outcomes.push(ingestor.handle_payload(line)));
        }

        assert!(outcomes.is_empty());
        assert!(ingestor.store().is_empty());
    }

    #[test]
    fn test_oversized_line_in_one_read_is_dropped() {
        let mut framer = LineFramer::default();
        let mut chunk = vec![b'x'; MAX_LINE_BYTES + 1];
        chunk.extend_from_slice(b"\nok\n");
        assert_eq!(collect(&mut framer, &chunk), vec!["ok"]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_run_joins_connections_left_by_earlier_run() {
        let (trigger, shutdown) = crate::shutdown::channel();
        let finished = Arc::new(AtomicBool::new(false));
        let mut listener = TcpQuoteListener::bind("127.0.0.1:0").unwrap();
        {
            let finished = Arc::clone(&finished);
            let shutdown = shutdown.clone();
            listener.connections.push(thread::spawn(move || {
                while shutdown.sleep(POLL_INTERVAL) {}
                finished.store(true, Ordering::SeqCst);
            }));
        }

        trigger.trigger();
        let ingestor = Arc::new(Ingestor::new(Arc::new(QuoteStore::new())));
        listener.run(&ingestor, &shutdown).unwrap();

        assert!(listener.connections.is_empty());
        assert!(finished.load(Ordering::SeqCst));
    }

    #[test]
    fn test_bind_reports_local_addr() {
        let listener = TcpQuoteListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
    }

    #[test]
    fn test_unbound_listener_has_no_local_addr() {
        assert!(TcpQuoteListener::new("127.0.0.1:0").local_addr().is_none());
    }
}
