//! Lifecycle owner for listener threads.
//!
//! Each listener runs in its own named thread under a [`RestartPolicy`]. When a thread
//! finishes it reports a [`ListenerExit`] on a crossbeam channel, which `main` selects on
//! alongside the Ctrl+C signal. [`Supervisor::shutdown`] raises the shared token and joins
//! every thread.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{error, info, warn};
use tickerboard_common::Result;

use crate::ingest::Ingestor;
use crate::listener::Listener;
use crate::shutdown::{self, Shutdown, ShutdownTrigger};

/// What to do when a listener's transport fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartPolicy {
    /// The failure ends the listener.
    #[default]
    Never,
    /// Reconnect after a delay that starts at `initial` and doubles per consecutive failure,
    /// capped at `max`. A run that lasted at least `max` resets the sequence.
    Backoff {
        /// First retry delay.
        initial: Duration,
        /// Largest retry delay.
        max: Duration,
    },
}

impl RestartPolicy {
    /// Delay before retry number `failures` (0-based), or `None` to give up.
    pub fn delay(&self, failures: u32) -> Option<Duration> {
        match *self {
            RestartPolicy::Never => None,
            RestartPolicy::Backoff { initial, max } => {
                let factor = 1u32.checked_shl(failures).unwrap_or(u32::MAX);
                Some(initial.saturating_mul(factor).min(max))
            }
        }
    }

    fn resets_after(&self, ran_for: Duration) -> bool {
        match *self {
            RestartPolicy::Never => false,
            RestartPolicy::Backoff { max, .. } => ran_for >= max,
        }
    }
}

/// Why a listener thread finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// Returned cleanly, normally because shutdown was requested.
    Stopped,
    /// Transport failure not retried; carries the last error.
    Failed(String),
}

/// Termination notice for one listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerExit {
    /// Listener name, e.g. `tcp`.
    pub name: &'static str,
    /// How it ended.
    pub reason: ExitReason,
}

/// Owns listener threads and the shutdown token they observe.
pub struct Supervisor {
    ingestor: Arc<Ingestor>,
    trigger: ShutdownTrigger,
    shutdown: Shutdown,
    handles: Vec<JoinHandle<()>>,
    exit_tx: Sender<ListenerExit>,
    exit_rx: Receiver<ListenerExit>,
}

impl Supervisor {
    /// Supervisor feeding every listener into `ingestor`.
    pub fn new(ingestor: Arc<Ingestor>) -> Self {
        let (trigger, shutdown) = shutdown::channel();
        let (exit_tx, exit_rx) = unbounded();
        Self {
            ingestor,
            trigger,
            shutdown,
            handles: Vec::new(),
            exit_tx,
            exit_rx,
        }
    }

    /// Handle for requesting shutdown from elsewhere (e.g. a signal handler).
    pub fn trigger(&self) -> ShutdownTrigger {
        self.trigger.clone()
    }

    /// Channel receiving one [`ListenerExit`] per finished listener.
    pub fn exits(&self) -> &Receiver<ListenerExit> {
        &self.exit_rx
    }

    /// Number of listeners started so far.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// `true` if no listener has been started.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Start `listener` in its own thread.
    pub fn spawn(&mut self, mut listener: Box<dyn Listener>, policy: RestartPolicy) -> Result<()> {
        let name = listener.name();
        let ingestor = Arc::clone(&self.ingestor);
        let shutdown = self.shutdown.clone();
        let exit_tx = self.exit_tx.clone();

        let handle = thread::Builder::new()
            .name(format!("listener-{}", name))
            .spawn(move || {
                let reason = supervise(listener.as_mut(), &ingestor, &shutdown, policy);
                match &reason {
                    ExitReason::Stopped => info!("{} listener stopped", name),
                    ExitReason::Failed(e) => error!("{} listener failed: {}", name, e),
                }
                // The receiver is gone only if the supervisor was dropped.
                let _ = exit_tx.send(ListenerExit { name, reason });
            })?;
        info!("{} listener started ({:?})", name, policy);
        self.handles.push(handle);
        Ok(())
    }

    /// Request shutdown and wait for every listener thread.
    pub fn shutdown(self) {
        self.trigger.trigger();
        for handle in self.handles {
            if handle.join().is_err() {
                error!("Listener thread panicked");
            }
        }
    }
}

fn supervise(
    listener: &mut dyn Listener,
    ingestor: &Arc<Ingestor>,
    shutdown: &Shutdown,
    policy: RestartPolicy,
) -> ExitReason {
    let mut failures = 0;
    loop {
        let started = Instant::now();
        let err = match listener.run(ingestor, shutdown) {
            Ok(()) => return ExitReason::Stopped,
            Err(_) if shutdown.is_triggered() => return ExitReason::Stopped,
            Err(e) => e,
        };

        if policy.resets_after(started.elapsed()) {
            failures = 0;
        }
        let Some(delay) = policy.delay(failures) else {
            return ExitReason::Failed(err.to_string());
        };
        warn!(
            "{} listener failed: {}; reconnecting in {:?}",
            listener.name(),
            err,
            delay
        );
        if !shutdown.sleep(delay) {
            return ExitReason::Stopped;
        }
        failures = failures.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::store::QuoteStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tickerboard_common::FeedError;

    /// Fails `failures` times, then stores one quote and waits for shutdown.
    struct FlakyListener {
        failures: usize,
        runs: Arc<AtomicUsize>,
    }

    impl Listener for FlakyListener {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn run(&mut self, ingestor: &Arc<Ingestor>, shutdown: &Shutdown) -> Result<()> {
            let run = self.runs.fetch_add(1, Ordering::SeqCst);
            if run < self.failures {
                return Err(FeedError::transport("flaky", "connection refused"));
            }
            ingestor.handle_payload(br#"{"symbol":"UP","bid":1}"#);
            while !shutdown.is_triggered() {
                shutdown.sleep(Duration::from_millis(10));
            }
            Ok(())
        }
    }

    fn supervisor() -> Supervisor {
        Supervisor::new(Arc::new(Ingestor::new(Arc::new(QuoteStore::new()))))
    }

    fn flaky(failures: usize) -> (Box<dyn Listener>, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let listener = FlakyListener {
            failures,
            runs: Arc::clone(&runs),
        };
        (Box::new(listener), runs)
    }

    #[test]
    fn test_backoff_delays_double_and_cap() {
        let policy = RestartPolicy::Backoff {
            initial: Duration::from_millis(100),
            max: Duration::from_millis(500),
        };
        assert_eq!(policy.delay(0), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay(1), Some(Duration::from_millis(200)));
        assert_eq!(policy.delay(2), Some(Duration::from_millis(400)));
        assert_eq!(policy.delay(3), Some(Duration::from_millis(500)));
        assert_eq!(policy.delay(40), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_never_policy_gives_up() {
        assert_eq!(RestartPolicy::Never.delay(0), None);
        assert_eq!(RestartPolicy::default(), RestartPolicy::Never);
    }

    #[test]
    fn test_failure_is_fatal_without_restart() {
        let mut supervisor = supervisor();
        let (listener, runs) = flaky(1);
        supervisor.spawn(listener, RestartPolicy::Never).unwrap();

        let exit = supervisor
            .exits()
            .recv_timeout(Duration::from_secs(5))
            .unwrap();
        assert_eq!(exit.name, "flaky");
        assert!(matches!(exit.reason, ExitReason::Failed(_)));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        supervisor.shutdown();
    }

    #[test]
    fn test_backoff_reconnects_until_success() {
        let store = Arc::new(QuoteStore::new());
        let mut supervisor = Supervisor::new(Arc::new(Ingestor::new(Arc::clone(&store))));
        let (listener, runs) = flaky(2);
        let policy = RestartPolicy::Backoff {
            initial: Duration::from_millis(10),
            max: Duration::from_millis(40),
        };
        supervisor.spawn(listener, policy).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while store.is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(store.len(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        let exits = supervisor.exits().clone();
        supervisor.shutdown();
        assert_eq!(exits.try_recv().unwrap().reason, ExitReason::Stopped);
    }

    #[test]
    fn test_shutdown_interrupts_backoff_sleep() {
        let mut supervisor = supervisor();
        let (listener, _runs) = flaky(usize::MAX);
        let policy = RestartPolicy::Backoff {
            initial: Duration::from_secs(60),
            max: Duration::from_secs(60),
        };
        supervisor.spawn(listener, policy).unwrap();
        thread::sleep(Duration::from_millis(50));

        let exits = supervisor.exits().clone();
        let started = Instant::now();
        supervisor.shutdown();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(exits.try_recv().unwrap().reason, ExitReason::Stopped);
    }
}
