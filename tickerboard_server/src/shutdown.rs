//! Cooperative shutdown token shared by listeners and connection threads.
//!
//! `ShutdownTrigger` raises the flag (from the Ctrl+C handler or the supervisor);
//! every `Shutdown` clone observes it at its next poll.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Step used by [`Shutdown::sleep`] between flag checks.
const SLEEP_STEP: Duration = Duration::from_millis(50);

/// Read side of the shutdown flag.
#[derive(Clone, Debug)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
}

/// Write side of the shutdown flag.
#[derive(Clone, Debug)]
pub struct ShutdownTrigger {
    flag: Arc<AtomicBool>,
}

/// Create a connected trigger/token pair.
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let flag = Arc::new(AtomicBool::new(false));
    (
        ShutdownTrigger {
            flag: Arc::clone(&flag),
        },
        Shutdown { flag },
    )
}

impl Shutdown {
    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleep for `duration`, waking early on shutdown.
    ///
    /// Returns `true` if the full duration elapsed, `false` if interrupted.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_triggered() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(SLEEP_STEP.min(deadline - now));
        }
    }
}

impl ShutdownTrigger {
    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}
