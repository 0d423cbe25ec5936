//! Cooperative cancellation for the worker pool.
//!
//! Two flags: `stop` means "claim no new jobs", `abort` additionally asks
//! in-flight transfers to stop at the next chunk boundary. Workers check them
//! at loop boundaries; nothing is interrupted mid-write.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const SLEEP_SLICE: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
struct Flags {
    stop: AtomicBool,
    abort: AtomicBool,
}

/// Shared cancellation handle. Cheap to clone; all clones observe the same flags.
#[derive(Debug, Clone, Default)]
pub struct PoolControl {
    flags: Arc<Flags>,
}

impl PoolControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop claiming new jobs; transfers already running finish normally.
    pub fn request_stop(&self) {
        self.flags.stop.store(true, Ordering::Relaxed);
    }

    /// Stop claiming and abort running transfers. Partial files keep their temp suffix.
    pub fn request_abort(&self) {
        self.flags.stop.store(true, Ordering::Relaxed);
        self.flags.abort.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.flags.stop.load(Ordering::Relaxed)
    }

    pub fn is_aborted(&self) -> bool {
        self.flags.abort.load(Ordering::Relaxed)
    }

    /// Sleep for `d`, waking early on stop. Returns false if interrupted.
    pub fn sleep(&self, d: Duration) -> bool {
        let deadline = Instant::now() + d;
        loop {
            if self.is_stopped() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}
