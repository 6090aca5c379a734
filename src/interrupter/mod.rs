//! Unblocks an in-progress blocking socket read when a request's deadline
//! is about to pass, by shutting the socket down from a timer thread
//! rather than delivering a POSIX signal. See the design notes on why:
//! a signal handler would need to be async-signal-safe and this bridge
//! would rather stay free of `unsafe`.

use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::error::{BridgeError, BridgeErrorKind};

/// Shared, cloneable handle to a single armed-or-idle timer. A
/// `DeadlineInterrupter` can be armed and reset across many invocations;
/// each `arm` call supersedes whatever the previous one was doing.
#[derive(Clone)]
pub struct DeadlineInterrupter {
    generation: Arc<AtomicU64>,
    cancel: Arc<Mutex<Option<Sender<()>>>>,
    registered: Arc<Mutex<Option<UnixStream>>>,
    fired: Arc<AtomicBool>,
    attached: Arc<AtomicBool>,
}

impl DeadlineInterrupter {
    pub fn new() -> Self {
        Self {
            generation: Arc::new(AtomicU64::new(0)),
            cancel: Arc::new(Mutex::new(None)),
            registered: Arc::new(Mutex::new(None)),
            fired: Arc::new(AtomicBool::new(false)),
            attached: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Marks a worker as attached. Called once the handler facade's
    /// `start()` has succeeded; `arm` fails until this has run.
    pub fn attach(&self) {
        self.attached.store(true, Ordering::SeqCst);
    }

    /// Marks no worker as attached. Called from `stop()`.
    pub fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }

    /// Registers the socket a fire should shut down. Call this right
    /// before the blocking read that the deadline protects.
    pub fn register_stream(&self, stream: UnixStream) {
        *self.registered.lock().unwrap() = Some(stream);
    }

    /// Drops the registered socket so a late fire (if one is already in
    /// flight) has nothing left to shut down.
    pub fn clear_stream(&self) {
        *self.registered.lock().unwrap() = None;
    }

    /// Arms a timer that fires `max(1, floor(remaining_ms/1000) - 1)`
    /// seconds from now — one second before the deadline `remaining_ms`
    /// counts down to, floored to whole seconds and never sooner than
    /// one second out, leaving the bridge's own error paths time to run
    /// before the platform can kill the sandbox.
    ///
    /// Fails with `InterrupterUnavailable` if no worker is attached yet
    /// (i.e. called before `attach`/outside a started handler facade).
    pub fn arm(&self, remaining_ms: i64) -> Result<(), BridgeError> {
        if !self.attached.load(Ordering::SeqCst) {
            return Err(BridgeError::new_with_kind_only(BridgeErrorKind::InterrupterUnavailable));
        }

        self.reset();

        let seconds = std::cmp::max(1, remaining_ms / 1000 - 1);
        let fire_after_ms = (seconds * 1000) as u64;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation_cell = Arc::clone(&self.generation);
        let registered = Arc::clone(&self.registered);
        let fired = Arc::clone(&self.fired);

        let (tx, rx) = mpsc::channel::<()>();
        *self.cancel.lock().unwrap() = Some(tx);

        thread::spawn(move || match rx.recv_timeout(Duration::from_millis(fire_after_ms)) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
            Err(RecvTimeoutError::Timeout) => {
                if generation_cell.load(Ordering::SeqCst) == generation {
                    fired.store(true, Ordering::SeqCst);
                    if let Some(stream) = registered.lock().unwrap().as_ref() {
                        let _ = stream.shutdown(std::net::Shutdown::Both);
                    }
                }
            }
        });

        Ok(())
    }

    /// Cancels any pending fire and clears the fired flag. Idempotent —
    /// safe to call even when nothing is armed, so the handler can call
    /// it unconditionally at the start and end of every invocation.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(tx) = self.cancel.lock().unwrap().take() {
            let _ = tx.send(());
        }
        self.fired.store(false, Ordering::SeqCst);
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

impl Default for DeadlineInterrupter {
    fn default() -> Self {
        Self::new()
    }
}
