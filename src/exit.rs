//! Process-wide exit coordination
//!
//! Any worker can ask every other worker to stop, optionally attaching a
//! reason. One or more waiters block in `wait_for_exit()` until that
//! happens and learn every reason that was recorded. Once set, the exit
//! flag never goes back.

use crate::error::{CombinedFailure, Reason, WorkerFailure};
use once_cell::sync::Lazy;
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// State guarded by the coordinator's single mutex
#[derive(Debug, Default)]
pub(crate) struct ExitState {
    /// Reasons in the order they were recorded. Append-only.
    pub(crate) reasons: Vec<Reason>,
    /// Set once the interrupt bridge has been installed; never cleared
    pub(crate) bridge_installed: bool,
}

#[derive(Debug, Default)]
struct Shared {
    // Written only while `state` is locked, read lock-free by should_exit()
    should_exit: AtomicBool,
    state: Mutex<ExitState>,
    exit_cond: Condvar,
}

/// Handle to one exit decision shared by a group of workers
///
/// Cloning is cheap and every clone refers to the same decision, so a
/// coordinator is built once at startup and handed to each worker.
///
/// # Example
/// ```text
/// // let exit = ExitCoordinator::new();
/// // let worker_exit = exit.clone();
/// // thread::spawn(move || { ...; worker_exit.exit_with_error(reason(e)); });
/// // if let Some(e) = exit.wait_for_exit() { ... }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExitCoordinator {
    shared: Arc<Shared>,
}

impl ExitCoordinator {
    /// Creates a coordinator that has not been asked to exit
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if any worker has asked for the exit
    ///
    /// Never blocks. Workers should call this regularly and stop cleanly
    /// once it returns true.
    pub fn should_exit(&self) -> bool {
        self.shared.should_exit.load(Ordering::SeqCst)
    }

    /// Asks every worker to exit without recording a reason
    ///
    /// Wakes all waiters. Calling it again is a no-op and never clears
    /// reasons recorded earlier.
    pub fn exit_without_error(&self) {
        let _state = self.lock();
        self.raise_and_broadcast();
    }

    /// Records `reason` and asks every worker to exit
    ///
    /// The reason is kept even if the exit was already requested, so a
    /// later `wait_for_exit()` sees every failure.
    pub fn exit_with_error(&self, reason: Reason) {
        let mut state = self.lock();
        state.reasons.push(reason);
        self.raise_and_broadcast();
    }

    /// Convenience around `exit_with_error` for any concrete error type
    pub fn exit_with<E>(&self, error: E)
    where
        E: Error + Send + Sync + 'static,
    {
        self.exit_with_error(Arc::new(error));
    }

    /// Formats a `WorkerFailure` and records it as the exit reason
    ///
    /// # Example
    /// ```text
    /// // exit.exit_with_errorf(format_args!("worker {} lost its connection", id));
    /// ```
    pub fn exit_with_errorf(&self, args: fmt::Arguments<'_>) {
        self.exit_with(WorkerFailure::from_args(args));
    }

    /// Returns the recorded reasons as one value
    ///
    /// # Returns
    /// * `None` if no reason was recorded
    /// * the recorded reason itself if there is exactly one
    /// * a `CombinedFailure` holding all of them otherwise
    pub fn exit_reason(&self) -> Option<Reason> {
        let state = self.lock();
        match state.reasons.as_slice() {
            [] => None,
            [only] => Some(Arc::clone(only)),
            all => Some(Arc::new(CombinedFailure::new(all.to_vec()))),
        }
    }

    /// Blocks the calling thread until the exit has been requested
    ///
    /// Returns immediately if it already was. There is no timeout; the
    /// only way out is the exit decision itself.
    pub fn block(&self) {
        let state = self.lock();
        let _state = self
            .shared
            .exit_cond
            .wait_while(state, |_| !self.should_exit())
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Blocks until the exit has been requested, then returns the reason
    ///
    /// Safe to call from several threads and more than once. After the
    /// exit it returns immediately with the same (or a grown) reason.
    /// `None` means a clean exit.
    pub fn wait_for_exit(&self) -> Option<Reason> {
        self.block();
        self.exit_reason()
    }

    /// Locks the shared state
    ///
    /// A worker that panicked while holding the lock must not stop the
    /// rest of the process from shutting down, so poisoning is ignored.
    pub(crate) fn lock(&self) -> MutexGuard<'_, ExitState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // Caller holds the state lock
    fn raise_and_broadcast(&self) {
        self.shared.should_exit.store(true, Ordering::SeqCst);
        self.shared.exit_cond.notify_all();
    }
}

/// Process-wide coordinator used by the free functions
static GLOBAL: Lazy<ExitCoordinator> = Lazy::new(ExitCoordinator::new);

/// Returns the process-wide coordinator
pub fn global() -> &'static ExitCoordinator {
    &GLOBAL
}

/// Checks the process-wide exit flag
pub fn should_exit() -> bool {
    global().should_exit()
}

/// Requests a clean process-wide exit
pub fn exit_without_error() {
    global().exit_without_error()
}

/// Requests a process-wide exit and records `reason`
pub fn exit_with_error(reason: Reason) {
    global().exit_with_error(reason)
}

/// Returns the process-wide exit reason without blocking
pub fn exit_reason() -> Option<Reason> {
    global().exit_reason()
}

/// Blocks until the process-wide exit is requested
pub fn wait_for_exit() -> Option<Reason> {
    global().wait_for_exit()
}
