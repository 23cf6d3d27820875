//! Interrupt (Ctrl+C) integration
//!
//! The bridge turns the first interrupt into `exit_without_error()` and then
//! stops intercepting, so a second interrupt gets the default behavior and
//! terminates the process. The bridge also stops intercepting as soon as the
//! exit is requested for any other reason.
//!
//! Two threads back an installed bridge:
//! - the listener owns the interrupt source and blocks until an interrupt
//!   arrives or the source is closed, then restores default handling;
//! - the watcher blocks in `wait_for_exit()` and closes the source, which
//!   releases the listener when the exit came from somewhere else.

use crate::exit::{global, ExitCoordinator};
use crate::logging::log;
use signal_hook::consts::SIGINT;
use signal_hook::flag;
use signal_hook::iterator::{Handle, Signals};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Something that delivers interrupts to the bridge
///
/// A source intercepts interrupts from the moment it is created until
/// `restore_default()` is called.
pub trait InterruptSource: Send + 'static {
    /// Handle used by another thread to stop `wait_for_interrupt()`
    type Closer: InterruptCloser;

    /// Returns a closer for this source
    fn closer(&self) -> Self::Closer;

    /// Blocks until an interrupt arrives
    ///
    /// # Returns
    /// * `true` if an interrupt was received
    /// * `false` if the source was closed first
    fn wait_for_interrupt(&mut self) -> bool;

    /// Stops intercepting; later interrupts get the default handling
    fn restore_default(&mut self);
}

/// Wakes a source's `wait_for_interrupt()` without an interrupt
pub trait InterruptCloser: Send + 'static {
    fn close(&self);
}

/// Set while some coordinator in this process owns the SIGINT bridge.
/// SIGINT handling is process-wide, so only one coordinator may own it and
/// the claim is never given back once a bridge was installed.
static OS_BRIDGE_CLAIMED: AtomicBool = AtomicBool::new(false);

/// SIGINT delivered by the operating system
///
/// Backed by a `signal_hook` iterator. Once `restore_default()` has run, a
/// further SIGINT is handled as if no handler was ever installed, which
/// terminates the process.
pub struct OsInterrupt {
    signals: Signals,
    pass_through: Arc<AtomicBool>,
}

impl OsInterrupt {
    /// Starts intercepting SIGINT
    ///
    /// # Errors
    /// If the signal handler cannot be registered
    pub fn new() -> io::Result<Self> {
        let pass_through = Arc::new(AtomicBool::new(false));
        // Armed by restore_default(); emulates the default action (terminate)
        flag::register_conditional_default(SIGINT, Arc::clone(&pass_through))?;
        let signals = Signals::new([SIGINT])?;
        Ok(Self {
            signals,
            pass_through,
        })
    }
}

impl InterruptSource for OsInterrupt {
    type Closer = Handle;

    fn closer(&self) -> Handle {
        self.signals.handle()
    }

    fn wait_for_interrupt(&mut self) -> bool {
        self.signals.forever().next().is_some()
    }

    fn restore_default(&mut self) {
        self.pass_through.store(true, Ordering::SeqCst);
        self.signals.handle().close();
    }
}

impl InterruptCloser for Handle {
    fn close(&self) {
        Handle::close(self);
    }
}

impl ExitCoordinator {
    /// Makes SIGINT request a clean exit
    ///
    /// Call before `wait_for_exit()`. The first SIGINT is equivalent to
    /// `exit_without_error()`; after that (or after the exit is requested
    /// any other way) SIGINT terminates the process as usual.
    ///
    /// Only one coordinator per process can own SIGINT. Once any
    /// coordinator has installed the handler, every later call (from this
    /// or any other coordinator) is a no-op, even after that handler was
    /// removed again.
    ///
    /// # Returns
    /// * `Ok(true)` if this call installed the handler
    /// * `Ok(false)` if a SIGINT handler or another bridge was already installed
    ///
    /// # Errors
    /// If the signal handler or its threads cannot be set up. Nothing is
    /// marked installed in that case, so the call may be retried.
    pub fn exit_on_interrupt(&self) -> io::Result<bool> {
        if OS_BRIDGE_CLAIMED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(false);
        }

        let installed = self.install_interrupt_bridge(OsInterrupt::new);
        if !matches!(installed, Ok(true)) {
            OS_BRIDGE_CLAIMED.store(false, Ordering::SeqCst);
        }
        installed
    }

    /// Installs the interrupt bridge over any `InterruptSource`
    ///
    /// `make_source` is only called when no bridge is installed yet, and
    /// the check and the installation happen under the exit lock, so
    /// concurrent callers never end up with two listeners. `make_source`
    /// must not call back into this coordinator.
    pub fn install_interrupt_bridge<S, F>(&self, make_source: F) -> io::Result<bool>
    where
        S: InterruptSource,
        F: FnOnce() -> io::Result<S>,
    {
        let mut state = self.lock();
        if state.bridge_installed {
            return Ok(false);
        }

        let source = make_source()?;
        let closer = source.closer();

        // If the listener cannot be spawned, `ready` is dropped with this
        // frame and the watcher ends without parking.
        let (ready, _watcher) = spawn_watcher(self.clone(), closer)?;
        spawn_listener(self.clone(), source)?;

        state.bridge_installed = true;
        let _ = ready.send(());
        Ok(true)
    }

    /// Returns true once an interrupt bridge has been installed
    pub fn interrupt_bridge_installed(&self) -> bool {
        self.lock().bridge_installed
    }
}

/// Starts the watcher thread
///
/// The watcher waits for a message on the returned sender before it parks
/// in `block()`; if the sender is dropped instead, it returns at once
/// without closing the source.
fn spawn_watcher<C: InterruptCloser>(
    exit: ExitCoordinator,
    closer: C,
) -> io::Result<(mpsc::Sender<()>, thread::JoinHandle<()>)> {
    let (ready, setup_done) = mpsc::channel::<()>();
    let handle = thread::Builder::new()
        .name("exit-interrupt-watcher".to_string())
        .spawn(move || {
            if setup_done.recv().is_err() {
                return;
            }
            exit.block();
            closer.close();
        })?;
    Ok((ready, handle))
}

fn spawn_listener<S: InterruptSource>(
    exit: ExitCoordinator,
    source: S,
) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("exit-interrupt-listener".to_string())
        .spawn(move || run_listener(exit, source))
}

fn run_listener<S: InterruptSource>(exit: ExitCoordinator, source: S) {
    let mut source = scopeguard::guard(source, |mut source| source.restore_default());
    let interrupted = source.wait_for_interrupt();
    // Default handling is back before anyone can observe the exit
    drop(source);

    if interrupted {
        let _ = log("Interrupt received, requesting exit");
        exit.exit_without_error();
    }
    let _ = log("Interrupt handler removed, next interrupt terminates the process");
}

/// Installs the SIGINT bridge on the process-wide coordinator
pub fn exit_on_interrupt() -> io::Result<bool> {
    global().exit_on_interrupt()
}

#[derive(Debug)]
struct ManualState {
    installed: bool,
    pending: bool,
    closed: bool,
    intercepted: usize,
    passed_through: usize,
}

#[derive(Debug)]
struct ManualShared {
    state: Mutex<ManualState>,
    changed: Condvar,
}

impl ManualShared {
    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Interrupt source driven by hand, for tests and embedding
///
/// Created together with a `ManualTrigger` by `manual_interrupt()`.
/// Interrupts fired after `restore_default()` are counted as passed through
/// to default handling instead of being delivered.
#[derive(Debug)]
pub struct ManualInterrupt {
    shared: Arc<ManualShared>,
}

/// Fires interrupts at a `ManualInterrupt`
#[derive(Debug, Clone)]
pub struct ManualTrigger {
    shared: Arc<ManualShared>,
}

/// Closer for a `ManualInterrupt`
#[derive(Debug)]
pub struct ManualCloser {
    shared: Arc<ManualShared>,
}

/// Creates an intercepting manual source and its trigger
pub fn manual_interrupt() -> (ManualInterrupt, ManualTrigger) {
    let shared = Arc::new(ManualShared {
        state: Mutex::new(ManualState {
            installed: true,
            pending: false,
            closed: false,
            intercepted: 0,
            passed_through: 0,
        }),
        changed: Condvar::new(),
    });
    (
        ManualInterrupt {
            shared: Arc::clone(&shared),
        },
        ManualTrigger { shared },
    )
}

impl InterruptSource for ManualInterrupt {
    type Closer = ManualCloser;

    fn closer(&self) -> ManualCloser {
        ManualCloser {
            shared: Arc::clone(&self.shared),
        }
    }

    fn wait_for_interrupt(&mut self) -> bool {
        let state = self.shared.lock();
        let mut state = self
            .shared
            .changed
            .wait_while(state, |s| !s.pending && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut state.pending, false)
    }

    fn restore_default(&mut self) {
        let mut state = self.shared.lock();
        state.installed = false;
        state.closed = true;
        self.shared.changed.notify_all();
    }
}

impl InterruptCloser for ManualCloser {
    fn close(&self) {
        let mut state = self.shared.lock();
        state.closed = true;
        self.shared.changed.notify_all();
    }
}

impl ManualTrigger {
    /// Fires one interrupt
    ///
    /// # Returns
    /// `true` if the source intercepted it, `false` if it passed through
    /// to default handling
    pub fn interrupt(&self) -> bool {
        let mut state = self.shared.lock();
        if state.installed {
            state.pending = true;
            state.intercepted += 1;
            self.shared.changed.notify_all();
            true
        } else {
            state.passed_through += 1;
            false
        }
    }

    /// Returns true while the source still intercepts interrupts
    pub fn is_installed(&self) -> bool {
        self.shared.lock().installed
    }

    /// Number of interrupts the source intercepted
    pub fn intercepted(&self) -> usize {
        self.shared.lock().intercepted
    }

    /// Number of interrupts that went to default handling
    pub fn passed_through(&self) -> usize {
        self.shared.lock().passed_through
    }

    /// Waits until the source restores default handling
    ///
    /// # Returns
    /// `false` if `timeout` elapsed first
    pub fn wait_uninstalled(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock();
        while state.installed {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self
                .shared
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}
