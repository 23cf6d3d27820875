//! Process-wide exit coordination
//!
//! Lets any number of worker threads agree on a single "time to stop"
//! decision, carry the reasons for it, and lets waiters block until it is
//! made. Optionally the first Ctrl+C (SIGINT) makes the same decision while
//! a second one terminates the process as usual.
//!
//! The `demo`, `cli` and `config` modules back the `exit_tester` binary.

pub mod cli;
pub mod config;
pub mod demo;
pub mod error;
pub mod exit;
pub mod interrupt;
pub mod logging;

pub use error::{reason, CombinedFailure, Reason, WorkerFailure};
pub use exit::{
    exit_reason, exit_with_error, exit_without_error, global, should_exit, wait_for_exit,
    ExitCoordinator,
};
pub use interrupt::{
    exit_on_interrupt, manual_interrupt, InterruptCloser, InterruptSource, ManualInterrupt,
    ManualTrigger, OsInterrupt,
};
pub use logging::{log, log_with_worker, set_log_file};

/// Name of the demo program
pub const DEMO_NAME: &str = "exit_tester";

/// Current version of the crate (from Cargo.toml)
pub const PROGRAM_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Requests a process-wide exit with a formatted `WorkerFailure`
///
/// # Example
/// ```text
/// // exit_with_errorf!("worker {} lost its connection", id);
/// ```
#[macro_export]
macro_rules! exit_with_errorf {
    ($($arg:tt)*) => {
        $crate::global().exit_with_errorf(::std::format_args!($($arg)*))
    };
}
