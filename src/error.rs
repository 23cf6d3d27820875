//! Exit reason types
//!
//! A reason is any error value a worker hands over when it asks the
//! process to exit. Reasons are shared (`Arc`) so the same value can be
//! handed to every caller of `wait_for_exit()`.

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// An opaque reason attached to a request to exit with failure
pub type Reason = Arc<dyn Error + Send + Sync + 'static>;

/// Failure described only by a message
///
/// Produced by `exit_with_errorf` and by `From<&str>`/`From<String>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct WorkerFailure {
    message: String,
}

impl WorkerFailure {
    /// Creates a failure from a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Creates a failure from preformatted arguments
    ///
    /// # Example
    /// ```text
    /// // WorkerFailure::from_args(format_args!("worker {} failed", 3))
    /// ```
    pub fn from_args(args: fmt::Arguments<'_>) -> Self {
        Self::new(fmt::format(args))
    }

    /// The failure message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for WorkerFailure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for WorkerFailure {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Two or more reasons recorded before the exit was observed
///
/// Displays every constituent reason, one per line, in the order they
/// were recorded.
#[derive(Debug, Clone, Error)]
#[error("{}", join_messages(.reasons))]
pub struct CombinedFailure {
    reasons: Vec<Reason>,
}

impl CombinedFailure {
    pub(crate) fn new(reasons: Vec<Reason>) -> Self {
        Self { reasons }
    }

    /// All constituent reasons, in recording order
    pub fn reasons(&self) -> &[Reason] {
        &self.reasons
    }

    /// Iterates over the constituent reasons
    pub fn iter(&self) -> std::slice::Iter<'_, Reason> {
        self.reasons.iter()
    }

    pub fn len(&self) -> usize {
        self.reasons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }

    /// Returns true if `reason` (the same shared value) is one of the constituents
    pub fn contains(&self, reason: &Reason) -> bool {
        self.reasons.iter().any(|r| Arc::ptr_eq(r, reason))
    }
}

impl<'a> IntoIterator for &'a CombinedFailure {
    type Item = &'a Reason;
    type IntoIter = std::slice::Iter<'a, Reason>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn join_messages(reasons: &[Reason]) -> String {
    reasons
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wraps any error into a shareable reason
pub fn reason<E>(error: E) -> Reason
where
    E: Error + Send + Sync + 'static,
{
    Arc::new(error)
}
