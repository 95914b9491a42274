//! Core error types for ShellSpark.

use thiserror::Error;

/// Result type alias using `SparkError`.
pub type SparkResult<T> = std::result::Result<T, SparkError>;

/// Core error type for ShellSpark operations.
///
/// Every error is surfaced to the caller synchronously at build or compile
/// time; the compiler recovers from nothing internally.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SparkError {
    /// Plan invariant violation at build time or compile time.
    #[error("PlanError: {0}")]
    Plan(String),

    /// A required external tool is missing from the host.
    #[error("UnsupportedEnvironment: required tool '{tool}' was not found")]
    UnsupportedEnvironment {
        /// Name of the missing tool.
        tool: String,
    },

    /// Escape-discipline assertion failure. Surfacing this indicates a bug.
    #[error("QuotingError: {0}")]
    Quoting(String),

    /// Failure while running a compiled command. Produced only by the
    /// external executor, never by the compiler itself.
    #[error("ExecutionError: {0}")]
    Execution(String),

    /// IO error.
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
}

impl SparkError {
    /// Create a new `Plan` error.
    pub fn plan<S: Into<String>>(msg: S) -> Self {
        Self::Plan(msg.into())
    }

    /// Create a new `UnsupportedEnvironment` error.
    pub fn unsupported<S: Into<String>>(tool: S) -> Self {
        Self::UnsupportedEnvironment { tool: tool.into() }
    }

    /// Create a new `Quoting` error.
    pub fn quoting<S: Into<String>>(msg: S) -> Self {
        Self::Quoting(msg.into())
    }

    /// Create a new `Execution` error.
    pub fn execution<S: Into<String>>(msg: S) -> Self {
        Self::Execution(msg.into())
    }
}

/// Ensure a condition holds, returning a `Plan` error if not.
#[macro_export]
macro_rules! ensure_plan {
    ($cond:expr, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::SparkError::Plan(format!($($msg)*)));
        }
    };
}

/// Return early with a `Plan` error.
#[macro_export]
macro_rules! plan_err {
    ($($arg:tt)*) => {
        return Err($crate::SparkError::Plan(format!($($arg)*)))
    };
}
