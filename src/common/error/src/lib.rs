//! Error types and result aliases for ShellSpark.

mod error;

pub use error::{SparkError, SparkResult};
