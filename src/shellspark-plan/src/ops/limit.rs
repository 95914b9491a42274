//! Limit operator.

use serde::{Deserialize, Serialize};

/// Limit operator - take the first `n` rows, optionally after skipping
/// `offset` rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LimitOp {
    /// Maximum number of rows; must be positive.
    pub n: u64,
    /// Rows to skip before taking.
    pub offset: u64,
}

impl LimitOp {
    /// Create a limit without offset.
    pub const fn new(n: u64) -> Self {
        Self { n, offset: 0 }
    }

    /// Add an offset.
    #[must_use]
    pub const fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }
}

impl std::fmt::Display for LimitOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.offset > 0 {
            write!(f, "Limit({}, offset={})", self.n, self.offset)
        } else {
            write!(f, "Limit({})", self.n)
        }
    }
}
