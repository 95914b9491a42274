//! Parallel annotation requesting multi-file parallelism.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Requested worker count for a parallel pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Workers {
    /// Use the host CPU count.
    Auto,
    /// Use a fixed number of workers.
    Fixed(NonZeroU32),
}

impl Workers {
    /// Create a fixed worker count; returns `Auto` semantics only through
    /// [`Workers::Auto`], so a zero count is rejected at the type level.
    pub fn fixed(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Self::Fixed)
    }
}

/// Parallel operator - annotation requesting `find | xargs -P` fan-out over
/// a multi-file glob.
///
/// Legal only when the enclosing plan contains no global-state operator
/// (Sort, Distinct, GroupBy, Limit); that check runs at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParallelOp {
    /// Requested worker count.
    pub workers: Workers,
}

impl ParallelOp {
    /// Create a parallel annotation.
    pub const fn new(workers: Workers) -> Self {
        Self { workers }
    }
}

impl std::fmt::Display for ParallelOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.workers {
            Workers::Auto => write!(f, "Parallel(auto)"),
            Workers::Fixed(n) => write!(f, "Parallel({n})"),
        }
    }
}
