//! Source operator naming the input file or glob.

use serde::{Deserialize, Serialize};

/// Source operator - entry point of every plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceOp {
    /// Input path or glob pattern.
    pub pattern: String,
    /// Whether the pattern contains glob metacharacters.
    pub is_glob: bool,
}

impl SourceOp {
    /// Create a source from a path, detecting glob metacharacters.
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let is_glob = pattern.contains(['*', '?', '[']);
        Self { pattern, is_glob }
    }
}

impl std::fmt::Display for SourceOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_glob {
            write!(f, "Source(glob={})", self.pattern)
        } else {
            write!(f, "Source({})", self.pattern)
        }
    }
}
