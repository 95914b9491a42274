//! Sort operator.

use serde::{Deserialize, Serialize};

/// Sort operator - total order over the output rows.
///
/// Input order is preserved only between rows whose key values are equal;
/// the tie-break is otherwise unspecified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortOp {
    /// Sort key: a column name, or a 1-based index rendered as a string for
    /// positional layouts.
    pub key: String,
    /// Descending order when true.
    pub descending: bool,
    /// Numeric comparison when true, lexicographic otherwise.
    pub numeric: bool,
}

impl SortOp {
    /// Create an ascending lexicographic sort on a key.
    pub fn asc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            descending: false,
            numeric: false,
        }
    }

    /// Create a descending sort on a key.
    pub fn desc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            descending: true,
            numeric: false,
        }
    }

    /// Use numeric comparison.
    #[must_use]
    pub const fn numeric(mut self) -> Self {
        self.numeric = true;
        self
    }
}

impl std::fmt::Display for SortOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dir = if self.descending { "desc" } else { "asc" };
        if self.numeric {
            write!(f, "Sort({}, {dir}, numeric)", self.key)
        } else {
            write!(f, "Sort({}, {dir})", self.key)
        }
    }
}
