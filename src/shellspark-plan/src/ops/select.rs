//! Select operator for column projection.

use serde::{Deserialize, Serialize};

/// Select operator - projection to the named columns.
///
/// The given order is preserved and duplicates are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectOp {
    /// Projected columns in output order.
    pub columns: Vec<String>,
}

impl SelectOp {
    /// Create a projection.
    pub fn new(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Display for SelectOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Select({})", self.columns.join(", "))
    }
}
