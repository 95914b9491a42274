//! Filter operators: raw-line predicates and field-aware predicates.

use serde::{Deserialize, Serialize};

use crate::scalar::Scalar;

/// Comparison operators accepted by filters.
///
/// The six relational operators are valid only on named columns; the four
/// string operators are valid on columns and on the whole line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    /// Equality.
    Eq,
    /// Inequality.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Substring match.
    Contains,
    /// Regular expression match.
    Regex,
    /// String prefix match.
    StartsWith,
    /// String suffix match.
    EndsWith,
}

impl CmpOp {
    /// Parse an operator keyword as used by the `name__op` filter protocol.
    ///
    /// Accepts the aliases `lte` for `le` and `gte` for `ge`.
    pub fn from_keyword(kw: &str) -> Option<Self> {
        Some(match kw {
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "lt" => Self::Lt,
            "le" | "lte" => Self::Le,
            "gt" => Self::Gt,
            "ge" | "gte" => Self::Ge,
            "contains" => Self::Contains,
            "regex" => Self::Regex,
            "startswith" => Self::StartsWith,
            "endswith" => Self::EndsWith,
            _ => return None,
        })
    }

    /// The operator keyword.
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Contains => "contains",
            Self::Regex => "regex",
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
        }
    }

    /// Whether this is a relational comparison rather than a string match.
    pub const fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }
}

/// Raw-line match kinds, the subset of [`CmpOp`] legal on the whole line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineMatch {
    /// Substring match.
    Contains,
    /// Regular expression match.
    Regex,
    /// Line prefix match.
    StartsWith,
    /// Line suffix match.
    EndsWith,
}

impl LineMatch {
    /// Narrow a [`CmpOp`] to a line match kind.
    pub fn from_cmp(op: CmpOp) -> Option<Self> {
        Some(match op {
            CmpOp::Contains => Self::Contains,
            CmpOp::Regex => Self::Regex,
            CmpOp::StartsWith => Self::StartsWith,
            CmpOp::EndsWith => Self::EndsWith,
            _ => return None,
        })
    }

    /// The operator keyword.
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Regex => "regex",
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
        }
    }
}

/// Line filter operator - predicate on raw lines, no field awareness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineFilterOp {
    /// Match kind.
    pub kind: LineMatch,
    /// Pattern to match against the whole line.
    pub pattern: String,
}

impl LineFilterOp {
    /// Create a line filter.
    pub fn new(kind: LineMatch, pattern: impl Into<String>) -> Self {
        Self {
            kind,
            pattern: pattern.into(),
        }
    }
}

impl std::fmt::Display for LineFilterOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LineFilter({}, {:?})", self.kind.keyword(), self.pattern)
    }
}

/// Column filter operator - predicate on a named field after Parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColFilterOp {
    /// Column name (or 1-based index rendered as a string for positional
    /// formats).
    pub column: String,
    /// Comparison operator.
    pub op: CmpOp,
    /// Right-hand value.
    pub value: Scalar,
}

impl ColFilterOp {
    /// Create a column filter.
    pub fn new(column: impl Into<String>, op: CmpOp, value: impl Into<Scalar>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }
}

impl std::fmt::Display for ColFilterOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ColFilter({} {} {})",
            self.column,
            self.op.keyword(),
            self.value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_aliases() {
        assert_eq!(CmpOp::from_keyword("le"), Some(CmpOp::Le));
        assert_eq!(CmpOp::from_keyword("lte"), Some(CmpOp::Le));
        assert_eq!(CmpOp::from_keyword("gte"), Some(CmpOp::Ge));
        assert_eq!(CmpOp::from_keyword("between"), None);
    }

    #[test]
    fn test_line_match_narrowing() {
        assert_eq!(LineMatch::from_cmp(CmpOp::Contains), Some(LineMatch::Contains));
        assert_eq!(LineMatch::from_cmp(CmpOp::Eq), None);
    }
}
