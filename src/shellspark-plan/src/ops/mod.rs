//! Plan operators for ShellSpark query compilation.
//!
//! These operators define *what* a query does; the code emitters decide
//! *how* the equivalent shell command is produced.
//!
//! Plans are linear: every operator has at most one input and `Source` is
//! always the leaf, so a plan is an ownership chain with no possibility of
//! cycles. All operators are immutable; the builder and the optimizer always
//! construct new trees.

mod aggregate;
mod filter;
mod limit;
mod parallel;
mod parse;
mod select;
mod sort;
mod source;

pub use aggregate::{AggFunc, AggInput, AggItem, AggOp, AggSpec, ArithOp, GroupByOp, Operand};
pub use filter::{CmpOp, ColFilterOp, LineFilterOp, LineMatch};
pub use limit::LimitOp;
pub use parallel::{ParallelOp, Workers};
pub use parse::{DataFormat, ParseOp};
pub use select::SelectOp;
pub use sort::SortOp;
pub use source::SourceOp;

use serde::{Deserialize, Serialize};

/// A plan operator.
///
/// Each variant wraps a parameter struct; unary operators own their input
/// through a `Box`. Equality and hashing are structural, including field
/// order inside `Select`, `GroupBy` and `Agg`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanOp {
    /// Source - names the input file or glob. Always the leaf.
    Source(SourceOp),

    /// Parse - declares the upstream byte stream's structure.
    Parse {
        /// Input plan.
        input: Box<PlanOp>,
        /// Parse parameters.
        parse: ParseOp,
    },

    /// LineFilter - predicate on raw lines.
    LineFilter {
        /// Input plan.
        input: Box<PlanOp>,
        /// Filter parameters.
        filter: LineFilterOp,
    },

    /// ColFilter - predicate on a named field after Parse.
    ColFilter {
        /// Input plan.
        input: Box<PlanOp>,
        /// Filter parameters.
        filter: ColFilterOp,
    },

    /// Select - column projection.
    Select {
        /// Input plan.
        input: Box<PlanOp>,
        /// Projection parameters.
        select: SelectOp,
    },

    /// GroupBy - marks grouping columns; must be immediately followed by Agg.
    GroupBy {
        /// Input plan.
        input: Box<PlanOp>,
        /// Grouping parameters.
        group_by: GroupByOp,
    },

    /// Agg - defines aggregated output columns.
    Agg {
        /// Input plan.
        input: Box<PlanOp>,
        /// Aggregation parameters.
        agg: AggOp,
    },

    /// Sort - row ordering.
    Sort {
        /// Input plan.
        input: Box<PlanOp>,
        /// Sort parameters.
        sort: SortOp,
    },

    /// Limit - row count restriction.
    Limit {
        /// Input plan.
        input: Box<PlanOp>,
        /// Limit parameters.
        limit: LimitOp,
    },

    /// Distinct - whole-record deduplication.
    Distinct {
        /// Input plan.
        input: Box<PlanOp>,
    },

    /// Parallel - multi-file parallelism annotation.
    Parallel {
        /// Input plan.
        input: Box<PlanOp>,
        /// Parallelism parameters.
        parallel: ParallelOp,
    },
}

impl PlanOp {
    // ========== Constructors ==========

    /// Create a source operator.
    pub fn source(source: SourceOp) -> Self {
        Self::Source(source)
    }

    /// Create a parse operator.
    pub fn parse(input: PlanOp, parse: ParseOp) -> Self {
        Self::Parse {
            input: Box::new(input),
            parse,
        }
    }

    /// Create a line filter operator.
    pub fn line_filter(input: PlanOp, filter: LineFilterOp) -> Self {
        Self::LineFilter {
            input: Box::new(input),
            filter,
        }
    }

    /// Create a column filter operator.
    pub fn col_filter(input: PlanOp, filter: ColFilterOp) -> Self {
        Self::ColFilter {
            input: Box::new(input),
            filter,
        }
    }

    /// Create a select operator.
    pub fn select(input: PlanOp, select: SelectOp) -> Self {
        Self::Select {
            input: Box::new(input),
            select,
        }
    }

    /// Create a group-by operator.
    pub fn group_by(input: PlanOp, group_by: GroupByOp) -> Self {
        Self::GroupBy {
            input: Box::new(input),
            group_by,
        }
    }

    /// Create an agg operator.
    pub fn agg(input: PlanOp, agg: AggOp) -> Self {
        Self::Agg {
            input: Box::new(input),
            agg,
        }
    }

    /// Create a sort operator.
    pub fn sort(input: PlanOp, sort: SortOp) -> Self {
        Self::Sort {
            input: Box::new(input),
            sort,
        }
    }

    /// Create a limit operator.
    pub fn limit(input: PlanOp, limit: LimitOp) -> Self {
        Self::Limit {
            input: Box::new(input),
            limit,
        }
    }

    /// Create a distinct operator.
    pub fn distinct(input: PlanOp) -> Self {
        Self::Distinct {
            input: Box::new(input),
        }
    }

    /// Create a parallel operator.
    pub fn parallel(input: PlanOp, parallel: ParallelOp) -> Self {
        Self::Parallel {
            input: Box::new(input),
            parallel,
        }
    }

    // ========== Analysis methods ==========

    /// Get the operator name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Source(_) => "Source",
            Self::Parse { .. } => "Parse",
            Self::LineFilter { .. } => "LineFilter",
            Self::ColFilter { .. } => "ColFilter",
            Self::Select { .. } => "Select",
            Self::GroupBy { .. } => "GroupBy",
            Self::Agg { .. } => "Agg",
            Self::Sort { .. } => "Sort",
            Self::Limit { .. } => "Limit",
            Self::Distinct { .. } => "Distinct",
            Self::Parallel { .. } => "Parallel",
        }
    }

    /// Check if this is the leaf operator.
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Source(_))
    }

    /// Get the input operator, if any.
    pub fn input(&self) -> Option<&PlanOp> {
        match self {
            Self::Source(_) => None,
            Self::Parse { input, .. }
            | Self::LineFilter { input, .. }
            | Self::ColFilter { input, .. }
            | Self::Select { input, .. }
            | Self::GroupBy { input, .. }
            | Self::Agg { input, .. }
            | Self::Sort { input, .. }
            | Self::Limit { input, .. }
            | Self::Distinct { input }
            | Self::Parallel { input, .. } => Some(input.as_ref()),
        }
    }

    /// Replace the input, consuming this operator.
    pub fn with_input(self, new_input: PlanOp) -> Self {
        self.map_input(|_| new_input)
    }

    /// Map over the input, replacing it with a transformed version.
    pub fn map_input<F>(self, f: F) -> Self
    where
        F: FnOnce(PlanOp) -> PlanOp,
    {
        match self {
            Self::Source(_) => self,
            Self::Parse { input, parse } => Self::Parse {
                input: Box::new(f(*input)),
                parse,
            },
            Self::LineFilter { input, filter } => Self::LineFilter {
                input: Box::new(f(*input)),
                filter,
            },
            Self::ColFilter { input, filter } => Self::ColFilter {
                input: Box::new(f(*input)),
                filter,
            },
            Self::Select { input, select } => Self::Select {
                input: Box::new(f(*input)),
                select,
            },
            Self::GroupBy { input, group_by } => Self::GroupBy {
                input: Box::new(f(*input)),
                group_by,
            },
            Self::Agg { input, agg } => Self::Agg {
                input: Box::new(f(*input)),
                agg,
            },
            Self::Sort { input, sort } => Self::Sort {
                input: Box::new(f(*input)),
                sort,
            },
            Self::Limit { input, limit } => Self::Limit {
                input: Box::new(f(*input)),
                limit,
            },
            Self::Distinct { input } => Self::Distinct {
                input: Box::new(f(*input)),
            },
            Self::Parallel { input, parallel } => Self::Parallel {
                input: Box::new(f(*input)),
                parallel,
            },
        }
    }

    /// Iterate from this operator down to the leaf.
    pub fn chain(&self) -> impl Iterator<Item = &PlanOp> {
        std::iter::successors(Some(self), |op| op.input())
    }

    /// Find the source node of this plan.
    pub fn find_source(&self) -> Option<&SourceOp> {
        self.chain().find_map(|op| match op {
            Self::Source(s) => Some(s),
            _ => None,
        })
    }

    /// Check if any filter, be it line- or column-level, is this operator.
    pub const fn is_filter(&self) -> bool {
        matches!(self, Self::LineFilter { .. } | Self::ColFilter { .. })
    }

    /// Check whether this operator references fields by name or position.
    pub const fn is_field_aware(&self) -> bool {
        matches!(
            self,
            Self::ColFilter { .. } | Self::Select { .. } | Self::GroupBy { .. } | Self::Agg { .. }
        )
    }

    /// Check whether this operator needs global state and therefore cannot
    /// be distributed across parallel workers without a reduction step.
    pub const fn is_global_state(&self) -> bool {
        matches!(
            self,
            Self::Sort { .. } | Self::Distinct { .. } | Self::GroupBy { .. } | Self::Limit { .. }
        )
    }

    /// Format as a tree string with indentation.
    pub fn explain(&self, indent: usize) -> String {
        let prefix = "  ".repeat(indent);
        let mut result = format!("{prefix}{self}\n");
        if let Some(input) = self.input() {
            result.push_str(&input.explain(indent + 1));
        }
        result
    }
}

impl std::fmt::Display for PlanOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source(source) => write!(f, "{source}"),
            Self::Parse { parse, .. } => write!(f, "{parse}"),
            Self::LineFilter { filter, .. } => write!(f, "{filter}"),
            Self::ColFilter { filter, .. } => write!(f, "{filter}"),
            Self::Select { select, .. } => write!(f, "{select}"),
            Self::GroupBy { group_by, .. } => write!(f, "{group_by}"),
            Self::Agg { agg, .. } => write!(f, "{agg}"),
            Self::Sort { sort, .. } => write!(f, "{sort}"),
            Self::Limit { limit, .. } => write!(f, "{limit}"),
            Self::Distinct { .. } => write!(f, "Distinct"),
            Self::Parallel { parallel, .. } => write!(f, "{parallel}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_chain() {
        let plan = PlanOp::select(
            PlanOp::col_filter(
                PlanOp::parse(
                    PlanOp::source(SourceOp::new("data.csv")),
                    ParseOp::csv(true),
                ),
                ColFilterOp::new("age", CmpOp::Gt, 18),
            ),
            SelectOp::new(["name", "city"]),
        );

        assert_eq!(plan.name(), "Select");
        assert!(!plan.is_leaf());
        assert_eq!(plan.chain().count(), 4);
        assert_eq!(plan.find_source().unwrap().pattern, "data.csv");
    }

    #[test]
    fn test_global_state_classification() {
        let source = PlanOp::source(SourceOp::new("x.log"));
        assert!(!source.is_global_state());

        let sort = PlanOp::sort(source.clone(), SortOp::asc("1"));
        assert!(sort.is_global_state());

        let limit = PlanOp::limit(source.clone(), LimitOp::new(10));
        assert!(limit.is_global_state());

        let distinct = PlanOp::distinct(source);
        assert!(distinct.is_global_state());
    }

    #[test]
    fn test_map_input() {
        let source = PlanOp::source(SourceOp::new("x.log"));
        let filter = PlanOp::line_filter(
            source,
            LineFilterOp::new(LineMatch::Contains, "ERROR"),
        );

        let wrapped = filter.map_input(|inner| PlanOp::limit(inner, LimitOp::new(5)));
        assert_eq!(wrapped.input().unwrap().name(), "Limit");
    }

    #[test]
    fn test_explain() {
        let plan = PlanOp::line_filter(
            PlanOp::source(SourceOp::new("app.log")),
            LineFilterOp::new(LineMatch::Contains, "ERROR"),
        );

        let explain = plan.explain(0);
        assert!(explain.contains("LineFilter"));
        assert!(explain.contains("Source"));
    }
}
