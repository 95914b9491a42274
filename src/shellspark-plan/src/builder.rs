//! Fluent, persistent plan builder.
//!
//! Every method consumes the builder and returns a new one; clone the
//! builder to branch a pipeline prefix. Invariants are enforced when
//! [`PlanBuilder::build`] is called.

use common_error::{SparkError, SparkResult};

use crate::ops::{
    AggItem, AggOp, AggSpec, CmpOp, ColFilterOp, GroupByOp, LimitOp, LineFilterOp, LineMatch,
    ParallelOp, ParseOp, PlanOp, SelectOp, SortOp, SourceOp, Workers,
};
use crate::plan::QueryPlan;
use crate::scalar::Scalar;

/// A filter predicate accepted by [`PlanBuilder::filter`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Predicate {
    /// Predicate on the whole raw line.
    Line(LineFilterOp),
    /// Predicate on a named column.
    Column(ColFilterOp),
}

impl Predicate {
    /// Create a raw-line predicate.
    pub fn line(kind: LineMatch, pattern: impl Into<String>) -> Self {
        Self::Line(LineFilterOp::new(kind, pattern))
    }

    /// Create a column predicate.
    pub fn column(name: impl Into<String>, op: CmpOp, value: impl Into<Scalar>) -> Self {
        Self::Column(ColFilterOp::new(name, op, value))
    }

    /// Parse the `name__operator` keyword convention used by ergonomic
    /// front-ends: `line__contains`, `status__ge`, `path__startswith`, ….
    ///
    /// The pseudo-column `line` targets the whole record and accepts only
    /// the string operators; `lte` and `gte` are accepted as aliases.
    pub fn from_keyword(key: &str, value: impl Into<Scalar>) -> SparkResult<Self> {
        let value = value.into();
        let (name, op_name) = key.split_once("__").ok_or_else(|| {
            SparkError::plan(format!(
                "invalid filter key '{key}': expected 'column__operator'"
            ))
        })?;
        if name.is_empty() || op_name.is_empty() || op_name.contains("__") {
            return Err(SparkError::plan(format!(
                "invalid filter key '{key}': expected 'column__operator'"
            )));
        }

        let op = CmpOp::from_keyword(op_name).ok_or_else(|| {
            SparkError::plan(format!("unknown filter operator '{op_name}' in '{key}'"))
        })?;

        if name == "line" {
            let kind = LineMatch::from_cmp(op).ok_or_else(|| {
                SparkError::plan(format!(
                    "operator '{op_name}' is not valid on the whole line; \
                     use contains, regex, startswith or endswith"
                ))
            })?;
            let Scalar::Str(pattern) = value else {
                return Err(SparkError::plan(format!(
                    "line filter '{key}' requires a string pattern"
                )));
            };
            Ok(Self::line(kind, pattern))
        } else {
            Ok(Self::Column(ColFilterOp::new(name, op, value)))
        }
    }
}

/// Builder for query plans.
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    root: PlanOp,
}

impl PlanBuilder {
    /// Start a plan from an input file or glob pattern.
    pub fn source(pattern: impl Into<String>) -> Self {
        Self {
            root: PlanOp::source(SourceOp::new(pattern)),
        }
    }

    /// Declare the structure of the upstream byte stream.
    #[must_use]
    pub fn parse(self, parse: ParseOp) -> Self {
        Self {
            root: PlanOp::parse(self.root, parse),
        }
    }

    /// Parse as csv with the default comma delimiter.
    #[must_use]
    pub fn parse_csv(self, header: bool) -> Self {
        self.parse(ParseOp::csv(header))
    }

    /// Parse as newline-delimited JSON.
    #[must_use]
    pub fn parse_json(self) -> Self {
        self.parse(ParseOp::json())
    }

    /// Parse as whitespace-separated text.
    #[must_use]
    pub fn parse_text(self) -> Self {
        self.parse(ParseOp::text())
    }

    /// Add a filter predicate.
    #[must_use]
    pub fn filter(self, predicate: Predicate) -> Self {
        let root = match predicate {
            Predicate::Line(filter) => PlanOp::line_filter(self.root, filter),
            Predicate::Column(filter) => PlanOp::col_filter(self.root, filter),
        };
        Self { root }
    }

    /// Add a filter using the `name__operator` keyword convention.
    pub fn filter_kw(self, key: &str, value: impl Into<Scalar>) -> SparkResult<Self> {
        Ok(self.filter(Predicate::from_keyword(key, value)?))
    }

    /// Project to the given columns, in order.
    #[must_use]
    pub fn select(self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            root: PlanOp::select(self.root, SelectOp::new(columns)),
        }
    }

    /// Group by the given columns. Must be immediately followed by
    /// [`PlanBuilder::agg`].
    #[must_use]
    pub fn group_by(self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            root: PlanOp::group_by(self.root, GroupByOp::new(keys)),
        }
    }

    /// Define aggregated output columns as `(alias, spec)` pairs.
    ///
    /// Aggregation inputs may be plain columns or one-operator arithmetic
    /// expressions such as `"price * quantity"` (see
    /// [`crate::ops::AggInput::parse`]).
    #[must_use]
    pub fn agg(self, items: impl IntoIterator<Item = (impl Into<String>, AggSpec)>) -> Self {
        let items = items
            .into_iter()
            .map(|(alias, spec)| AggItem::new(alias, spec))
            .collect();
        Self {
            root: PlanOp::agg(self.root, AggOp::new(items)),
        }
    }

    /// Order the output by a key.
    #[must_use]
    pub fn sort(self, sort: SortOp) -> Self {
        Self {
            root: PlanOp::sort(self.root, sort),
        }
    }

    /// Take the first `n` rows.
    #[must_use]
    pub fn limit(self, n: u64) -> Self {
        Self {
            root: PlanOp::limit(self.root, LimitOp::new(n)),
        }
    }

    /// Skip `offset` rows, then take the first `n`.
    #[must_use]
    pub fn limit_offset(self, n: u64, offset: u64) -> Self {
        Self {
            root: PlanOp::limit(self.root, LimitOp::new(n).with_offset(offset)),
        }
    }

    /// Deduplicate whole records.
    #[must_use]
    pub fn distinct(self) -> Self {
        Self {
            root: PlanOp::distinct(self.root),
        }
    }

    /// Request multi-file parallelism.
    ///
    /// The check against global-state operators runs at compile time, since
    /// later builder calls may still add one.
    #[must_use]
    pub fn parallel(self, workers: Workers) -> Self {
        Self {
            root: PlanOp::parallel(self.root, ParallelOp::new(workers)),
        }
    }

    /// Get the current root operator without validation.
    pub fn root(&self) -> &PlanOp {
        &self.root
    }

    /// Validate the chain and produce the plan.
    pub fn build(self) -> SparkResult<QueryPlan> {
        QueryPlan::new(self.root)
    }
}
