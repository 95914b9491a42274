//! Fluent pipeline front-end.
//!
//! `Pipeline` is the ergonomic surface over [`PlanBuilder`]: it adds the
//! `name__operator` filter convention and compiles through the process-wide
//! default [`Compiler`] (or an explicit one for isolated tool sets).

use common_error::SparkResult;
use shellspark_codegen::Compiler;
use shellspark_plan::{
    AggSpec, ParseOp, PlanBuilder, Predicate, QueryPlan, Scalar, SortOp, Workers,
};

/// Builder for shell-compiled data transformations.
///
/// # Example
///
/// ```no_run
/// use shellspark::Pipeline;
///
/// let command = Pipeline::new("app.log")
///     .filter_kw("line__contains", "ERROR")?
///     .to_shell()?;
/// # Ok::<(), common_error::SparkError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    builder: PlanBuilder,
}

impl Pipeline {
    /// Start a pipeline from an input file or glob pattern.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            builder: PlanBuilder::source(path),
        }
    }

    /// Declare the input format.
    #[must_use]
    pub fn parse(mut self, parse: ParseOp) -> Self {
        self.builder = self.builder.parse(parse);
        self
    }

    /// Parse as csv with a header row.
    #[must_use]
    pub fn parse_csv(mut self, header: bool) -> Self {
        self.builder = self.builder.parse_csv(header);
        self
    }

    /// Parse as newline-delimited JSON.
    #[must_use]
    pub fn parse_json(mut self) -> Self {
        self.builder = self.builder.parse_json();
        self
    }

    /// Parse as whitespace-separated text.
    #[must_use]
    pub fn parse_text(mut self) -> Self {
        self.builder = self.builder.parse_text();
        self
    }

    /// Add an explicit filter predicate.
    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.builder = self.builder.filter(predicate);
        self
    }

    /// Add a filter using the `name__operator` convention:
    /// `line__contains`, `status__ge`, `path__startswith`, ….
    pub fn filter_kw(mut self, key: &str, value: impl Into<Scalar>) -> SparkResult<Self> {
        self.builder = self.builder.filter_kw(key, value)?;
        Ok(self)
    }

    /// Project to the given columns.
    #[must_use]
    pub fn select(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.builder = self.builder.select(columns);
        self
    }

    /// Group by the given columns; must be followed by [`Pipeline::agg`].
    #[must_use]
    pub fn group_by(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.builder = self.builder.group_by(keys);
        self
    }

    /// Define aggregated output columns as `(alias, spec)` pairs.
    #[must_use]
    pub fn agg(mut self, items: impl IntoIterator<Item = (impl Into<String>, AggSpec)>) -> Self {
        self.builder = self.builder.agg(items);
        self
    }

    /// Sort by a key.
    #[must_use]
    pub fn sort(mut self, key: impl Into<String>, descending: bool, numeric: bool) -> Self {
        let mut sort = if descending {
            SortOp::desc(key)
        } else {
            SortOp::asc(key)
        };
        if numeric {
            sort = sort.numeric();
        }
        self.builder = self.builder.sort(sort);
        self
    }

    /// Take the first `n` rows.
    #[must_use]
    pub fn limit(mut self, n: u64) -> Self {
        self.builder = self.builder.limit(n);
        self
    }

    /// Skip `offset` rows, then take the first `n`.
    #[must_use]
    pub fn limit_offset(mut self, n: u64, offset: u64) -> Self {
        self.builder = self.builder.limit_offset(n, offset);
        self
    }

    /// Deduplicate whole records.
    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.builder = self.builder.distinct();
        self
    }

    /// Request multi-file parallelism with an explicit worker count.
    ///
    /// A zero count falls back to auto (CPU count).
    #[must_use]
    pub fn parallel(mut self, workers: u32) -> Self {
        let workers = Workers::fixed(workers).unwrap_or(Workers::Auto);
        self.builder = self.builder.parallel(workers);
        self
    }

    /// Request multi-file parallelism sized to the host CPU count.
    #[must_use]
    pub fn parallel_auto(mut self) -> Self {
        self.builder = self.builder.parallel(Workers::Auto);
        self
    }

    /// Validate and return the underlying plan.
    pub fn plan(&self) -> SparkResult<QueryPlan> {
        self.builder.clone().build()
    }

    /// Compile to a shell command using the process-wide default compiler.
    pub fn to_shell(&self) -> SparkResult<String> {
        self.to_shell_with(Compiler::global())
    }

    /// Compile to a shell command using an explicit compiler.
    pub fn to_shell_with(&self, compiler: &Compiler) -> SparkResult<String> {
        compiler.compile(&self.plan()?)
    }

    /// Display the plan as a tree.
    pub fn explain(&self) -> SparkResult<String> {
        Ok(self.plan()?.explain())
    }
}
