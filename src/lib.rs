//! ShellSpark compiles declarative data-transformation queries into single
//! Unix shell command lines built from standard text-processing utilities
//! (AWK, grep/ripgrep, jq, sort, uniq, head, find, xargs).
//!
//! A query is assembled with the fluent [`Pipeline`] builder into an
//! immutable plan, rewritten by a rule-based optimizer, bound to the
//! binaries discovered on the host and emitted as one pipe-joined command
//! string, ready for inspection, caching or dispatch by an external
//! executor.
//!
//! ```no_run
//! use shellspark::{AggSpec, Pipeline};
//!
//! let command = Pipeline::new("sales.csv")
//!     .parse_csv(true)
//!     .filter_kw("quantity__gt", 0)?
//!     .group_by(["region"])
//!     .agg([("total_revenue", AggSpec::sum("price * quantity"))])
//!     .sort("total_revenue", true, true)
//!     .to_shell()?;
//! # Ok::<(), shellspark::SparkError>(())
//! ```

mod pipeline;

pub use pipeline::Pipeline;

pub use common_error::{SparkError, SparkResult};
pub use shellspark_codegen::{Assembler, CacheKey, Compiler, CompileCache, Fragment, Layout};
pub use shellspark_optimizer::{OptimizationRule, Optimizer, Transformed};
pub use shellspark_plan::{
    AggFunc, AggInput, AggItem, AggOp, AggSpec, ArithOp, CmpOp, ColFilterOp, DataFormat,
    GroupByOp, LimitOp, LineFilterOp, LineMatch, Operand, ParallelOp, ParseOp, PlanBuilder,
    PlanOp, Predicate, QueryPlan, Scalar, SelectOp, SortOp, SourceOp, Workers,
};
pub use shellspark_tools::{
    AwkTool, AwkVariant, Fingerprint, GrepTool, GrepVariant, JqTool, ResolvedTools, SortTool,
    ToolConfig, ToolRegistry,
};
