//! Rule-based plan optimizer for ShellSpark.
//!
//! The optimizer rewrites a plan into an equivalent plan that emits a
//! smaller, faster command: filters sink below projections, redundant
//! operators disappear and adjacent limits merge. Rules run in a fixed
//! sequence, each to fixpoint before the next; a Limit is never pushed past
//! a Sort since that would change the output.

pub mod rules;

pub use rules::{
    DistinctAfterAggElimination, DuplicateFilterElimination, FilterPushdown, LimitCoalescing,
    OptimizationRule, Optimizer, Transformed,
};

use common_error::SparkResult;
use shellspark_plan::QueryPlan;

/// Optimize a plan with the default rule set.
pub fn optimize(plan: QueryPlan) -> SparkResult<QueryPlan> {
    Optimizer::default().optimize(plan)
}
