//! Optimization rule trait and framework.

use common_error::SparkResult;
use shellspark_plan::PlanOp;

/// A single optimization rule that can rewrite a plan chain.
///
/// A rewrite is legal only if the emitted command's observable output is
/// identical for every input: rules may reorder filters within the
/// documented bounds, drop redundant work, and merge adjacent operators,
/// but never cross a Parse boundary or move anything past a global-state
/// operator.
pub trait OptimizationRule: Send + Sync {
    /// Get the name of this rule.
    fn name(&self) -> &'static str;

    /// Get a description of what this rule does.
    fn description(&self) -> &'static str {
        "No description available"
    }

    /// Apply this rule once over the whole chain, returning a potentially
    /// transformed plan.
    fn apply(&self, op: PlanOp) -> SparkResult<Transformed>;
}

/// The result of applying an optimization rule.
#[derive(Debug, Clone)]
pub struct Transformed {
    /// The (potentially transformed) plan root.
    pub op: PlanOp,
    /// Whether the plan was actually changed.
    pub changed: bool,
}

impl Transformed {
    /// Create a result indicating the plan was changed.
    pub const fn yes(op: PlanOp) -> Self {
        Self { op, changed: true }
    }

    /// Create a result indicating the plan was unchanged.
    pub const fn no(op: PlanOp) -> Self {
        Self { op, changed: false }
    }
}
