//! Main optimizer applying a fixed rule sequence.

use common_error::SparkResult;
use shellspark_plan::QueryPlan;
use tracing::debug;

use super::{
    DistinctAfterAggElimination, DuplicateFilterElimination, FilterPushdown, LimitCoalescing,
};
use super::rule::OptimizationRule;

/// Query optimizer.
///
/// Rules are applied in a fixed order; each rule runs to fixpoint before the
/// next begins. The whole sequence is idempotent: optimizing an already
/// optimized plan changes nothing.
pub struct Optimizer {
    rules: Vec<Box<dyn OptimizationRule>>,
    max_iterations: usize,
}

impl Optimizer {
    /// Create an optimizer with the given rules.
    pub fn new(rules: Vec<Box<dyn OptimizationRule>>) -> Self {
        Self {
            rules,
            max_iterations: 32,
        }
    }

    /// Set the per-rule fixpoint iteration bound.
    #[must_use]
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Optimize a plan.
    pub fn optimize(&self, plan: QueryPlan) -> SparkResult<QueryPlan> {
        let mut root = plan.into_root();

        for rule in &self.rules {
            for iteration in 0..self.max_iterations {
                let transformed = rule.apply(root)?;
                root = transformed.op;
                if !transformed.changed {
                    break;
                }
                debug!(rule = rule.name(), iteration, "rule changed plan");
            }
        }

        QueryPlan::new(root)
    }

    /// Get the rules.
    pub fn rules(&self) -> &[Box<dyn OptimizationRule>] {
        &self.rules
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new(vec![
            Box::new(FilterPushdown),
            Box::new(DuplicateFilterElimination),
            Box::new(DistinctAfterAggElimination),
            Box::new(LimitCoalescing),
        ])
    }
}
