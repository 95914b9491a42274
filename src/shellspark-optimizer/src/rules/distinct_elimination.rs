//! Post-aggregation Distinct elimination rule.

use common_error::SparkResult;
use shellspark_plan::PlanOp;

use super::rule::{OptimizationRule, Transformed};

/// Remove a `Distinct` immediately following `Agg`: aggregation already
/// produces exactly one record per group.
pub struct DistinctAfterAggElimination;

impl OptimizationRule for DistinctAfterAggElimination {
    fn name(&self) -> &'static str {
        "DistinctAfterAggElimination"
    }

    fn description(&self) -> &'static str {
        "Drop Distinct directly above an aggregation"
    }

    fn apply(&self, op: PlanOp) -> SparkResult<Transformed> {
        let (new_root, changed) = eliminate(op);
        Ok(if changed {
            Transformed::yes(new_root)
        } else {
            Transformed::no(new_root)
        })
    }
}

fn eliminate(op: PlanOp) -> (PlanOp, bool) {
    let mut changed = false;
    let op = op.map_input(|child| {
        let (child, child_changed) = eliminate(child);
        changed |= child_changed;
        child
    });

    if let PlanOp::Distinct { input } = op {
        if matches!(&*input, PlanOp::Agg { .. }) {
            return (*input, true);
        }
        return (PlanOp::Distinct { input }, changed);
    }

    (op, changed)
}
