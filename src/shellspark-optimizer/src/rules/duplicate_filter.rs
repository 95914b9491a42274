//! Duplicate filter elimination rule.

use common_error::SparkResult;
use shellspark_plan::PlanOp;

use super::rule::{OptimizationRule, Transformed};

/// Collapse two structurally equal filters in succession to one.
pub struct DuplicateFilterElimination;

impl OptimizationRule for DuplicateFilterElimination {
    fn name(&self) -> &'static str {
        "DuplicateFilterElimination"
    }

    fn description(&self) -> &'static str {
        "Drop a filter identical to the filter directly beneath it"
    }

    fn apply(&self, op: PlanOp) -> SparkResult<Transformed> {
        let (new_root, changed) = dedup(op);
        Ok(if changed {
            Transformed::yes(new_root)
        } else {
            Transformed::no(new_root)
        })
    }
}

fn dedup(op: PlanOp) -> (PlanOp, bool) {
    let mut changed = false;
    let op = op.map_input(|child| {
        let (child, child_changed) = dedup(child);
        changed |= child_changed;
        child
    });

    match op {
        PlanOp::LineFilter { input, filter } => {
            if matches!(&*input, PlanOp::LineFilter { filter: inner, .. } if *inner == filter) {
                return (*input, true);
            }
            (PlanOp::LineFilter { input, filter }, changed)
        }
        PlanOp::ColFilter { input, filter } => {
            if matches!(&*input, PlanOp::ColFilter { filter: inner, .. } if *inner == filter) {
                return (*input, true);
            }
            (PlanOp::ColFilter { input, filter }, changed)
        }
        other => (other, changed),
    }
}
