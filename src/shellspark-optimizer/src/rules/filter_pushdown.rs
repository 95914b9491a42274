//! Filter pushdown optimization rule.
//!
//! Move column filters as close as possible to the data source so the
//! emitted command discards rows before projecting them.

use common_error::SparkResult;
use shellspark_plan::PlanOp;

use super::rule::{OptimizationRule, Transformed};

/// Filter pushdown rule.
///
/// A `ColFilter` immediately downstream of a `Select` moves below it when
/// the filtered column remains in the projection's scope. Filters are never
/// pushed across a `Parse` (raw-line and parsed semantics differ), and never
/// below GroupBy/Agg, Sort, Limit or Distinct. Line filters stay where the
/// builder put them: the raw line they match changes shape across any
/// field-introducing operator.
pub struct FilterPushdown;

impl OptimizationRule for FilterPushdown {
    fn name(&self) -> &'static str {
        "FilterPushdown"
    }

    fn description(&self) -> &'static str {
        "Push column filters below projections"
    }

    fn apply(&self, op: PlanOp) -> SparkResult<Transformed> {
        let (new_root, changed) = push_down(op);
        Ok(if changed {
            Transformed::yes(new_root)
        } else {
            Transformed::no(new_root)
        })
    }
}

fn push_down(op: PlanOp) -> (PlanOp, bool) {
    // Rewrite the chain bottom-up so a filter freed by a lower rewrite can
    // keep sinking in the same pass.
    let mut changed = false;
    let op = op.map_input(|child| {
        let (child, child_changed) = push_down(child);
        changed |= child_changed;
        child
    });

    if let PlanOp::ColFilter { input, filter } = op {
        if let PlanOp::Select { input: select_input, select } = *input {
            if select.columns.contains(&filter.column) {
                let (pushed, _) = push_down(PlanOp::ColFilter {
                    input: select_input,
                    filter,
                });
                return (
                    PlanOp::Select {
                        input: Box::new(pushed),
                        select,
                    },
                    true,
                );
            }
            return (
                PlanOp::ColFilter {
                    input: Box::new(PlanOp::Select {
                        input: select_input,
                        select,
                    }),
                    filter,
                },
                changed,
            );
        }
        return (PlanOp::ColFilter { input, filter }, changed);
    }

    (op, changed)
}
