//! Limit coalescing rule.

use common_error::SparkResult;
use shellspark_plan::{ops::LimitOp, PlanOp};

use super::rule::{OptimizationRule, Transformed};

/// Collapse consecutive Limits to the minimum count.
///
/// The merge only fires when the outer limit has no offset: an outer offset
/// skips rows of the inner limit's output and cannot be folded into a single
/// head invocation. Limit is never pushed past Sort.
pub struct LimitCoalescing;

impl OptimizationRule for LimitCoalescing {
    fn name(&self) -> &'static str {
        "LimitCoalescing"
    }

    fn description(&self) -> &'static str {
        "Merge adjacent Limits to the smaller count"
    }

    fn apply(&self, op: PlanOp) -> SparkResult<Transformed> {
        let (new_root, changed) = coalesce(op);
        Ok(if changed {
            Transformed::yes(new_root)
        } else {
            Transformed::no(new_root)
        })
    }
}

fn coalesce(op: PlanOp) -> (PlanOp, bool) {
    let mut changed = false;
    let op = op.map_input(|child| {
        let (child, child_changed) = coalesce(child);
        changed |= child_changed;
        child
    });

    if let PlanOp::Limit { input, limit: outer } = op {
        if outer.offset == 0 {
            if let PlanOp::Limit { input: inner_input, limit: inner } = *input {
                return (
                    PlanOp::Limit {
                        input: inner_input,
                        limit: LimitOp {
                            n: outer.n.min(inner.n),
                            offset: inner.offset,
                        },
                    },
                    true,
                );
            }
        }
        return (PlanOp::Limit { input, limit: outer }, changed);
    }

    (op, changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellspark_plan::PlanBuilder;

    fn limit_counts(op: &PlanOp) -> Vec<u64> {
        op.chain()
            .filter_map(|op| match op {
                PlanOp::Limit { limit, .. } => Some(limit.n),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_adjacent_limits_take_minimum() {
        let plan = PlanBuilder::source("app.log")
            .limit(100)
            .limit(10)
            .build()
            .unwrap();

        let result = LimitCoalescing.apply(plan.into_root()).unwrap();
        assert!(result.changed);
        assert_eq!(limit_counts(&result.op), vec![10]);
    }

    #[test]
    fn test_three_limits_collapse() {
        let plan = PlanBuilder::source("app.log")
            .limit(50)
            .limit(100)
            .limit(25)
            .build()
            .unwrap();

        let result = LimitCoalescing.apply(plan.into_root()).unwrap();
        assert!(result.changed);
        assert_eq!(limit_counts(&result.op), vec![25]);
    }

    #[test]
    fn test_outer_offset_blocks_merge() {
        let plan = PlanBuilder::source("app.log")
            .limit(100)
            .limit_offset(10, 5)
            .build()
            .unwrap();

        let result = LimitCoalescing.apply(plan.into_root()).unwrap();
        assert!(!result.changed);
        assert_eq!(limit_counts(&result.op), vec![10, 100]);
    }
}
