//! Build-time structural validation of plan chains.
//!
//! Every invariant here is checked when a plan is built; the compile-time
//! checks (Parallel legality, column resolution against a concrete layout)
//! live in the assembler.

use common_error::{ensure_plan, plan_err, SparkError, SparkResult};

use crate::ops::{AggFunc, AggInput, DataFormat, PlanOp};

/// Validate a plan chain.
pub fn validate(root: &PlanOp) -> SparkResult<()> {
    let chain: Vec<&PlanOp> = root.chain().collect();

    let leaf = chain.last().expect("chain is never empty");
    ensure_plan!(
        leaf.is_leaf(),
        "plan must terminate in a Source node, found {}",
        leaf.name()
    );

    let mut parallel_count = 0usize;

    for (i, op) in chain.iter().enumerate() {
        match op {
            PlanOp::GroupBy { group_by, .. } => {
                ensure_plan!(
                    !group_by.keys.is_empty(),
                    "GroupBy requires at least one key"
                );
                // The consumer sits just before us in root-to-leaf order.
                let consumer = i.checked_sub(1).map(|j| chain[j]);
                if !matches!(consumer, Some(PlanOp::Agg { .. })) {
                    plan_err!("GroupBy must be immediately followed by Agg");
                }
            }
            PlanOp::Agg { agg, .. } => {
                ensure_plan!(!agg.items.is_empty(), "Agg requires at least one aggregation");
                if !matches!(op.input(), Some(PlanOp::GroupBy { .. })) {
                    plan_err!("Agg must immediately follow GroupBy");
                }
                let mut seen = std::collections::HashSet::new();
                for item in &agg.items {
                    ensure_plan!(
                        !item.alias.is_empty(),
                        "aggregation alias must not be empty"
                    );
                    ensure_plan!(
                        seen.insert(item.alias.as_str()),
                        "duplicate aggregation alias '{}'",
                        item.alias
                    );
                    if matches!(item.input, AggInput::Star) && item.func != AggFunc::Count {
                        plan_err!(
                            "aggregation '{}': '*' is only valid with count",
                            item.alias
                        );
                    }
                    // A column that still contains an operator is the
                    // fallback for an expression that failed to parse;
                    // surface the original parse error here.
                    if let AggInput::Column(column) = &item.input {
                        AggInput::parse(column)?;
                    }
                }
            }
            PlanOp::Select { select, .. } => {
                ensure_plan!(
                    !select.columns.is_empty(),
                    "Select requires at least one column"
                );
            }
            PlanOp::Sort { sort, .. } => {
                ensure_plan!(!sort.key.is_empty(), "Sort key must not be empty");
            }
            PlanOp::Limit { limit, .. } => {
                ensure_plan!(limit.n >= 1, "Limit must be positive");
            }
            PlanOp::Parallel { .. } => {
                parallel_count += 1;
                ensure_plan!(
                    parallel_count <= 1,
                    "Parallel may appear at most once in a plan"
                );
            }
            _ => {}
        }

        if op.is_field_aware() {
            check_field_scope(op, &chain[i + 1..])?;
        }
    }

    Ok(())
}

/// Check that a field-aware operator has a Parse upstream and that its
/// column references are addressable under that parse.
fn check_field_scope(op: &PlanOp, upstream: &[&PlanOp]) -> SparkResult<()> {
    for inner in upstream {
        match inner {
            // Aggregated output introduces its own named columns; positions
            // are resolved against the layout at compile time.
            PlanOp::Agg { .. } => return Ok(()),
            PlanOp::Parse { parse, .. } => {
                let named_ok = match parse.format {
                    DataFormat::Json => true,
                    DataFormat::Csv => parse.has_header,
                    DataFormat::Text => false,
                };
                if !named_ok {
                    for column in referenced_columns(op) {
                        if column.parse::<u64>().map_or(true, |n| n == 0) {
                            return Err(SparkError::plan(format!(
                                "{}: column '{column}' requires a header-bearing \
                                 Parse; use a 1-based index for {} input",
                                op.name(),
                                parse.format.name()
                            )));
                        }
                    }
                }
                return Ok(());
            }
            _ => {}
        }
    }

    Err(SparkError::plan(format!(
        "{} requires a preceding Parse node",
        op.name()
    )))
}

fn referenced_columns(op: &PlanOp) -> Vec<&str> {
    match op {
        PlanOp::ColFilter { filter, .. } => vec![filter.column.as_str()],
        PlanOp::Select { select, .. } => select.columns.iter().map(String::as_str).collect(),
        PlanOp::GroupBy { group_by, .. } => group_by.keys.iter().map(String::as_str).collect(),
        PlanOp::Agg { agg, .. } => agg.input_columns(),
        _ => Vec::new(),
    }
}
