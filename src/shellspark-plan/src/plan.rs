//! Query plan root structure.

use std::hash::{Hash, Hasher};

use common_error::SparkResult;
use serde::{Deserialize, Serialize};

use crate::ops::PlanOp;
use crate::validate;

/// Root of a validated query plan.
///
/// A plan is an immutable chain of operators with `Source` at the leaf.
/// Construction runs the build-time invariant checks; a `QueryPlan` value is
/// therefore always structurally valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryPlan {
    root: PlanOp,
}

impl QueryPlan {
    /// Validate and wrap a plan root.
    pub fn new(root: PlanOp) -> SparkResult<Self> {
        validate::validate(&root)?;
        Ok(Self { root })
    }

    /// Get the root operator.
    pub fn root(&self) -> &PlanOp {
        &self.root
    }

    /// Consume the plan, returning the root operator.
    pub fn into_root(self) -> PlanOp {
        self.root
    }

    /// Structural hash of the plan.
    ///
    /// Two plans hash equal iff they are node-by-node identical, including
    /// field order in Select, GroupBy and Agg. Stable within a process; used
    /// as half of the compile-cache key.
    pub fn structural_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.root.hash(&mut hasher);
        hasher.finish()
    }

    /// Display the plan as a tree.
    pub fn explain(&self) -> String {
        self.root.explain(0)
    }
}

impl std::fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.explain())
    }
}
