//! Query plan AST and builder for ShellSpark.
//!
//! A plan is a linear chain of immutable, structurally-hashable operators
//! with [`ops::SourceOp`] at the leaf. Plans are assembled with the
//! persistent [`PlanBuilder`], validated at build time, rewritten by the
//! optimizer crate and consumed by the code emitters.
//!
//! # Example
//!
//! ```
//! use shellspark_plan::{AggSpec, CmpOp, PlanBuilder, Predicate, SortOp};
//!
//! let plan = PlanBuilder::source("sales.csv")
//!     .parse_csv(true)
//!     .filter(Predicate::column("quantity", CmpOp::Gt, 0))
//!     .group_by(["region"])
//!     .agg([("total_revenue", AggSpec::sum("price * quantity"))])
//!     .sort(SortOp::desc("total_revenue").numeric())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(plan.root().name(), "Sort");
//! ```

mod builder;
pub mod ops;
mod plan;
mod scalar;
mod validate;

pub use builder::{PlanBuilder, Predicate};
pub use ops::{
    AggFunc, AggInput, AggItem, AggOp, AggSpec, ArithOp, CmpOp, ColFilterOp, DataFormat,
    GroupByOp, LimitOp, LineFilterOp, LineMatch, Operand, ParallelOp, ParseOp, PlanOp, SelectOp,
    SortOp, SourceOp, Workers,
};
pub use plan::QueryPlan;
pub use scalar::{format_float, Scalar};
pub use validate::validate;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_serialization() {
        let plan = PlanBuilder::source("users.json")
            .parse_json()
            .select(["name", "email"])
            .build()
            .unwrap();

        let json = serde_json::to_string(&plan).unwrap();
        let back: QueryPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(plan, back);
        assert_eq!(plan.structural_hash(), back.structural_hash());
    }

    #[test]
    fn test_select_order_changes_hash() {
        let a = PlanBuilder::source("u.json")
            .parse_json()
            .select(["name", "email"])
            .build()
            .unwrap();
        let b = PlanBuilder::source("u.json")
            .parse_json()
            .select(["email", "name"])
            .build()
            .unwrap();

        assert_ne!(a.structural_hash(), b.structural_hash());
    }
}
