//! GroupBy and Agg operators.
//!
//! GroupBy marks the grouping columns and must be immediately followed by
//! Agg, which defines the output columns.

use common_error::{SparkError, SparkResult};
use serde::{Deserialize, Serialize};

use crate::scalar::Scalar;

/// Supported aggregation functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggFunc {
    /// Count rows; the only function allowed over `*`.
    Count,
    /// Sum of numeric values.
    Sum,
    /// Average of numeric values.
    Avg,
    /// Minimum value per group.
    Min,
    /// Maximum value per group.
    Max,
    /// First value seen in input order.
    First,
    /// Last value seen in input order.
    Last,
    /// Count of unique values per group.
    CountDistinct,
}

impl AggFunc {
    /// Get the function name for display.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
            Self::First => "first",
            Self::Last => "last",
            Self::CountDistinct => "countdistinct",
        }
    }

    /// Parse a function name; `mean` is accepted as an alias for `avg`.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "count" => Self::Count,
            "sum" => Self::Sum,
            "avg" | "mean" => Self::Avg,
            "min" => Self::Min,
            "max" => Self::Max,
            "first" => Self::First,
            "last" => Self::Last,
            "countdistinct" => Self::CountDistinct,
            _ => return None,
        })
    }
}

/// Arithmetic operators allowed in aggregation inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
}

impl ArithOp {
    /// The operator symbol.
    pub const fn symbol(&self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
            Self::Div => '/',
        }
    }
}

/// One operand of an arithmetic aggregation input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    /// A column reference.
    Column(String),
    /// A numeric constant.
    Const(Scalar),
}

/// The input of a single aggregation.
///
/// Besides a plain column, a one-operator arithmetic expression is accepted:
/// `col op col` or `col op const` with `op` one of `+ - * /`. `Star` is
/// legal only under `count`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggInput {
    /// All rows (`count(*)`).
    Star,
    /// A single column.
    Column(String),
    /// A one-operator arithmetic expression over columns and constants.
    Arith {
        /// Left operand.
        lhs: Operand,
        /// Operator.
        op: ArithOp,
        /// Right operand.
        rhs: Operand,
    },
}

impl AggInput {
    /// Parse an aggregation input string.
    ///
    /// `*` is the star input; a string containing one of `+ - * /` is parsed
    /// as an arithmetic expression; anything else is a plain column name.
    pub fn parse(text: &str) -> SparkResult<Self> {
        let text = text.trim();
        if text == "*" {
            return Ok(Self::Star);
        }
        if text.is_empty() {
            return Err(SparkError::plan("aggregation input must not be empty"));
        }

        let mut op_pos = None;
        for (i, c) in text.char_indices() {
            if matches!(c, '+' | '-' | '*' | '/') && i > 0 {
                if op_pos.is_some() {
                    return Err(SparkError::plan(format!(
                        "aggregation input '{text}' contains more than one operator; \
                         only 'col', 'col op col' and 'col op const' are supported"
                    )));
                }
                op_pos = Some((i, c));
            }
        }

        let Some((pos, op_char)) = op_pos else {
            return Ok(Self::Column(text.to_string()));
        };

        let op = match op_char {
            '+' => ArithOp::Add,
            '-' => ArithOp::Sub,
            '*' => ArithOp::Mul,
            _ => ArithOp::Div,
        };
        let lhs = text[..pos].trim();
        let rhs = text[pos + 1..].trim();
        if lhs.is_empty() || rhs.is_empty() {
            return Err(SparkError::plan(format!(
                "aggregation input '{text}' is missing an operand around '{op_char}'"
            )));
        }

        Ok(Self::Arith {
            lhs: parse_operand(lhs),
            op,
            rhs: parse_operand(rhs),
        })
    }

    /// Columns referenced by this input.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Self::Star => Vec::new(),
            Self::Column(c) => vec![c.as_str()],
            Self::Arith { lhs, rhs, .. } => [lhs, rhs]
                .into_iter()
                .filter_map(|o| match o {
                    Operand::Column(c) => Some(c.as_str()),
                    Operand::Const(_) => None,
                })
                .collect(),
        }
    }
}

fn parse_operand(text: &str) -> Operand {
    if let Ok(i) = text.parse::<i64>() {
        return Operand::Const(Scalar::Int(i));
    }
    if let Ok(f) = text.parse::<f64>() {
        return Operand::Const(Scalar::Float(f));
    }
    Operand::Column(text.to_string())
}

impl std::fmt::Display for AggInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Star => write!(f, "*"),
            Self::Column(c) => write!(f, "{c}"),
            Self::Arith { lhs, op, rhs } => {
                let fmt_operand = |o: &Operand| match o {
                    Operand::Column(c) => c.clone(),
                    Operand::Const(s) => s.raw(),
                };
                write!(f, "{} {} {}", fmt_operand(lhs), op.symbol(), fmt_operand(rhs))
            }
        }
    }
}

/// An aggregation before it receives its output alias.
///
/// Helper constructors mirror the surface of the builder:
/// `AggSpec::sum("price * quantity")`, `AggSpec::count_star()`, ….
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggSpec {
    /// Aggregation function.
    pub func: AggFunc,
    /// Input column or arithmetic expression.
    pub input: AggInput,
}

impl AggSpec {
    /// Create an aggregation over a column or arithmetic expression.
    ///
    /// The input string is parsed by [`AggInput::parse`]; an invalid
    /// expression is reported when the plan is built.
    pub fn new(func: AggFunc, input: impl Into<String>) -> Self {
        let text = input.into();
        let input = AggInput::parse(&text).unwrap_or(AggInput::Column(text));
        Self { func, input }
    }

    /// `count(*)`.
    pub const fn count_star() -> Self {
        Self {
            func: AggFunc::Count,
            input: AggInput::Star,
        }
    }

    /// `count(col)`.
    pub fn count(column: impl Into<String>) -> Self {
        Self::new(AggFunc::Count, column)
    }

    /// `sum(col)`.
    pub fn sum(column: impl Into<String>) -> Self {
        Self::new(AggFunc::Sum, column)
    }

    /// `avg(col)`.
    pub fn avg(column: impl Into<String>) -> Self {
        Self::new(AggFunc::Avg, column)
    }

    /// `min(col)`.
    pub fn min(column: impl Into<String>) -> Self {
        Self::new(AggFunc::Min, column)
    }

    /// `max(col)`.
    pub fn max(column: impl Into<String>) -> Self {
        Self::new(AggFunc::Max, column)
    }

    /// `first(col)`.
    pub fn first(column: impl Into<String>) -> Self {
        Self::new(AggFunc::First, column)
    }

    /// `last(col)`.
    pub fn last(column: impl Into<String>) -> Self {
        Self::new(AggFunc::Last, column)
    }

    /// `countdistinct(col)`.
    pub fn count_distinct(column: impl Into<String>) -> Self {
        Self::new(AggFunc::CountDistinct, column)
    }

    /// The `(column, fn_name)` surface form: `("salary", "sum")`.
    ///
    /// Pure sugar over the named constructors; `mean` is accepted for
    /// `avg`.
    pub fn from_pair(column: impl Into<String>, fn_name: &str) -> SparkResult<Self> {
        let func = AggFunc::from_name(fn_name).ok_or_else(|| {
            SparkError::plan(format!("unknown aggregation function '{fn_name}'"))
        })?;
        Ok(Self::new(func, column))
    }
}

/// A single named output column of an Agg node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggItem {
    /// Output column alias.
    pub alias: String,
    /// Input column or arithmetic expression.
    pub input: AggInput,
    /// Aggregation function.
    pub func: AggFunc,
}

impl AggItem {
    /// Create an aggregation item from an alias and a spec.
    pub fn new(alias: impl Into<String>, spec: AggSpec) -> Self {
        Self {
            alias: alias.into(),
            input: spec.input,
            func: spec.func,
        }
    }
}

impl std::fmt::Display for AggItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}({})", self.alias, self.func.name(), self.input)
    }
}

/// GroupBy operator - marks the grouping columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupByOp {
    /// Grouping columns in declaration order.
    pub keys: Vec<String>,
}

impl GroupByOp {
    /// Create a group-by over the given columns.
    pub fn new(keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Display for GroupByOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GroupBy({})", self.keys.join(", "))
    }
}

/// Agg operator - defines the aggregated output columns.
///
/// Output columns are the group keys followed by the aggregation aliases in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggOp {
    /// Aggregations in declaration order.
    pub items: Vec<AggItem>,
}

impl AggOp {
    /// Create an agg node from items.
    pub const fn new(items: Vec<AggItem>) -> Self {
        Self { items }
    }

    /// All columns referenced by aggregation inputs, in first-reference order.
    pub fn input_columns(&self) -> Vec<&str> {
        let mut cols: Vec<&str> = Vec::new();
        for item in &self.items {
            for c in item.input.columns() {
                if !cols.contains(&c) {
                    cols.push(c);
                }
            }
        }
        cols
    }
}

impl std::fmt::Display for AggOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let items = self
            .items
            .iter()
            .map(std::string::ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "Agg({items})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_column() {
        assert_eq!(
            AggInput::parse("salary").unwrap(),
            AggInput::Column("salary".to_string())
        );
        assert_eq!(AggInput::parse("*").unwrap(), AggInput::Star);
    }

    #[test]
    fn test_parse_arithmetic() {
        let input = AggInput::parse("price * quantity").unwrap();
        assert_eq!(
            input,
            AggInput::Arith {
                lhs: Operand::Column("price".to_string()),
                op: ArithOp::Mul,
                rhs: Operand::Column("quantity".to_string()),
            }
        );
        assert_eq!(input.columns(), vec!["price", "quantity"]);
    }

    #[test]
    fn test_parse_column_op_const() {
        let input = AggInput::parse("total / 100").unwrap();
        assert_eq!(
            input,
            AggInput::Arith {
                lhs: Operand::Column("total".to_string()),
                op: ArithOp::Div,
                rhs: Operand::Const(Scalar::Int(100)),
            }
        );
    }

    #[test]
    fn test_parse_rejects_multiple_operators() {
        assert!(AggInput::parse("a + b + c").is_err());
        assert!(AggInput::parse("a *").is_err());
    }

    #[test]
    fn test_agg_input_columns_dedup() {
        let agg = AggOp::new(vec![
            AggItem::new("total", AggSpec::sum("price * quantity")),
            AggItem::new("avg_price", AggSpec::avg("price")),
        ]);
        assert_eq!(agg.input_columns(), vec!["price", "quantity"]);
    }

    #[test]
    fn test_func_aliases() {
        assert_eq!(AggFunc::from_name("avg"), Some(AggFunc::Avg));
        assert_eq!(AggFunc::from_name("mean"), Some(AggFunc::Avg));
        assert_eq!(AggFunc::from_name("median"), None);
    }
}
