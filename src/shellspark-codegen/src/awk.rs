//! AWK emitter: csv/text parsing, column filters, projection and
//! grouped aggregation, fused into a single invocation.

use common_error::{SparkError, SparkResult};
use shellspark_plan::ops::{
    AggFunc, AggInput, AggOp, CmpOp, ColFilterOp, GroupByOp, Operand, SelectOp,
};
use shellspark_plan::Scalar;
use shellspark_tools::AwkTool;

use crate::fragment::Layout;
use crate::quote::{escape_awk_regex, escape_awk_string, sh_quote, sh_quote_always};

/// AWK code that reads the first csv record into the `h` column-name table
/// and skips it.
const HEADER_MAP_CODE: &str = "NR==1{for(i=1;i<=NF;i++)h[$i]=i; next}";

/// How column references resolve to AWK field expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMode {
    /// Header-bearing csv: names resolve through the runtime `h` table.
    HeaderCsv {
        /// Field delimiter.
        delimiter: String,
    },
    /// Positional input with no known names: only 1-based indices resolve.
    Indexed {
        /// Field delimiter; `None` means default whitespace splitting.
        delimiter: Option<String>,
    },
    /// A layout fixed at compile time: names resolve to their position.
    Positional {
        /// Field delimiter.
        delimiter: String,
        /// Column names by position.
        columns: Vec<String>,
    },
}

impl FieldMode {
    /// Field separator passed via `-F`, if any.
    pub fn field_separator(&self) -> Option<&str> {
        match self {
            Self::HeaderCsv { delimiter } | Self::Positional { delimiter, .. } => Some(delimiter),
            Self::Indexed { delimiter } => delimiter.as_deref(),
        }
    }

    /// Header-skip code, when the first record is a header.
    fn header_code(&self) -> Option<&'static str> {
        matches!(self, Self::HeaderCsv { .. }).then_some(HEADER_MAP_CODE)
    }

    /// Resolve a column reference to an AWK field expression.
    pub fn field_ref(&self, column: &str) -> SparkResult<String> {
        match self {
            Self::HeaderCsv { .. } => Ok(format!("$h[\"{}\"]", escape_awk_string(column))),
            Self::Indexed { .. } => match column.parse::<u64>() {
                Ok(n) if n >= 1 => Ok(format!("${n}")),
                _ => Err(SparkError::plan(format!(
                    "column '{column}' cannot be resolved without a header; \
                     use a 1-based index"
                ))),
            },
            Self::Positional { columns, .. } => {
                if let Some(pos) = columns.iter().position(|c| c == column) {
                    Ok(format!("${}", pos + 1))
                } else if let Ok(n) = column.parse::<u64>() {
                    if n >= 1 {
                        return Ok(format!("${n}"));
                    }
                    Err(unknown_column(column, columns))
                } else {
                    Err(unknown_column(column, columns))
                }
            }
        }
    }

    /// Separator used when printing multiple fields.
    fn output_separator(&self) -> Option<&str> {
        self.field_separator()
    }
}

fn unknown_column(column: &str, columns: &[String]) -> SparkError {
    SparkError::plan(format!(
        "unknown column '{column}'; available columns: {}",
        columns.join(", ")
    ))
}

/// A contiguous run of AWK-amenable operators consumed in one pass.
#[derive(Debug, Default)]
pub struct AwkRun<'a> {
    /// Column filters, fused into one conjunctive predicate.
    pub filters: Vec<&'a ColFilterOp>,
    /// Projection, ignored when an aggregation is present.
    pub select: Option<&'a SelectOp>,
    /// Grouped aggregation.
    pub group: Option<(&'a GroupByOp, &'a AggOp)>,
}

impl AwkRun<'_> {
    /// Whether the run produces any work beyond passing lines through.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.select.is_none() && self.group.is_none()
    }
}

/// Emit one AWK pipeline stage for a run of operators.
///
/// Returns the stage command and the layout of its output stream.
pub fn emit(
    tool: &AwkTool,
    mode: &FieldMode,
    run: &AwkRun<'_>,
    file: Option<&str>,
) -> SparkResult<(String, Layout)> {
    let mut parts = Vec::new();
    if let Some(header) = mode.header_code() {
        parts.push(header.to_string());
    }

    let conditions = run
        .filters
        .iter()
        .map(|f| condition(mode, f))
        .collect::<SparkResult<Vec<_>>>()?;

    let output_layout;
    if let Some((group_by, agg)) = run.group {
        let (body, end) = aggregation_blocks(mode, group_by, agg)?;
        if conditions.is_empty() {
            parts.push(body);
        } else {
            parts.push(format!("{}{body}", conditions.join(" && ")));
        }
        parts.push(end);

        let sep = mode.output_separator().unwrap_or(",").to_string();
        let mut columns = group_by.keys.clone();
        columns.extend(agg.items.iter().map(|item| item.alias.clone()));
        output_layout = Layout::Delimited {
            delimiter: Some(sep),
            columns: Some(columns),
        };
    } else {
        let action = match run.select {
            None => "print".to_string(),
            Some(select) => {
                let refs = select
                    .columns
                    .iter()
                    .map(|c| mode.field_ref(c))
                    .collect::<SparkResult<Vec<_>>>()?;
                let sep = mode.output_separator().unwrap_or(" ");
                let sep_str = format!("\"{}\"", escape_awk_string(sep));
                format!("print {}", refs.join(&sep_str))
            }
        };
        if conditions.is_empty() {
            parts.push(format!("{{{action}}}"));
        } else {
            parts.push(format!("{}{{{action}}}", conditions.join(" && ")));
        }

        output_layout = match run.select {
            Some(select) => Layout::Delimited {
                delimiter: mode
                    .output_separator()
                    .map(std::string::ToString::to_string),
                columns: Some(select.columns.clone()),
            },
            None => Layout::Delimited {
                delimiter: mode.field_separator().map(std::string::ToString::to_string),
                columns: match mode {
                    FieldMode::Positional { columns, .. } => Some(columns.clone()),
                    _ => None,
                },
            },
        };
    }

    let script = parts.join(" ");
    let mut command = tool.path.display().to_string();
    if let Some(fs) = mode.field_separator() {
        command.push_str(" -F");
        command.push_str(&sh_quote(fs)?);
    }
    command.push(' ');
    command.push_str(&sh_quote_always(&script)?);
    if let Some(file) = file {
        command.push(' ');
        command.push_str(file);
    }

    Ok((command, output_layout))
}

/// Render a column filter as an AWK boolean expression.
fn condition(mode: &FieldMode, filter: &ColFilterOp) -> SparkResult<String> {
    let field = mode.field_ref(&filter.column)?;
    let string_value = || format!("\"{}\"", escape_awk_string(&filter.value.raw()));
    let value = match &filter.value {
        Scalar::Int(_) | Scalar::Float(_) => filter.value.raw(),
        Scalar::Str(_) | Scalar::Bool(_) => string_value(),
    };

    Ok(match filter.op {
        CmpOp::Eq => format!("{field}=={value}"),
        CmpOp::Ne => format!("{field}!={value}"),
        CmpOp::Lt => format!("{field}<{value}"),
        CmpOp::Le => format!("{field}<={value}"),
        CmpOp::Gt => format!("{field}>{value}"),
        CmpOp::Ge => format!("{field}>={value}"),
        CmpOp::Contains => format!("index({field},{})>0", string_value()),
        CmpOp::StartsWith => format!("index({field},{})==1", string_value()),
        CmpOp::EndsWith => {
            let v = string_value();
            format!("substr({field},length({field})-length({v})+1)=={v}")
        }
        CmpOp::Regex => format!("{field}~/{}/", escape_awk_regex(&filter.value.raw())),
    })
}

/// Render the aggregation input as an AWK value expression.
fn agg_value(mode: &FieldMode, input: &AggInput) -> SparkResult<Option<String>> {
    Ok(match input {
        AggInput::Star => None,
        AggInput::Column(c) => Some(mode.field_ref(c)?),
        AggInput::Arith { lhs, op, rhs } => {
            let operand = |o: &Operand| -> SparkResult<String> {
                match o {
                    Operand::Column(c) => mode.field_ref(c),
                    Operand::Const(s) => Ok(s.raw()),
                }
            };
            Some(format!(
                "({}{}{})",
                operand(lhs)?,
                op.symbol(),
                operand(rhs)?
            ))
        }
    })
}

/// Build the per-record accumulation block and the END block for a grouped
/// aggregation.
fn aggregation_blocks(
    mode: &FieldMode,
    group_by: &GroupByOp,
    agg: &AggOp,
) -> SparkResult<(String, String)> {
    let key_refs = group_by
        .keys
        .iter()
        .map(|k| mode.field_ref(k))
        .collect::<SparkResult<Vec<_>>>()?;
    let key_expr = if key_refs.len() == 1 {
        key_refs[0].clone()
    } else {
        format!("({})", key_refs.join(" SUBSEP "))
    };

    let mut accum = vec![format!("key={key_expr}")];
    for item in &agg.items {
        let name = sanitize(&item.alias);
        let value = agg_value(mode, &item.input)?;
        match item.func {
            AggFunc::Count => accum.push(format!("_count_{name}[key]++")),
            AggFunc::Sum => accum.push(format!(
                "_sum_{name}[key]+={}",
                value.as_deref().expect("sum input always has a value")
            )),
            AggFunc::Avg => {
                let v = value.as_deref().expect("avg input always has a value");
                accum.push(format!("_sum_{name}[key]+={v}"));
                accum.push(format!("_cnt_{name}[key]++"));
            }
            AggFunc::Min | AggFunc::Max => {
                let v = value.as_deref().expect("min/max input always has a value");
                let arr = if item.func == AggFunc::Min {
                    format!("_min_{name}")
                } else {
                    format!("_max_{name}")
                };
                let cmp = if item.func == AggFunc::Min { "<" } else { ">" };
                accum.push(format!(
                    "if(!_seen_{name}[key]||{v}{cmp}{arr}[key]){{{arr}[key]={v};_seen_{name}[key]=1}}"
                ));
            }
            AggFunc::First => {
                let v = value.as_deref().expect("first input always has a value");
                accum.push(format!(
                    "if(!_seen_{name}[key]){{_first_{name}[key]={v};_seen_{name}[key]=1}}"
                ));
            }
            AggFunc::Last => accum.push(format!(
                "_last_{name}[key]={}",
                value.as_deref().expect("last input always has a value")
            )),
            AggFunc::CountDistinct => accum.push(format!(
                "_cd_{name}[key,{}]=1",
                value
                    .as_deref()
                    .expect("countdistinct input always has a value")
            )),
        }
    }
    accum.push("_keys[key]=1".to_string());
    let body = format!("{{{}}}", accum.join("; "));

    // END block: one record per group, keys then aliases in declaration
    // order, split back out of SUBSEP for composite keys.
    let mut end_stmts = Vec::new();
    let mut outputs = Vec::new();
    if group_by.keys.len() > 1 {
        end_stmts.push("split(k,_parts,SUBSEP)".to_string());
        outputs.extend((1..=group_by.keys.len()).map(|i| format!("_parts[{i}]")));
    } else {
        outputs.push("k".to_string());
    }

    for item in &agg.items {
        let name = sanitize(&item.alias);
        match item.func {
            AggFunc::Count => outputs.push(format!("_count_{name}[k]")),
            AggFunc::Sum => outputs.push(format!("_sum_{name}[k]")),
            AggFunc::Avg => outputs.push(format!("_sum_{name}[k]/_cnt_{name}[k]")),
            AggFunc::Min => outputs.push(format!("_min_{name}[k]")),
            AggFunc::Max => outputs.push(format!("_max_{name}[k]")),
            AggFunc::First => outputs.push(format!("_first_{name}[k]")),
            AggFunc::Last => outputs.push(format!("_last_{name}[k]")),
            AggFunc::CountDistinct => {
                // The _cd array is keyed (group, value); count entries whose
                // group half matches the key being printed.
                end_stmts.push(format!("_cdc_{name}=0"));
                end_stmts.push(format!(
                    "for(_cdkey in _cd_{name}){{split(_cdkey,_cdparts,SUBSEP);\
                     if(_cdparts[1]==k)_cdc_{name}++}}"
                ));
                outputs.push(format!("_cdc_{name}"));
            }
        }
    }

    let sep = mode.output_separator().unwrap_or(",");
    let sep_str = format!("\"{}\"", escape_awk_string(sep));
    end_stmts.push(format!("print {}", outputs.join(&sep_str)));

    let end = format!("END{{for(k in _keys){{{}}}}}", end_stmts.join("; "));
    Ok((body, end))
}

/// Make a name safe for use as part of an AWK variable name.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
