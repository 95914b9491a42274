//! jq emitter for json parsing and the field-aware operations that follow.

use common_error::{SparkError, SparkResult};
use shellspark_plan::ops::{CmpOp, ColFilterOp, SelectOp};
use shellspark_plan::Scalar;
use shellspark_tools::JqTool;

use crate::fragment::Layout;
use crate::quote::sh_quote_always;

/// Emit one jq pipeline stage: filters become `select(…)` expressions and a
/// projection becomes an object constructor, concatenated with jq pipes
/// inside a single shell word. Output is compact, one record per line.
pub fn stage(
    tool: &JqTool,
    filters: &[&ColFilterOp],
    select: Option<&SelectOp>,
    file: Option<&str>,
) -> SparkResult<(String, Layout)> {
    let mut parts = Vec::new();
    for filter in filters {
        parts.push(format!("select({})", predicate(filter)?));
    }
    if let Some(select) = select {
        parts.push(projection(select));
    }

    let program = if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join(" | ")
    };

    let mut command = format!("{} -c {}", tool.path.display(), sh_quote_always(&program)?);
    if let Some(file) = file {
        command.push(' ');
        command.push_str(file);
    }

    let columns = select.map(|s| s.columns.clone());
    Ok((command, Layout::Ndjson { columns }))
}

/// Emit the json-to-tsv conversion stage feeding AWK or sort:
/// `jq -r '[.col1,.col2] | @tsv'`.
pub fn conversion(
    tool: &JqTool,
    columns: &[String],
    file: Option<&str>,
) -> SparkResult<(String, Layout)> {
    let refs: Vec<String> = columns.iter().map(|c| field_ref(c)).collect();
    let program = format!("[{}] | @tsv", refs.join(","));

    let mut command = format!("{} -r {}", tool.path.display(), sh_quote_always(&program)?);
    if let Some(file) = file {
        command.push(' ');
        command.push_str(file);
    }
    Ok((command, Layout::tsv(columns.to_vec())))
}

fn predicate(filter: &ColFilterOp) -> SparkResult<String> {
    let field = field_ref(&filter.column);
    let literal = jq_literal(&filter.value);
    let string_literal = || jq_literal(&Scalar::Str(filter.value.raw()));

    Ok(match filter.op {
        CmpOp::Eq => format!("{field} == {literal}"),
        CmpOp::Ne => format!("{field} != {literal}"),
        CmpOp::Lt => format!("{field} < {literal}"),
        CmpOp::Le => format!("{field} <= {literal}"),
        CmpOp::Gt => format!("{field} > {literal}"),
        CmpOp::Ge => format!("{field} >= {literal}"),
        CmpOp::Contains => format!("{field} | contains({})", string_literal()),
        CmpOp::Regex => format!("{field} | test({})", string_literal()),
        CmpOp::StartsWith => format!("{field} | startswith({})", string_literal()),
        CmpOp::EndsWith => format!("{field} | endswith({})", string_literal()),
    })
}

fn projection(select: &SelectOp) -> String {
    if select.columns.len() == 1 {
        return field_ref(&select.columns[0]);
    }

    let fields: Vec<String> = select
        .columns
        .iter()
        .map(|c| {
            if is_identifier(c) {
                c.clone()
            } else {
                format!("{}: {}", json_string(c), field_ref(c))
            }
        })
        .collect();
    format!("{{{}}}", fields.join(", "))
}

/// Convert a column name to a jq field path.
///
/// Dotted names address nested fields (`user.city` becomes `.user.city`);
/// a name that is not identifier-safe goes through bracket indexing.
fn field_ref(column: &str) -> String {
    if let Some(stripped) = column.strip_prefix('.') {
        if !stripped.is_empty() {
            return column.to_string();
        }
    }
    if column.split('.').all(is_identifier) && !column.is_empty() {
        return format!(".{column}");
    }
    format!(".[{}]", json_string(column))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn jq_literal(value: &Scalar) -> String {
    match value {
        Scalar::Str(s) => json_string(s),
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => serde_json::Number::from_f64(*f)
            .map(|n| n.to_string())
            .unwrap_or_else(|| "null".to_string()),
        Scalar::Bool(b) => b.to_string(),
    }
}

fn json_string(s: &str) -> String {
    serde_json::to_string(s).expect("strings always serialize")
}

/// Missing jq is fatal only once a plan actually parses json.
pub fn require(jq: Option<JqTool>) -> SparkResult<JqTool> {
    jq.ok_or_else(|| SparkError::unsupported("jq"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn tool() -> JqTool {
        JqTool {
            path: PathBuf::from("jq"),
        }
    }

    #[test]
    fn test_projection_only() {
        let select = SelectOp::new(["name", "email"]);
        let (cmd, layout) = stage(&tool(), &[], Some(&select), Some("users.json")).unwrap();
        assert_eq!(cmd, "jq -c '{name, email}' users.json");
        assert_eq!(
            layout.columns(),
            Some(&["name".to_string(), "email".to_string()][..])
        );
    }

    #[test]
    fn test_filter_then_projection() {
        let filter = ColFilterOp::new("status", CmpOp::Ge, 400);
        let select = SelectOp::new(["path", "status", "response_time"]);
        let (cmd, _) = stage(&tool(), &[&filter], Some(&select), Some("logs.json")).unwrap();
        assert_eq!(
            cmd,
            "jq -c 'select(.status >= 400) | {path, status, response_time}' logs.json"
        );
    }

    #[test]
    fn test_identity_program() {
        let (cmd, _) = stage(&tool(), &[], None, None).unwrap();
        assert_eq!(cmd, "jq -c '.'");
    }

    #[test]
    fn test_string_operators() {
        let contains = ColFilterOp::new("path", CmpOp::Contains, "/api/");
        let (cmd, _) = stage(&tool(), &[&contains], None, None).unwrap();
        assert_eq!(cmd, r#"jq -c 'select(.path | contains("/api/"))'"#);

        let regex = ColFilterOp::new("ua", CmpOp::Regex, "bot|crawler");
        let (cmd, _) = stage(&tool(), &[&regex], None, None).unwrap();
        assert!(cmd.contains(r#".ua | test("bot|crawler")"#));
    }

    #[test]
    fn test_nested_field_access() {
        assert_eq!(field_ref("user.city"), ".user.city");
        assert_eq!(field_ref(".already.a.path"), ".already.a.path");
        assert_eq!(field_ref("weird name"), r#".["weird name"]"#);
    }

    #[test]
    fn test_hostile_value_stays_json_encoded() {
        let filter = ColFilterOp::new("msg", CmpOp::Eq, "a\"b'c$d");
        let (cmd, _) = stage(&tool(), &[&filter], None, None).unwrap();
        // The value is JSON-encoded inside the program and the program is a
        // single quoted shell word.
        assert!(cmd.contains(r#"select(.msg == "a\"b'c$d")"#.replace("'", r"'\''").as_str()));
    }

    #[test]
    fn test_conversion_fragment() {
        let cols = vec!["region".to_string(), "price".to_string()];
        let (cmd, layout) = conversion(&tool(), &cols, None).unwrap();
        assert_eq!(cmd, "jq -r '[.region,.price] | @tsv'");
        assert_eq!(layout, Layout::tsv(cols));
    }
}
