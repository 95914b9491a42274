//! sort-family emitter: Sort, Distinct and Limit stages.

use std::path::Path;

use common_error::{SparkError, SparkResult};
use shellspark_plan::ops::{LimitOp, SortOp};
use shellspark_tools::SortTool;

use crate::fragment::Layout;
use crate::quote::sh_quote;

/// Host facts the sort emitter parameterizes on.
#[derive(Debug, Clone, Copy)]
pub struct SortContext<'a> {
    /// Resolved sort binary and capabilities.
    pub tool: &'a SortTool,
    /// Host CPU count, for `--parallel`.
    pub cpus: usize,
    /// Directory for `sort -T`.
    pub tmpdir: &'a Path,
}

impl SortContext<'_> {
    /// Flags shared by every sort invocation: GNU parallelism when the
    /// registry reports support, and always an explicit temp dir.
    fn common_flags(&self) -> SparkResult<String> {
        let mut flags = String::new();
        if self.tool.supports_parallel && self.cpus > 1 {
            flags.push_str(&format!(" --parallel={}", self.cpus));
            if self.tool.supports_buffer_size {
                flags.push_str(" -S 80%");
            }
        }
        flags.push_str(" -T ");
        flags.push_str(&sh_quote(&self.tmpdir.to_string_lossy())?);
        Ok(flags)
    }
}

/// Resolve a sort key to a 1-based field position under the given layout.
///
/// Named keys need a layout fixed at compile time (aggregation output,
/// projection or jq conversion); a bare numeric key is taken as a position.
pub fn resolve_key_index(layout: &Layout, key: &str) -> SparkResult<usize> {
    if let Some(columns) = layout.columns() {
        if let Some(pos) = columns.iter().position(|c| c == key) {
            return Ok(pos + 1);
        }
        if let Ok(n) = key.parse::<usize>() {
            if n >= 1 {
                return Ok(n);
            }
        }
        return Err(SparkError::plan(format!(
            "Sort: unknown column '{key}'; available columns: {}",
            columns.join(", ")
        )));
    }

    match key.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(SparkError::plan(format!(
            "Sort: column '{key}' cannot be resolved against an unfixed \
             layout; use a 1-based index or project the columns first"
        ))),
    }
}

/// Emit a sort stage.
pub fn sort_stage(
    ctx: SortContext<'_>,
    sort: &SortOp,
    layout: &Layout,
    file: Option<&str>,
) -> SparkResult<String> {
    let index = resolve_key_index(layout, &sort.key)?;

    let mut command = ctx.tool.path.display().to_string();
    if let Some(delim) = layout.delimiter() {
        command.push_str(" -t");
        command.push_str(&sh_quote(delim)?);
    }

    let mut key_spec = format!(" -k{index},{index}");
    if sort.descending {
        key_spec.push('r');
    }
    if sort.numeric {
        key_spec.push('n');
    }
    command.push_str(&key_spec);
    command.push_str(&ctx.common_flags()?);

    if let Some(file) = file {
        command.push(' ');
        command.push_str(file);
    }
    Ok(command)
}

/// Emit a distinct stage: `uniq` when the stream is already sorted,
/// otherwise `sort -u`.
pub fn distinct_stage(
    ctx: SortContext<'_>,
    after_sort: bool,
    file: Option<&str>,
) -> SparkResult<String> {
    if after_sort {
        let mut command = "uniq".to_string();
        if let Some(file) = file {
            command.push(' ');
            command.push_str(file);
        }
        return Ok(command);
    }

    let mut command = format!("{} -u{}", ctx.tool.path.display(), ctx.common_flags()?);
    if let Some(file) = file {
        command.push(' ');
        command.push_str(file);
    }
    Ok(command)
}

/// Emit a limit stage: `head -n <n>`, preceded by a `tail` skip when an
/// offset is present.
pub fn limit_stage(limit: &LimitOp, file: Option<&str>) -> String {
    if limit.offset > 0 {
        let mut tail = format!("tail -n +{}", limit.offset + 1);
        if let Some(file) = file {
            tail.push(' ');
            tail.push_str(file);
        }
        format!("{tail} | head -n {}", limit.n)
    } else {
        let mut command = format!("head -n {}", limit.n);
        if let Some(file) = file {
            command.push(' ');
            command.push_str(file);
        }
        command
    }
}
