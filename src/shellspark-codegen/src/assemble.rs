//! Pipeline assembler: walks the optimized plan leaf-to-root, delegates
//! contiguous runs to the emitters and joins the fragments with pipes.

use std::path::PathBuf;

use common_error::{SparkError, SparkResult};
use shellspark_plan::ops::{DataFormat, PlanOp, SourceOp, Workers};
use shellspark_plan::QueryPlan;
use shellspark_tools::ToolRegistry;
use tracing::debug;

use crate::awk::{self, AwkRun, FieldMode};
use crate::fragment::{Fragment, Layout};
use crate::grep;
use crate::jq;
use crate::quote::{is_plain_glob, sh_quote, sh_quote_always};
use crate::sortcmd::{self, SortContext};

/// How the input file reaches the first pipeline stage.
enum SourceArg {
    /// Appended as an argument to the first command.
    Inline(String),
    /// A `find … -print0 | xargs -0 [-PN]` wrapper that runs the first
    /// command once per matched file.
    Wrapper(String),
}

/// Walks a validated, optimized plan and produces the full command line.
pub struct Assembler<'a> {
    registry: &'a ToolRegistry,
}

impl<'a> Assembler<'a> {
    /// Create an assembler over a tool registry.
    pub const fn new(registry: &'a ToolRegistry) -> Self {
        Self { registry }
    }

    /// Assemble the complete shell command for a plan.
    pub fn assemble(&self, plan: &QueryPlan) -> SparkResult<String> {
        let mut chain: Vec<&PlanOp> = plan.root().chain().collect();
        chain.reverse();

        let source = match chain.first().copied() {
            Some(PlanOp::Source(source)) => source,
            _ => return Err(SparkError::plan("plan has no Source leaf")),
        };

        let parallel = chain.iter().copied().find_map(|op| match op {
            PlanOp::Parallel { parallel, .. } => Some(parallel),
            _ => None,
        });
        if parallel.is_some() {
            if let Some(bad) = chain.iter().copied().find(|op| op.is_global_state()) {
                return Err(SparkError::plan(format!(
                    "Parallel cannot be combined with {}: it requires global \
                     state across all input files",
                    bad.name()
                )));
            }
        }

        let ops: Vec<&PlanOp> = chain
            .into_iter()
            .filter(|op| !matches!(op, PlanOp::Source(_) | PlanOp::Parallel { .. }))
            .collect();

        let source_arg = if let Some(parallel) = parallel {
            let workers = match parallel.workers {
                Workers::Auto => self.registry.cpu_count(),
                Workers::Fixed(n) => n.get() as usize,
            };
            SourceArg::Wrapper(find_xargs_prefix(source, Some(workers))?)
        } else if source.is_glob {
            if is_plain_glob(&source.pattern) {
                SourceArg::Inline(source.pattern.clone())
            } else {
                SourceArg::Wrapper(find_xargs_prefix(source, None)?)
            }
        } else {
            SourceArg::Inline(sh_quote(&source.pattern)?)
        };
        let inline_file = match &source_arg {
            SourceArg::Inline(file) => Some(file.clone()),
            SourceArg::Wrapper(_) => None,
        };

        let tmpdir: PathBuf = self.registry.config().sort_tmpdir();
        let mut stages: Vec<Fragment> = Vec::new();
        let mut layout = Layout::Raw;
        let mut after_sort = false;

        let mut i = 0;
        while i < ops.len() {
            // The raw file (or glob) rides on the first emitted command.
            let mut file = if stages.is_empty() {
                inline_file.clone()
            } else {
                None
            };

            match ops[i] {
                PlanOp::LineFilter { filter, .. } => {
                    let tool = self.registry.resolve_grep()?;
                    let command = grep::stage(&tool, filter, file.take().as_deref())?;
                    stages.push(Fragment::new(command, layout.clone(), layout.clone()));
                    after_sort = false;
                    i += 1;
                }

                PlanOp::Parse { parse, .. } => match parse.format {
                    DataFormat::Json => {
                        let tool = jq::require(self.registry.resolve_jq())?;
                        let (filters, select, next) = collect_jq_run(&ops, i + 1);
                        let (command, output) =
                            jq::stage(&tool, &filters, select, file.take().as_deref())?;
                        stages.push(Fragment::new(command, layout.clone(), output.clone()));
                        layout = output;
                        after_sort = false;
                        i = next;
                    }
                    DataFormat::Csv | DataFormat::Text => {
                        let mode = match parse.format {
                            DataFormat::Csv if parse.has_header => FieldMode::HeaderCsv {
                                delimiter: parse.delimiter.clone(),
                            },
                            DataFormat::Csv => FieldMode::Indexed {
                                delimiter: Some(parse.delimiter.clone()),
                            },
                            _ => FieldMode::Indexed { delimiter: None },
                        };
                        let (run, next) = collect_awk_run(&ops, i + 1)?;

                        if run.is_empty() && !matches!(mode, FieldMode::HeaderCsv { .. }) {
                            // Nothing to compute and no header to skip.
                            layout = Layout::Delimited {
                                delimiter: mode
                                    .field_separator()
                                    .map(std::string::ToString::to_string),
                                columns: None,
                            };
                        } else {
                            let tool = self.registry.resolve_awk()?;
                            let (command, output) =
                                awk::emit(&tool, &mode, &run, file.take().as_deref())?;
                            stages.push(Fragment::new(command, layout.clone(), output.clone()));
                            layout = output;
                            after_sort = false;
                        }
                        i = next;
                    }
                },

                PlanOp::ColFilter { .. } | PlanOp::Select { .. } | PlanOp::GroupBy { .. } => {
                    i = self.field_stage(&ops, i, &mut stages, &mut layout, file.take())?;
                    after_sort = false;
                }

                PlanOp::Agg { .. } => {
                    // Validation keeps Agg glued to its GroupBy, which the
                    // GroupBy arm consumes together with it.
                    return Err(SparkError::plan("Agg must immediately follow GroupBy"));
                }

                PlanOp::Sort { sort, .. } => {
                    if let Layout::Ndjson { columns } = &layout {
                        let Some(cols) = columns.clone() else {
                            return Err(SparkError::plan(
                                "Sort on json records requires a prior Select to \
                                 fix the column layout",
                            ));
                        };
                        let tool = jq::require(self.registry.resolve_jq())?;
                        let (command, output) =
                            jq::conversion(&tool, &cols, file.take().as_deref())?;
                        stages.push(Fragment::new(command, layout.clone(), output.clone()));
                        layout = output;
                    }

                    let tool = self.registry.resolve_sort()?;
                    let ctx = SortContext {
                        tool: &tool,
                        cpus: self.registry.cpu_count(),
                        tmpdir: &tmpdir,
                    };
                    let command = sortcmd::sort_stage(ctx, sort, &layout, file.take().as_deref())?;
                    stages.push(Fragment::new(command, layout.clone(), layout.clone()));
                    after_sort = true;
                    i += 1;
                }

                PlanOp::Distinct { .. } => {
                    let tool = self.registry.resolve_sort()?;
                    let ctx = SortContext {
                        tool: &tool,
                        cpus: self.registry.cpu_count(),
                        tmpdir: &tmpdir,
                    };
                    let command =
                        sortcmd::distinct_stage(ctx, after_sort, file.take().as_deref())?;
                    stages.push(Fragment::new(command, layout.clone(), layout.clone()));
                    after_sort = true;
                    i += 1;
                }

                PlanOp::Limit { limit, .. } => {
                    let command = sortcmd::limit_stage(limit, file.take().as_deref());
                    stages.push(Fragment::new(command, layout.clone(), layout.clone()));
                    i += 1;
                }

                PlanOp::Source(_) | PlanOp::Parallel { .. } => i += 1,
            }
        }

        let mut commands: Vec<String> = stages.into_iter().map(|f| f.command).collect();
        if commands.is_empty() {
            // A bare Source still has to produce the stream.
            commands.push(match &inline_file {
                Some(file) => format!("cat {file}"),
                None => "cat".to_string(),
            });
        }

        if let SourceArg::Wrapper(prefix) = source_arg {
            commands[0] = format!("{prefix} {}", commands[0]);
        }

        let command = commands.join(" | ");
        debug!(stages = commands.len(), "assembled pipeline");
        Ok(command)
    }

    /// Emit a stage for field-aware operators that are not adjacent to
    /// their Parse: after aggregation output, a projection, or a jq
    /// conversion.
    fn field_stage(
        &self,
        ops: &[&PlanOp],
        i: usize,
        stages: &mut Vec<Fragment>,
        layout: &mut Layout,
        mut file: Option<String>,
    ) -> SparkResult<usize> {
        match layout.clone() {
            Layout::Ndjson { columns } => {
                if matches!(ops[i], PlanOp::GroupBy { .. }) {
                    // Aggregation is AWK's job; bridge with a @tsv
                    // conversion carrying exactly the referenced columns.
                    let (run, next) = collect_awk_run(ops, i)?;
                    let needed = conversion_columns(&run);
                    if let Some(have) = &columns {
                        for column in &needed {
                            if !have.contains(column) {
                                return Err(SparkError::plan(format!(
                                    "GroupBy: unknown column '{column}' after \
                                     projection; available columns: {}",
                                    have.join(", ")
                                )));
                            }
                        }
                    }

                    let tool = jq::require(self.registry.resolve_jq())?;
                    let (command, converted) =
                        jq::conversion(&tool, &needed, file.take().as_deref())?;
                    stages.push(Fragment::new(command, layout.clone(), converted.clone()));

                    let mode = FieldMode::Positional {
                        delimiter: "\t".to_string(),
                        columns: needed,
                    };
                    let awk_tool = self.registry.resolve_awk()?;
                    let (command, output) = awk::emit(&awk_tool, &mode, &run, None)?;
                    stages.push(Fragment::new(command, converted, output.clone()));
                    *layout = output;
                    Ok(next)
                } else {
                    let tool = jq::require(self.registry.resolve_jq())?;
                    let (filters, select, next) = collect_jq_run(ops, i);
                    let (command, output) =
                        jq::stage(&tool, &filters, select, file.take().as_deref())?;
                    // A filter-only stage keeps the upstream projection.
                    let output = match output {
                        Layout::Ndjson { columns: None } => Layout::Ndjson { columns },
                        other => other,
                    };
                    stages.push(Fragment::new(command, layout.clone(), output.clone()));
                    *layout = output;
                    Ok(next)
                }
            }

            Layout::Delimited { delimiter, columns } => {
                let Some(columns) = columns else {
                    return Err(SparkError::plan(format!(
                        "{}: columns cannot be resolved without a fixed \
                         layout; aggregate or project the stream first",
                        ops[i].name()
                    )));
                };
                let mode = FieldMode::Positional {
                    delimiter: delimiter.unwrap_or_else(|| " ".to_string()),
                    columns,
                };
                let (run, next) = collect_awk_run(ops, i)?;
                let tool = self.registry.resolve_awk()?;
                let (command, output) = awk::emit(&tool, &mode, &run, file.take().as_deref())?;
                stages.push(Fragment::new(command, layout.clone(), output.clone()));
                *layout = output;
                Ok(next)
            }

            Layout::Raw => Err(SparkError::plan(format!(
                "{} requires a preceding Parse node",
                ops[i].name()
            ))),
        }
    }
}

/// Collect a contiguous jq-amenable run: filters up to an optional
/// projection. A filter following the projection starts a fresh stage so it
/// sees the projected records.
fn collect_jq_run<'a>(
    ops: &[&'a PlanOp],
    start: usize,
) -> (
    Vec<&'a shellspark_plan::ops::ColFilterOp>,
    Option<&'a shellspark_plan::ops::SelectOp>,
    usize,
) {
    let mut filters = Vec::new();
    let mut select = None;
    let mut j = start;
    while j < ops.len() {
        match ops[j] {
            PlanOp::ColFilter { filter, .. } if select.is_none() => filters.push(filter),
            PlanOp::Select { select: s, .. } if select.is_none() => select = Some(s),
            _ => break,
        }
        j += 1;
    }
    (filters, select, j)
}

/// Collect a contiguous AWK-amenable run: filters, an optional projection
/// and at most one GroupBy+Agg pair, which ends the run.
fn collect_awk_run<'a>(ops: &[&'a PlanOp], start: usize) -> SparkResult<(AwkRun<'a>, usize)> {
    let mut run = AwkRun::default();
    let mut j = start;
    while j < ops.len() {
        match ops[j] {
            PlanOp::ColFilter { filter, .. } if run.select.is_none() => run.filters.push(filter),
            PlanOp::Select { select, .. } if run.select.is_none() => run.select = Some(select),
            PlanOp::GroupBy { group_by, .. } => {
                let Some(PlanOp::Agg { agg, .. }) = ops.get(j + 1) else {
                    return Err(SparkError::plan("GroupBy must be immediately followed by Agg"));
                };
                run.group = Some((group_by, agg));
                return Ok((run, j + 2));
            }
            _ => break,
        }
        j += 1;
    }
    Ok((run, j))
}

/// Columns a json stream must carry into the tsv conversion: group keys,
/// then aggregation inputs, in first-reference order.
fn conversion_columns(run: &AwkRun<'_>) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    if let Some((group_by, agg)) = run.group {
        for key in &group_by.keys {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
        for column in agg.input_columns() {
            if !columns.iter().any(|c| c == column) {
                columns.push(column.to_string());
            }
        }
    }
    columns
}

/// Build the `find <dir> -name '<glob>' -print0 | xargs -0 [-PN]` prefix.
fn find_xargs_prefix(source: &SourceOp, workers: Option<usize>) -> SparkResult<String> {
    let (dir, name) = match source.pattern.rsplit_once('/') {
        Some((dir, name)) if !dir.is_empty() => (dir, name),
        _ => (".", source.pattern.as_str()),
    };

    let mut prefix = format!(
        "find {} -name {} -print0 | xargs -0",
        sh_quote(dir)?,
        sh_quote_always(name)?
    );
    if let Some(workers) = workers {
        prefix.push_str(&format!(" -P{workers}"));
    }
    Ok(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellspark_plan::{AggSpec, CmpOp, LineMatch, PlanBuilder, Predicate, SortOp, Workers};
    use shellspark_tools::{
        AwkTool, AwkVariant, GrepTool, GrepVariant, JqTool, ResolvedTools, SortTool, ToolConfig,
    };
    use std::path::PathBuf;

    fn registry() -> ToolRegistry {
        ToolRegistry::from_resolved(
            ToolConfig::default(),
            ResolvedTools {
                awk: Some(AwkTool {
                    path: PathBuf::from("awk"),
                    variant: AwkVariant::Mawk,
                }),
                grep: Some(GrepTool {
                    path: PathBuf::from("rg"),
                    variant: GrepVariant::Rg,
                    supports_fixed_strings: true,
                    supports_extended_regex: true,
                }),
                sort: Some(SortTool {
                    path: PathBuf::from("sort"),
                    supports_parallel: false,
                    supports_buffer_size: false,
                }),
                jq: Some(JqTool {
                    path: PathBuf::from("jq"),
                }),
                cpus: 4,
            },
        )
    }

    fn assemble(plan: shellspark_plan::QueryPlan) -> SparkResult<String> {
        let registry = registry();
        Assembler::new(&registry).assemble(&plan)
    }

    #[test]
    fn test_single_grep_stage_with_file_argument() {
        let plan = PlanBuilder::source("app.log")
            .filter(Predicate::line(LineMatch::Contains, "ERROR"))
            .build()
            .unwrap();
        assert_eq!(
            assemble(plan).unwrap(),
            "rg -F --no-filename 'ERROR' app.log"
        );
    }

    #[test]
    fn test_glob_retained_as_argument() {
        let plan = PlanBuilder::source("logs/*.log")
            .filter(Predicate::line(LineMatch::Contains, "ERROR"))
            .build()
            .unwrap();
        assert_eq!(
            assemble(plan).unwrap(),
            "rg -F --no-filename 'ERROR' logs/*.log"
        );
    }

    #[test]
    fn test_hostile_glob_falls_back_to_find() {
        let plan = PlanBuilder::source("my logs/*.log")
            .filter(Predicate::line(LineMatch::Contains, "ERROR"))
            .build()
            .unwrap();
        assert_eq!(
            assemble(plan).unwrap(),
            "find 'my logs' -name '*.log' -print0 | xargs -0 rg -F --no-filename 'ERROR'"
        );
    }

    #[test]
    fn test_json_projection() {
        let plan = PlanBuilder::source("users.json")
            .parse_json()
            .select(["name", "email"])
            .build()
            .unwrap();
        assert_eq!(assemble(plan).unwrap(), "jq -c '{name, email}' users.json");
    }

    #[test]
    fn test_csv_aggregation_then_sort() {
        let plan = PlanBuilder::source("sales.csv")
            .parse_csv(true)
            .filter(Predicate::column("quantity", CmpOp::Gt, 0))
            .group_by(["region"])
            .agg([("total_revenue", AggSpec::sum("price * quantity"))])
            .sort(SortOp::desc("total_revenue").numeric())
            .build()
            .unwrap();

        let cmd = assemble(plan).unwrap();
        let (awk_part, sort_part) = cmd.split_once(" | ").unwrap();
        assert!(awk_part.starts_with("awk -F, '"));
        assert!(awk_part.contains("NR==1{for(i=1;i<=NF;i++)h[$i]=i; next}"));
        assert!(awk_part.contains("$h[\"quantity\"]>0"));
        assert!(awk_part.contains("_sum_total_revenue[key]+=($h[\"price\"]*$h[\"quantity\"])"));
        assert!(awk_part.ends_with("' sales.csv"));
        assert_eq!(sort_part, "sort -t, -k2,2rn -T /tmp");
    }

    #[test]
    fn test_parallel_json_filtering() {
        let plan = PlanBuilder::source("logs/*.json")
            .parse_json()
            .filter(Predicate::column("status", CmpOp::Ge, 400))
            .parallel(Workers::fixed(8).unwrap())
            .build()
            .unwrap();

        assert_eq!(
            assemble(plan).unwrap(),
            "find logs -name '*.json' -print0 | xargs -0 -P8 jq -c 'select(.status >= 400)'"
        );
    }

    #[test]
    fn test_parallel_auto_uses_cpu_count() {
        let plan = PlanBuilder::source("logs/*.json")
            .parse_json()
            .parallel(Workers::Auto)
            .build()
            .unwrap();

        let cmd = assemble(plan).unwrap();
        assert!(cmd.contains("xargs -0 -P4 "));
    }

    #[test]
    fn test_parallel_rejects_global_state() {
        for plan in [
            PlanBuilder::source("logs/*.json")
                .parse_json()
                .sort(SortOp::asc("status"))
                .parallel(Workers::fixed(8).unwrap())
                .build()
                .unwrap(),
            PlanBuilder::source("logs/*.json")
                .parse_json()
                .limit(10)
                .parallel(Workers::Auto)
                .build()
                .unwrap(),
            PlanBuilder::source("logs/*.json")
                .distinct()
                .parallel(Workers::Auto)
                .build()
                .unwrap(),
        ] {
            let err = assemble(plan).unwrap_err();
            assert!(err.to_string().contains("Parallel"), "{err}");
        }
    }

    #[test]
    fn test_sort_on_json_inserts_conversion() {
        let plan = PlanBuilder::source("logs.json")
            .parse_json()
            .select(["status", "path"])
            .sort(SortOp::desc("status").numeric())
            .build()
            .unwrap();

        let cmd = assemble(plan).unwrap();
        assert_eq!(
            cmd,
            "jq -c '{status, path}' logs.json | jq -r '[.status,.path] | @tsv' | \
             sort -t'\t' -k1,1rn -T /tmp"
        );
    }

    #[test]
    fn test_json_group_by_bridges_through_tsv() {
        let plan = PlanBuilder::source("logs.json")
            .parse_json()
            .group_by(["path"])
            .agg([("hits", AggSpec::count_star())])
            .build()
            .unwrap();

        let cmd = assemble(plan).unwrap();
        let stages: Vec<&str> = cmd.split(" | ").collect();
        assert_eq!(stages[0], "jq -c '.' logs.json");
        assert_eq!(stages[1], "jq -r '[.path] | @tsv'");
        assert!(stages[2].starts_with("awk -F'\t' '"));
        assert!(stages[2].contains("_count_hits[key]++"));
    }

    #[test]
    fn test_distinct_after_sort_uses_uniq() {
        let plan = PlanBuilder::source("data.txt")
            .sort(SortOp::asc("1"))
            .distinct()
            .build()
            .unwrap();

        assert_eq!(
            assemble(plan).unwrap(),
            "sort -k1,1 -T /tmp data.txt | uniq"
        );
    }

    #[test]
    fn test_standalone_distinct_uses_sort_u() {
        let plan = PlanBuilder::source("data.txt").distinct().build().unwrap();
        assert_eq!(assemble(plan).unwrap(), "sort -u -T /tmp data.txt");
    }

    #[test]
    fn test_bare_source_emits_cat() {
        let plan = PlanBuilder::source("data.txt").build().unwrap();
        assert_eq!(assemble(plan).unwrap(), "cat data.txt");
    }

    #[test]
    fn test_limit_offset_keeps_file_on_tail() {
        let plan = PlanBuilder::source("data.txt")
            .limit_offset(10, 5)
            .build()
            .unwrap();
        assert_eq!(assemble(plan).unwrap(), "tail -n +6 data.txt | head -n 10");
    }

    #[test]
    fn test_filter_after_projection_starts_new_jq_stage() {
        let plan = PlanBuilder::source("logs.json")
            .parse_json()
            .select(["path", "status"])
            .filter(Predicate::column("status", CmpOp::Ge, 500))
            .build()
            .unwrap();

        assert_eq!(
            assemble(plan).unwrap(),
            "jq -c '{path, status}' logs.json | jq -c 'select(.status >= 500)'"
        );
    }

    #[test]
    fn test_col_filter_on_aggregated_output() {
        let plan = PlanBuilder::source("sales.csv")
            .parse_csv(true)
            .group_by(["region"])
            .agg([("total", AggSpec::sum("price"))])
            .filter(Predicate::column("total", CmpOp::Gt, 1000))
            .build()
            .unwrap();

        let cmd = assemble(plan).unwrap();
        let stages: Vec<&str> = cmd.split(" | ").collect();
        assert_eq!(stages.len(), 2);
        // Aggregated output is positional: total is field 2.
        assert!(stages[1].contains("$2>1000{print}"));
    }

    #[test]
    fn test_missing_jq_is_unsupported_environment() {
        let registry = ToolRegistry::from_resolved(
            ToolConfig::default(),
            ResolvedTools {
                awk: registry().resolve_awk().ok(),
                grep: registry().resolve_grep().ok(),
                sort: registry().resolve_sort().ok(),
                jq: None,
                cpus: 4,
            },
        );
        let plan = PlanBuilder::source("users.json")
            .parse_json()
            .select(["name"])
            .build()
            .unwrap();

        let err = Assembler::new(&registry).assemble(&plan).unwrap_err();
        assert!(err.to_string().contains("jq"));
    }

    #[test]
    fn test_hostile_path_is_quoted() {
        let plan = PlanBuilder::source("my file; rm -rf $HOME.log")
            .filter(Predicate::line(LineMatch::Contains, "x"))
            .build()
            .unwrap();

        let cmd = assemble(plan).unwrap();
        assert!(cmd.ends_with("'my file; rm -rf $HOME.log'"));
    }
}
