//! End-to-end compilation scenarios and the compiler's quantified
//! invariants, run against a fixed injected tool set so the emitted
//! commands are byte-stable regardless of the host.

use std::path::PathBuf;

use shellspark::{
    AggSpec, AwkTool, AwkVariant, CmpOp, Compiler, GrepTool, GrepVariant, JqTool, LineMatch,
    Pipeline, Predicate, ResolvedTools, SortTool, ToolConfig, ToolRegistry,
};

fn resolved_tools(rg: bool, parallel_sort: bool) -> ResolvedTools {
    ResolvedTools {
        awk: Some(AwkTool {
            path: PathBuf::from("mawk"),
            variant: AwkVariant::Mawk,
        }),
        grep: Some(if rg {
            GrepTool {
                path: PathBuf::from("rg"),
                variant: GrepVariant::Rg,
                supports_fixed_strings: true,
                supports_extended_regex: true,
            }
        } else {
            GrepTool {
                path: PathBuf::from("grep"),
                variant: GrepVariant::Grep,
                supports_fixed_strings: true,
                supports_extended_regex: true,
            }
        }),
        sort: Some(SortTool {
            path: PathBuf::from("sort"),
            supports_parallel: parallel_sort,
            supports_buffer_size: parallel_sort,
        }),
        jq: Some(JqTool {
            path: PathBuf::from("jq"),
        }),
        cpus: 8,
    }
}

fn compiler() -> Compiler {
    Compiler::with_registry(ToolRegistry::from_resolved(
        ToolConfig::default(),
        resolved_tools(true, false),
    ))
}

fn grep_compiler() -> Compiler {
    Compiler::with_registry(ToolRegistry::from_resolved(
        ToolConfig::default(),
        resolved_tools(false, false),
    ))
}

#[test]
fn scenario_line_filter_prefers_ripgrep() {
    let pipeline = Pipeline::new("app.log")
        .filter_kw("line__contains", "ERROR")
        .unwrap();

    assert_eq!(
        pipeline.to_shell_with(&compiler()).unwrap(),
        "rg -F --no-filename 'ERROR' app.log"
    );
    assert_eq!(
        pipeline.to_shell_with(&grep_compiler()).unwrap(),
        "grep -F 'ERROR' app.log"
    );
}

#[test]
fn scenario_json_projection() {
    let cmd = Pipeline::new("users.json")
        .parse_json()
        .select(["name", "email"])
        .to_shell_with(&compiler())
        .unwrap();

    assert_eq!(cmd, "jq -c '{name, email}' users.json");
}

#[test]
fn scenario_json_filter_and_projection() {
    let cmd = Pipeline::new("logs.json")
        .parse_json()
        .filter_kw("status__ge", 400)
        .unwrap()
        .select(["path", "status", "response_time"])
        .to_shell_with(&compiler())
        .unwrap();

    assert_eq!(
        cmd,
        "jq -c 'select(.status >= 400) | {path, status, response_time}' logs.json"
    );
}

#[test]
fn scenario_csv_aggregation_with_arithmetic_and_sort() {
    let cmd = Pipeline::new("sales.csv")
        .parse_csv(true)
        .filter_kw("quantity__gt", 0)
        .unwrap()
        .group_by(["region"])
        .agg([("total_revenue", AggSpec::sum("price * quantity"))])
        .sort("total_revenue", true, true)
        .to_shell_with(&compiler())
        .unwrap();

    let (awk_stage, sort_stage) = cmd.split_once(" | ").unwrap();
    assert!(awk_stage.starts_with("mawk -F, '"));
    assert!(awk_stage.contains("NR==1{for(i=1;i<=NF;i++)h[$i]=i; next}"));
    assert!(awk_stage.contains("$h[\"quantity\"]>0"));
    assert!(awk_stage.contains("_sum_total_revenue[key]+=($h[\"price\"]*$h[\"quantity\"])"));
    assert!(awk_stage.ends_with("' sales.csv"));
    assert_eq!(sort_stage, "sort -t, -k2,2rn -T /tmp");
}

#[test]
fn scenario_parallel_json_filtering() {
    let cmd = Pipeline::new("logs/*.json")
        .parse_json()
        .filter_kw("status__ge", 400)
        .unwrap()
        .parallel(8)
        .to_shell_with(&compiler())
        .unwrap();

    assert_eq!(
        cmd,
        "find logs -name '*.json' -print0 | xargs -0 -P8 jq -c 'select(.status >= 400)'"
    );
}

#[test]
fn scenario_parallel_with_sort_is_a_plan_error() {
    let err = Pipeline::new("logs/*.json")
        .parse_json()
        .filter_kw("status__ge", 400)
        .unwrap()
        .parallel(8)
        .sort("status", false, false)
        .to_shell_with(&compiler())
        .unwrap_err();

    let message = err.to_string();
    assert!(message.starts_with("PlanError"), "{message}");
    assert!(message.contains("Parallel"), "{message}");
    assert!(message.contains("Sort"), "{message}");
}

const HOSTILE: &[&str] = &[
    "a'b",
    "a\"b",
    "a$b",
    "a;b",
    "a|b",
    "a`b",
    "a\nb",
    "a b",
];

#[test]
fn quoting_safety_for_patterns_and_paths() {
    let compiler = compiler();
    for hostile in HOSTILE {
        let pattern = format!("ERR{hostile}OR");
        let path = format!("dir/{hostile}.log");
        let cmd = Pipeline::new(&path)
            .filter(Predicate::line(LineMatch::Contains, &pattern))
            .to_shell_with(&compiler)
            .unwrap();

        // The command splits back into exactly the intended words: the
        // pattern and path survive as data.
        let words = shlex::split(&cmd).expect("command must stay shell-parseable");
        assert_eq!(
            words,
            vec![
                "rg".to_string(),
                "-F".to_string(),
                "--no-filename".to_string(),
                pattern,
                path,
            ]
        );
    }
}

#[test]
fn quoting_safety_for_filter_values_and_columns() {
    let compiler = compiler();
    for hostile in HOSTILE {
        let value = format!("x{hostile}y");
        let cmd = Pipeline::new("data.csv")
            .parse_csv(true)
            .filter(Predicate::column("note", CmpOp::Eq, value.as_str()))
            .to_shell_with(&compiler)
            .unwrap();

        let words = shlex::split(&cmd).expect("command must stay shell-parseable");
        // mawk -F, '<program>' data.csv
        assert_eq!(words.len(), 4, "{cmd}");
        assert_eq!(words[0], "mawk");
        assert_eq!(words[3], "data.csv");
        let program = &words[2];
        assert!(
            program.contains("$h[\"note\"]=="),
            "program must compare the note field: {program}"
        );
    }

    // A hostile column name is escaped inside the AWK string literal.
    let cmd = Pipeline::new("data.csv")
        .parse_csv(true)
        .filter(Predicate::column("we\"ird$col", CmpOp::Eq, 1))
        .to_shell_with(&compiler)
        .unwrap();
    let words = shlex::split(&cmd).unwrap();
    assert!(words[2].contains(r#"$h["we\"ird$col"]"#));
}

#[test]
fn hash_stability_and_sensitivity() {
    let build = |pattern: &str| {
        Pipeline::new("app.log")
            .filter_kw("line__contains", pattern)
            .unwrap()
            .plan()
            .unwrap()
    };

    assert_eq!(
        build("ERROR").structural_hash(),
        build("ERROR").structural_hash()
    );
    assert_ne!(
        build("ERROR").structural_hash(),
        build("ERROR ").structural_hash()
    );
}

#[test]
fn optimizer_is_idempotent_across_plan_shapes() {
    let optimizer = shellspark::Optimizer::default();
    let plans = vec![
        Pipeline::new("app.log")
            .filter_kw("line__contains", "ERROR")
            .unwrap()
            .plan()
            .unwrap(),
        Pipeline::new("sales.csv")
            .parse_csv(true)
            .select(["region", "quantity"])
            .filter_kw("quantity__gt", 0)
            .unwrap()
            .limit(100)
            .limit(10)
            .plan()
            .unwrap(),
        Pipeline::new("sales.csv")
            .parse_csv(true)
            .group_by(["region"])
            .agg([("n", AggSpec::count_star())])
            .distinct()
            .plan()
            .unwrap(),
    ];

    for plan in plans {
        let once = optimizer.optimize(plan).unwrap();
        let twice = optimizer.optimize(once.clone()).unwrap();
        assert_eq!(once, twice);
    }
}

#[test]
fn optimized_and_unoptimized_compile_to_the_same_command_for_stable_plans() {
    // For a plan the optimizer does not change, compiling before and after
    // optimization must agree byte for byte.
    let compiler = compiler();
    let plan = Pipeline::new("logs.json")
        .parse_json()
        .filter_kw("status__ge", 400)
        .unwrap()
        .select(["path"])
        .plan()
        .unwrap();

    let optimized = shellspark::Optimizer::default().optimize(plan.clone()).unwrap();
    assert_eq!(plan, optimized);
    assert_eq!(
        compiler.compile(&plan).unwrap(),
        compiler.compile(&optimized).unwrap()
    );
}

#[test]
fn cache_returns_byte_equal_commands_under_interleaved_clears() {
    let cached = compiler();
    let pipelines: Vec<Pipeline> = vec![
        Pipeline::new("a.log").filter_kw("line__contains", "x").unwrap(),
        Pipeline::new("b.json").parse_json().select(["k"]),
        Pipeline::new("c.csv")
            .parse_csv(true)
            .group_by(["g"])
            .agg([("n", AggSpec::count_star())]),
        Pipeline::new("d.txt").distinct().limit(3),
    ];

    // A deterministic shuffle of lookups interleaved with clears; every
    // result must be byte-equal to a fresh compilation.
    for round in 0..6 {
        for (i, pipeline) in pipelines.iter().enumerate() {
            if (round * 7 + i) % 5 == 0 {
                cached.clear_cache();
            }
            let from_cache = pipeline.to_shell_with(&cached).unwrap();
            let fresh = pipeline.to_shell_with(&compiler()).unwrap();
            assert_eq!(from_cache, fresh);
        }
    }
}

#[test]
fn parallel_legality_is_exactly_the_absence_of_global_state() {
    let compiler = compiler();

    let legal = Pipeline::new("logs/*.json")
        .parse_json()
        .filter_kw("status__ge", 400)
        .unwrap()
        .select(["path"])
        .parallel_auto();
    assert!(legal.to_shell_with(&compiler).is_ok());

    let illegal: Vec<Pipeline> = vec![
        Pipeline::new("logs/*.json").parse_json().sort("status", false, false).parallel_auto(),
        Pipeline::new("logs/*.json").parse_json().limit(10).parallel_auto(),
        Pipeline::new("logs/*.json").distinct().parallel_auto(),
        Pipeline::new("logs/*.csv")
            .parse_csv(true)
            .group_by(["path"])
            .agg([("n", AggSpec::count_star())])
            .parallel_auto(),
    ];
    for pipeline in illegal {
        let err = pipeline.to_shell_with(&compiler).unwrap_err();
        assert!(err.to_string().contains("Parallel"), "{err}");
    }
}

#[test]
fn sort_parallel_flags_follow_registry_capabilities() {
    let parallel_compiler = Compiler::with_registry(ToolRegistry::from_resolved(
        ToolConfig::default(),
        resolved_tools(true, true),
    ));

    let pipeline = Pipeline::new("sales.csv")
        .parse_csv(true)
        .group_by(["region"])
        .agg([("n", AggSpec::count_star())])
        .sort("n", true, true);

    let with_parallel = pipeline.to_shell_with(&parallel_compiler).unwrap();
    assert!(with_parallel.contains("--parallel=8"));
    assert!(with_parallel.contains("-S 80%"));
    assert!(with_parallel.contains("-T /tmp"));

    let without = pipeline.to_shell_with(&compiler()).unwrap();
    assert!(!without.contains("--parallel"));
}

#[test]
fn tmpdir_config_seeds_sort() {
    let config = ToolConfig {
        tmpdir: Some(PathBuf::from("/var/tmp")),
        ..ToolConfig::default()
    };
    let compiler = Compiler::with_registry(ToolRegistry::from_resolved(
        config,
        resolved_tools(true, false),
    ));

    let cmd = Pipeline::new("data.txt")
        .sort("1", false, false)
        .to_shell_with(&compiler)
        .unwrap();
    assert_eq!(cmd, "sort -k1,1 -T /var/tmp data.txt");
}
