//! Tool registry: discovery, capability detection and fingerprinting.

use std::path::PathBuf;

use common_error::{SparkError, SparkResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ToolConfig;
use crate::probe::{find_in_path, probe_version, run_probe};

/// Detected awk implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AwkVariant {
    /// mawk - fastest, preferred.
    Mawk,
    /// GNU awk.
    Gawk,
    /// Any other awk (typically BSD / POSIX awk).
    Awk,
}

impl AwkVariant {
    /// Variant label used in the fingerprint.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Mawk => "mawk",
            Self::Gawk => "gawk",
            Self::Awk => "awk",
        }
    }
}

/// Resolved awk binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwkTool {
    /// Absolute path (or override name).
    pub path: PathBuf,
    /// Implementation variant.
    pub variant: AwkVariant,
}

/// Detected grep family implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrepVariant {
    /// ripgrep.
    Rg,
    /// GNU or BSD grep.
    Grep,
}

impl GrepVariant {
    /// Variant label used in the fingerprint.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Rg => "rg",
            Self::Grep => "grep",
        }
    }
}

/// Resolved grep-family binary and its capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrepTool {
    /// Absolute path (or override name).
    pub path: PathBuf,
    /// Implementation variant.
    pub variant: GrepVariant,
    /// Whether `-F` fixed-string matching is available.
    pub supports_fixed_strings: bool,
    /// Whether `-E` extended regular expressions are available.
    pub supports_extended_regex: bool,
}

/// Resolved sort binary and its capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortTool {
    /// Absolute path (or override name).
    pub path: PathBuf,
    /// Whether `--parallel=N` is accepted (GNU sort).
    pub supports_parallel: bool,
    /// Whether `-S <size>` is accepted.
    pub supports_buffer_size: bool,
}

/// Resolved jq binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JqTool {
    /// Absolute path (or override name).
    pub path: PathBuf,
}

/// Stable summary of the resolved tool set.
///
/// Byte-equal iff every resolution and capability flag is identical; part of
/// the compile-cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// The fingerprint bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A pre-resolved tool set for embedding and tests, bypassing all probes.
#[derive(Debug, Clone, Default)]
pub struct ResolvedTools {
    /// awk resolution; `None` means absent.
    pub awk: Option<AwkTool>,
    /// grep resolution; `None` means absent.
    pub grep: Option<GrepTool>,
    /// sort resolution; `None` means absent.
    pub sort: Option<SortTool>,
    /// jq resolution; `None` means absent.
    pub jq: Option<JqTool>,
    /// CPU count to report.
    pub cpus: usize,
}

#[derive(Debug, Default)]
struct RegistryState {
    awk: Option<Option<AwkTool>>,
    grep: Option<Option<GrepTool>>,
    sort: Option<Option<SortTool>>,
    jq: Option<Option<JqTool>>,
    cpus: Option<usize>,
}

/// Discovers available binaries, caches resolutions and capability flags,
/// and exposes an opaque fingerprint of the resolved tool set.
///
/// Discovery runs at most once per tool per registry; results, including
/// definitive absences, are memoized behind a single lock. A probe failure
/// or timeout is recorded as absence, never as a cached error.
#[derive(Debug)]
pub struct ToolRegistry {
    config: ToolConfig,
    state: Mutex<RegistryState>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(ToolConfig::from_env())
    }
}

impl ToolRegistry {
    /// Create a registry with the given configuration.
    pub fn new(config: ToolConfig) -> Self {
        Self {
            config,
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Create a registry seeded with a fixed tool set; no probes will run.
    pub fn from_resolved(config: ToolConfig, tools: ResolvedTools) -> Self {
        Self {
            config,
            state: Mutex::new(RegistryState {
                awk: Some(tools.awk),
                grep: Some(tools.grep),
                sort: Some(tools.sort),
                jq: Some(tools.jq),
                cpus: Some(tools.cpus.max(1)),
            }),
        }
    }

    /// The configuration this registry was created with.
    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    /// Resolve the awk implementation. Absence is fatal.
    pub fn resolve_awk(&self) -> SparkResult<AwkTool> {
        let mut state = self.state.lock();
        let entry = state
            .awk
            .get_or_insert_with(|| discover_awk(self.config.awk.as_deref()));
        entry.clone().ok_or_else(|| SparkError::unsupported("awk"))
    }

    /// Resolve the grep family implementation. Absence of both rg and grep
    /// is fatal; absence of rg alone silently falls back to grep.
    pub fn resolve_grep(&self) -> SparkResult<GrepTool> {
        let mut state = self.state.lock();
        let entry = state
            .grep
            .get_or_insert_with(|| discover_grep(self.config.grep.as_deref()));
        entry.clone().ok_or_else(|| SparkError::unsupported("grep"))
    }

    /// Resolve the sort implementation. Absence is fatal.
    pub fn resolve_sort(&self) -> SparkResult<SortTool> {
        let mut state = self.state.lock();
        let entry = state
            .sort
            .get_or_insert_with(|| discover_sort(self.config.sort.as_deref()));
        entry.clone().ok_or_else(|| SparkError::unsupported("sort"))
    }

    /// Resolve jq. Returns `None` when absent; the assembler raises
    /// `UnsupportedEnvironment` only if the plan actually parses json.
    pub fn resolve_jq(&self) -> Option<JqTool> {
        let mut state = self.state.lock();
        state
            .jq
            .get_or_insert_with(|| discover_jq(self.config.jq.as_deref()))
            .clone()
    }

    /// Host CPU count; falls back to 1.
    pub fn cpu_count(&self) -> usize {
        let mut state = self.state.lock();
        *state.cpus.get_or_insert_with(discover_cpu_count)
    }

    /// A stable byte summary of every resolution above.
    ///
    /// Triggers discovery for any tool not yet resolved.
    pub fn fingerprint(&self) -> Fingerprint {
        let awk = self.resolve_awk().ok();
        let grep = self.resolve_grep().ok();
        let sort = self.resolve_sort().ok();
        let jq = self.resolve_jq();
        let cpus = self.cpu_count();

        let mut lines = Vec::with_capacity(5);
        lines.push(match &awk {
            Some(t) => format!("awk={}:{}", t.path.display(), t.variant.name()),
            None => "awk=absent".to_string(),
        });
        lines.push(match &grep {
            Some(t) => format!(
                "grep={}:{}:F={}:E={}",
                t.path.display(),
                t.variant.name(),
                t.supports_fixed_strings,
                t.supports_extended_regex
            ),
            None => "grep=absent".to_string(),
        });
        lines.push(match &sort {
            Some(t) => format!(
                "sort={}:parallel={}:S={}",
                t.path.display(),
                t.supports_parallel,
                t.supports_buffer_size
            ),
            None => "sort=absent".to_string(),
        });
        lines.push(match &jq {
            Some(t) => format!("jq={}", t.path.display()),
            None => "jq=absent".to_string(),
        });
        lines.push(format!("cpus={cpus}"));

        Fingerprint(lines.join("\n"))
    }

    /// Forget every cached resolution.
    pub fn clear(&self) {
        *self.state.lock() = RegistryState::default();
    }
}

fn classify_awk(path: &PathBuf, fallback_name: &str) -> AwkVariant {
    let version = probe_version(path).unwrap_or_default().to_lowercase();
    if version.contains("mawk") {
        AwkVariant::Mawk
    } else if version.contains("gnu awk") || version.contains("gawk") {
        AwkVariant::Gawk
    } else {
        match fallback_name {
            "mawk" => AwkVariant::Mawk,
            "gawk" => AwkVariant::Gawk,
            _ => AwkVariant::Awk,
        }
    }
}

fn discover_awk(override_name: Option<&str>) -> Option<AwkTool> {
    if let Some(name) = override_name {
        if let Some(path) = find_in_path(name) {
            let variant = classify_awk(&path, basename(name));
            debug!(path = %path.display(), variant = variant.name(), "awk override resolved");
            return Some(AwkTool { path, variant });
        }
    }

    for name in ["mawk", "gawk", "awk"] {
        if let Some(path) = find_in_path(name) {
            let variant = classify_awk(&path, name);
            debug!(path = %path.display(), variant = variant.name(), "awk resolved");
            return Some(AwkTool { path, variant });
        }
    }

    debug!("no awk implementation found");
    None
}

fn grep_flag_works(path: &PathBuf, flag: &str) -> bool {
    // Exit 1 just means no match; only usage errors disqualify the flag.
    run_probe(path, &[flag, "x", "/dev/null"])
        .map(|out| matches!(out.code, Some(0 | 1)))
        .unwrap_or(false)
}

fn discover_grep(override_name: Option<&str>) -> Option<GrepTool> {
    if let Some(name) = override_name {
        if let Some(path) = find_in_path(name) {
            let variant = if basename(name) == "rg" {
                GrepVariant::Rg
            } else {
                GrepVariant::Grep
            };
            return Some(finish_grep(path, variant));
        }
    }

    if let Some(path) = find_in_path("rg") {
        debug!(path = %path.display(), "ripgrep resolved");
        return Some(finish_grep(path, GrepVariant::Rg));
    }
    if let Some(path) = find_in_path("grep") {
        debug!(path = %path.display(), "grep resolved");
        return Some(finish_grep(path, GrepVariant::Grep));
    }

    debug!("no grep implementation found");
    None
}

fn finish_grep(path: PathBuf, variant: GrepVariant) -> GrepTool {
    let (fixed, extended) = match variant {
        GrepVariant::Rg => (true, true),
        GrepVariant::Grep => (grep_flag_works(&path, "-F"), grep_flag_works(&path, "-E")),
    };
    GrepTool {
        path,
        variant,
        supports_fixed_strings: fixed,
        supports_extended_regex: extended,
    }
}

fn discover_sort(override_name: Option<&str>) -> Option<SortTool> {
    let path = override_name
        .and_then(find_in_path)
        .or_else(|| find_in_path("sort"))?;

    let supports_parallel = run_probe(&path, &["--parallel=1", "--version"])
        .map(|out| out.success)
        .unwrap_or(false);
    let supports_buffer_size = run_probe(&path, &["-S", "1M", "--version"])
        .map(|out| out.success)
        .unwrap_or(false);

    debug!(
        path = %path.display(),
        parallel = supports_parallel,
        buffer = supports_buffer_size,
        "sort resolved"
    );
    Some(SortTool {
        path,
        supports_parallel,
        supports_buffer_size,
    })
}

fn discover_jq(override_name: Option<&str>) -> Option<JqTool> {
    let path = override_name
        .and_then(find_in_path)
        .or_else(|| find_in_path("jq"))?;
    debug!(path = %path.display(), "jq resolved");
    Some(JqTool { path })
}

fn discover_cpu_count() -> usize {
    let probed = if cfg!(target_os = "macos") {
        find_in_path("sysctl")
            .and_then(|p| run_probe(&p, &["-n", "hw.ncpu"]))
            .filter(|out| out.success)
            .and_then(|out| out.stdout.trim().parse::<usize>().ok())
    } else {
        find_in_path("nproc")
            .and_then(|p| run_probe(&p, &[]))
            .filter(|out| out.success)
            .and_then(|out| out.stdout.trim().parse::<usize>().ok())
    };

    probed
        .filter(|&n| n >= 1)
        .or_else(|| std::thread::available_parallelism().ok().map(usize::from))
        .unwrap_or(1)
}

fn basename(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}
