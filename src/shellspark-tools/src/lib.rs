//! Host tool discovery and capability detection for ShellSpark.
//!
//! The registry resolves the concrete binaries a compiled command will run
//! (awk, grep/ripgrep, sort, jq), detects the capability differences between
//! the GNU and BSD tool families, and summarizes the whole resolution as an
//! opaque [`Fingerprint`] used in the compile-cache key.
//!
//! Discovery probes are bounded to about a second each so a misconfigured
//! binary can never stall compilation; a probe failure is treated as tool
//! absence.

mod config;
mod probe;
mod registry;

pub use config::{ToolConfig, ENV_AWK, ENV_GREP, ENV_JQ, ENV_SORT};
pub use probe::{find_in_path, probe_version, run_probe, ProbeOutput, PROBE_TIMEOUT};
pub use registry::{
    AwkTool, AwkVariant, Fingerprint, GrepTool, GrepVariant, JqTool, ResolvedTools, SortTool,
    ToolRegistry,
};
