//! Tool configuration with environment-derived defaults.
//!
//! All environment access happens here, once, when the config is created;
//! nothing downstream calls `getenv` at emission time.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Environment variable overriding awk discovery.
pub const ENV_AWK: &str = "SHELLSPARK_AWK";
/// Environment variable overriding grep discovery.
pub const ENV_GREP: &str = "SHELLSPARK_GREP";
/// Environment variable overriding sort discovery.
pub const ENV_SORT: &str = "SHELLSPARK_SORT";
/// Environment variable overriding jq discovery.
pub const ENV_JQ: &str = "SHELLSPARK_JQ";

/// Discovery overrides and host settings for the tool registry.
///
/// An override may be an absolute path or a bare name; either bypasses
/// discovery for that tool. `tmpdir` seeds `sort -T`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Override for awk.
    pub awk: Option<String>,
    /// Override for grep.
    pub grep: Option<String>,
    /// Override for sort.
    pub sort: Option<String>,
    /// Override for jq.
    pub jq: Option<String>,
    /// Temp directory for `sort -T`; `None` falls back to `/tmp`.
    pub tmpdir: Option<PathBuf>,
}

impl ToolConfig {
    /// Build a config from `SHELLSPARK_*` overrides and `TMPDIR`.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            awk: var(ENV_AWK),
            grep: var(ENV_GREP),
            sort: var(ENV_SORT),
            jq: var(ENV_JQ),
            tmpdir: var("TMPDIR").map(PathBuf::from),
        }
    }

    /// The directory passed to `sort -T`.
    pub fn sort_tmpdir(&self) -> PathBuf {
        self.tmpdir
            .clone()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
    }
}
