//! grep-family emitter for raw-line predicates.

use common_error::SparkResult;
use shellspark_plan::ops::{LineFilterOp, LineMatch};
use shellspark_tools::{GrepTool, GrepVariant};

use crate::quote::{escape_regex_literal, sh_quote_always};

/// Emit one grep/ripgrep pipeline stage for a line filter.
///
/// `contains` uses fixed-string mode, `regex` extended-regex mode, and the
/// anchored kinds an escaped literal behind the same regex flag. Consecutive
/// line filters become separate stages since grep has no whole-line
/// conjunction syntax.
pub fn stage(tool: &GrepTool, filter: &LineFilterOp, file: Option<&str>) -> SparkResult<String> {
    let mut flags: Vec<&str> = Vec::new();
    let pattern = match filter.kind {
        LineMatch::Contains => {
            if tool.supports_fixed_strings {
                flags.push("-F");
                filter.pattern.clone()
            } else {
                if tool.variant == GrepVariant::Grep && tool.supports_extended_regex {
                    flags.push("-E");
                }
                escape_regex_literal(&filter.pattern)
            }
        }
        LineMatch::Regex => {
            if tool.variant == GrepVariant::Grep && tool.supports_extended_regex {
                flags.push("-E");
            }
            filter.pattern.clone()
        }
        LineMatch::StartsWith => {
            if tool.variant == GrepVariant::Grep && tool.supports_extended_regex {
                flags.push("-E");
            }
            format!("^{}", escape_regex_literal(&filter.pattern))
        }
        LineMatch::EndsWith => {
            if tool.variant == GrepVariant::Grep && tool.supports_extended_regex {
                flags.push("-E");
            }
            format!("{}$", escape_regex_literal(&filter.pattern))
        }
    };

    // ripgrep prints file names by default once more than one file matches.
    if tool.variant == GrepVariant::Rg {
        flags.push("--no-filename");
    }

    let mut command = tool.path.display().to_string();
    for flag in flags {
        command.push(' ');
        command.push_str(flag);
    }
    command.push(' ');
    command.push_str(&sh_quote_always(&pattern)?);
    if let Some(file) = file {
        command.push(' ');
        command.push_str(file);
    }
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn rg() -> GrepTool {
        GrepTool {
            path: PathBuf::from("rg"),
            variant: GrepVariant::Rg,
            supports_fixed_strings: true,
            supports_extended_regex: true,
        }
    }

    fn grep() -> GrepTool {
        GrepTool {
            path: PathBuf::from("grep"),
            variant: GrepVariant::Grep,
            supports_fixed_strings: true,
            supports_extended_regex: true,
        }
    }

    #[test]
    fn test_contains_prefers_fixed_strings() {
        let filter = LineFilterOp::new(LineMatch::Contains, "ERROR");
        assert_eq!(
            stage(&rg(), &filter, Some("app.log")).unwrap(),
            "rg -F --no-filename 'ERROR' app.log"
        );
        assert_eq!(
            stage(&grep(), &filter, Some("app.log")).unwrap(),
            "grep -F 'ERROR' app.log"
        );
    }

    #[test]
    fn test_regex_uses_extended_mode() {
        let filter = LineFilterOp::new(LineMatch::Regex, "ERROR|WARN");
        assert_eq!(
            stage(&grep(), &filter, None).unwrap(),
            "grep -E 'ERROR|WARN'"
        );
        assert_eq!(
            stage(&rg(), &filter, None).unwrap(),
            "rg --no-filename 'ERROR|WARN'"
        );
    }

    #[test]
    fn test_anchored_kinds_escape_the_literal() {
        let starts = LineFilterOp::new(LineMatch::StartsWith, "[core]");
        assert_eq!(
            stage(&grep(), &starts, None).unwrap(),
            r"grep -E '^\[core\]'"
        );

        let ends = LineFilterOp::new(LineMatch::EndsWith, ".rs");
        assert_eq!(stage(&grep(), &ends, None).unwrap(), r"grep -E '\.rs$'");
    }

    #[test]
    fn test_hostile_pattern_is_quoted() {
        let filter = LineFilterOp::new(LineMatch::Contains, "a'b; rm -rf $HOME");
        let cmd = stage(&rg(), &filter, None).unwrap();
        // The embedded single quote is escaped and the rest stays inside
        // one quoted word.
        assert_eq!(cmd, r#"rg -F --no-filename 'a'\''b; rm -rf $HOME'"#);
    }
}
