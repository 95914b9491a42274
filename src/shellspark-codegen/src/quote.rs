//! Escaping for every context a dynamic value can land in.
//!
//! No value ever reaches the command line without passing through one of
//! these functions: shell words go through [`sh_quote`] or
//! [`sh_quote_always`], text embedded in an AWK program through the awk
//! escapes, and regex-literal patterns through [`escape_regex_literal`].

use common_error::{SparkError, SparkResult};

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '@' | '%' | '+' | '=' | ':' | ',' | '.' | '/' | '-' | '_')
}

fn single_quoted(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Quote a string as a single POSIX shell word, leaving it bare when every
/// character is shell-inert. Used for file paths, delimiters and
/// directories.
///
/// The only unrepresentable input is one containing a nul byte; that
/// surfaces as a `Quoting` error, which indicates a bug upstream.
pub fn sh_quote(value: &str) -> SparkResult<String> {
    reject_nul(value)?;
    if !value.is_empty() && value.chars().all(is_shell_safe) {
        Ok(value.to_string())
    } else {
        Ok(single_quoted(value))
    }
}

/// Single-quote a string unconditionally. Used for patterns and embedded
/// programs, which are always rendered as one quoted word.
pub fn sh_quote_always(value: &str) -> SparkResult<String> {
    reject_nul(value)?;
    Ok(single_quoted(value))
}

fn reject_nul(value: &str) -> SparkResult<()> {
    if value.contains('\0') {
        return Err(SparkError::quoting(format!(
            "value {value:?} contains a nul byte and cannot be quoted for the shell"
        )));
    }
    Ok(())
}

/// Check whether a glob pattern can be placed on the command line unquoted
/// so the shell still expands it.
///
/// Quoting a glob would disable expansion, so only patterns built entirely
/// from glob metacharacters and shell-inert characters qualify; anything
/// else falls back to `find | xargs`.
pub fn is_plain_glob(pattern: &str) -> bool {
    !pattern.is_empty()
        && pattern.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '*' | '?' | '[' | ']' | '_' | '-' | '.' | '/')
        })
}

/// Escape text for an AWK string literal (between double quotes).
pub fn escape_awk_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a pattern for an AWK `/…/` regex literal.
pub fn escape_awk_regex(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '/' => out.push_str("\\/"),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a literal string so it matches itself in an extended regex.
pub fn escape_regex_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(
            c,
            '\\' | '.' | '^' | '$' | '*' | '+' | '?' | '{' | '}' | '[' | ']' | '|' | '(' | ')'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
