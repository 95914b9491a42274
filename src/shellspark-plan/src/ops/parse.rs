//! Parse operator declaring the structure of the upstream byte stream.

use serde::{Deserialize, Serialize};

/// Input data format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataFormat {
    /// Delimiter-separated values with an optional header row.
    Csv,
    /// Newline-delimited JSON records.
    Json,
    /// Plain text, whitespace-separated fields addressed by position.
    Text,
}

impl DataFormat {
    /// Get the format name for display.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Text => "text",
        }
    }
}

/// Parse operator - introduces a field interpretation of the raw stream.
///
/// For csv with `has_header = true` this makes columns addressable by name;
/// for text, fields are addressed by 1-based position. Json records are
/// addressed by key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParseOp {
    /// Declared format of the input.
    pub format: DataFormat,
    /// Field delimiter, meaningful for csv only.
    pub delimiter: String,
    /// Whether the first csv record is a header row.
    pub has_header: bool,
}

impl ParseOp {
    /// Create a csv parse with the default comma delimiter.
    pub fn csv(has_header: bool) -> Self {
        Self {
            format: DataFormat::Csv,
            delimiter: ",".to_string(),
            has_header,
        }
    }

    /// Create a json parse.
    pub fn json() -> Self {
        Self {
            format: DataFormat::Json,
            delimiter: String::new(),
            has_header: false,
        }
    }

    /// Create a plain-text parse (whitespace fields, positional access).
    pub fn text() -> Self {
        Self {
            format: DataFormat::Text,
            delimiter: String::new(),
            has_header: false,
        }
    }

    /// Set a custom csv delimiter.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }
}

impl std::fmt::Display for ParseOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.format {
            DataFormat::Csv => {
                write!(f, "Parse(csv, header={})", self.has_header)
            }
            other => write!(f, "Parse({})", other.name()),
        }
    }
}
