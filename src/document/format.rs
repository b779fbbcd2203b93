//! Built-in document formats

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Document formats the built-in loader and writer understand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Plain text, split into paragraphs at blank lines
    Text,
    /// JSON document with a `chunks` array
    Json,
}

impl DocumentFormat {
    /// Format implied by a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" | "text" | "md" => Some(DocumentFormat::Text),
            "json" => Some(DocumentFormat::Json),
            _ => None,
        }
    }

    /// Format name
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Text => "text",
            DocumentFormat::Json => "json",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(DocumentFormat::Text),
            "json" => Ok(DocumentFormat::Json),
            other => Err(format!(
                "Unknown document format '{other}'. Must be one of: text, json"
            )),
        }
    }
}
