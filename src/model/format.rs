use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which textual target a capture is synthesized into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureMode {
    /// One checkbox line per captured line, metadata as an inline suffix
    #[default]
    InlineTask,
    /// A standalone note with a `---` preamble block
    Document,
}

impl CaptureMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CaptureMode::InlineTask => "inline-task",
            CaptureMode::Document => "document",
        }
    }
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaptureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inline-task" | "inline" | "task" | "checkbox" => Ok(CaptureMode::InlineTask),
            "document" | "note" | "file" => Ok(CaptureMode::Document),
            other => Err(other.to_string()),
        }
    }
}

/// The two mutually exclusive metadata encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vocabulary {
    /// Icon followed by the value: `📅 2025-05-14`, `🔼`
    #[default]
    Symbol,
    /// Inline fields: `[due:: 2025-05-14]`, `[priority:: medium]`
    Bracket,
}

impl Vocabulary {
    pub fn as_str(self) -> &'static str {
        match self {
            Vocabulary::Symbol => "symbol",
            Vocabulary::Bracket => "bracket",
        }
    }
}

impl fmt::Display for Vocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vocabulary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "symbol" | "emoji" | "tasks" => Ok(Vocabulary::Symbol),
            "bracket" | "dataview" => Ok(Vocabulary::Bracket),
            other => Err(other.to_string()),
        }
    }
}
