use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Task status, the closed set every status symbol normalizes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Completed,
    Planned,
    Cancelled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::NotStarted,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Planned,
        TaskStatus::Cancelled,
    ];

    /// The character used inside the checkbox `[ ]` when nothing is configured
    pub fn default_symbol(self) -> char {
        match self {
            TaskStatus::NotStarted => ' ',
            TaskStatus::InProgress => '/',
            TaskStatus::Completed => 'x',
            TaskStatus::Planned => '?',
            TaskStatus::Cancelled => '-',
        }
    }

    /// Textual form written into document preambles
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not-started",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Planned => "planned",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "not-started" | "todo" => Ok(TaskStatus::NotStarted),
            "in-progress" | "active" => Ok(TaskStatus::InProgress),
            "completed" | "done" => Ok(TaskStatus::Completed),
            "planned" => Ok(TaskStatus::Planned),
            "cancelled" | "canceled" => Ok(TaskStatus::Cancelled),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

/// Task priority on a 1 (lowest) to 5 (highest) scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

/// Icons indexed by level - 1
const PRIORITY_ICONS: [&str; 5] = ["⏬", "🔽", "🔼", "⏫", "🔺"];
/// Names indexed by level - 1
const PRIORITY_NAMES: [&str; 5] = ["lowest", "low", "medium", "high", "highest"];

impl Priority {
    pub fn new(level: u8) -> Option<Priority> {
        (1..=5).contains(&level).then_some(Priority(level))
    }

    pub fn level(self) -> u8 {
        self.0
    }

    /// Icon used by the symbol vocabulary
    pub fn icon(self) -> &'static str {
        PRIORITY_ICONS[usize::from(self.0 - 1)]
    }

    /// Name used by the bracket vocabulary
    pub fn name(self) -> &'static str {
        PRIORITY_NAMES[usize::from(self.0 - 1)]
    }

    pub fn from_icon(icon: &str) -> Option<Priority> {
        // Tolerate a trailing variation selector (U+FE0F)
        let icon = icon.trim_end_matches('\u{fe0f}');
        PRIORITY_ICONS
            .iter()
            .position(|i| *i == icon)
            .map(|idx| Priority(idx as u8 + 1))
    }

    /// Accepts a level name (`high`) or a digit (`4`)
    pub fn from_name(name: &str) -> Option<Priority> {
        let name = name.trim().to_lowercase();
        if let Ok(level) = name.parse::<u8>() {
            return Priority::new(level);
        }
        PRIORITY_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|idx| Priority(idx as u8 + 1))
    }
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Priority::new(level).ok_or_else(|| format!("priority out of range 1-5: {}", level))
    }
}

impl From<Priority> for u8 {
    fn from(p: Priority) -> u8 {
        p.0
    }
}
