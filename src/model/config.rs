use std::collections::HashMap;
use std::path::PathBuf;

use chrono::format::{Item, StrftimeItems};
use chrono::{Days, Months, NaiveDate};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::format::{CaptureMode, Vocabulary};
use crate::model::metadata::DateField;
use crate::model::task::TaskStatus;
use crate::util::unicode::single_char;

/// Error type for configuration loading and validation
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("could not edit config: {0}")]
    EditError(#[from] toml_edit::TomlError),
    #[error("unknown vocabulary {0:?} (expected \"symbol\" or \"bracket\")")]
    InvalidVocabulary(String),
    #[error("unknown capture mode {0:?} (expected \"inline-task\" or \"document\")")]
    InvalidMode(String),
    #[error("status symbol for {status} must be exactly one character, got {symbol:?}")]
    InvalidStatusSymbol { status: String, symbol: String },
    #[error("status symbol {symbol:?} is mapped to both {first} and {second}")]
    DuplicateStatusSymbol {
        symbol: char,
        first: TaskStatus,
        second: TaskStatus,
    },
    #[error("unknown status {0:?} in status aliases")]
    UnknownStatus(String),
    #[error("invalid date offset {offset:?} for phrase {phrase:?} (expected e.g. 1d, 2w, 1m, 1y)")]
    InvalidOffset { phrase: String, offset: String },
    #[error("empty {0} in date configuration")]
    EmptyPhrase(&'static str),
    #[error("invalid date format {0:?}")]
    InvalidDateFormat(String),
    #[error("could not build pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Configuration as read from quickcap.toml. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default)]
    pub capture: CaptureSection,
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default)]
    pub dates: DateConfig,
    #[serde(default)]
    pub markers: MarkerConfig,
    #[serde(default)]
    pub document: DocumentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSection {
    #[serde(default = "default_vocabulary")]
    pub vocabulary: String,
    /// Mode new sessions start in. Written back by `qc mode`.
    #[serde(default = "default_mode")]
    pub default_mode: String,
}

impl Default for CaptureSection {
    fn default() -> Self {
        CaptureSection {
            vocabulary: default_vocabulary(),
            default_mode: default_mode(),
        }
    }
}

fn default_vocabulary() -> String {
    "symbol".to_string()
}

fn default_mode() -> String {
    "inline-task".to_string()
}

/// Symbols written inside the checkbox for each status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    #[serde(default = "default_not_started")]
    pub not_started: String,
    #[serde(default = "default_in_progress")]
    pub in_progress: String,
    #[serde(default = "default_completed")]
    pub completed: String,
    #[serde(default = "default_planned")]
    pub planned: String,
    #[serde(default = "default_cancelled")]
    pub cancelled: String,
    /// Extra symbols that read as a status but are never written
    #[serde(default = "default_aliases")]
    pub aliases: IndexMap<String, String>,
}

impl Default for StatusConfig {
    fn default() -> Self {
        StatusConfig {
            not_started: default_not_started(),
            in_progress: default_in_progress(),
            completed: default_completed(),
            planned: default_planned(),
            cancelled: default_cancelled(),
            aliases: default_aliases(),
        }
    }
}

fn default_not_started() -> String {
    TaskStatus::NotStarted.default_symbol().to_string()
}

fn default_in_progress() -> String {
    TaskStatus::InProgress.default_symbol().to_string()
}

fn default_completed() -> String {
    TaskStatus::Completed.default_symbol().to_string()
}

fn default_planned() -> String {
    TaskStatus::Planned.default_symbol().to_string()
}

fn default_cancelled() -> String {
    TaskStatus::Cancelled.default_symbol().to_string()
}

fn default_aliases() -> IndexMap<String, String> {
    IndexMap::from([
        (">".to_string(), "in-progress".to_string()),
        ("X".to_string(), "completed".to_string()),
    ])
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateConfig {
    /// Relative phrase -> offset from today (`1d`, `2w`, `1m`, `1y`)
    #[serde(default = "default_phrases")]
    pub phrases: IndexMap<String, String>,
    #[serde(default)]
    pub keywords: KeywordConfig,
    /// chrono format strings tried against date-looking tokens
    #[serde(default = "default_absolute_formats")]
    pub absolute_formats: Vec<String>,
    /// Recognize `friday`, `next friday`
    #[serde(default = "default_true")]
    pub weekdays: bool,
    /// Recognize `in 3 days`, `in 2 weeks`, `in 1 month`
    #[serde(default = "default_true")]
    pub relative_units: bool,
}

impl Default for DateConfig {
    fn default() -> Self {
        DateConfig {
            phrases: default_phrases(),
            keywords: KeywordConfig::default(),
            absolute_formats: default_absolute_formats(),
            weekdays: true,
            relative_units: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_phrases() -> IndexMap<String, String> {
    [
        ("today", "0d"),
        ("tomorrow", "1d"),
        ("day after tomorrow", "2d"),
        ("next week", "7d"),
        ("next month", "1m"),
        ("next year", "1y"),
    ]
    .into_iter()
    .map(|(p, o)| (p.to_string(), o.to_string()))
    .collect()
}

fn default_absolute_formats() -> Vec<String> {
    vec!["%Y-%m-%d".to_string()]
}

/// Words that route a following date phrase to a field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    #[serde(default = "default_start_keywords")]
    pub start: Vec<String>,
    #[serde(default = "default_due_keywords")]
    pub due: Vec<String>,
    #[serde(default = "default_scheduled_keywords")]
    pub scheduled: Vec<String>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        KeywordConfig {
            start: default_start_keywords(),
            due: default_due_keywords(),
            scheduled: default_scheduled_keywords(),
        }
    }
}

fn strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

fn default_start_keywords() -> Vec<String> {
    strings(&["start", "starting", "starts", "begin", "begins", "from"])
}

fn default_due_keywords() -> Vec<String> {
    strings(&["due", "deadline", "by", "until", "before"])
}

fn default_scheduled_keywords() -> Vec<String> {
    strings(&["scheduled", "on", "at", "planned", "set for"])
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// `#<prefix>/value` and `[<prefix>:: value]` set the project
    #[serde(default = "default_project_prefix")]
    pub project_prefix: String,
    /// `<prefix>value` sets the context in the symbol vocabulary
    #[serde(default = "default_context_prefix")]
    pub context_prefix: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        MarkerConfig {
            project_prefix: default_project_prefix(),
            context_prefix: default_context_prefix(),
        }
    }
}

fn default_project_prefix() -> String {
    "project".to_string()
}

fn default_context_prefix() -> String {
    "@".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    #[serde(default)]
    pub use_template: bool,
    /// Template path, relative to the template root
    #[serde(default)]
    pub template: String,
    /// Also harvest `#tags` from the captured content into the preamble
    #[serde(default)]
    pub write_content_tags: bool,
    #[serde(default = "default_file_name_template")]
    pub file_name_template: String,
    #[serde(default)]
    pub default_folder: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        DocumentConfig {
            use_template: false,
            template: String::new(),
            write_content_tags: false,
            file_name_template: default_file_name_template(),
            default_folder: String::new(),
        }
    }
}

fn default_file_name_template() -> String {
    "{{DATE:YYYY-MM-DD}} - ".to_string()
}

// ---------------------------------------------------------------------------
// Validated form
// ---------------------------------------------------------------------------

/// Offset of a relative phrase from the reference date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeOffset {
    Days(i64),
    Months(u32),
}

impl RelativeOffset {
    /// Parse `3d`, `-1d`, `2w`, `1m`, `1y`
    pub fn parse(s: &str) -> Option<RelativeOffset> {
        let s = s.trim().to_lowercase();
        let unit = s.chars().last()?;
        let n: i64 = s[..s.len() - unit.len_utf8()].trim().parse().ok()?;
        match unit {
            'd' => Some(RelativeOffset::Days(n)),
            'w' => n.checked_mul(7).map(RelativeOffset::Days),
            'm' => u32::try_from(n).ok().map(RelativeOffset::Months),
            'y' => u32::try_from(n)
                .ok()
                .and_then(|y| y.checked_mul(12))
                .map(RelativeOffset::Months),
            _ => None,
        }
    }

    pub fn apply(self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            RelativeOffset::Days(n) if n >= 0 => today.checked_add_days(Days::new(n.unsigned_abs())),
            RelativeOffset::Days(n) => today.checked_sub_days(Days::new(n.unsigned_abs())),
            RelativeOffset::Months(m) => today.checked_add_months(Months::new(m)),
        }
    }
}

/// Two-way status <-> symbol mapping
#[derive(Debug, Clone)]
pub struct StatusMap {
    symbols: HashMap<TaskStatus, char>,
    lookup: HashMap<char, TaskStatus>,
}

impl StatusMap {
    /// Symbol written for `status`
    pub fn symbol(&self, status: TaskStatus) -> char {
        self.symbols
            .get(&status)
            .copied()
            .unwrap_or_else(|| status.default_symbol())
    }

    /// Status a symbol reads as, if it is mapped at all
    pub fn status_of(&self, symbol: char) -> Option<TaskStatus> {
        self.lookup.get(&symbol).copied()
    }

    /// Textual status for a marker; unmapped or absent markers read as not started
    pub fn status_text(&self, marker: Option<char>) -> &'static str {
        marker
            .and_then(|c| self.status_of(c))
            .unwrap_or(TaskStatus::NotStarted)
            .as_str()
    }

    pub fn is_mapped(&self, symbol: char) -> bool {
        self.lookup.contains_key(&symbol)
    }
}

impl Default for StatusMap {
    fn default() -> Self {
        let symbols: HashMap<TaskStatus, char> = TaskStatus::ALL
            .into_iter()
            .map(|s| (s, s.default_symbol()))
            .collect();
        let mut lookup: HashMap<char, TaskStatus> =
            symbols.iter().map(|(s, c)| (*c, *s)).collect();
        lookup.insert('>', TaskStatus::InProgress);
        lookup.insert('X', TaskStatus::Completed);
        StatusMap { symbols, lookup }
    }
}

/// Validated date scanning rules
#[derive(Debug, Clone)]
pub struct DateRules {
    /// Phrase (lowercase) and its offset, longest phrase first
    pub phrases: Vec<(String, RelativeOffset)>,
    /// Keyword (lowercase) and the field it routes to, longest first
    pub keywords: Vec<(String, DateField)>,
    pub absolute_formats: Vec<String>,
    pub weekdays: bool,
    pub relative_units: bool,
}

/// Fully validated configuration the engine runs on
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub vocabulary: Vocabulary,
    pub default_mode: CaptureMode,
    pub status: StatusMap,
    pub dates: DateRules,
    pub markers: MarkerConfig,
    pub document: DocumentConfig,
}

impl CaptureConfig {
    /// Check every section and build the runtime form. Fails on the first problem.
    pub fn validate(&self) -> Result<EngineConfig, ConfigError> {
        let vocabulary: Vocabulary = self
            .capture
            .vocabulary
            .parse()
            .map_err(ConfigError::InvalidVocabulary)?;
        let default_mode: CaptureMode = self
            .capture
            .default_mode
            .parse()
            .map_err(ConfigError::InvalidMode)?;
        let status = build_status_map(&self.status)?;
        let dates = build_date_rules(&self.dates)?;

        Ok(EngineConfig {
            vocabulary,
            default_mode,
            status,
            dates,
            markers: self.markers.clone(),
            document: self.document.clone(),
        })
    }
}

fn build_status_map(cfg: &StatusConfig) -> Result<StatusMap, ConfigError> {
    let mut symbols = HashMap::new();
    let mut lookup: HashMap<char, TaskStatus> = HashMap::new();

    let primary = [
        (TaskStatus::NotStarted, &cfg.not_started),
        (TaskStatus::InProgress, &cfg.in_progress),
        (TaskStatus::Completed, &cfg.completed),
        (TaskStatus::Planned, &cfg.planned),
        (TaskStatus::Cancelled, &cfg.cancelled),
    ];
    let aliases = cfg
        .aliases
        .iter()
        .map(|(symbol, name)| {
            name.parse::<TaskStatus>()
                .map(|status| (status, symbol))
                .map_err(|_| ConfigError::UnknownStatus(name.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let written = primary.len();
    for (i, (status, raw)) in primary.into_iter().chain(aliases).enumerate() {
        let symbol = single_char(raw).ok_or_else(|| ConfigError::InvalidStatusSymbol {
            status: status.to_string(),
            symbol: raw.clone(),
        })?;
        if let Some(&first) = lookup.get(&symbol)
            && first != status
        {
            return Err(ConfigError::DuplicateStatusSymbol {
                symbol,
                first,
                second: status,
            });
        }
        lookup.insert(symbol, status);
        if i < written {
            symbols.insert(status, symbol);
        }
    }

    Ok(StatusMap { symbols, lookup })
}

/// Lowercase with single spaces between words
fn normalize_words(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn build_date_rules(cfg: &DateConfig) -> Result<DateRules, ConfigError> {
    let mut phrases = Vec::with_capacity(cfg.phrases.len());
    for (phrase, offset) in &cfg.phrases {
        let phrase = normalize_words(phrase);
        if phrase.is_empty() {
            return Err(ConfigError::EmptyPhrase("phrase"));
        }
        let parsed = RelativeOffset::parse(offset).ok_or_else(|| ConfigError::InvalidOffset {
            phrase: phrase.clone(),
            offset: offset.clone(),
        })?;
        phrases.push((phrase, parsed));
    }
    phrases.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut keywords = Vec::new();
    for (words, field) in [
        (&cfg.keywords.start, DateField::Start),
        (&cfg.keywords.due, DateField::Due),
        (&cfg.keywords.scheduled, DateField::Scheduled),
    ] {
        for word in words {
            let word = normalize_words(word);
            if word.is_empty() {
                return Err(ConfigError::EmptyPhrase("keyword"));
            }
            keywords.push((word, field));
        }
    }
    keywords.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    for fmt in &cfg.absolute_formats {
        let broken = fmt.trim().is_empty()
            || StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error));
        if broken {
            return Err(ConfigError::InvalidDateFormat(fmt.clone()));
        }
    }

    Ok(DateRules {
        phrases,
        keywords,
        absolute_formats: cfg.absolute_formats.clone(),
        weekdays: cfg.weekdays,
        relative_units: cfg.relative_units,
    })
}
