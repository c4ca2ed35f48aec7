use chrono::format::{Fixed, Item, Numeric, StrftimeItems};
use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use regex::{Captures, Regex};
use tracing::debug;

use crate::model::config::{ConfigError, DateRules};
use crate::model::metadata::{DateField, PartialMetadata};
use crate::parse::span::{TextSpan, overlaps_any, remove_spans};
use crate::parse::tidy_line;
use crate::util::unicode::leading_indent;

const WEEKDAYS: [(&str, Weekday); 7] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

const MONTHS: [&str; 12] = [
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

/// Text that already encodes a value and must not be scanned:
/// `[key:: value]`, an icon date, a recurrence rule, a location, a tag or a context.
const PROTECTED: &str = concat!(
    r"\[[^\[\]\n]*::[^\[\]\n]*\]",
    r"|(?:🛫|📅|⏳|✅|➕|❌)\x{FE0F}?\s*\S+",
    r"|🔁\x{FE0F}?[^📅🛫⏳✅➕❌🔺⏫🔼🔽⏬📁#\[\n]*",
    r"|📁\x{FE0F}?\s*\S+",
    r"|[#@][\p{L}\p{N}_/-]+",
);

/// Result of scanning one line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineScan {
    /// The line with every recognized phrase (and its keyword) removed
    pub cleaned_line: String,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub scheduled_date: Option<NaiveDate>,
}

impl LineScan {
    pub fn date(&self, field: DateField) -> Option<NaiveDate> {
        match field {
            DateField::Start => self.start_date,
            DateField::Due => self.due_date,
            DateField::Scheduled => self.scheduled_date,
        }
    }

    fn date_mut(&mut self, field: DateField) -> &mut Option<NaiveDate> {
        match field {
            DateField::Start => &mut self.start_date,
            DateField::Due => &mut self.due_date,
            DateField::Scheduled => &mut self.scheduled_date,
        }
    }

    pub fn has_dates(&self) -> bool {
        DateField::ALL.iter().any(|f| self.date(*f).is_some())
    }

    /// The dates as a partial record
    pub fn dates(&self) -> PartialMetadata {
        PartialMetadata {
            start_date: self.start_date,
            due_date: self.due_date,
            scheduled_date: self.scheduled_date,
            ..PartialMetadata::default()
        }
    }
}

/// Finds natural-language date phrases in a line.
///
/// The scanner is built once from validated rules and a reference date.
/// Scanning is pure: the same line always yields the same result.
#[derive(Debug, Clone)]
pub struct DateScanner {
    rules: DateRules,
    today: NaiveDate,
    pattern: Regex,
    protected: Regex,
}

impl DateScanner {
    pub fn new(rules: &DateRules, today: NaiveDate) -> Result<Self, ConfigError> {
        let pattern = Regex::new(&build_pattern(rules)?)?;
        let protected = Regex::new(PROTECTED)?;
        Ok(DateScanner {
            rules: rules.clone(),
            today,
            pattern,
            protected,
        })
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Scan one line. A line without any phrase comes back unchanged.
    ///
    /// Each date field takes the first phrase routed to it; a later phrase for
    /// the same field is left in the text.
    pub fn scan_line(&self, line: &str) -> LineScan {
        let protected: Vec<TextSpan> = self
            .protected
            .find_iter(line)
            .map(|m| TextSpan::new(m.start(), m.end()))
            .collect();

        let mut scan = LineScan::default();
        let mut removals = Vec::new();

        for caps in self.pattern.captures_iter(line) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            if overlaps_any(&protected, &whole.range()) {
                continue;
            }
            let field = caps
                .name("kw")
                .and_then(|kw| self.keyword_field(kw.as_str()))
                .unwrap_or(DateField::Due);
            let Some(date) = self.resolve(&caps) else {
                continue;
            };
            let slot = scan.date_mut(field);
            if slot.is_some() {
                continue;
            }
            debug!(phrase = whole.as_str(), ?field, %date, "date phrase");
            *slot = Some(date);
            removals.push(TextSpan::new(whole.start(), whole.end()));
        }

        scan.cleaned_line = if removals.is_empty() {
            line.to_string()
        } else {
            // Matches start on a word boundary, so the indent is never cut
            let indent = leading_indent(line);
            let removed = remove_spans(line, &removals);
            tidy_line(indent, &removed[indent.len()..])
        };
        scan
    }

    fn keyword_field(&self, keyword: &str) -> Option<DateField> {
        let keyword = keyword
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        self.rules
            .keywords
            .iter()
            .find(|(k, _)| *k == keyword)
            .map(|(_, field)| *field)
    }

    fn resolve(&self, caps: &Captures<'_>) -> Option<NaiveDate> {
        for (idx, fmt) in self.rules.absolute_formats.iter().enumerate() {
            if let Some(abs) = caps.name(&format!("abs{idx}")) {
                return NaiveDate::parse_from_str(abs.as_str(), fmt).ok();
            }
        }
        if let Some(day) = caps.name("nextwd") {
            let ahead = days_until(self.today, weekday(day.as_str())?);
            return self
                .today
                .checked_add_days(Days::new(if ahead == 0 { 7 } else { ahead }));
        }
        if let Some(day) = caps.name("wd") {
            let ahead = days_until(self.today, weekday(day.as_str())?);
            return self.today.checked_add_days(Days::new(ahead));
        }
        if let (Some(n), Some(unit)) = (caps.name("n"), caps.name("unit")) {
            let n: u32 = n.as_str().parse().ok()?;
            let unit = unit.as_str().to_lowercase();
            return if unit.starts_with("day") {
                self.today.checked_add_days(Days::new(u64::from(n)))
            } else if unit.starts_with("week") {
                self.today.checked_add_days(Days::new(u64::from(n) * 7))
            } else if unit.starts_with("month") {
                self.today.checked_add_months(Months::new(n))
            } else {
                self.today.checked_add_months(Months::new(n.checked_mul(12)?))
            };
        }
        let phrase = caps.name("phrase")?.as_str();
        let phrase = phrase
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        self.rules
            .phrases
            .iter()
            .find(|(p, _)| *p == phrase)
            .and_then(|(_, offset)| offset.apply(self.today))
    }
}

fn weekday(name: &str) -> Option<Weekday> {
    let name = name.to_lowercase();
    WEEKDAYS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, day)| *day)
}

/// Days from `today` to the next `target`, 0 when today is `target`
fn days_until(today: NaiveDate, target: Weekday) -> u64 {
    let from = today.weekday().num_days_from_monday();
    let to = target.num_days_from_monday();
    u64::from((to + 7 - from) % 7)
}

/// Escape a configured word and let any whitespace inside it stretch
fn word_pattern(word: &str) -> String {
    word.split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+")
}

/// Regex matching what `format` writes. `None` when the format has an item
/// with no fixed shape to match, such as a time zone or fractional seconds.
fn format_pattern(format: &str) -> Option<String> {
    let long: Vec<&str> = MONTHS.to_vec();
    let short: Vec<&str> = MONTHS.iter().map(|m| &m[..3]).collect();
    let days_long: Vec<&str> = WEEKDAYS.iter().map(|(n, _)| *n).collect();
    let days_short: Vec<&str> = WEEKDAYS.iter().map(|(n, _)| &n[..3]).collect();

    let mut out = String::new();
    for item in StrftimeItems::new(format) {
        let piece = match item {
            Item::Literal(s) => regex::escape(s),
            Item::OwnedLiteral(s) => regex::escape(&s),
            Item::Space(_) | Item::OwnedSpace(_) => r"\s+".to_string(),
            Item::Numeric(numeric, _) => match numeric {
                Numeric::Year | Numeric::IsoYear => r"\d{4}",
                Numeric::YearDiv100
                | Numeric::YearMod100
                | Numeric::IsoYearDiv100
                | Numeric::IsoYearMod100 => r"\d{2}",
                Numeric::Ordinal => r"\d{1,3}",
                Numeric::WeekdayFromMon | Numeric::NumDaysFromSun => r"\d",
                Numeric::Timestamp | Numeric::Nanosecond => r"\d+",
                _ => r"\d{1,2}",
            }
            .to_string(),
            Item::Fixed(Fixed::ShortMonthName) => format!("(?:{})", short.join("|")),
            // The parser takes the full name or its abbreviation
            Item::Fixed(Fixed::LongMonthName) => {
                format!("(?:{}|{})", long.join("|"), short.join("|"))
            }
            Item::Fixed(Fixed::ShortWeekdayName) => format!("(?:{})", days_short.join("|")),
            Item::Fixed(Fixed::LongWeekdayName) => {
                format!("(?:{}|{})", days_long.join("|"), days_short.join("|"))
            }
            Item::Fixed(Fixed::LowerAmPm | Fixed::UpperAmPm) => "[ap]m".to_string(),
            _ => return None,
        };
        out.push_str(&piece);
    }
    (!out.is_empty()).then_some(out)
}

fn build_pattern(rules: &DateRules) -> Result<String, ConfigError> {
    let mut alternatives = Vec::new();
    // Absolute formats first so `%A, %B %d` is not cut short at the weekday
    for (idx, fmt) in rules.absolute_formats.iter().enumerate() {
        let pattern =
            format_pattern(fmt).ok_or_else(|| ConfigError::InvalidDateFormat(fmt.clone()))?;
        alternatives.push(format!("(?P<abs{idx}>{pattern})"));
    }
    if !rules.phrases.is_empty() {
        let phrases: Vec<String> = rules.phrases.iter().map(|(p, _)| word_pattern(p)).collect();
        alternatives.push(format!("(?P<phrase>{})", phrases.join("|")));
    }
    if rules.weekdays {
        let days: Vec<&str> = WEEKDAYS.iter().map(|(n, _)| *n).collect();
        let days = days.join("|");
        alternatives.push(format!(r"next\s+(?P<nextwd>{days})"));
        alternatives.push(format!("(?P<wd>{days})"));
    }
    if rules.relative_units {
        alternatives.push(r"in\s+(?P<n>\d{1,3})\s+(?P<unit>days?|weeks?|months?|years?)".to_string());
    }
    if alternatives.is_empty() {
        // Matches nothing
        return Ok(r"\b\B".to_string());
    }

    let keywords: Vec<String> = rules.keywords.iter().map(|(k, _)| word_pattern(k)).collect();
    let keyword = if keywords.is_empty() {
        String::new()
    } else {
        format!(r"(?:(?P<kw>{})\s+)?", keywords.join("|"))
    };
    Ok(format!(r"(?i)\b{keyword}(?:{})\b", alternatives.join("|")))
}
