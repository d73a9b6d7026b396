use regex::Regex;

use crate::model::config::HeaderKeys;

/// Date value in either supported order
const DATE: &str = r"(\d{4}-\d{2}-\d{2}|\d{2}-\d{2}-\d{4})";

/// Date value with an optional trailing time, as completion stamps carry
const DATE_TIME: &str = r"((?:\d{4}-\d{2}-\d{2}|\d{2}-\d{2}-\d{4})(?:[T ]\d{2}:\d{2})?)";

/// Allowed characters in a single task id
const ID: &str = r"([a-zA-Z0-9_-]+)";

/// Comma-separated sequence of task ids
const ID_SEQ: &str = r"([a-zA-Z0-9_-]+(?: *, *[a-zA-Z0-9_-]+ *)*)";

/// `HH:MM - HH:MM` with flexible inner spacing
const TIME_RANGE: &str = r"(\d{2}:\d{2}\s*-\s*\d{2}:\d{2})";

/// Single-valued fields a task line can carry inline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Created,
    Start,
    Scheduled,
    Due,
    Completion,
    Cancelled,
    Id,
    DependsOn,
    Time,
    Priority,
    Reminder,
}

/// Compiled dialect rows for every inline field.
///
/// Each field owns an ordered row list: the marker-symbol dialect first,
/// then `[key:: value]`, then `@key(value)`. Extraction walks the rows in
/// that order and takes the first hit; rows never merge. Key names come
/// from the header-key table so inline and header aliasing stay in step.
pub struct FieldTables {
    created: Vec<Regex>,
    start: Vec<Regex>,
    scheduled: Vec<Regex>,
    due: Vec<Regex>,
    completion: Vec<Regex>,
    cancelled: Vec<Regex>,
    id: Vec<Regex>,
    depends_on: Vec<Regex>,
    time: Vec<Regex>,
    priority_marker: Regex,
    priority_value: Vec<Regex>,
    reminder_keyed: Vec<Regex>,
    reminder_stamp: Regex,
    reminder_clock: Regex,
    recurrence: Vec<Regex>,
    tags: Regex,
}

impl FieldTables {
    /// Compile every dialect row once. All dynamic parts are escaped, so
    /// the patterns are valid by construction.
    pub fn new(keys: &HeaderKeys) -> FieldTables {
        FieldTables {
            created: date_rows("➕", &keys.created),
            start: date_rows("🛫", &keys.start),
            scheduled: date_rows("(?:⏳|⌛)", &keys.scheduled),
            due: date_rows("(?:📅|📆|🗓)", &keys.due),
            completion: vec![
                marker_row("✅", DATE_TIME),
                keyed_row(&keys.completion, DATE_TIME),
                call_row(&keys.completion, DATE_TIME),
            ],
            cancelled: date_rows("❌", &keys.cancelled),
            id: vec![
                marker_row("🆔", ID),
                keyed_row(&keys.id, ID),
                call_row(&keys.id, ID),
            ],
            depends_on: vec![
                marker_row("⛔", ID_SEQ),
                keyed_row(&keys.depends_on, r"([^\]]+)"),
                call_row(&keys.depends_on, r"(.*?)"),
            ],
            time: vec![
                marker_row("⏰", TIME_RANGE),
                marker_row("⏰", &format!(r"\[{}\]", TIME_RANGE)),
                keyed_row(&keys.time, TIME_RANGE),
                call_row(&keys.time, TIME_RANGE),
                compile(&format!(r"^- \[.\]\s*{}", TIME_RANGE)),
            ],
            priority_marker: marker_row("(🔺|⏫|🔼|🔽|⏬)", ""),
            priority_value: vec![
                keyed_row(&keys.priority, r"(\d{1,2})"),
                call_row(&keys.priority, r"(\d{1,2})"),
            ],
            reminder_keyed: vec![
                keyed_row(&keys.reminder, r"(.*?)"),
                call_row(&keys.reminder, r"(.*?)"),
            ],
            reminder_stamp: compile(r"\(@(\d{4}-\d{2}-\d{2}(?: \d{2}:\d{2})?)\)"),
            reminder_clock: compile(r"\(@(\d{2}:\d{2})\)"),
            recurrence: vec![
                marker_row("🔁", ""),
                compile(r"\[recurring::.*?\]"),
                compile(r"@recurring\(.*?\)"),
            ],
            tags: compile(r##"(^|\s)#[^ !@#$%^&*(),.?":{}|<>]+"##),
        }
    }

    pub fn created(&self, text: &str) -> String {
        first_value(&self.created, text).unwrap_or_default()
    }

    pub fn start(&self, text: &str) -> String {
        first_value(&self.start, text).unwrap_or_default()
    }

    pub fn scheduled(&self, text: &str) -> String {
        first_value(&self.scheduled, text).unwrap_or_default()
    }

    pub fn due(&self, text: &str) -> String {
        first_value(&self.due, text).unwrap_or_default()
    }

    pub fn completion(&self, text: &str) -> String {
        first_value(&self.completion, text).unwrap_or_default()
    }

    pub fn cancelled(&self, text: &str) -> String {
        first_value(&self.cancelled, text).unwrap_or_default()
    }

    pub fn id(&self, text: &str) -> String {
        first_value(&self.id, text).unwrap_or_default()
    }

    pub fn depends_on(&self, text: &str) -> Vec<String> {
        let Some(sequence) = first_value(&self.depends_on, text) else {
            return Vec::new();
        };
        sequence
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn time(&self, text: &str) -> String {
        first_value(&self.time, text).unwrap_or_default()
    }

    /// Rank 1 (highest) through 5 (lowest); 0 when the line carries none
    pub fn priority(&self, text: &str) -> u8 {
        if let Some(caps) = self.priority_marker.captures(text) {
            return marker_rank(&caps[1]);
        }
        first_value(&self.priority_value, text)
            .and_then(|value| value.parse().ok())
            .unwrap_or(0)
    }

    /// Resolved reminder as `YYYY-MM-DDTHH:MM`. A bare `(@HH:MM)` resolves
    /// against whichever of start/scheduled/due is present, in that order,
    /// and is empty when none is.
    pub fn reminder(&self, text: &str, start: &str, scheduled: &str, due: &str) -> String {
        if let Some(value) = first_value(&self.reminder_keyed, text) {
            return value.replacen(' ', "T", 1).trim().to_string();
        }
        if let Some(caps) = self.reminder_stamp.captures(text) {
            let value = &caps[1];
            return match value.split_once(' ') {
                Some((date, time)) => format!("{date}T{time}"),
                None => format!("{value}T09:00"),
            };
        }
        if let Some(caps) = self.reminder_clock.captures(text) {
            let base = [start, scheduled, due].into_iter().find(|d| !d.is_empty());
            if let Some(base) = base {
                return format!("{base}T{}", &caps[1]);
            }
        }
        String::new()
    }

    /// Whitespace/line-start anchored `#` tokens; `#`s embedded in URLs
    /// have no preceding whitespace and are skipped.
    pub fn tags(&self, text: &str) -> Vec<String> {
        self.tags
            .find_iter(text)
            .map(|m| m.as_str().trim().to_string())
            .collect()
    }

    pub fn is_recurring(&self, text: &str) -> bool {
        self.recurrence.iter().any(|row| row.is_match(text))
    }

    /// Byte range of the first dialect row matching `text`, in row order
    pub fn find_span(&self, field: Field, text: &str) -> Option<(usize, usize)> {
        self.row_refs(field)
            .into_iter()
            .find_map(|row| row.find(text).map(|m| (m.start(), m.end())))
    }

    fn row_refs(&self, field: Field) -> Vec<&Regex> {
        match field {
            Field::Created => self.created.iter().collect(),
            Field::Start => self.start.iter().collect(),
            Field::Scheduled => self.scheduled.iter().collect(),
            Field::Due => self.due.iter().collect(),
            Field::Completion => self.completion.iter().collect(),
            Field::Cancelled => self.cancelled.iter().collect(),
            Field::Id => self.id.iter().collect(),
            Field::DependsOn => self.depends_on.iter().collect(),
            Field::Time => self.time.iter().collect(),
            Field::Priority => std::iter::once(&self.priority_marker)
                .chain(&self.priority_value)
                .collect(),
            Field::Reminder => self
                .reminder_keyed
                .iter()
                .chain([&self.reminder_stamp, &self.reminder_clock])
                .collect(),
        }
    }
}

/// Format a field value in its write dialect. Alternate dialects are read
/// but never produced.
pub fn format_primary(field: Field, value: &str) -> String {
    match field {
        Field::Created => format!("➕ {value}"),
        Field::Start => format!("🛫 {value}"),
        Field::Scheduled => format!("⏳ {value}"),
        Field::Due => format!("📅 {value}"),
        Field::Completion => format!("✅ {value}"),
        Field::Cancelled => format!("❌ {value}"),
        Field::Id => format!("🆔 {value}"),
        Field::DependsOn => format!("⛔ {value}"),
        Field::Time => format!("⏰ {value}"),
        Field::Priority => {
            let rank = value.parse().unwrap_or(0);
            marker_for_rank(rank).unwrap_or_default().to_string()
        }
        Field::Reminder => format!("(@{})", value.replacen('T', " ", 1)),
    }
}

pub fn marker_rank(marker: &str) -> u8 {
    match marker {
        "🔺" => 1,
        "⏫" => 2,
        "🔼" => 3,
        "🔽" => 4,
        "⏬" => 5,
        _ => 0,
    }
}

pub fn marker_for_rank(rank: u8) -> Option<&'static str> {
    match rank {
        1 => Some("🔺"),
        2 => Some("⏫"),
        3 => Some("🔼"),
        4 => Some("🔽"),
        5 => Some("⏬"),
        _ => None,
    }
}

fn first_value(rows: &[Regex], text: &str) -> Option<String> {
    rows.iter().find_map(|row| {
        row.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
    })
}

fn date_rows(symbols: &str, key: &str) -> Vec<Regex> {
    vec![
        marker_row(symbols, DATE),
        keyed_row(key, DATE),
        call_row(key, DATE),
    ]
}

/// Marker dialect: emoji, optional variant selector 16, value
fn marker_row(symbols: &str, value: &str) -> Regex {
    if value.is_empty() {
        compile(&format!("{symbols}\u{FE0F}?"))
    } else {
        compile(&format!("{symbols}\u{FE0F}? *{value}"))
    }
}

/// Inline-key dialect: `[key:: value]`
fn keyed_row(key: &str, value: &str) -> Regex {
    compile(&format!(r"\[{}::\s*{value}\]", regex::escape(key)))
}

/// Call-style dialect: `@key(value)`
fn call_row(key: &str, value: &str) -> Regex {
    compile(&format!(r"@{}\(\s*{value}\s*\)", regex::escape(key)))
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid field regex")
}
