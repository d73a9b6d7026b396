use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::io::journal::JournalEntry;
use crate::model::record::{NoteRecord, TaskRecord};
use crate::model::status::StatusSet;
use crate::ops::note::{priority_rank, rank_name};
use crate::parse::fields::Field;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ScanReportJson {
    pub scanned: usize,
    pub pending: usize,
    pub completed: usize,
    pub changed: Vec<String>,
    pub files: Vec<FileCountJson>,
}

#[derive(Serialize)]
pub struct FileCountJson {
    pub file: String,
    pub pending: usize,
    pub completed: usize,
}

#[derive(Serialize)]
pub struct FileTasksJson<'a> {
    pub file: &'a str,
    pub tasks: Vec<&'a TaskRecord>,
}

#[derive(Serialize)]
pub struct CheckReportJson {
    pub checked: usize,
    pub drifted: Vec<DriftJson>,
}

#[derive(Serialize)]
pub struct DriftJson {
    pub id: String,
    pub file: String,
    pub line: usize,
    pub error: String,
}

#[derive(Serialize)]
pub struct QueueJson<'a> {
    pub pending: Vec<&'a str>,
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// The durable id when the task carries one, the synthetic id otherwise
pub fn display_id(record: &TaskRecord) -> String {
    match record.durable_id() {
        Some(id) => id.to_string(),
        None => record.id.to_string(),
    }
}

/// Format a single task as a one-line summary
pub fn format_record_line(record: &TaskRecord) -> String {
    format!(
        "{:>10}  {}",
        display_id(record),
        record.title.trim_start()
    )
}

/// Format a document listing header
pub fn format_file_header(path: &str) -> String {
    format!("== {} ==", path)
}

/// Format detailed task view
pub fn format_record_detail(record: &TaskRecord, statuses: &StatusSet) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push(record.title.trim_start().to_string());
    lines.push(format!("id: {}", display_id(record)));
    lines.push(format!(
        "file: {}:{}",
        record.file_path, record.location.start_line
    ));
    match statuses.name_of(record.status) {
        Some(name) => lines.push(format!("status: {} [{}]", name, record.status)),
        None => lines.push(format!("status: [{}]", record.status)),
    }

    for (label, value) in [
        ("created", &record.created),
        ("start", &record.start),
        ("scheduled", &record.scheduled),
        ("due", &record.due),
        ("completion", &record.completion),
        ("cancelled", &record.cancelled),
        ("time", &record.time),
        ("reminder", &record.reminder),
    ] {
        if !value.is_empty() {
            lines.push(format!("{}: {}", label, value));
        }
    }

    if record.priority > 0 {
        match rank_name(record.priority) {
            Some(name) => lines.push(format!("priority: {} ({})", record.priority, name)),
            None => lines.push(format!("priority: {}", record.priority)),
        }
    }
    if !record.tags.is_empty() {
        lines.push(format!("tags: {}", record.tags.join(" ")));
    }
    if !record.depends_on.is_empty() {
        lines.push(format!("depends on: {}", record.depends_on.join(", ")));
    }

    if !record.body.is_empty() {
        lines.push("body:".to_string());
        for line in &record.body {
            lines.push(format!("  {}", line.trim_start()));
        }
    }

    lines
}

/// Format a task-note listing line
pub fn format_note_line(note: &NoteRecord) -> String {
    if note.reminder.is_empty() {
        note.file_path.clone()
    } else {
        format!("{} (reminder: {})", note.file_path, note.reminder)
    }
}

/// Format a journal entry for terminal display
pub fn format_journal_entry(entry: &JournalEntry) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!(
        "{}  {}: {}",
        entry.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        entry.category,
        entry.description
    ));
    for (key, value) in &entry.fields {
        lines.push(format!("  {}: {}", key, value));
    }
    for line in entry.body.lines() {
        lines.push(format!("    {}", line));
    }
    lines
}

// ---------------------------------------------------------------------------
// Argument parsing
// ---------------------------------------------------------------------------

/// Parse a status argument: a single character is a raw symbol, anything
/// longer must be a configured status name.
pub fn parse_status_value(value: &str, statuses: &StatusSet) -> Result<char, String> {
    let mut chars = value.chars();
    if let (Some(symbol), None) = (chars.next(), chars.next()) {
        return Ok(symbol);
    }
    statuses.symbol_for_name(value).ok_or_else(|| {
        format!(
            "unknown status '{}' (expected a symbol like 'x' or a configured name)",
            value
        )
    })
}

pub fn parse_field_name(name: &str) -> Result<Field, String> {
    match name {
        "created" => Ok(Field::Created),
        "start" => Ok(Field::Start),
        "scheduled" => Ok(Field::Scheduled),
        "due" => Ok(Field::Due),
        "completion" => Ok(Field::Completion),
        "cancelled" => Ok(Field::Cancelled),
        "id" => Ok(Field::Id),
        "depends-on" | "dependsOn" => Ok(Field::DependsOn),
        "time" => Ok(Field::Time),
        "priority" => Ok(Field::Priority),
        "reminder" => Ok(Field::Reminder),
        other => Err(format!(
            "unknown field '{}' (expected: created, start, scheduled, due, completion, cancelled, id, depends-on, time, priority, reminder)",
            other
        )),
    }
}

/// Reject values the inline dialects cannot represent
pub fn validate_field_value(field: Field, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Ok(());
    }
    match field {
        Field::Created
        | Field::Start
        | Field::Scheduled
        | Field::Due
        | Field::Completion
        | Field::Cancelled => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(|_| ())
            .map_err(|_| format!("invalid date '{}' (expected YYYY-MM-DD)", value)),
        Field::Reminder => {
            if NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").is_ok()
                || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
            {
                Ok(())
            } else {
                Err(format!(
                    "invalid reminder '{}' (expected YYYY-MM-DD or YYYY-MM-DDTHH:MM)",
                    value
                ))
            }
        }
        Field::Priority => {
            if value == "0" || priority_rank(value) > 0 {
                Ok(())
            } else {
                Err(format!(
                    "invalid priority '{}' (expected 0-5 or highest/high/medium/low/lowest)",
                    value
                ))
            }
        }
        _ => Ok(()),
    }
}

/// Parse a timestamp argument: RFC 3339, or a bare date taken as midnight UTC
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        && let Some(dt) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(dt.and_utc());
    }
    Err(format!("invalid timestamp '{}' (expected ISO-8601)", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_record() -> TaskRecord {
        let mut record = TaskRecord::new(
            ' ',
            "- [ ] Buy milk 📅 2025-01-10 #errand".to_string(),
            "inbox.md".to_string(),
        );
        record.id = 7;
        record.due = "2025-01-10".to_string();
        record.tags = vec!["#errand".to_string()];
        record
    }

    #[test]
    fn test_display_id_prefers_durable() {
        let mut record = sample_record();
        assert_eq!(display_id(&record), "7");
        record.legacy_id = "task-42".to_string();
        assert_eq!(display_id(&record), "task-42");
    }

    #[test]
    fn test_record_detail_skips_empty_fields() {
        let record = sample_record();
        let lines = format_record_detail(&record, &StatusSet::default());
        assert!(lines.contains(&"due: 2025-01-10".to_string()));
        assert!(lines.contains(&"tags: #errand".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("scheduled:")));
        assert!(!lines.iter().any(|l| l.starts_with("priority:")));
    }

    #[test]
    fn test_parse_status_value() {
        let statuses = StatusSet::default();
        assert_eq!(parse_status_value("x", &statuses), Ok('x'));
        assert_eq!(parse_status_value("/", &statuses), Ok('/'));
        assert_eq!(parse_status_value("checked", &statuses), Ok('x'));
        assert_eq!(parse_status_value("dropped", &statuses), Ok('-'));
        assert!(parse_status_value("bogus", &statuses).is_err());
    }

    #[test]
    fn test_parse_field_name() {
        assert_eq!(parse_field_name("due"), Ok(Field::Due));
        assert_eq!(parse_field_name("depends-on"), Ok(Field::DependsOn));
        assert!(parse_field_name("color").is_err());
    }

    #[test]
    fn test_validate_field_value() {
        assert!(validate_field_value(Field::Due, "2025-01-10").is_ok());
        assert!(validate_field_value(Field::Due, "tomorrow").is_err());
        assert!(validate_field_value(Field::Due, "").is_ok());
        assert!(validate_field_value(Field::Priority, "high").is_ok());
        assert!(validate_field_value(Field::Priority, "9").is_err());
        assert!(validate_field_value(Field::Reminder, "2025-01-10T09:00").is_ok());
    }

    #[test]
    fn test_parse_timestamp_accepts_bare_date() {
        let dt = parse_timestamp("2025-06-15").unwrap();
        assert_eq!(dt.to_rfc3339_opts(SecondsFormat::Secs, true), "2025-06-15T00:00:00Z");
        assert!(parse_timestamp("not-a-date").is_err());
    }
}
