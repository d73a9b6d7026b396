use thiserror::Error;
use toml_edit::{Array, DocumentMut, Item, Value};

use crate::model::config::NoteConfig;
use crate::model::record::{Location, TaskRecord};
use crate::model::status::StatusSet;
use crate::parse::classifier::is_task_line;
use crate::parse::frontmatter;
use crate::parse::line::synthetic_id;

#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("malformed header in {path}: {source}")]
    Malformed {
        path: String,
        source: toml_edit::TomlError,
    },
}

/// Build the whole-document record for a task note, or `None` when the
/// document has no header or its tags lack the identifier token.
///
/// Header keys follow the same aliasing table as inline dialects. Priority
/// accepts a rank name or a number; status accepts a symbol or a configured
/// status name. The body lists every task line found in the content, and
/// the location spans the whole document.
pub fn read_note(
    document: &str,
    path: &str,
    config: &NoteConfig,
    statuses: &StatusSet,
) -> Result<Option<TaskRecord>, HeaderError> {
    let Some(parts) = frontmatter::split(document) else {
        return Ok(None);
    };
    let header: DocumentMut = parts.header.parse().map_err(|source| HeaderError::Malformed {
        path: path.to_string(),
        source,
    })?;
    if !is_task_note(&header, config) {
        return Ok(None);
    }

    let keys = &config.keys;
    let mut record = TaskRecord::new(
        status_symbol(&first_value(&header, &keys.status), statuses),
        first_value(&header, &keys.title),
        path.to_string(),
    );
    record.id = synthetic_id(path, 1);
    record.legacy_id = first_value(&header, &keys.id);
    record.created = first_value(&header, &keys.created);
    record.start = first_value(&header, &keys.start);
    record.scheduled = first_value(&header, &keys.scheduled);
    record.due = first_value(&header, &keys.due);
    record.cancelled = first_value(&header, &keys.cancelled);
    record.completion = first_value(&header, &keys.completion);
    record.time = first_value(&header, &keys.time);
    record.priority = priority_rank(&first_value(&header, &keys.priority));
    record.tags = list_values(&header, &keys.tags);
    record.depends_on = list_values(&header, &keys.depends_on);
    record.reminder = first_value(&header, &keys.reminder);

    record.body = parts
        .body
        .split('\n')
        .filter(|line| is_task_line(line))
        .map(String::from)
        .collect();

    let lines: Vec<&str> = document.split('\n').collect();
    record.location = Location::new(1, lines.len(), lines.last().map_or(0, |l| l.len()));

    Ok(Some(record))
}

/// Merge the record's fields into the document's header, leaving unrelated
/// keys, ordering, comments, and the body untouched. A document without a
/// header gets one prepended.
pub fn update_header(
    document: &str,
    record: &TaskRecord,
    config: &NoteConfig,
    statuses: &StatusSet,
) -> Result<String, HeaderError> {
    let (header_text, body) = match frontmatter::split(document) {
        Some(parts) => (parts.header, parts.body),
        None => ("", document),
    };
    let mut header: DocumentMut =
        header_text.parse().map_err(|source| HeaderError::Malformed {
            path: record.file_path.clone(),
            source,
        })?;
    let keys = &config.keys;

    header[keys.title.as_str()] = toml_edit::value(record.title.as_str());
    write_tags(&mut header, &keys.tags, &config.identifier, &record.tags);

    let status_name = statuses
        .name_of(record.status)
        .map(str::to_string)
        .unwrap_or_else(|| record.status.to_string());
    header[keys.status.as_str()] = toml_edit::value(status_name);

    match rank_name(record.priority) {
        Some(name) => header[keys.priority.as_str()] = toml_edit::value(name),
        None => {
            header.remove(&keys.priority);
        }
    }

    set_or_remove(&mut header, &keys.created, &record.created);
    set_or_remove(&mut header, &keys.start, &record.start);
    set_or_remove(&mut header, &keys.scheduled, &record.scheduled);
    set_or_remove(&mut header, &keys.due, &record.due);
    set_or_remove(&mut header, &keys.cancelled, &record.cancelled);
    set_or_remove(&mut header, &keys.completion, &record.completion);
    set_or_remove(&mut header, &keys.time, &record.time);
    set_or_remove(&mut header, &keys.reminder, &record.reminder);
    write_list(&mut header, &keys.depends_on, &record.depends_on);
    if !record.legacy_id.is_empty() {
        header[keys.id.as_str()] = toml_edit::value(record.legacy_id.as_str());
    }

    Ok(format!("+++\n{header}+++\n{body}"))
}

/// Whether the header's tags carry the task-note identifier token
pub fn is_task_note(header: &DocumentMut, config: &NoteConfig) -> bool {
    let needle = config.identifier.to_ascii_lowercase();
    header
        .get(&config.keys.tags)
        .map(item_values)
        .unwrap_or_default()
        .iter()
        .flat_map(|value| value.split(','))
        .any(|tag| tag.trim().to_ascii_lowercase().contains(&needle))
}

/// Rank names accepted in headers, mirroring the inline priority scale
pub fn priority_rank(value: &str) -> u8 {
    match value.trim().to_ascii_lowercase().as_str() {
        "" => 0,
        "highest" => 1,
        "high" => 2,
        "medium" => 3,
        "low" => 4,
        "lowest" => 5,
        number => match number.parse::<u8>() {
            Ok(rank) if rank <= 5 => rank,
            _ => 0,
        },
    }
}

pub fn rank_name(priority: u8) -> Option<&'static str> {
    match priority {
        1 => Some("highest"),
        2 => Some("high"),
        3 => Some("medium"),
        4 => Some("low"),
        5 => Some("lowest"),
        _ => None,
    }
}

fn status_symbol(value: &str, statuses: &StatusSet) -> char {
    let value = value.trim();
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (None, _) => ' ',
        (Some(symbol), None) => symbol,
        _ => statuses.symbol_for_name(value).unwrap_or(' '),
    }
}

fn set_or_remove(header: &mut DocumentMut, key: &str, value: &str) {
    if value.is_empty() {
        header.remove(key);
    } else {
        header[key] = toml_edit::value(value);
    }
}

/// The record's tags replace the header list wholesale, so a removal
/// sticks; the identifier token always leads.
fn write_tags(header: &mut DocumentMut, key: &str, identifier: &str, tags: &[String]) {
    let mut merged: Vec<String> = vec![identifier.to_string()];
    for tag in tags {
        let clean = tag.trim().trim_start_matches('#').to_string();
        if !clean.is_empty() && !merged.contains(&clean) {
            merged.push(clean);
        }
    }
    let mut array = Array::new();
    for tag in &merged {
        array.push(tag.as_str());
    }
    header[key] = toml_edit::value(array);
}

fn write_list(header: &mut DocumentMut, key: &str, values: &[String]) {
    if values.is_empty() {
        header.remove(key);
        return;
    }
    let mut array = Array::new();
    for value in values {
        array.push(value.as_str());
    }
    header[key] = toml_edit::value(array);
}

fn first_value(header: &DocumentMut, key: &str) -> String {
    header
        .get(key)
        .map(item_values)
        .unwrap_or_default()
        .into_iter()
        .next()
        .unwrap_or_default()
}

/// List values, splitting comma-joined scalars the way arrays are read
fn list_values(header: &DocumentMut, key: &str) -> Vec<String> {
    header
        .get(key)
        .map(item_values)
        .unwrap_or_default()
        .iter()
        .flat_map(|value| value.split(','))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

fn item_values(item: &Item) -> Vec<String> {
    match item {
        Item::Value(value) => value_strings(value),
        _ => Vec::new(),
    }
}

fn value_strings(value: &Value) -> Vec<String> {
    match value {
        Value::String(text) => vec![text.value().clone()],
        Value::Integer(number) => vec![number.value().to_string()],
        Value::Float(number) => vec![number.value().to_string()],
        Value::Boolean(flag) => vec![flag.value().to_string()],
        Value::Datetime(stamp) => vec![stamp.value().to_string()],
        Value::Array(items) => items.iter().flat_map(value_strings).collect(),
        Value::InlineTable(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NOTE: &str = "+++\n\
        title = \"Plan the trip\"\n\
        tags = [\"taskNote\", \"travel\"]\n\
        status = \"in progress\"\n\
        priority = \"high\"\n\
        due = \"2025-07-01\"\n\
        dependsOn = [\"abc-1\"]\n\
        reminder = \"2025-06-30T09:00\"\n\
        +++\n\
        Some intro text.\n\
        - [ ] book flights\n\
        - [x] renew passport\n\
        plain line\n";

    #[test]
    fn test_read_note_maps_header_fields() {
        let config = NoteConfig::default();
        let statuses = StatusSet::default();
        let record = read_note(NOTE, "trip.md", &config, &statuses)
            .unwrap()
            .unwrap();

        assert_eq!(record.title, "Plan the trip");
        assert_eq!(record.status, '/');
        assert_eq!(record.priority, 2);
        assert_eq!(record.due, "2025-07-01");
        assert_eq!(record.tags, vec!["taskNote", "travel"]);
        assert_eq!(record.depends_on, vec!["abc-1"]);
        assert_eq!(record.reminder, "2025-06-30T09:00");
        assert_eq!(record.file_path, "trip.md");
        assert_eq!(record.location.start_line, 1);
    }

    #[test]
    fn test_read_note_body_lists_task_lines() {
        let config = NoteConfig::default();
        let record = read_note(NOTE, "trip.md", &config, &StatusSet::default())
            .unwrap()
            .unwrap();
        assert_eq!(record.body, vec!["- [ ] book flights", "- [x] renew passport"]);
    }

    #[test]
    fn test_read_note_skips_unmarked_documents() {
        let config = NoteConfig::default();
        let statuses = StatusSet::default();
        let plain = "+++\ntitle = \"notes\"\ntags = [\"journal\"]\n+++\ntext\n";
        assert!(read_note(plain, "a.md", &config, &statuses).unwrap().is_none());
        assert!(read_note("no header\n", "a.md", &config, &statuses).unwrap().is_none());
    }

    #[test]
    fn test_read_note_malformed_header() {
        let config = NoteConfig::default();
        let statuses = StatusSet::default();
        let broken = "+++\ntags = [\"taskNote\"\n+++\n";
        let err = read_note(broken, "bad.md", &config, &statuses).unwrap_err();
        let HeaderError::Malformed { path, .. } = err;
        assert_eq!(path, "bad.md");
    }

    #[test]
    fn test_status_accepts_symbol_or_name() {
        let statuses = StatusSet::default();
        assert_eq!(status_symbol("/", &statuses), '/');
        assert_eq!(status_symbol("in progress", &statuses), '/');
        assert_eq!(status_symbol("dropped", &statuses), '-');
        assert_eq!(status_symbol("unknown name", &statuses), ' ');
        assert_eq!(status_symbol("", &statuses), ' ');
    }

    #[test]
    fn test_priority_accepts_name_or_number() {
        assert_eq!(priority_rank("highest"), 1);
        assert_eq!(priority_rank("Medium"), 3);
        assert_eq!(priority_rank("4"), 4);
        assert_eq!(priority_rank(""), 0);
        assert_eq!(priority_rank("urgent"), 0);
        assert_eq!(priority_rank("9"), 0);
    }

    #[test]
    fn test_update_header_preserves_comments_and_unrelated_keys() {
        let doc = "+++\n\
            # planning note\n\
            title = \"Plan the trip\"\n\
            tags = [\"taskNote\"]\n\
            status = \"unchecked\"\n\
            owner = \"sam\"\n\
            +++\n\
            body stays\n";
        let config = NoteConfig::default();
        let statuses = StatusSet::default();
        let mut record = read_note(doc, "trip.md", &config, &statuses)
            .unwrap()
            .unwrap();
        record.status = 'x';
        record.due = "2025-07-01".to_string();

        let updated = update_header(doc, &record, &config, &statuses).unwrap();
        assert!(updated.contains("# planning note"));
        assert!(updated.contains("owner = \"sam\""));
        assert!(updated.contains("status = \"checked\""));
        assert!(updated.contains("due = \"2025-07-01\""));
        assert!(updated.ends_with("+++\nbody stays\n"));
    }

    #[test]
    fn test_update_header_removes_cleared_fields() {
        let doc = "+++\n\
            title = \"t\"\n\
            tags = [\"taskNote\"]\n\
            status = \"unchecked\"\n\
            due = \"2025-07-01\"\n\
            +++\n";
        let config = NoteConfig::default();
        let statuses = StatusSet::default();
        let mut record = read_note(doc, "t.md", &config, &statuses).unwrap().unwrap();
        record.due = String::new();

        let updated = update_header(doc, &record, &config, &statuses).unwrap();
        assert!(!updated.contains("due"));
    }

    #[test]
    fn test_update_header_drops_removed_tags() {
        let doc = "+++\n\
            title = \"t\"\n\
            tags = [\"taskNote\", \"travel\", \"summer\"]\n\
            status = \"unchecked\"\n\
            +++\n";
        let config = NoteConfig::default();
        let statuses = StatusSet::default();
        let mut record = read_note(doc, "t.md", &config, &statuses).unwrap().unwrap();
        record.tags.retain(|t| t != "summer");

        let updated = update_header(doc, &record, &config, &statuses).unwrap();
        assert!(updated.contains("tags = [\"taskNote\", \"travel\"]"));
        assert!(!updated.contains("summer"));
    }

    #[test]
    fn test_update_header_creates_missing_header() {
        let config = NoteConfig::default();
        let statuses = StatusSet::default();
        let mut record = TaskRecord::new(' ', "Fresh note".to_string(), "n.md".to_string());
        record.tags = vec!["#travel".to_string()];

        let updated = update_header("content only\n", &record, &config, &statuses).unwrap();
        assert!(updated.starts_with("+++\n"));
        assert!(updated.contains("title = \"Fresh note\""));
        assert!(updated.contains("tags = [\"taskNote\", \"travel\"]"));
        assert!(updated.ends_with("+++\ncontent only\n"));
    }

    #[test]
    fn test_update_header_keeps_existing_tags() {
        let doc = "+++\ntags = [\"taskNote\", \"old\"]\ntitle = \"t\"\nstatus = \"unchecked\"\n+++\n";
        let config = NoteConfig::default();
        let statuses = StatusSet::default();
        let mut record = read_note(doc, "t.md", &config, &statuses).unwrap().unwrap();
        record.tags.push("#new".to_string());

        let updated = update_header(doc, &record, &config, &statuses).unwrap();
        assert!(updated.contains("tags = [\"taskNote\", \"old\", \"new\"]"));
    }

    #[test]
    fn test_aliased_keys() {
        let mut config = NoteConfig::default();
        config.keys.due = "deadline".to_string();
        let statuses = StatusSet::default();
        let doc = "+++\ntags = [\"taskNote\"]\ndeadline = \"2025-12-01\"\n+++\n";
        let record = read_note(doc, "a.md", &config, &statuses).unwrap().unwrap();
        assert_eq!(record.due, "2025-12-01");
    }

    #[test]
    fn test_unquoted_toml_date_reads_as_string() {
        let config = NoteConfig::default();
        let statuses = StatusSet::default();
        let doc = "+++\ntags = [\"taskNote\"]\ndue = 2025-07-01\npriority = 2\n+++\n";
        let record = read_note(doc, "a.md", &config, &statuses).unwrap().unwrap();
        assert_eq!(record.due, "2025-07-01");
        assert_eq!(record.priority, 2);
    }
}
