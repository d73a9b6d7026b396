use std::sync::LazyLock;

use regex::Regex;

use crate::model::record::{Location, TaskRecord};
use crate::parse::body::collect_body;
use crate::parse::classifier::checkbox_symbol;
use crate::parse::fields::FieldTables;

/// Checkbox prefix of a task line, through the trailing spaces
static CHECKBOX_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^- \[.\]\s*").expect("valid checkbox prefix regex"));

/// Build a full record from the task line at `index` (0-based; must be in
/// range). The line itself is kept verbatim as the record title so later
/// serialization reproduces the source text exactly.
pub fn parse_task_line(
    lines: &[&str],
    index: usize,
    file_path: &str,
    tables: &FieldTables,
    indent_unit: &str,
) -> TaskRecord {
    let line = lines[index];
    let body = collect_body(lines, index + 1, indent_unit);

    let mut record = TaskRecord::new(
        checkbox_symbol(line),
        line.to_string(),
        file_path.to_string(),
    );

    record.id = synthetic_id(file_path, index + 1);
    extract_fields(&mut record, tables);

    record.location = Location {
        start_line: index + 1,
        start_char_index: 0,
        end_line: index + 1 + body.len(),
        end_char_index: body.last().map_or(line.len(), |last| last.len()),
    };
    record.body = body;

    record
}

/// Re-derive every inline field from the record's current title line.
/// Called after a parse and again after any edit that rewrites the line,
/// so the structured fields never drift from the text.
pub fn extract_fields(record: &mut TaskRecord, tables: &FieldTables) {
    let line = record.title.clone();
    record.legacy_id = tables.id(&line);
    record.created = tables.created(&line);
    record.start = tables.start(&line);
    record.scheduled = tables.scheduled(&line);
    record.due = tables.due(&line);
    record.completion = tables.completion(&line);
    record.cancelled = tables.cancelled(&line);
    record.time = tables.time(&line);
    record.priority = tables.priority(&line);
    record.tags = tables.tags(&line);
    record.depends_on = tables.depends_on(&line);
    record.reminder = tables.reminder(&line, &record.start, &record.scheduled, &record.due);
}

/// The line text after the checkbox, for display
pub fn title_text(line: &str) -> String {
    CHECKBOX_PREFIX.replace(line.trim_start(), "").to_string()
}

/// Deterministic record id from the source path and start line. Rescanning
/// unchanged text reproduces the same id, so ids stay stable across runs.
pub fn synthetic_id(file_path: &str, start_line: usize) -> u32 {
    const FNV_OFFSET: u32 = 0x811c_9dc5;
    const FNV_PRIME: u32 = 0x0100_0193;
    let mut hash = FNV_OFFSET;
    for byte in file_path.bytes().chain(start_line.to_le_bytes()) {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    // 0 is reserved for "no id"
    hash.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::HeaderKeys;
    use pretty_assertions::assert_eq;

    fn tables() -> FieldTables {
        FieldTables::new(&HeaderKeys::default())
    }

    #[test]
    fn test_parses_full_line() {
        let doc = vec!["- [ ] Buy milk 📅 2025-01-10 ⏫ #errand", "\tskim, not whole"];
        let record = parse_task_line(&doc, 0, "inbox.md", &tables(), "\t");

        assert_eq!(record.status, ' ');
        assert_eq!(record.title, "- [ ] Buy milk 📅 2025-01-10 ⏫ #errand");
        assert_eq!(record.due, "2025-01-10");
        assert_eq!(record.priority, 2);
        assert_eq!(record.tags, vec!["#errand"]);
        assert_eq!(record.body, vec!["\tskim, not whole"]);
        assert_eq!(record.file_path, "inbox.md");
    }

    #[test]
    fn test_location_spans_body() {
        let doc = vec!["intro", "- [ ] task", "\tnote one", "\tnote two", "after"];
        let record = parse_task_line(&doc, 1, "a.md", &tables(), "\t");

        assert_eq!(record.location.start_line, 2);
        assert_eq!(record.location.start_char_index, 0);
        assert_eq!(record.location.end_line, 4);
        assert_eq!(record.location.end_char_index, "\tnote two".len());
    }

    #[test]
    fn test_location_without_body_ends_on_task_line() {
        let doc = vec!["- [x] done ✅ 2025-01-02"];
        let record = parse_task_line(&doc, 0, "a.md", &tables(), "\t");

        assert_eq!(record.location.start_line, 1);
        assert_eq!(record.location.end_line, 1);
        assert_eq!(record.location.end_char_index, doc[0].len());
        assert_eq!(record.completion, "2025-01-02");
    }

    #[test]
    fn test_clock_reminder_uses_extracted_dates() {
        let doc = vec!["- [ ] call 🛫 2025-03-01 (@08:30)"];
        let record = parse_task_line(&doc, 0, "a.md", &tables(), "\t");
        assert_eq!(record.reminder, "2025-03-01T08:30");
    }

    #[test]
    fn test_synthetic_id_is_stable_and_position_sensitive() {
        assert_eq!(synthetic_id("a.md", 3), synthetic_id("a.md", 3));
        assert_ne!(synthetic_id("a.md", 3), synthetic_id("a.md", 4));
        assert_ne!(synthetic_id("a.md", 3), synthetic_id("b.md", 3));
        assert_ne!(synthetic_id("", 0), 0);
    }

    #[test]
    fn test_legacy_id_kept_alongside_synthetic() {
        let doc = vec!["- [ ] tracked 🆔 k9x"];
        let record = parse_task_line(&doc, 0, "a.md", &tables(), "\t");
        assert_eq!(record.legacy_id, "k9x");
        assert!(record.id != 0);
        assert_eq!(record.durable_id(), Some("k9x"));
    }

    #[test]
    fn test_title_text() {
        assert_eq!(title_text("- [x] Pay rent 📅 2025-01-01"), "Pay rent 📅 2025-01-01");
        assert_eq!(title_text("\t- [ ] nested"), "nested");
    }
}
