use std::sync::LazyLock;

use regex::Regex;

use crate::model::record::TaskRecord;
use crate::parse::fields::{Field, FieldTables, format_primary};

static STATUS_BOX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.\]").expect("valid status box regex"));

/// Emit a record exactly as it reads in its source document: the stored
/// first line with the current status stamped into its checkbox, then the
/// body lines. Because the title is kept verbatim at parse time, every
/// dialect round-trips unchanged.
pub fn serialize_record(record: &TaskRecord) -> String {
    let line = stamp_status(&record.title, record.status);
    let body = record.body.join("\n");
    if body.trim().is_empty() {
        line
    } else {
        format!("{line}\n{body}")
    }
}

/// Replace the first checkbox on the line with `symbol`
pub fn stamp_status(line: &str, symbol: char) -> String {
    let stamped = format!("[{symbol}]");
    STATUS_BOX.replacen(line, 1, stamped.as_str()).to_string()
}

/// Rewrite one field's inline value on a task line.
///
/// Whatever dialect currently carries the field is replaced by the write
/// dialect. A missing field is appended at the end of the line; an empty
/// `value` removes the field. Lines without the field stay untouched on
/// removal.
pub fn rewrite_field(line: &str, field: Field, value: &str, tables: &FieldTables) -> String {
    let formatted = if value.is_empty() {
        String::new()
    } else {
        format_primary(field, value)
    };

    match tables.find_span(field, line) {
        Some((start, end)) if formatted.is_empty() => splice(line, start, end, ""),
        Some((start, end)) => splice(line, start, end, &formatted),
        None if formatted.is_empty() => line.to_string(),
        None => format!("{} {formatted}", line.trim_end()),
    }
}

/// Append a tag unless the line already carries it
pub fn add_tag(line: &str, tag: &str, tables: &FieldTables) -> String {
    let tag = normalize_tag(tag);
    if tables.tags(line).iter().any(|t| *t == tag) {
        return line.to_string();
    }
    format!("{} {tag}", line.trim_end())
}

/// Remove one tag token, leaving the rest of the line intact
pub fn remove_tag(line: &str, tag: &str) -> String {
    let tag = normalize_tag(tag);
    let pattern = Regex::new(&format!(r"(^|\s){}(\s|$)", regex::escape(&tag)))
        .expect("valid tag removal regex");
    pattern.replacen(line, 1, "$1").trim_end().to_string()
}

/// First line of a brand-new task
pub fn compose_line(status: char, text: &str) -> String {
    format!("- [{status}] {}", text.trim())
}

fn normalize_tag(tag: &str) -> String {
    if tag.starts_with('#') {
        tag.to_string()
    } else {
        format!("#{tag}")
    }
}

/// Replace `line[start..end]`, squeezing the doubled space a removal
/// leaves behind
fn splice(line: &str, start: usize, end: usize, replacement: &str) -> String {
    let before = &line[..start];
    let mut after = &line[end..];
    if replacement.is_empty() && before.ends_with(' ') && after.starts_with(' ') {
        after = &after[1..];
    }
    let mut out = String::with_capacity(before.len() + replacement.len() + after.len());
    out.push_str(before);
    out.push_str(replacement);
    out.push_str(after);
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::HeaderKeys;
    use crate::parse::line::parse_task_line;
    use pretty_assertions::assert_eq;

    fn tables() -> FieldTables {
        FieldTables::new(&HeaderKeys::default())
    }

    #[test]
    fn test_serialize_round_trips_marker_dialect() {
        let doc = vec!["- [ ] Buy milk 📅 2025-01-10 ⏫ #errand", "\tskim"];
        let record = parse_task_line(&doc, 0, "a.md", &tables(), "\t");
        assert_eq!(
            serialize_record(&record),
            "- [ ] Buy milk 📅 2025-01-10 ⏫ #errand\n\tskim"
        );
    }

    #[test]
    fn test_serialize_round_trips_alternate_dialects() {
        for line in [
            "- [ ] x [due:: 2025-01-10]",
            "- [ ] x @due(2025-01-10)",
            "- [ ] x [priority:: 4] (@2025-01-10 08:00)",
        ] {
            let doc = vec![line];
            let record = parse_task_line(&doc, 0, "a.md", &tables(), "\t");
            assert_eq!(serialize_record(&record), line);
        }
    }

    #[test]
    fn test_serialize_stamps_current_status() {
        let doc = vec!["- [ ] open task"];
        let mut record = parse_task_line(&doc, 0, "a.md", &tables(), "\t");
        record.status = 'x';
        assert_eq!(serialize_record(&record), "- [x] open task");
    }

    #[test]
    fn test_stamp_status_only_touches_first_box() {
        assert_eq!(
            stamp_status("- [ ] see [x] in text", '/'),
            "- [/] see [x] in text"
        );
    }

    #[test]
    fn test_rewrite_replaces_existing_value() {
        let t = tables();
        assert_eq!(
            rewrite_field("- [ ] x 📅 2025-01-10 #tag", Field::Due, "2025-02-02", &t),
            "- [ ] x 📅 2025-02-02 #tag"
        );
    }

    #[test]
    fn test_rewrite_converts_alternate_dialect_to_marker() {
        let t = tables();
        assert_eq!(
            rewrite_field("- [ ] x [due:: 2025-01-10]", Field::Due, "2025-02-02", &t),
            "- [ ] x 📅 2025-02-02"
        );
    }

    #[test]
    fn test_rewrite_appends_missing_field() {
        let t = tables();
        assert_eq!(
            rewrite_field("- [ ] bare", Field::Scheduled, "2025-03-03", &t),
            "- [ ] bare ⏳ 2025-03-03"
        );
    }

    #[test]
    fn test_rewrite_empty_value_removes_field() {
        let t = tables();
        assert_eq!(
            rewrite_field("- [ ] x ✅ 2025-01-02 #done", Field::Completion, "", &t),
            "- [ ] x #done"
        );
        assert_eq!(
            rewrite_field("- [ ] x ✅ 2025-01-02", Field::Completion, "", &t),
            "- [ ] x"
        );
        assert_eq!(rewrite_field("- [ ] x", Field::Completion, "", &t), "- [ ] x");
    }

    #[test]
    fn test_rewrite_priority_marker() {
        let t = tables();
        assert_eq!(
            rewrite_field("- [ ] x ⏫ #tag", Field::Priority, "5", &t),
            "- [ ] x ⏬ #tag"
        );
        assert_eq!(
            rewrite_field("- [ ] x ⏫", Field::Priority, "0", &t),
            "- [ ] x"
        );
        assert_eq!(
            rewrite_field("- [ ] x", Field::Priority, "1", &t),
            "- [ ] x 🔺"
        );
    }

    #[test]
    fn test_add_and_remove_tag() {
        let t = tables();
        assert_eq!(add_tag("- [ ] x", "errand", &t), "- [ ] x #errand");
        assert_eq!(add_tag("- [ ] x #errand", "#errand", &t), "- [ ] x #errand");
        assert_eq!(remove_tag("- [ ] x #errand #home", "errand"), "- [ ] x #home");
        assert_eq!(remove_tag("- [ ] x #home", "#home"), "- [ ] x");
        assert_eq!(remove_tag("- [ ] x", "#gone"), "- [ ] x");
    }

    #[test]
    fn test_compose_line() {
        assert_eq!(compose_line(' ', "Call the bank"), "- [ ] Call the bank");
        assert_eq!(compose_line('/', "  padded  "), "- [/] padded");
    }
}
