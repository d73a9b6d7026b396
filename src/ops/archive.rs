use chrono::{DateTime, SecondsFormat, Utc};

use crate::model::record::TaskRecord;
use crate::ops::patch::{PatchError, delete_record, patch_record};
use crate::parse::serializer::serialize_record;

/// Outcome of archiving: the rewritten source document, and the archive
/// document's new content when a destination is configured
#[derive(Debug, Clone)]
pub struct Archived {
    pub source: String,
    pub destination: Option<String>,
}

/// Move a record out of its source document.
///
/// With an archive destination, the serialized record is prepended to the
/// archive content under a timestamped quote header and deleted at the
/// source. Without one, the record span is wrapped in a `%%` fold-marker
/// pair in place instead.
pub fn archive_record(
    source_document: &str,
    archive_document: Option<&str>,
    record: &TaskRecord,
    now: DateTime<Utc>,
    confirm_conflicts: bool,
) -> Result<Archived, PatchError> {
    let content = serialize_record(record);

    match archive_document {
        Some(existing) => {
            let source = delete_record(source_document, record, confirm_conflicts)?;
            let stamp = now.to_rfc3339_opts(SecondsFormat::Secs, true);
            let destination = format!("> Archived at {stamp}\n{content}\n\n{existing}");
            Ok(Archived {
                source,
                destination: Some(destination),
            })
        }
        None => {
            let folded = format!("%%{content}%%");
            let source = patch_record(source_document, record, &folded, confirm_conflicts)?;
            Ok(Archived {
                source,
                destination: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::HeaderKeys;
    use crate::parse::fields::FieldTables;
    use crate::parse::line::parse_task_line;
    use pretty_assertions::assert_eq;

    fn record_at(document: &str, index: usize) -> TaskRecord {
        let lines: Vec<&str> = document.split('\n').collect();
        let tables = FieldTables::new(&HeaderKeys::default());
        parse_task_line(&lines, index, "a.md", &tables, "\t")
    }

    fn when() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-15T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_archive_to_file_prepends_and_deletes() {
        let doc = "keep\n- [x] done task ✅ 2025-06-01\nalso keep\n";
        let record = record_at(doc, 1);
        let archived = archive_record(doc, Some("> Archived at earlier\n- [x] old\n\n"), &record, when(), true)
            .unwrap();

        assert_eq!(archived.source, "keep\nalso keep\n");
        assert_eq!(
            archived.destination.unwrap(),
            "> Archived at 2025-06-15T10:30:00Z\n- [x] done task ✅ 2025-06-01\n\n> Archived at earlier\n- [x] old\n\n"
        );
    }

    #[test]
    fn test_archive_to_fresh_file() {
        let doc = "- [x] task\n";
        let record = record_at(doc, 0);
        let archived = archive_record(doc, Some(""), &record, when(), true).unwrap();
        assert_eq!(archived.source, "");
        assert_eq!(
            archived.destination.unwrap(),
            "> Archived at 2025-06-15T10:30:00Z\n- [x] task\n\n"
        );
    }

    #[test]
    fn test_archive_in_place_folds_span() {
        let doc = "before\n- [x] task\n\tnote\nafter\n";
        let record = record_at(doc, 1);
        let archived = archive_record(doc, None, &record, when(), true).unwrap();
        assert_eq!(archived.source, "before\n%%- [x] task\n\tnote%%\nafter\n");
        assert!(archived.destination.is_none());
    }

    #[test]
    fn test_archive_carries_body_to_destination() {
        let doc = "- [x] task\n\tdetail line\n";
        let record = record_at(doc, 0);
        let archived = archive_record(doc, Some(""), &record, when(), true).unwrap();
        assert_eq!(archived.source, "");
        assert_eq!(
            archived.destination.unwrap(),
            "> Archived at 2025-06-15T10:30:00Z\n- [x] task\n\tdetail line\n\n"
        );
    }

    #[test]
    fn test_diverged_record_fails_before_archiving() {
        let doc = "- [x] task\n";
        let mut record = record_at(doc, 0);
        record.title = "- [x] something else".to_string();
        assert!(archive_record(doc, Some(""), &record, when(), true).is_err());
    }
}
