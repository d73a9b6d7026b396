use chrono::NaiveDate;

use crate::model::record::TaskRecord;
use crate::model::status::{StatusKind, StatusSet};
use crate::ops::patch::{PatchError, patch_record};
use crate::parse::fields::{Field, FieldTables};
use crate::parse::line::{extract_fields, parse_task_line};
use crate::parse::serializer;

/// A successful edit: the patched document plus the refreshed record whose
/// title, fields, and location match the new text
#[derive(Debug, Clone)]
pub struct Edit {
    pub document: String,
    pub record: TaskRecord,
}

// ---------------------------------------------------------------------------
// Status transitions
// ---------------------------------------------------------------------------

/// Completed symbols reopen, everything else completes
pub fn toggle_status(
    document: &str,
    record: &TaskRecord,
    statuses: &StatusSet,
    tables: &FieldTables,
    today: NaiveDate,
    confirm_conflicts: bool,
) -> Result<Edit, PatchError> {
    let symbol = statuses.toggled(record.status);
    set_status(document, record, symbol, statuses, tables, today, confirm_conflicts)
}

/// Advance along the configured status sequence, wrapping at the end
pub fn cycle_status(
    document: &str,
    record: &TaskRecord,
    statuses: &StatusSet,
    tables: &FieldTables,
    today: NaiveDate,
    confirm_conflicts: bool,
) -> Result<Edit, PatchError> {
    let symbol = statuses.next(record.status);
    set_status(document, record, symbol, statuses, tables, today, confirm_conflicts)
}

/// Stamp or clear the completion/cancelled dates for a status change.
///
/// Task-note records use this directly before a header rewrite; line
/// records go through `set_status`, which mirrors the same rules into
/// the line text instead.
pub fn stamp_status_dates(
    record: &mut TaskRecord,
    was: StatusKind,
    statuses: &StatusSet,
    today: NaiveDate,
) {
    let now = statuses.kind_of(record.status);
    let stamp = today.format("%Y-%m-%d").to_string();

    if now == StatusKind::Done && was != StatusKind::Done {
        record.completion = stamp.clone();
    } else if was == StatusKind::Done && now != StatusKind::Done {
        record.completion = String::new();
    }

    if now == StatusKind::Cancelled && was != StatusKind::Cancelled {
        record.cancelled = stamp;
    } else if was == StatusKind::Cancelled && now != StatusKind::Cancelled {
        record.cancelled = String::new();
    }
}

/// Direct status set — handles completion/cancelled date bookkeeping
pub fn set_status(
    document: &str,
    record: &TaskRecord,
    symbol: char,
    statuses: &StatusSet,
    tables: &FieldTables,
    today: NaiveDate,
    confirm_conflicts: bool,
) -> Result<Edit, PatchError> {
    let mut updated = record.clone();
    updated.status = symbol;

    let was = statuses.kind_of(record.status);
    let now = statuses.kind_of(symbol);
    let stamp = today.format("%Y-%m-%d").to_string();

    if now == StatusKind::Done && was != StatusKind::Done {
        updated.title = serializer::rewrite_field(&updated.title, Field::Completion, &stamp, tables);
    } else if was == StatusKind::Done && now != StatusKind::Done {
        updated.title = serializer::rewrite_field(&updated.title, Field::Completion, "", tables);
    }

    if now == StatusKind::Cancelled && was != StatusKind::Cancelled {
        updated.title = serializer::rewrite_field(&updated.title, Field::Cancelled, &stamp, tables);
    } else if was == StatusKind::Cancelled && now != StatusKind::Cancelled {
        updated.title = serializer::rewrite_field(&updated.title, Field::Cancelled, "", tables);
    }

    apply(document, record, updated, tables, confirm_conflicts)
}

// ---------------------------------------------------------------------------
// Field edits
// ---------------------------------------------------------------------------

/// Rewrite one inline field; an empty value removes it
pub fn set_field(
    document: &str,
    record: &TaskRecord,
    field: Field,
    value: &str,
    tables: &FieldTables,
    confirm_conflicts: bool,
) -> Result<Edit, PatchError> {
    let mut updated = record.clone();
    updated.title = serializer::rewrite_field(&updated.title, field, value, tables);
    apply(document, record, updated, tables, confirm_conflicts)
}

pub fn add_tag(
    document: &str,
    record: &TaskRecord,
    tag: &str,
    tables: &FieldTables,
    confirm_conflicts: bool,
) -> Result<Edit, PatchError> {
    let mut updated = record.clone();
    updated.title = serializer::add_tag(&updated.title, tag, tables);
    apply(document, record, updated, tables, confirm_conflicts)
}

pub fn remove_tag(
    document: &str,
    record: &TaskRecord,
    tag: &str,
    tables: &FieldTables,
    confirm_conflicts: bool,
) -> Result<Edit, PatchError> {
    let mut updated = record.clone();
    updated.title = serializer::remove_tag(&updated.title, tag);
    apply(document, record, updated, tables, confirm_conflicts)
}

// ---------------------------------------------------------------------------
// Task creation
// ---------------------------------------------------------------------------

/// Append a new task line (plus indented body notes) at the end of the
/// document and return the rewritten text with the built record
pub fn add_task(
    document: &str,
    text: &str,
    body: &[String],
    file_path: &str,
    tables: &FieldTables,
    indent_unit: &str,
) -> (String, TaskRecord) {
    let mut lines: Vec<String> = if document.trim().is_empty() {
        Vec::new()
    } else {
        document.trim_end().split('\n').map(String::from).collect()
    };

    let index = lines.len();
    lines.push(serializer::compose_line(' ', text));
    for note in body {
        lines.push(format!("{indent_unit}{}", note.trim_end()));
    }

    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let record = parse_task_line(&refs, index, file_path, tables, indent_unit);

    let mut out = lines.join("\n");
    out.push('\n');
    (out, record)
}

// ---------------------------------------------------------------------------

/// Guard, serialize, patch, and refresh the record to match the new text
fn apply(
    document: &str,
    old: &TaskRecord,
    mut updated: TaskRecord,
    tables: &FieldTables,
    confirm_conflicts: bool,
) -> Result<Edit, PatchError> {
    if tables.is_recurring(&old.title) {
        return Err(PatchError::UnsupportedRecurringEdit);
    }

    // Bake the status into the stored line so the next edit's drift probe
    // matches what the document now says
    updated.title = serializer::stamp_status(&updated.title, updated.status);
    extract_fields(&mut updated, tables);

    let content = serializer::serialize_record(&updated);
    if content.trim().is_empty() {
        return Err(PatchError::EmptySerialization);
    }

    let document = patch_record(document, old, &content, confirm_conflicts)?;

    updated.location.end_line = updated.location.start_line + updated.body.len();
    updated.location.end_char_index = updated
        .body
        .last()
        .map_or(updated.title.len(), |last| last.len());

    Ok(Edit {
        document,
        record: updated,
    })
}
