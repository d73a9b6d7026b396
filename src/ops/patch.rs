use thiserror::Error;

use crate::model::record::TaskRecord;
use crate::parse::serializer::serialize_record;

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("could not patch {path}: line {line} is out of range")]
    FileNotFound { path: String, line: usize },
    #[error("task location in {path} drifted: line {line} no longer holds the cached task, rescan before retrying")]
    LocationDrift {
        path: String,
        line: usize,
        found: String,
    },
    #[error("task content in {path} diverged from the cache")]
    ContentConflict {
        path: String,
        expected: String,
        found: String,
    },
    #[error("cannot edit a recurring task without a date roller")]
    UnsupportedRecurringEdit,
    #[error("serializer produced no text for a live record")]
    EmptySerialization,
}

/// Replace the text span `old` occupies in `document` with `new_content`.
/// Empty `new_content` deletes the span cleanly.
///
/// The span is validated before anything is touched: the start line must
/// still begin with the cached task's leading characters, and the spanned
/// text must equal the cached serialization exactly or up to whitespace.
/// Any other divergence is a conflict; with `confirm_conflicts` off the
/// new content force-applies. Returns the full patched document; the
/// caller persists it. A failed patch leaves nothing modified.
pub fn patch_record(
    document: &str,
    old: &TaskRecord,
    new_content: &str,
    confirm_conflicts: bool,
) -> Result<String, PatchError> {
    let lines: Vec<&str> = document.split('\n').collect();
    let location = &old.location;

    if location.start_line == 0 || location.start_line > lines.len() {
        return Err(PatchError::FileNotFound {
            path: old.file_path.clone(),
            line: location.start_line,
        });
    }

    let start = location.start_line - 1;
    let start_text = lines[start];
    let probe: String = old.title.trim().chars().take(5).collect();
    if !start_text.trim().starts_with(&probe) {
        return Err(PatchError::LocationDrift {
            path: old.file_path.clone(),
            line: location.start_line,
            found: start_text.to_string(),
        });
    }

    let end = location.end_line.clamp(location.start_line, lines.len());
    let span = span_text(&lines, start, end, location.start_char_index, location.end_char_index);

    let expected = serialize_record(old);
    if span != expected && !whitespace_equivalent(&span, &expected) {
        if confirm_conflicts {
            return Err(PatchError::ContentConflict {
                path: old.file_path.clone(),
                expected,
                found: span,
            });
        }
        // Safeguard off: force-apply over the diverged text
    }

    Ok(reassemble(&lines, start, end, location, new_content))
}

/// Delete the record's span from the document
pub fn delete_record(
    document: &str,
    old: &TaskRecord,
    confirm_conflicts: bool,
) -> Result<String, PatchError> {
    patch_record(document, old, "", confirm_conflicts)
}

/// Whether the record's cached location still points at its text, without
/// modifying anything
pub fn validate_location(document: &str, record: &TaskRecord) -> Result<(), PatchError> {
    patch_record(document, record, &serialize_record(record), true).map(|_| ())
}

/// Collapse whitespace runs to single spaces and trim both ends; two spans
/// are interchangeable when their normal forms agree
pub fn whitespace_equivalent(a: &str, b: &str) -> bool {
    normalize_whitespace(a) == normalize_whitespace(b)
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn span_text(
    lines: &[&str],
    start: usize,
    end: usize,
    start_char: usize,
    end_char: usize,
) -> String {
    let mut span: Vec<&str> = lines[start..end].to_vec();
    if let Some(first) = span.first_mut() {
        *first = slice_from(first, start_char);
    }
    if let Some(last) = span.last_mut() {
        *last = slice_to(last, end_char);
    }
    span.join("\n")
}

fn reassemble(
    lines: &[&str],
    start: usize,
    end: usize,
    location: &crate::model::record::Location,
    new_content: &str,
) -> String {
    // Text outside the span on the boundary lines survives the patch and
    // stays glued to the replacement
    let head = slice_to(lines[start], location.start_char_index);
    let tail = slice_from(lines[end - 1], location.end_char_index);

    let mut out: Vec<String> = lines[..start].iter().map(|s| s.to_string()).collect();

    let body = new_content.trim_end_matches('\n');
    if body.trim().is_empty() {
        let residue = format!("{head}{tail}");
        if !residue.is_empty() {
            out.push(residue);
        }
    } else {
        let mut replacement: Vec<String> = body.split('\n').map(String::from).collect();
        if let Some(first) = replacement.first_mut() {
            *first = format!("{head}{first}");
        }
        if let Some(last) = replacement.last_mut() {
            last.push_str(tail);
        }
        out.extend(replacement);
    }

    out.extend(lines[end..].iter().map(|s| s.to_string()));
    out.join("\n")
}

/// `&text[index..]` tolerant of a drifted index: clamps to the text end
/// and backs up to a character boundary
fn slice_from(text: &str, index: usize) -> &str {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    &text[index..]
}

fn slice_to(text: &str, index: usize) -> &str {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    &text[..index]
}
