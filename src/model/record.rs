use serde::{Deserialize, Serialize};

use crate::model::status::{StatusKind, StatusSet};

/// Exact span a record occupied in its source document at the moment it was
/// last built or successfully patched.
///
/// Lines are 1-based. Char indexes are byte offsets within their line;
/// `end_char_index` is the byte length of the final consumed line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub start_line: usize,
    pub start_char_index: usize,
    pub end_line: usize,
    pub end_char_index: usize,
}

impl Location {
    pub fn new(start_line: usize, end_line: usize, end_char_index: usize) -> Self {
        Location {
            start_line,
            start_char_index: 0,
            end_line,
            end_char_index,
        }
    }
}

/// A task overlaid on a source document: either one specially-formatted line
/// (plus indented continuation lines) or a whole task-note document.
///
/// `title` and `body` hold the raw source text verbatim so a record can
/// round-trip through the serializer without disturbing user formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    /// Synthetic id, derived from the source position when no durable id exists
    pub id: u32,
    /// Durable id embedded in the text (`🆔abc-12`); authoritative when non-empty
    #[serde(default)]
    pub legacy_id: String,
    /// Checkbox symbol
    pub status: char,
    /// The raw first line, including inline field markup
    pub title: String,
    /// Raw continuation lines (sub-task lines or description text)
    #[serde(default)]
    pub body: Vec<String>,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub scheduled: String,
    #[serde(default)]
    pub due: String,
    #[serde(default)]
    pub cancelled: String,
    #[serde(default)]
    pub completion: String,
    /// `HH:MM - HH:MM` range, empty when absent
    #[serde(default)]
    pub time: String,
    /// 0 = none, 1 (highest) through 5 (lowest)
    #[serde(default)]
    pub priority: u8,
    /// `#`-prefixed tokens in source order
    #[serde(default)]
    pub tags: Vec<String>,
    /// Durable ids of tasks this one depends on
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// `YYYY-MM-DDTHH:MM`, empty when absent
    #[serde(default)]
    pub reminder: String,
    pub file_path: String,
    #[serde(default)]
    pub location: Location,
}

impl TaskRecord {
    pub fn new(status: char, title: String, file_path: String) -> Self {
        TaskRecord {
            id: 0,
            legacy_id: String::new(),
            status,
            title,
            body: Vec::new(),
            created: String::new(),
            start: String::new(),
            scheduled: String::new(),
            due: String::new(),
            cancelled: String::new(),
            completion: String::new(),
            time: String::new(),
            priority: 0,
            tags: Vec::new(),
            depends_on: Vec::new(),
            reminder: String::new(),
            file_path,
            location: Location::default(),
        }
    }

    /// The durable id when one is embedded in the text
    pub fn durable_id(&self) -> Option<&str> {
        if self.legacy_id.is_empty() {
            None
        } else {
            Some(&self.legacy_id)
        }
    }

    pub fn kind(&self, statuses: &StatusSet) -> StatusKind {
        statuses.kind_of(self.status)
    }

    /// Whether this record belongs in the Completed half of the cache
    pub fn is_completed(&self, statuses: &StatusSet) -> bool {
        statuses.is_completed(self.status)
    }
}

/// A document whose header carries a reminder property. Tracked separately
/// from task records so reminder integrations can list them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRecord {
    pub file_path: String,
    pub reminder: String,
}
