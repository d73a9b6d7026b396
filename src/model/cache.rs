use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::record::{NoteRecord, TaskRecord};

/// The aggregate index of task records across a document set.
///
/// A record lives in exactly one of `pending`/`completed` at any time,
/// keyed by its source path. Within `pending`, the bucket for the file
/// that changed most recently sits at the front; `completed` keeps plain
/// insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCache {
    #[serde(default)]
    pub source_name: String,
    pub modified_at: DateTime<Utc>,
    #[serde(default, rename = "Pending")]
    pub pending: IndexMap<String, Vec<TaskRecord>>,
    #[serde(default, rename = "Completed")]
    pub completed: IndexMap<String, Vec<TaskRecord>>,
    #[serde(default, rename = "Notes")]
    pub notes: Vec<NoteRecord>,
}

impl TaskCache {
    pub fn new(source_name: &str) -> Self {
        TaskCache {
            source_name: source_name.to_string(),
            modified_at: Utc::now(),
            pending: IndexMap::new(),
            completed: IndexMap::new(),
            notes: Vec::new(),
        }
    }

    /// Compare a freshly scanned record list against what the cache holds
    /// for `path`, ignoring synthetic ids. Missing buckets compare as empty.
    pub fn records_unchanged(
        &self,
        path: &str,
        new_pending: &[TaskRecord],
        new_completed: &[TaskRecord],
    ) -> bool {
        let old_pending = self.pending.get(path).map(Vec::as_slice).unwrap_or(&[]);
        let old_completed = self.completed.get(path).map(Vec::as_slice).unwrap_or(&[]);
        lists_match(old_pending, new_pending) && lists_match(old_completed, new_completed)
    }

    /// Replace both buckets for `path` and stamp the modification time.
    /// The pending bucket is promoted to the front (recency ordering).
    pub fn replace_file(
        &mut self,
        path: &str,
        pending: Vec<TaskRecord>,
        completed: Vec<TaskRecord>,
    ) {
        if pending.is_empty() {
            self.pending.shift_remove(path);
        } else {
            self.pending.insert(path.to_string(), pending);
            if let Some(index) = self.pending.get_index_of(path) {
                self.pending.move_index(index, 0);
            }
        }
        if completed.is_empty() {
            self.completed.shift_remove(path);
        } else {
            self.completed.insert(path.to_string(), completed);
        }
        self.modified_at = Utc::now();
    }

    /// Drop every trace of a deleted document.
    pub fn remove_file(&mut self, path: &str) {
        self.pending.shift_remove(path);
        self.completed.shift_remove(path);
        self.notes.retain(|n| n.file_path != path);
        self.modified_at = Utc::now();
    }

    /// Rewrite keys and record paths after a document rename.
    pub fn rename_file(&mut self, old_path: &str, new_path: &str) {
        rename_key(&mut self.pending, old_path, new_path);
        rename_key(&mut self.completed, old_path, new_path);
        for note in &mut self.notes {
            if note.file_path == old_path {
                note.file_path = new_path.to_string();
            }
        }
        self.modified_at = Utc::now();
    }

    /// Rewrite every key under a renamed folder prefix.
    /// Returns the paths that moved (new names).
    pub fn rename_folder(&mut self, old_prefix: &str, new_prefix: &str) -> Vec<String> {
        let old_dir = format!("{}/", old_prefix.trim_end_matches('/'));
        let new_dir = format!("{}/", new_prefix.trim_end_matches('/'));

        let moved: Vec<(String, String)> = self
            .pending
            .keys()
            .chain(self.completed.keys())
            .filter(|k| k.starts_with(&old_dir))
            .map(|k| (k.clone(), format!("{}{}", new_dir, &k[old_dir.len()..])))
            .collect();

        let mut new_paths = Vec::new();
        for (old, new) in moved {
            self.rename_file(&old, &new);
            if !new_paths.contains(&new) {
                new_paths.push(new);
            }
        }
        new_paths
    }

    /// Track a reminder-bearing document, replacing any previous entry.
    pub fn upsert_note(&mut self, note: NoteRecord) {
        match self.notes.iter_mut().find(|n| n.file_path == note.file_path) {
            Some(existing) => *existing = note,
            None => self.notes.push(note),
        }
    }

    /// Remove buckets whose record list is empty. Run before persisting.
    pub fn cleanup(&mut self) {
        self.pending.retain(|_, records| !records.is_empty());
        self.completed.retain(|_, records| !records.is_empty());
    }

    /// Find a record by durable id, falling back to the synthetic id.
    pub fn find(&self, id: &str) -> Option<&TaskRecord> {
        let by_durable = self
            .all_records()
            .find(|r| r.durable_id() == Some(id));
        if by_durable.is_some() {
            return by_durable;
        }
        let numeric: u32 = id.parse().ok()?;
        self.all_records().find(|r| r.id == numeric)
    }

    pub fn all_records(&self) -> impl Iterator<Item = &TaskRecord> {
        self.pending
            .values()
            .chain(self.completed.values())
            .flatten()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.values().map(Vec::len).sum()
    }
}

fn lists_match(old: &[TaskRecord], new: &[TaskRecord]) -> bool {
    old.len() == new.len()
        && old.iter().zip(new).all(|(a, b)| {
            let mut b = b.clone();
            b.id = a.id;
            *a == b
        })
}

fn rename_key(map: &mut IndexMap<String, Vec<TaskRecord>>, old_path: &str, new_path: &str) {
    if let Some(index) = map.get_index_of(old_path)
        && let Some((_, mut records)) = map.shift_remove_index(index)
    {
        for record in &mut records {
            record.file_path = new_path.to_string();
        }
        map.shift_insert(index.min(map.len()), new_path.to_string(), records);
    }
}
