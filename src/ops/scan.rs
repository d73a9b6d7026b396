use std::thread;

use thiserror::Error;
use tracing::warn;

use crate::model::cache::TaskCache;
use crate::model::config::EngineConfig;
use crate::model::record::{NoteRecord, TaskRecord};
use crate::ops::filter::{self, TagFilter};
use crate::ops::note::{self, HeaderError};
use crate::parse::classifier::is_task_line;
use crate::parse::fields::FieldTables;
use crate::parse::frontmatter;
use crate::parse::line::parse_task_line;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("malformed header in {path}: {source}")]
    MalformedHeader {
        path: String,
        source: toml::de::Error,
    },
    #[error(transparent)]
    Note(#[from] HeaderError),
}

/// Everything one document contributes to the cache
#[derive(Debug, Clone)]
pub struct FileScan {
    pub path: String,
    pub pending: Vec<TaskRecord>,
    pub completed: Vec<TaskRecord>,
    pub note: Option<NoteRecord>,
}

impl FileScan {
    fn empty(path: &str) -> Self {
        FileScan {
            path: path.to_string(),
            pending: Vec::new(),
            completed: Vec::new(),
            note: None,
        }
    }

    pub fn record_count(&self) -> usize {
        self.pending.len() + self.completed.len()
    }
}

/// Extracts task records from document text under one configuration.
/// Field tables and tag patterns are compiled once up front.
pub struct Scanner<'a> {
    config: &'a EngineConfig,
    tables: FieldTables,
    tag_filter: TagFilter,
}

impl<'a> Scanner<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Scanner {
            config,
            tables: FieldTables::new(&config.note.keys),
            tag_filter: TagFilter::new(&config.scan.tags),
        }
    }

    pub fn tables(&self) -> &FieldTables {
        &self.tables
    }

    /// Scan one document. A document the filters reject contributes an
    /// empty result, which clears any stale buckets it left in the cache.
    pub fn scan_file(&self, path: &str, text: &str) -> Result<FileScan, ScanError> {
        let header = frontmatter::parse(text).map_err(|source| ScanError::MalformedHeader {
            path: path.to_string(),
            source,
        })?;

        if !filter::admit(path, header.as_ref(), &self.config.scan) {
            return Ok(FileScan::empty(path));
        }

        let mut scan = FileScan::empty(path);
        scan.note = header.as_ref().and_then(|table| {
            frontmatter::values_of(table, &self.config.note.reminder_key)
                .into_iter()
                .next()
                .filter(|value| !value.is_empty())
                .map(|reminder| NoteRecord {
                    file_path: path.to_string(),
                    reminder,
                })
        });

        // A task note is the whole document as one record
        if let Some(record) = note::read_note(text, path, &self.config.note, &self.config.statuses)?
        {
            self.push(&mut scan, record);
            return Ok(scan);
        }

        let lines: Vec<&str> = text.split('\n').collect();
        let mut index = 0;
        while index < lines.len() {
            let line = lines[index];
            if is_task_line(line) && self.tag_filter.admits(&self.tables.tags(line)) {
                let record = parse_task_line(
                    &lines,
                    index,
                    path,
                    &self.tables,
                    &self.config.scan.indent_unit,
                );
                index += 1 + record.body.len();
                self.push(&mut scan, record);
            } else {
                index += 1;
            }
        }
        Ok(scan)
    }

    /// Scan a document set and merge the results into the cache. Documents
    /// are scanned in parallel; a document whose extraction fails is logged
    /// and skipped. Returns the paths whose cache content actually changed,
    /// so a no-op rescan produces no downstream churn.
    pub fn scan_into(
        &self,
        documents: &[(String, String)],
        cache: &mut TaskCache,
    ) -> Vec<String> {
        let results: Vec<Result<FileScan, ScanError>> = thread::scope(|scope| {
            let handles: Vec<_> = documents
                .iter()
                .map(|(path, text)| scope.spawn(move || self.scan_file(path, text)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("scan worker panicked"))
                .collect()
        });

        let mut changed = Vec::new();
        for result in results {
            let scan = match result {
                Ok(scan) => scan,
                Err(error) => {
                    warn!("skipping document: {}", error);
                    continue;
                }
            };
            let path = scan.path.clone();
            if self.merge(scan, cache) {
                changed.push(path);
            }
        }
        changed
    }

    /// Merge one file's scan into the cache; true when anything changed
    fn merge(&self, scan: FileScan, cache: &mut TaskCache) -> bool {
        let records_changed =
            !cache.records_unchanged(&scan.path, &scan.pending, &scan.completed);
        let old_note = cache.notes.iter().find(|n| n.file_path == scan.path);
        let note_changed = old_note != scan.note.as_ref();

        if records_changed {
            cache.replace_file(&scan.path, scan.pending, scan.completed);
        }
        if note_changed {
            match scan.note {
                Some(note) => cache.upsert_note(note),
                None => cache.notes.retain(|n| n.file_path != scan.path),
            }
            cache.modified_at = chrono::Utc::now();
        }
        records_changed || note_changed
    }

    fn push(&self, scan: &mut FileScan, record: TaskRecord) {
        if record.is_completed(&self.config.statuses) {
            scan.completed.push(record);
        } else {
            scan.pending.push(record);
        }
    }
}
