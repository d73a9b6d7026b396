use std::fs;
use std::path::{Path, PathBuf};

use crate::io::journal;
use crate::model::cache::TaskCache;

/// Error type for cache persistence
#[derive(Debug, thiserror::Error)]
pub enum CacheIoError {
    #[error("could not serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Path of the persisted cache inside the sidecar directory.
pub fn cache_path(tasklens_dir: &Path) -> PathBuf {
    tasklens_dir.join("cache.json")
}

/// Read the persisted cache. A missing or corrupt file yields `None` and
/// the caller falls back to a fresh scan.
pub fn read_cache(tasklens_dir: &Path) -> Option<TaskCache> {
    let path = cache_path(tasklens_dir);
    let content = fs::read_to_string(&path).ok()?;
    serde_json::from_str(&content).ok()
}

/// Persist the cache as pretty JSON via an atomic write.
/// Empty buckets are dropped first.
pub fn write_cache(tasklens_dir: &Path, cache: &mut TaskCache) -> Result<(), CacheIoError> {
    cache.cleanup();
    let path = cache_path(tasklens_dir);
    let content = serde_json::to_string_pretty(cache)?;
    journal::atomic_write(&path, content.as_bytes())
        .map_err(|e| CacheIoError::WriteError { path, source: e })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use insta::assert_snapshot;
    use tempfile::TempDir;

    use crate::model::record::{Location, TaskRecord};

    fn sample_record() -> TaskRecord {
        let mut record = TaskRecord::new(
            ' ',
            "- [ ] Buy milk 📅2025-01-10 #errand".to_string(),
            "inbox.md".to_string(),
        );
        record.id = 7;
        record.due = "2025-01-10".to_string();
        record.tags = vec!["#errand".to_string()];
        record.location = Location::new(1, 1, 37);
        record
    }

    #[test]
    fn test_write_then_read_round_trips() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(".tasklens");
        fs::create_dir_all(&dir).unwrap();

        let mut cache = TaskCache::new("vault");
        cache.replace_file("inbox.md", vec![sample_record()], Vec::new());
        write_cache(&dir, &mut cache).unwrap();

        let loaded = read_cache(&dir).unwrap();
        assert_eq!(loaded.source_name, "vault");
        assert_eq!(loaded.pending_count(), 1);
        assert_eq!(loaded.pending["inbox.md"], cache.pending["inbox.md"]);
    }

    #[test]
    fn test_read_missing_cache_returns_none() {
        let tmp = TempDir::new().unwrap();
        assert!(read_cache(tmp.path()).is_none());
    }

    #[test]
    fn test_read_corrupt_cache_returns_none() {
        let tmp = TempDir::new().unwrap();
        fs::write(cache_path(tmp.path()), "not json {{{").unwrap();
        assert!(read_cache(tmp.path()).is_none());
    }

    #[test]
    fn test_write_drops_empty_buckets() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(".tasklens");
        fs::create_dir_all(&dir).unwrap();

        let mut cache = TaskCache::new("vault");
        cache.pending.insert("empty.md".to_string(), Vec::new());
        cache.completed.insert("also-empty.md".to_string(), Vec::new());
        write_cache(&dir, &mut cache).unwrap();

        let content = fs::read_to_string(cache_path(&dir)).unwrap();
        assert!(!content.contains("empty.md"));
    }

    #[test]
    fn test_persisted_cache_shape() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(".tasklens");
        fs::create_dir_all(&dir).unwrap();

        let mut cache = TaskCache::new("vault");
        cache.replace_file("inbox.md", vec![sample_record()], Vec::new());
        cache.modified_at = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
        write_cache(&dir, &mut cache).unwrap();

        let content = fs::read_to_string(cache_path(&dir)).unwrap();
        assert_snapshot!(content, @r##"
        {
          "sourceName": "vault",
          "modifiedAt": "2025-01-10T12:00:00Z",
          "Pending": {
            "inbox.md": [
              {
                "id": 7,
                "legacyId": "",
                "status": " ",
                "title": "- [ ] Buy milk 📅2025-01-10 #errand",
                "body": [],
                "created": "",
                "start": "",
                "scheduled": "",
                "due": "2025-01-10",
                "cancelled": "",
                "completion": "",
                "time": "",
                "priority": 0,
                "tags": [
                  "#errand"
                ],
                "dependsOn": [],
                "reminder": "",
                "filePath": "inbox.md",
                "location": {
                  "startLine": 1,
                  "startCharIndex": 0,
                  "endLine": 1,
                  "endCharIndex": 37
                }
              }
            ]
          },
          "Completed": {},
          "Notes": []
        }
        "##);
    }
}
