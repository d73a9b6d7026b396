use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::io::journal;

/// Deferred-scan queue: vault paths waiting for a rescan.
///
/// Membership only; a path queued twice scans once and insertion order
/// carries no meaning. The set persists as JSON so queued work survives
/// a process restart.
#[derive(Debug)]
pub struct ScanQueue {
    path: PathBuf,
    pending: BTreeSet<String>,
}

impl ScanQueue {
    /// Load the queue from the sidecar directory. A missing or corrupt
    /// file yields an empty queue.
    pub fn load(tasklens_dir: &Path) -> Self {
        let path = tasklens_dir.join("queue.json");
        let pending = fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();
        ScanQueue { path, pending }
    }

    /// Queue a path for the next drain. Returns false when already queued.
    pub fn push(&mut self, path: &str) -> bool {
        self.pending.insert(path.to_string())
    }

    /// Queue every path in a change-set.
    pub fn extend<I: IntoIterator<Item = String>>(&mut self, paths: I) {
        self.pending.extend(paths);
    }

    /// Take every queued path in one batch, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending).into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Queued paths in sorted order, for display.
    pub fn paths(&self) -> Vec<&str> {
        self.pending.iter().map(String::as_str).collect()
    }

    /// Persist the queue as JSON via an atomic write.
    pub fn save(&self) -> io::Result<()> {
        let content = serde_json::to_string_pretty(&self.pending)?;
        journal::atomic_write(&self.path, content.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let queue = ScanQueue::load(tmp.path());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_push_deduplicates() {
        let tmp = TempDir::new().unwrap();
        let mut queue = ScanQueue::load(tmp.path());

        assert!(queue.push("notes/a.md"));
        assert!(queue.push("notes/b.md"));
        assert!(!queue.push("notes/a.md"));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_drain_takes_everything_once() {
        let tmp = TempDir::new().unwrap();
        let mut queue = ScanQueue::load(tmp.path());
        queue.extend(["b.md".to_string(), "a.md".to_string(), "b.md".to_string()]);

        let drained = queue.drain();
        assert_eq!(drained, vec!["a.md", "b.md"]);
        assert!(queue.is_empty());
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_queue_survives_reload() {
        let tmp = TempDir::new().unwrap();
        let mut queue = ScanQueue::load(tmp.path());
        queue.push("notes/a.md");
        queue.push("inbox.md");
        queue.save().unwrap();

        let reloaded = ScanQueue::load(tmp.path());
        assert_eq!(reloaded.paths(), vec!["inbox.md", "notes/a.md"]);
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("queue.json"), "not json").unwrap();
        let queue = ScanQueue::load(tmp.path());
        assert!(queue.is_empty());
    }
}
