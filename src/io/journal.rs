use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, SecondsFormat, Utc};
use tempfile::NamedTempFile;

use crate::io::lock::flock_nonblocking;

/// Journal size that triggers an opportunistic trim of old entries (1 MB).
const MAX_LOG_SIZE: u64 = 1_048_576;

/// Entries older than this are dropped by the default prune cutoff.
const DEFAULT_KEEP_DAYS: i64 = 30;

/// Self-documenting header written at the top of a new journal.
const FILE_HEADER: &str = "\
<!-- tasklens journal — append-only record of refused and lost edits
     Conflicts, drifted locations, deletions, and failed writes land here.
     If an edit was refused or a task vanished, the details are below.
     View with: tl journal
     Prune old entries: tl journal prune
     Safe to delete if empty or stale. -->

---
";

/// Category of a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalCategory {
    Conflict,
    Drift,
    Write,
    Delete,
}

impl JournalCategory {
    fn name(self) -> &'static str {
        match self {
            JournalCategory::Conflict => "conflict",
            JournalCategory::Drift => "drift",
            JournalCategory::Write => "write",
            JournalCategory::Delete => "delete",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        [
            JournalCategory::Conflict,
            JournalCategory::Drift,
            JournalCategory::Write,
            JournalCategory::Delete,
        ]
        .into_iter()
        .find(|c| c.name() == name)
    }
}

impl fmt::Display for JournalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single entry in the journal.
#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    pub category: JournalCategory,
    pub description: String,
    pub fields: Vec<(String, String)>,
    pub body: String,
}

impl JournalEntry {
    /// Emit the entry as one journal block. Blocks are separated by `---`;
    /// the body rides in a text fence so task markup cannot be mistaken
    /// for journal structure.
    fn to_markdown(&self) -> String {
        use std::fmt::Write as _;

        let mut out = format!(
            "## {} — {}: {}\n\n",
            stamp(&self.timestamp),
            self.category,
            self.description
        );
        for (key, value) in &self.fields {
            let _ = writeln!(out, "{key}: {value}");
        }
        if !self.body.is_empty() {
            out.push_str("\n```text\n");
            out.push_str(self.body.trim_end_matches('\n'));
            out.push_str("\n```\n");
        }
        out.push_str("\n---\n");
        out
    }

    /// Serialize for `tl journal --json`.
    pub fn to_json(&self) -> serde_json::Value {
        let fields: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();

        serde_json::json!({
            "timestamp": stamp(&self.timestamp),
            "category": self.category.to_string(),
            "description": self.description,
            "fields": fields,
            "body": self.body,
        })
    }
}

fn stamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Path of the journal file inside the sidecar directory.
pub fn journal_path(tasklens_dir: &Path) -> PathBuf {
    tasklens_dir.join("journal.log")
}

/// Write `content` to `path` through a temp file and rename, so readers
/// never observe a half-written file.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Appending
// ---------------------------------------------------------------------------

/// Append an entry to the journal. The journal must never take a command
/// down with it, so failures are logged and swallowed.
pub fn log_journal(tasklens_dir: &Path, entry: JournalEntry) {
    if let Err(e) = append_entry(tasklens_dir, &entry) {
        tracing::warn!("could not write to journal: {}", e);
    }
}

fn append_entry(tasklens_dir: &Path, entry: &JournalEntry) -> io::Result<()> {
    let path = journal_path(tasklens_dir);
    if fs::metadata(&path).map(|m| m.len()).unwrap_or(0) > MAX_LOG_SIZE {
        shrink_if_idle(&path);
    }

    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    if file.metadata()?.len() == 0 {
        file.write_all(FILE_HEADER.as_bytes())?;
    }
    file.write_all(entry.to_markdown().as_bytes())
}

/// Drop aged entries from an oversized journal, but only when no other
/// process holds it. Skipping the trim is always safe.
fn shrink_if_idle(path: &Path) {
    let Ok(mut file) = OpenOptions::new().read(true).write(true).open(path) else {
        return;
    };
    if !flock_nonblocking(&file) {
        return;
    }

    let mut text = String::new();
    if file.read_to_string(&mut text).is_err() {
        return;
    }
    let cutoff = Utc::now() - chrono::Duration::days(DEFAULT_KEEP_DAYS);
    let kept = drop_entries_before(&text, cutoff);

    // Rewrite through the locked descriptor
    if kept.len() < text.len()
        && file.set_len(0).is_ok()
        && file.seek(SeekFrom::Start(0)).is_ok()
    {
        let _ = file.write_all(kept.as_bytes());
    }
}

/// Record a refused patch with both sides of the disagreement.
pub fn log_conflict(
    tasklens_dir: &Path,
    file_path: &str,
    line: usize,
    expected: &str,
    found: &str,
) {
    log_journal(
        tasklens_dir,
        JournalEntry {
            timestamp: Utc::now(),
            category: JournalCategory::Conflict,
            description: format!("edit refused in {}", file_path),
            fields: vec![
                ("Source".to_string(), file_path.to_string()),
                ("Line".to_string(), line.to_string()),
            ],
            body: format!("cached:\n{}\n\ndocument:\n{}", expected, found),
        },
    );
}

/// Record a cached location that no longer points at its task.
pub fn log_drift(tasklens_dir: &Path, file_path: &str, line: usize, found: &str) {
    log_journal(
        tasklens_dir,
        JournalEntry {
            timestamp: Utc::now(),
            category: JournalCategory::Drift,
            description: format!("stale location in {}", file_path),
            fields: vec![
                ("Source".to_string(), file_path.to_string()),
                ("Line".to_string(), line.to_string()),
                ("Hint".to_string(), "rescan this file".to_string()),
            ],
            body: found.to_string(),
        },
    );
}

/// Record a task-note header that no longer parses. Rescanning cannot fix
/// this one; the header itself needs repair.
pub fn log_header_error(tasklens_dir: &Path, file_path: &str, parse_error: &str) {
    log_journal(
        tasklens_dir,
        JournalEntry {
            timestamp: Utc::now(),
            category: JournalCategory::Drift,
            description: format!("unparsable header in {}", file_path),
            fields: vec![
                ("Source".to_string(), file_path.to_string()),
                ("Error".to_string(), parse_error.to_string()),
                ("Hint".to_string(), "repair the header, then rescan".to_string()),
            ],
            body: String::new(),
        },
    );
}

/// Record a deletion with the removed text, so it stays recoverable.
pub fn log_deletion(tasklens_dir: &Path, file_path: &str, task_id: &str, task_source: &str) {
    log_journal(
        tasklens_dir,
        JournalEntry {
            timestamp: Utc::now(),
            category: JournalCategory::Delete,
            description: format!("task {} deleted", task_id),
            fields: vec![
                ("Task".to_string(), task_id.to_string()),
                ("Source".to_string(), file_path.to_string()),
            ],
            body: task_source.to_string(),
        },
    );
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read journal entries, most recent first. `since` keeps only entries at
/// or after the given instant; `limit` caps how many are returned.
pub fn read_journal_entries(
    tasklens_dir: &Path,
    limit: Option<usize>,
    since: Option<DateTime<Utc>>,
) -> Vec<JournalEntry> {
    let Ok(text) = fs::read_to_string(journal_path(tasklens_dir)) else {
        return Vec::new();
    };

    let mut entries = parse_journal(&text);
    entries.reverse();
    if let Some(since) = since {
        entries.retain(|e| e.timestamp >= since);
    }
    if let Some(limit) = limit {
        entries.truncate(limit);
    }
    entries
}

/// Split the journal into `---`-separated blocks and build an entry from
/// each block that carries a heading. Separator lines inside a body fence
/// do not split; the file header block has no heading and yields nothing.
fn parse_journal(text: &str) -> Vec<JournalEntry> {
    let mut entries = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    let mut fenced = false;

    for line in text.lines() {
        if !fenced && line == "---" {
            entries.extend(build_entry(&block));
            block.clear();
            continue;
        }
        if fenced {
            if line == "```" {
                fenced = false;
            }
        } else if line.starts_with("```") {
            fenced = true;
        }
        block.push(line);
    }
    entries.extend(build_entry(&block));
    entries
}

fn build_entry(block: &[&str]) -> Option<JournalEntry> {
    let mut lines = block.iter();
    let heading = loop {
        let line = lines.next()?;
        if let Some(rest) = line.strip_prefix("## ") {
            break rest;
        }
    };
    let (timestamp, category, description) = split_heading(heading)?;

    let mut fields = Vec::new();
    let mut body_lines: Vec<&str> = Vec::new();
    let mut fenced = false;
    for line in lines {
        if fenced {
            if *line == "```" {
                fenced = false;
            } else {
                body_lines.push(line);
            }
        } else if line.starts_with("```") {
            fenced = true;
        } else if !line.starts_with('#')
            && let Some((key, value)) = line.split_once(": ")
        {
            fields.push((key.trim().to_string(), value.to_string()));
        }
    }

    Some(JournalEntry {
        timestamp,
        category,
        description,
        fields,
        body: body_lines.join("\n"),
    })
}

/// Heading grammar: `<timestamp> — <category>: <description>`
fn split_heading(heading: &str) -> Option<(DateTime<Utc>, JournalCategory, String)> {
    let (ts, rest) = heading.split_once(" — ")?;
    let timestamp = DateTime::parse_from_rfc3339(ts).ok()?.with_timezone(&Utc);
    let (category, description) = rest.split_once(": ")?;
    Some((
        timestamp,
        JournalCategory::from_name(category)?,
        description.to_string(),
    ))
}

// ---------------------------------------------------------------------------
// Pruning
// ---------------------------------------------------------------------------

/// Remove entries older than `before` (default: 30 days ago), or every
/// entry when `all` is set. Returns how many entries were removed.
pub fn prune_journal(
    tasklens_dir: &Path,
    before: Option<DateTime<Utc>>,
    all: bool,
) -> io::Result<usize> {
    let path = journal_path(tasklens_dir);
    if !path.exists() {
        return Ok(0);
    }

    let mut file = lock_journal(&path)?;
    let mut text = String::new();
    file.read_to_string(&mut text)?;
    let original = parse_journal(&text).len();

    let kept = if all {
        FILE_HEADER.to_string()
    } else {
        let cutoff = before.unwrap_or_else(|| Utc::now() - chrono::Duration::days(DEFAULT_KEEP_DAYS));
        drop_entries_before(&text, cutoff)
    };
    let remaining = if all { 0 } else { parse_journal(&kept).len() };

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(kept.as_bytes())?;
    Ok(original - remaining)
}

/// Take the journal's own flock, giving a concurrent writer a moment to
/// finish before giving up.
fn lock_journal(path: &Path) -> io::Result<File> {
    let file = OpenOptions::new().read(true).write(true).open(path)?;
    let deadline = Instant::now() + Duration::from_secs(1);
    while !flock_nonblocking(&file) {
        if Instant::now() >= deadline {
            return Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "journal is in use, try again later",
            ));
        }
        thread::sleep(Duration::from_millis(50));
    }
    Ok(file)
}

/// Rebuild the journal keeping only entries at or after `cutoff`.
fn drop_entries_before(text: &str, cutoff: DateTime<Utc>) -> String {
    let mut kept = String::from(FILE_HEADER);
    for entry in parse_journal(text) {
        if entry.timestamp >= cutoff {
            kept.push_str(&entry.to_markdown());
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sidecar(tmp: &TempDir) -> PathBuf {
        let dir = tmp.path().join(".tasklens");
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn entry_at(days_ago: i64, category: JournalCategory, desc: &str, body: &str) -> JournalEntry {
        JournalEntry {
            timestamp: Utc::now() - chrono::Duration::days(days_ago),
            category,
            description: desc.to_string(),
            fields: vec![
                ("Source".to_string(), "inbox.md".to_string()),
                ("Line".to_string(), "4".to_string()),
            ],
            body: body.to_string(),
        }
    }

    #[test]
    fn test_markdown_shape() {
        let md = entry_at(0, JournalCategory::Conflict, "edit refused", "- [ ] x").to_markdown();
        assert!(md.starts_with("## "));
        assert!(md.contains("conflict: edit refused"));
        assert!(md.contains("Source: inbox.md"));
        assert!(md.contains("Line: 4"));
        assert!(md.contains("```text\n- [ ] x\n```"));
        assert!(md.ends_with("\n---\n"));
    }

    #[test]
    fn test_entry_without_body_has_no_fence() {
        let md = entry_at(0, JournalCategory::Write, "write failed", "").to_markdown();
        assert!(!md.contains("```"));

        let parsed = parse_journal(&md);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].description, "write failed");
        assert!(parsed[0].body.is_empty());
    }

    #[test]
    fn test_log_and_read_newest_first() {
        let tmp = TempDir::new().unwrap();
        let dir = sidecar(&tmp);

        log_journal(&dir, entry_at(0, JournalCategory::Drift, "first", "a"));
        log_journal(&dir, entry_at(0, JournalCategory::Write, "second", "b"));

        let entries = read_journal_entries(&dir, None, None);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].description, "second");
        assert_eq!(entries[1].description, "first");
        assert_eq!(entries[1].body, "a");
    }

    #[test]
    fn test_limit_keeps_newest() {
        let tmp = TempDir::new().unwrap();
        let dir = sidecar(&tmp);

        for i in 0..5 {
            log_journal(
                &dir,
                entry_at(0, JournalCategory::Delete, &format!("entry{}", i), ""),
            );
        }

        let entries = read_journal_entries(&dir, Some(2), None);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].description, "entry4");
        assert_eq!(entries[1].description, "entry3");
    }

    #[test]
    fn test_since_filters_older() {
        let tmp = TempDir::new().unwrap();
        let dir = sidecar(&tmp);

        log_journal(&dir, entry_at(10, JournalCategory::Drift, "older", ""));
        log_journal(&dir, entry_at(0, JournalCategory::Drift, "newer", ""));

        let since = Utc::now() - chrono::Duration::days(5);
        let entries = read_journal_entries(&dir, None, Some(since));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].description, "newer");
    }

    #[test]
    fn test_conflict_entry_captures_both_sides() {
        let tmp = TempDir::new().unwrap();
        let dir = sidecar(&tmp);

        log_conflict(&dir, "notes/a.md", 3, "- [ ] task", "- [ ] tusk");

        let entries = read_journal_entries(&dir, None, None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, JournalCategory::Conflict);
        assert_eq!(entries[0].description, "edit refused in notes/a.md");
        assert_eq!(entries[0].body, "cached:\n- [ ] task\n\ndocument:\n- [ ] tusk");
        assert!(entries[0].fields.iter().any(|(k, v)| k == "Line" && v == "3"));
    }

    #[test]
    fn test_deletion_entry_preserves_task_text() {
        let tmp = TempDir::new().unwrap();
        let dir = sidecar(&tmp);

        log_deletion(&dir, "inbox.md", "bank-1", "- [ ] call the bank\n\task the fee");

        let entries = read_journal_entries(&dir, None, None);
        assert_eq!(entries[0].description, "task bank-1 deleted");
        assert_eq!(entries[0].body, "- [ ] call the bank\n\task the fee");
        assert!(entries[0].fields.iter().any(|(k, v)| k == "Task" && v == "bank-1"));
    }

    #[test]
    fn test_header_error_entry_names_the_file() {
        let tmp = TempDir::new().unwrap();
        let dir = sidecar(&tmp);

        log_header_error(&dir, "trip.md", "expected `=` after key");

        let entries = read_journal_entries(&dir, None, None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, JournalCategory::Drift);
        assert_eq!(entries[0].description, "unparsable header in trip.md");
        assert!(entries[0].body.is_empty());
        assert!(
            entries[0]
                .fields
                .iter()
                .any(|(k, v)| k == "Error" && v == "expected `=` after key")
        );
    }

    #[test]
    fn test_body_with_separator_line_round_trips() {
        let tmp = TempDir::new().unwrap();
        let dir = sidecar(&tmp);

        // A fenced body line that looks like the block separator
        log_drift(&dir, "notes/hr.md", 7, "before\n---\nafter");

        let entries = read_journal_entries(&dir, None, None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].body, "before\n---\nafter");
    }

    #[test]
    fn test_entry_missing_terminator_still_parses() {
        let md = entry_at(0, JournalCategory::Write, "tail entry", "text").to_markdown();
        let truncated = md.trim_end_matches("---\n");

        let parsed = parse_journal(truncated);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].description, "tail entry");
    }

    #[test]
    fn test_header_written_once() {
        let tmp = TempDir::new().unwrap();
        let dir = sidecar(&tmp);

        log_journal(&dir, entry_at(0, JournalCategory::Drift, "a", ""));
        log_journal(&dir, entry_at(0, JournalCategory::Drift, "b", ""));

        let content = fs::read_to_string(journal_path(&dir)).unwrap();
        assert!(content.starts_with("<!-- tasklens journal"));
        assert_eq!(content.matches("tasklens journal").count(), 1);
    }

    #[test]
    fn test_prune_all_leaves_header() {
        let tmp = TempDir::new().unwrap();
        let dir = sidecar(&tmp);

        log_journal(&dir, entry_at(0, JournalCategory::Drift, "gone", "body"));

        let removed = prune_journal(&dir, None, true).unwrap();
        assert_eq!(removed, 1);
        assert!(read_journal_entries(&dir, None, None).is_empty());

        let content = fs::read_to_string(journal_path(&dir)).unwrap();
        assert!(content.contains("tasklens journal"));
    }

    #[test]
    fn test_prune_cutoff_counts_removed() {
        let tmp = TempDir::new().unwrap();
        let dir = sidecar(&tmp);

        log_journal(&dir, entry_at(90, JournalCategory::Delete, "old", "gone"));
        log_journal(&dir, entry_at(0, JournalCategory::Delete, "recent", "kept"));

        let removed = prune_journal(&dir, None, false).unwrap();
        assert_eq!(removed, 1);

        let entries = read_journal_entries(&dir, None, None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].description, "recent");
    }

    #[test]
    fn test_missing_journal_reads_empty_and_prunes_zero() {
        let tmp = TempDir::new().unwrap();
        let dir = sidecar(&tmp);

        assert!(read_journal_entries(&dir, None, None).is_empty());
        assert_eq!(prune_journal(&dir, None, true).unwrap(), 0);
    }

    #[test]
    fn test_to_json_keys() {
        let json = entry_at(0, JournalCategory::Delete, "task x deleted", "- [ ] x").to_json();
        assert_eq!(json["category"], "delete");
        assert_eq!(json["description"], "task x deleted");
        assert_eq!(json["body"], "- [ ] x");
        assert_eq!(json["fields"]["Source"], "inbox.md");
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_atomic_write_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("doc.md");
        fs::write(&path, "before").unwrap();

        atomic_write(&path, b"after").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "after");
    }
}
