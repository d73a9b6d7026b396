use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Events sent from the file watcher to the caller's loop.
#[derive(Debug)]
pub enum ChangeEvent {
    /// One or more vault documents changed on disk.
    Changed(Vec<PathBuf>),
}

/// A file system watcher for a vault root.
///
/// The engine itself only consumes "this file changed" signals; this
/// watcher is one adapter that produces them.
pub struct VaultWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<ChangeEvent>,
}

impl VaultWatcher {
    /// Start watching the given vault root.
    /// Returns a `VaultWatcher` whose `poll()` method should be called each tick.
    pub fn start(vault_root: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let sidecar = vault_root.join(crate::io::vault::TASKLENS_DIR);
        let root = vault_root.to_path_buf();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let event = match result {
                    Ok(e) => e,
                    Err(_) => return,
                };

                // We only care about creates, modifications, and removes
                match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
                    _ => return,
                }

                let relevant: Vec<PathBuf> = event
                    .paths
                    .into_iter()
                    .filter(|p| {
                        // Must be inside the vault
                        if !p.starts_with(&root) {
                            return false;
                        }
                        // The sidecar directory is engine-owned, never rescanned
                        if p.starts_with(&sidecar) {
                            return false;
                        }
                        // Only markdown documents matter
                        p.extension().and_then(|e| e.to_str()) == Some("md")
                    })
                    .collect();

                if !relevant.is_empty() {
                    let _ = tx.send(ChangeEvent::Changed(relevant));
                }
            },
            Config::default(),
        )?;

        watcher.watch(vault_root, RecursiveMode::Recursive)?;
        Ok(VaultWatcher {
            _watcher: watcher,
            rx,
        })
    }

    /// Non-blocking poll for pending change events.
    /// Returns all queued events (may be empty).
    pub fn poll(&self) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        while let Ok(evt) = self.rx.try_recv() {
            events.push(evt);
        }
        events
    }
}

/// Coalesces repeated change signals for the same path.
///
/// A path is admitted once per window; repeats inside the window drop,
/// so a burst of editor saves triggers a single rescan.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    last_seen: HashMap<PathBuf, Instant>,
}

impl Debouncer {
    pub fn new(window_ms: u64) -> Self {
        Debouncer {
            window: Duration::from_millis(window_ms),
            last_seen: HashMap::new(),
        }
    }

    /// Whether this signal should trigger work now.
    pub fn admit(&mut self, path: &Path) -> bool {
        let now = Instant::now();
        match self.last_seen.get(path) {
            Some(prev) if now.duration_since(*prev) < self.window => false,
            _ => {
                self.last_seen.insert(path.to_path_buf(), now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debouncer_drops_repeats_inside_window() {
        let mut debouncer = Debouncer::new(60_000);
        assert!(debouncer.admit(Path::new("notes/a.md")));
        assert!(!debouncer.admit(Path::new("notes/a.md")));
        assert!(!debouncer.admit(Path::new("notes/a.md")));
    }

    #[test]
    fn test_debouncer_tracks_paths_independently() {
        let mut debouncer = Debouncer::new(60_000);
        assert!(debouncer.admit(Path::new("notes/a.md")));
        assert!(debouncer.admit(Path::new("notes/b.md")));
        assert!(!debouncer.admit(Path::new("notes/a.md")));
    }

    #[test]
    fn test_zero_window_never_suppresses() {
        let mut debouncer = Debouncer::new(0);
        assert!(debouncer.admit(Path::new("notes/a.md")));
        assert!(debouncer.admit(Path::new("notes/a.md")));
    }
}
