use serde::{Deserialize, Serialize};

/// What a checkbox symbol means for bucketing and transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusKind {
    Todo,
    Done,
    Cancelled,
    InProgress,
    Custom,
}

impl StatusKind {
    /// Done and Cancelled records live in the Completed half of the cache
    pub fn is_completed(self) -> bool {
        matches!(self, StatusKind::Done | StatusKind::Cancelled)
    }
}

/// One symbol in the configurable status set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    /// The character inside the checkbox `[ ]`
    pub symbol: char,
    /// Human-readable name, also used by task-note headers
    pub name: String,
    pub kind: StatusKind,
    /// Symbol the cycle operation advances to (defaults to plain toggle)
    #[serde(default)]
    pub next_symbol: Option<char>,
}

/// The active set of checkbox symbols.
///
/// Symbols not listed here are treated as `Custom` and bucket as pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSet {
    #[serde(default = "default_entries")]
    pub entries: Vec<StatusEntry>,
}

impl Default for StatusSet {
    fn default() -> Self {
        StatusSet {
            entries: default_entries(),
        }
    }
}

fn default_entries() -> Vec<StatusEntry> {
    fn entry(symbol: char, name: &str, kind: StatusKind, next: Option<char>) -> StatusEntry {
        StatusEntry {
            symbol,
            name: name.to_string(),
            kind,
            next_symbol: next,
        }
    }
    vec![
        entry(' ', "unchecked", StatusKind::Todo, Some('/')),
        entry('/', "in progress", StatusKind::InProgress, Some('x')),
        entry('x', "checked", StatusKind::Done, Some(' ')),
        entry('X', "checked", StatusKind::Done, Some(' ')),
        entry('-', "dropped", StatusKind::Cancelled, Some(' ')),
    ]
}

impl StatusSet {
    fn entry(&self, symbol: char) -> Option<&StatusEntry> {
        self.entries.iter().find(|e| e.symbol == symbol)
    }

    pub fn kind_of(&self, symbol: char) -> StatusKind {
        self.entry(symbol)
            .map(|e| e.kind)
            .unwrap_or(StatusKind::Custom)
    }

    pub fn is_completed(&self, symbol: char) -> bool {
        self.kind_of(symbol).is_completed()
    }

    /// Look up a symbol by its configured name (task-note headers use names)
    pub fn symbol_for_name(&self, name: &str) -> Option<char> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .map(|e| e.symbol)
    }

    pub fn name_of(&self, symbol: char) -> Option<&str> {
        self.entry(symbol).map(|e| e.name.as_str())
    }

    /// Toggle: completed symbols reopen, everything else completes
    pub fn toggled(&self, symbol: char) -> char {
        if self.is_completed(symbol) { ' ' } else { 'x' }
    }

    /// Advance along the configured sequence; unknown symbols fall back to toggle
    pub fn next(&self, symbol: char) -> char {
        self.entry(symbol)
            .and_then(|e| e.next_symbol)
            .unwrap_or_else(|| self.toggled(symbol))
    }
}
