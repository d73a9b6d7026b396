use serde::{Deserialize, Serialize};

use crate::model::status::StatusSet;

/// Engine configuration from `.tasklens/config.toml`.
///
/// Every section defaults, so a missing or empty file yields a working
/// configuration. Components receive the pieces they need explicitly;
/// nothing reads this through a global.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub vault: VaultInfo,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub statuses: StatusSet,
    #[serde(default)]
    pub patch: PatchConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub note: NoteConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultInfo {
    /// Display name; defaults to the vault directory name
    #[serde(default)]
    pub name: String,
}

/// Whether a filter group admits matches, rejects them, or is off
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Polarity {
    AllowOnly,
    DenyListed,
    #[default]
    Disabled,
}

/// One rule group: literal values, `folder/` prefixes, or `/…/` regexes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterGroup {
    #[serde(default)]
    pub polarity: Polarity,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Frontmatter rule group: one header key matched against a value list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrontmatterFilter {
    #[serde(default)]
    pub polarity: Polarity,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Indentation unit for body collection: a tab or a fixed run of spaces
    #[serde(default = "default_indent_unit")]
    pub indent_unit: String,
    #[serde(default)]
    pub files: FilterGroup,
    #[serde(default)]
    pub folders: FilterGroup,
    #[serde(default)]
    pub frontmatter: FrontmatterFilter,
    /// Evaluated per-line against extracted tags, not per-document
    #[serde(default)]
    pub tags: FilterGroup,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            indent_unit: default_indent_unit(),
            files: FilterGroup::default(),
            folders: FilterGroup::default(),
            frontmatter: FrontmatterFilter::default(),
            tags: FilterGroup::default(),
        }
    }
}

fn default_indent_unit() -> String {
    "\t".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchConfig {
    /// When true, a non-whitespace divergence at patch time is an error the
    /// caller must resolve; when false, the patch force-applies
    #[serde(default = "default_true")]
    pub confirm_conflicts: bool,
}

impl Default for PatchConfig {
    fn default() -> Self {
        PatchConfig {
            confirm_conflicts: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Vault-relative path of the archive document.
    /// Empty = wrap archived records in fold markers in place.
    #[serde(default)]
    pub file: String,
}

/// Task-note detection and header key aliasing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteConfig {
    /// Tag marking a document as a single whole-document task
    #[serde(default = "default_note_identifier")]
    pub identifier: String,
    /// Header key whose presence registers the document as a reminder note
    #[serde(default = "default_reminder_key")]
    pub reminder_key: String,
    #[serde(default)]
    pub keys: HeaderKeys,
}

impl Default for NoteConfig {
    fn default() -> Self {
        NoteConfig {
            identifier: default_note_identifier(),
            reminder_key: default_reminder_key(),
            keys: HeaderKeys::default(),
        }
    }
}

fn default_note_identifier() -> String {
    "taskNote".to_string()
}

fn default_reminder_key() -> String {
    "reminder".to_string()
}

/// Per-deployment names for task-note header fields. These same names are
/// the inline-key and call-style dialect keys on task lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderKeys {
    #[serde(default = "default_key_title")]
    pub title: String,
    #[serde(default = "default_key_status")]
    pub status: String,
    #[serde(default = "default_key_tags")]
    pub tags: String,
    #[serde(default = "default_key_id")]
    pub id: String,
    #[serde(default = "default_key_priority")]
    pub priority: String,
    #[serde(default = "default_key_created")]
    pub created: String,
    #[serde(default = "default_key_start")]
    pub start: String,
    #[serde(default = "default_key_scheduled")]
    pub scheduled: String,
    #[serde(default = "default_key_due")]
    pub due: String,
    #[serde(default = "default_key_cancelled")]
    pub cancelled: String,
    #[serde(default = "default_key_completion")]
    pub completion: String,
    #[serde(default = "default_key_time")]
    pub time: String,
    #[serde(default = "default_key_reminder")]
    pub reminder: String,
    #[serde(default = "default_key_depends_on")]
    pub depends_on: String,
}

impl Default for HeaderKeys {
    fn default() -> Self {
        HeaderKeys {
            title: default_key_title(),
            status: default_key_status(),
            tags: default_key_tags(),
            id: default_key_id(),
            priority: default_key_priority(),
            created: default_key_created(),
            start: default_key_start(),
            scheduled: default_key_scheduled(),
            due: default_key_due(),
            cancelled: default_key_cancelled(),
            completion: default_key_completion(),
            time: default_key_time(),
            reminder: default_key_reminder(),
            depends_on: default_key_depends_on(),
        }
    }
}

fn default_key_title() -> String {
    "title".to_string()
}

fn default_key_status() -> String {
    "status".to_string()
}

fn default_key_tags() -> String {
    "tags".to_string()
}

fn default_key_id() -> String {
    "id".to_string()
}

fn default_key_priority() -> String {
    "priority".to_string()
}

fn default_key_created() -> String {
    "created".to_string()
}

fn default_key_start() -> String {
    "start".to_string()
}

fn default_key_scheduled() -> String {
    "scheduled".to_string()
}

fn default_key_due() -> String {
    "due".to_string()
}

fn default_key_cancelled() -> String {
    "cancelled".to_string()
}

fn default_key_completion() -> String {
    "completion".to_string()
}

fn default_key_time() -> String {
    "time".to_string()
}

fn default_key_reminder() -> String {
    "reminder".to_string()
}

fn default_key_depends_on() -> String {
    "dependsOn".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Window for coalescing repeated change signals for one path
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        WatchConfig {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    500
}
