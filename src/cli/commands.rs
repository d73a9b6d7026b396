use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tl", about = concat!("[x] tasklens v", env!("CARGO_PKG_VERSION"), " - your tasks stay plain text"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different vault directory
    #[arg(short = 'C', long = "vault-dir", global = true)]
    pub vault_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a tasklens vault in the current directory
    Init(InitArgs),
    /// Scan documents and refresh the cache
    Scan(ScanArgs),
    /// List cached tasks
    List(ListArgs),
    /// Show task details
    Show(ShowArgs),
    /// Toggle, cycle, or set a task's status
    Status(StatusArgs),
    /// Set an inline field (due, priority, ...)
    Set(SetArgs),
    /// Add or remove a tag
    Tag(TagArgs),
    /// Append a new task to a document
    Add(AddArgs),
    /// Delete a task from its document
    Delete(DeleteArgs),
    /// Archive a task
    Archive(ArchiveArgs),
    /// Show or drain the deferred-scan queue
    Queue(QueueCmd),
    /// Validate cached locations against the documents
    Check,
    /// Watch the vault and rescan changed documents
    Watch(WatchArgs),
    /// View or manage the journal
    Journal(JournalCmd),
}

// ---------------------------------------------------------------------------
// Init args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Vault name (default: the directory name)
    #[arg(long)]
    pub name: Option<String>,
    /// Rewrite the config even if .tasklens/ already exists
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ScanArgs {
    /// Documents to rescan, vault-relative (default: the whole vault)
    pub paths: Vec<String>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Only pending tasks
    #[arg(long)]
    pub pending: bool,
    /// Only completed tasks
    #[arg(long)]
    pub completed: bool,
    /// Filter to one document
    #[arg(long)]
    pub file: Option<String>,
    /// Filter by tag
    #[arg(long)]
    pub tag: Option<String>,
    /// List task notes instead of tasks
    #[arg(long)]
    pub notes: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Task id, durable or numeric
    pub id: String,
}

// ---------------------------------------------------------------------------
// Write command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct StatusArgs {
    /// Task id, durable or numeric
    pub id: String,
    /// New status: a symbol or a configured name (default: toggle)
    pub status: Option<String>,
    /// Advance along the configured status sequence instead of toggling
    #[arg(long)]
    pub next: bool,
    /// Apply even when the document diverged from the cache
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct SetArgs {
    /// Task id, durable or numeric
    pub id: String,
    /// Field name (created, start, scheduled, due, completion, cancelled,
    /// id, depends-on, time, priority, reminder)
    pub field: String,
    /// New value (omit to clear the field)
    pub value: Option<String>,
    /// Apply even when the document diverged from the cache
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct TagArgs {
    /// Task id, durable or numeric
    pub id: String,
    /// Action: "add" or "rm"
    pub action: String,
    /// Tag, with or without the leading '#'
    pub tag: String,
    /// Apply even when the document diverged from the cache
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct AddArgs {
    /// Target document, vault-relative (created when missing)
    pub file: String,
    /// Task text, without the checkbox prefix
    pub text: String,
    /// Indented note line under the task (repeatable)
    #[arg(long)]
    pub body: Vec<String>,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Task id, durable or numeric
    pub id: String,
    /// Skip confirmation prompt
    #[arg(long)]
    pub yes: bool,
    /// Apply even when the document diverged from the cache
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ArchiveArgs {
    /// Task id, durable or numeric
    pub id: String,
    /// Apply even when the document diverged from the cache
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Maintenance
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct QueueCmd {
    #[command(subcommand)]
    pub action: Option<QueueAction>,
}

#[derive(Subcommand)]
pub enum QueueAction {
    /// List queued documents (default)
    Show,
    /// Rescan every queued document and clear the queue
    Drain,
}

#[derive(Args)]
pub struct WatchArgs {
    /// Queue changed documents instead of rescanning immediately
    #[arg(long)]
    pub defer: bool,
}

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct JournalCmd {
    #[command(subcommand)]
    pub action: Option<JournalAction>,
    /// Maximum number of entries to show (default: 10)
    #[arg(long)]
    pub limit: Option<usize>,
    /// Show entries after this timestamp (ISO-8601)
    #[arg(long)]
    pub since: Option<String>,
}

#[derive(Subcommand)]
pub enum JournalAction {
    /// Remove old entries
    Prune(JournalPruneArgs),
    /// Print the absolute path to the journal
    Path,
}

#[derive(Args)]
pub struct JournalPruneArgs {
    /// Remove entries older than this timestamp (default: 30 days ago)
    #[arg(long)]
    pub before: Option<String>,
    /// Remove all entries
    #[arg(long)]
    pub all: bool,
}
