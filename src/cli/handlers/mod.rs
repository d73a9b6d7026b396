mod init;
pub use init::cmd_init;

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{Local, Utc};

/// Global override for the vault directory (set by -C flag)
static VAULT_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::cache_io;
use crate::io::journal;
use crate::io::lock::VaultLock;
use crate::io::queue::ScanQueue;
use crate::io::vault::{self, VaultError};
use crate::io::watcher::{ChangeEvent, Debouncer, VaultWatcher};
use crate::model::cache::TaskCache;
use crate::model::config::EngineConfig;
use crate::model::record::TaskRecord;
use crate::ops::note::priority_rank;
use crate::ops::patch::PatchError;
use crate::ops::scan::Scanner;
use crate::ops::{self, Edit};
use crate::parse::fields::Field;
use crate::parse::serializer::serialize_record;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;

    // Store -C override for vault discovery
    if let Some(ref dir) = cli.vault_dir {
        let abs = std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?;
        VAULT_DIR_OVERRIDE.lock().unwrap().replace(abs);
    }

    match cli.command {
        // Init runs before vault discovery
        Commands::Init(args) => cmd_init(args),

        // Read commands
        Commands::Scan(args) => cmd_scan(args, json),
        Commands::List(args) => cmd_list(args, json),
        Commands::Show(args) => cmd_show(args, json),
        Commands::Check => cmd_check(json),

        // Write commands
        Commands::Status(args) => cmd_status(args, json),
        Commands::Set(args) => cmd_set(args, json),
        Commands::Tag(args) => cmd_tag(args, json),
        Commands::Add(args) => cmd_add(args, json),
        Commands::Delete(args) => cmd_delete(args),
        Commands::Archive(args) => cmd_archive(args),

        // Maintenance
        Commands::Queue(args) => cmd_queue(args, json),
        Commands::Watch(args) => cmd_watch(args),
        Commands::Journal(args) => cmd_journal(args, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A discovered vault root with its loaded configuration
struct Vault {
    root: PathBuf,
    sidecar: PathBuf,
    config: EngineConfig,
}

fn start_dir() -> std::io::Result<PathBuf> {
    match VAULT_DIR_OVERRIDE.lock().unwrap().as_ref() {
        Some(dir) => Ok(dir.clone()),
        None => std::env::current_dir(),
    }
}

fn open_vault() -> Result<Vault, VaultError> {
    let start = start_dir().map_err(VaultError::IoError)?;
    let root = vault::discover_vault(&start)?;
    let mut config = vault::load_config(&root)?;
    if config.vault.name.is_empty()
        && let Some(name) = root.file_name()
    {
        config.vault.name = name.to_string_lossy().into_owned();
    }
    let sidecar = vault::tasklens_dir(&root);
    Ok(Vault {
        root,
        sidecar,
        config,
    })
}

fn load_cache(vault: &Vault) -> Result<TaskCache, Box<dyn std::error::Error>> {
    cache_io::read_cache(&vault.sidecar)
        .ok_or_else(|| "no cache found: run `tl scan` first".into())
}

fn find_record(cache: &TaskCache, id: &str) -> Result<TaskRecord, Box<dyn std::error::Error>> {
    cache
        .find(id)
        .cloned()
        .ok_or_else(|| format!("task not found: {}", id).into())
}

/// Whether the record's document is a task note (one whole-document record)
fn is_note_record(
    vault: &Vault,
    document: &str,
    record: &TaskRecord,
) -> Result<bool, ops::HeaderError> {
    let note = checked_header(
        vault,
        ops::read_note(
            document,
            &record.file_path,
            &vault.config.note,
            &vault.config.statuses,
        ),
    )?;
    Ok(note.is_some())
}

/// Record an unparsable header in the journal before the error surfaces
fn checked_header<T>(
    vault: &Vault,
    result: Result<T, ops::HeaderError>,
) -> Result<T, ops::HeaderError> {
    if let Err(ref error) = result {
        let ops::HeaderError::Malformed { path, source } = error;
        journal::log_header_error(&vault.sidecar, path, &source.to_string());
    }
    result
}

/// Record a refused patch in the journal before the error surfaces
fn journal_edit_error(vault: &Vault, record: &TaskRecord, error: &PatchError) {
    match error {
        PatchError::ContentConflict {
            path,
            expected,
            found,
        } => {
            journal::log_conflict(
                &vault.sidecar,
                path,
                record.location.start_line,
                expected,
                found,
            );
        }
        PatchError::LocationDrift { path, line, found } => {
            journal::log_drift(&vault.sidecar, path, *line, found);
        }
        _ => {}
    }
}

fn checked_edit(
    vault: &Vault,
    record: &TaskRecord,
    result: Result<Edit, PatchError>,
) -> Result<Edit, PatchError> {
    if let Err(ref error) = result {
        journal_edit_error(vault, record, error);
    }
    result
}

/// Persist a rewritten document and fold its fresh scan into the cache
fn complete_edit(
    vault: &Vault,
    scanner: &Scanner,
    cache: &mut TaskCache,
    path: &str,
    document: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    vault::write_document(&vault.root, path, document)?;
    let documents = vec![(path.to_string(), document.to_string())];
    scanner.scan_into(&documents, cache);
    cache_io::write_cache(&vault.sidecar, cache)?;
    Ok(())
}

/// Scan the given documents into the cache. A path that no longer exists
/// drops its cache buckets. Returns the paths whose records changed.
fn scan_paths(
    vault: &Vault,
    scanner: &Scanner,
    cache: &mut TaskCache,
    paths: &[String],
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut documents = Vec::new();
    let mut removed = Vec::new();
    for path in paths {
        match vault::try_read_document(&vault.root, path)? {
            Some(text) => documents.push((path.clone(), text)),
            None => {
                let had_records = cache.pending.contains_key(path.as_str())
                    || cache.completed.contains_key(path.as_str())
                    || cache.notes.iter().any(|n| n.file_path == *path);
                if had_records {
                    cache.remove_file(path);
                    removed.push(path.clone());
                }
            }
        }
    }
    let mut changed = scanner.scan_into(&documents, cache);
    changed.extend(removed);
    Ok(changed)
}

fn count_word(count: usize, singular: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}s", count, singular)
    }
}

// ---------------------------------------------------------------------------
// Read command handlers
// ---------------------------------------------------------------------------

fn cmd_scan(args: ScanArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let vault = open_vault()?;
    let _lock = VaultLock::acquire_default(&vault.sidecar)?;
    let scanner = Scanner::new(&vault.config);
    let mut cache = cache_io::read_cache(&vault.sidecar)
        .unwrap_or_else(|| TaskCache::new(&vault.config.vault.name));

    let full_scan = args.paths.is_empty();
    let paths = if full_scan {
        vault::list_documents(&vault.root)?
    } else {
        args.paths
    };

    // A full scan also drops buckets for documents that no longer exist
    let mut stale: Vec<String> = Vec::new();
    if full_scan {
        let live: HashSet<&str> = paths.iter().map(String::as_str).collect();
        let cached: HashSet<String> = cache
            .pending
            .keys()
            .chain(cache.completed.keys())
            .filter(|p| !live.contains(p.as_str()))
            .cloned()
            .collect();
        for path in cached {
            cache.remove_file(&path);
            stale.push(path);
        }
    }

    let mut changed = scan_paths(&vault, &scanner, &mut cache, &paths)?;
    changed.extend(stale);
    changed.sort();
    changed.dedup();

    if !changed.is_empty() || !cache_io::cache_path(&vault.sidecar).exists() {
        cache_io::write_cache(&vault.sidecar, &mut cache)?;
    }

    let files: Vec<FileCountJson> = paths
        .iter()
        .filter_map(|path| {
            let pending = cache.pending.get(path.as_str()).map_or(0, Vec::len);
            let completed = cache.completed.get(path.as_str()).map_or(0, Vec::len);
            if pending + completed > 0 {
                Some(FileCountJson {
                    file: path.clone(),
                    pending,
                    completed,
                })
            } else {
                None
            }
        })
        .collect();
    let report = ScanReportJson {
        scanned: paths.len(),
        pending: files.iter().map(|f| f.pending).sum(),
        completed: files.iter().map(|f| f.completed).sum(),
        changed,
        files,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "scanned {}: {} pending, {} completed",
            count_word(report.scanned, "document"),
            report.pending,
            report.completed
        );
        for entry in &report.files {
            println!(
                "  {}: {} pending, {} completed",
                entry.file, entry.pending, entry.completed
            );
        }
        if report.changed.is_empty() {
            println!("cache unchanged");
        } else {
            println!("{} changed", count_word(report.changed.len(), "document"));
        }
    }
    Ok(())
}

fn cmd_list(args: ListArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let vault = open_vault()?;
    let cache = load_cache(&vault)?;

    if args.notes {
        if json {
            println!("{}", serde_json::to_string_pretty(&cache.notes)?);
        } else if cache.notes.is_empty() {
            println!("no task notes cached");
        } else {
            for note in &cache.notes {
                println!("{}", format_note_line(note));
            }
        }
        return Ok(());
    }

    let include_pending = args.pending || !args.completed;
    let include_completed = args.completed;

    let matches = |record: &TaskRecord| -> bool {
        if let Some(ref file) = args.file
            && record.file_path != *file
        {
            return false;
        }
        if let Some(ref tag) = args.tag {
            let needle = tag.trim_start_matches('#');
            if !record
                .tags
                .iter()
                .any(|t| t.trim_start_matches('#') == needle)
            {
                return false;
            }
        }
        true
    };

    let mut by_file: BTreeMap<&str, Vec<&TaskRecord>> = BTreeMap::new();
    if include_pending {
        for records in cache.pending.values() {
            for record in records.iter().filter(|r| matches(r)) {
                by_file.entry(&record.file_path).or_default().push(record);
            }
        }
    }
    if include_completed {
        for records in cache.completed.values() {
            for record in records.iter().filter(|r| matches(r)) {
                by_file.entry(&record.file_path).or_default().push(record);
            }
        }
    }
    for records in by_file.values_mut() {
        records.sort_by_key(|r| r.location.start_line);
    }

    if json {
        let listing: Vec<FileTasksJson> = by_file
            .iter()
            .map(|(file, tasks)| FileTasksJson {
                file,
                tasks: tasks.clone(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else if by_file.is_empty() {
        println!("no tasks");
    } else {
        let mut first = true;
        for (file, records) in &by_file {
            if !first {
                println!();
            }
            first = false;
            println!("{}", format_file_header(file));
            for record in records {
                println!("{}", format_record_line(record));
            }
        }
    }
    Ok(())
}

fn cmd_show(args: ShowArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let vault = open_vault()?;
    let cache = load_cache(&vault)?;
    let record = find_record(&cache, &args.id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        for line in format_record_detail(&record, &vault.config.statuses) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_check(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let vault = open_vault()?;
    let cache = load_cache(&vault)?;

    let mut checked = 0;
    let mut drifted = Vec::new();
    let mut documents: BTreeMap<&str, Option<String>> = BTreeMap::new();

    for record in cache.all_records() {
        checked += 1;
        let text = documents
            .entry(record.file_path.as_str())
            .or_insert_with(|| {
                vault::try_read_document(&vault.root, &record.file_path)
                    .ok()
                    .flatten()
            })
            .as_deref();

        let error = match text {
            None => Some("document missing".to_string()),
            Some(text) => {
                match ops::read_note(text, &record.file_path, &vault.config.note, &vault.config.statuses) {
                    Err(e) => Some(e.to_string()),
                    Ok(Some(fresh)) => {
                        if fresh == *record {
                            None
                        } else {
                            Some("task note out of date".to_string())
                        }
                    }
                    Ok(None) => ops::validate_location(text, record).err().map(|e| e.to_string()),
                }
            }
        };

        if let Some(error) = error {
            drifted.push(DriftJson {
                id: display_id(record),
                file: record.file_path.clone(),
                line: record.location.start_line,
                error,
            });
        }
    }

    let report = CheckReportJson { checked, drifted };
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.drifted.is_empty() {
        println!("✓ {} match their documents", count_word(report.checked, "record"));
    } else {
        for drift in &report.drifted {
            println!("  {}:{} {}: {}", drift.file, drift.line, drift.id, drift.error);
        }
        println!(
            "✗ {} of {} records drifted (run `tl scan` to refresh)",
            report.drifted.len(),
            report.checked
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write command handlers
// ---------------------------------------------------------------------------

fn cmd_status(args: StatusArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let vault = open_vault()?;
    let _lock = VaultLock::acquire_default(&vault.sidecar)?;
    let mut cache = load_cache(&vault)?;
    let record = find_record(&cache, &args.id)?;

    let scanner = Scanner::new(&vault.config);
    let statuses = &vault.config.statuses;
    let document = vault::read_document(&vault.root, &record.file_path)?;
    let today = Local::now().date_naive();
    let confirm = vault.config.patch.confirm_conflicts && !args.force;

    let symbol = match args.status {
        Some(ref value) => {
            parse_status_value(value, statuses).map_err(Box::<dyn std::error::Error>::from)?
        }
        None if args.next => statuses.next(record.status),
        None => statuses.toggled(record.status),
    };

    let edit = if is_note_record(&vault, &document, &record)? {
        let mut updated = record.clone();
        let was = statuses.kind_of(updated.status);
        updated.status = symbol;
        ops::stamp_status_dates(&mut updated, was, statuses, today);
        let rewritten = checked_header(
            &vault,
            ops::update_header(&document, &updated, &vault.config.note, statuses),
        )?;
        Edit {
            document: rewritten,
            record: updated,
        }
    } else {
        checked_edit(
            &vault,
            &record,
            ops::set_status(&document, &record, symbol, statuses, scanner.tables(), today, confirm),
        )?
    };

    complete_edit(&vault, &scanner, &mut cache, &record.file_path, &edit.document)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&edit.record)?);
    } else {
        let label = match statuses.name_of(symbol) {
            Some(name) => format!("[{}] {}", symbol, name),
            None => format!("[{}]", symbol),
        };
        println!("{} → {}", args.id, label);
    }
    Ok(())
}

fn cmd_set(args: SetArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let vault = open_vault()?;
    let _lock = VaultLock::acquire_default(&vault.sidecar)?;
    let mut cache = load_cache(&vault)?;
    let record = find_record(&cache, &args.id)?;

    let field = parse_field_name(&args.field).map_err(Box::<dyn std::error::Error>::from)?;
    let raw = args.value.unwrap_or_default();
    validate_field_value(field, &raw).map_err(Box::<dyn std::error::Error>::from)?;
    // Rank names normalize to the numeric scale
    let value = if field == Field::Priority && !raw.is_empty() {
        priority_rank(&raw).to_string()
    } else {
        raw
    };

    let scanner = Scanner::new(&vault.config);
    let statuses = &vault.config.statuses;
    let document = vault::read_document(&vault.root, &record.file_path)?;
    let confirm = vault.config.patch.confirm_conflicts && !args.force;

    let edit = if is_note_record(&vault, &document, &record)? {
        let mut updated = record.clone();
        assign_field(&mut updated, field, &value);
        let rewritten = checked_header(
            &vault,
            ops::update_header(&document, &updated, &vault.config.note, statuses),
        )?;
        Edit {
            document: rewritten,
            record: updated,
        }
    } else {
        checked_edit(
            &vault,
            &record,
            ops::set_field(&document, &record, field, &value, scanner.tables(), confirm),
        )?
    };

    complete_edit(&vault, &scanner, &mut cache, &record.file_path, &edit.document)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&edit.record)?);
    } else if value.is_empty() {
        println!("{} {} cleared", args.id, args.field);
    } else {
        println!("{} {} → {}", args.id, args.field, value);
    }
    Ok(())
}

/// Mirror an inline field assignment onto a header-backed record
fn assign_field(record: &mut TaskRecord, field: Field, value: &str) {
    match field {
        Field::Created => record.created = value.to_string(),
        Field::Start => record.start = value.to_string(),
        Field::Scheduled => record.scheduled = value.to_string(),
        Field::Due => record.due = value.to_string(),
        Field::Completion => record.completion = value.to_string(),
        Field::Cancelled => record.cancelled = value.to_string(),
        Field::Id => record.legacy_id = value.to_string(),
        Field::Time => record.time = value.to_string(),
        Field::Reminder => record.reminder = value.to_string(),
        Field::Priority => record.priority = priority_rank(value),
        Field::DependsOn => {
            record.depends_on = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
    }
}

fn cmd_tag(args: TagArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let vault = open_vault()?;
    let _lock = VaultLock::acquire_default(&vault.sidecar)?;
    let mut cache = load_cache(&vault)?;
    let record = find_record(&cache, &args.id)?;

    let scanner = Scanner::new(&vault.config);
    let statuses = &vault.config.statuses;
    let document = vault::read_document(&vault.root, &record.file_path)?;
    let confirm = vault.config.patch.confirm_conflicts && !args.force;

    let edit = if is_note_record(&vault, &document, &record)? {
        // Header tags are stored bare
        let needle = args.tag.trim_start_matches('#').to_string();
        let mut updated = record.clone();
        match args.action.as_str() {
            "add" => {
                if !updated
                    .tags
                    .iter()
                    .any(|t| t.trim_start_matches('#') == needle)
                {
                    updated.tags.push(needle);
                }
            }
            "rm" => updated.tags.retain(|t| t.trim_start_matches('#') != needle),
            other => {
                return Err(format!("unknown action '{}' (expected: add, rm)", other).into());
            }
        }
        let rewritten = checked_header(
            &vault,
            ops::update_header(&document, &updated, &vault.config.note, statuses),
        )?;
        Edit {
            document: rewritten,
            record: updated,
        }
    } else {
        let result = match args.action.as_str() {
            "add" => ops::edits::add_tag(&document, &record, &args.tag, scanner.tables(), confirm),
            "rm" => ops::edits::remove_tag(&document, &record, &args.tag, scanner.tables(), confirm),
            other => {
                return Err(format!("unknown action '{}' (expected: add, rm)", other).into());
            }
        };
        checked_edit(&vault, &record, result)?
    };

    complete_edit(&vault, &scanner, &mut cache, &record.file_path, &edit.document)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&edit.record)?);
    } else {
        println!("{} tag {} {}", args.id, args.action, args.tag);
    }
    Ok(())
}

fn cmd_add(args: AddArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let vault = open_vault()?;
    let _lock = VaultLock::acquire_default(&vault.sidecar)?;
    let scanner = Scanner::new(&vault.config);

    let document = vault::try_read_document(&vault.root, &args.file)?.unwrap_or_default();
    let (rewritten, record) = ops::add_task(
        &document,
        &args.text,
        &args.body,
        &args.file,
        scanner.tables(),
        &vault.config.scan.indent_unit,
    );

    let mut cache = cache_io::read_cache(&vault.sidecar)
        .unwrap_or_else(|| TaskCache::new(&vault.config.vault.name));
    complete_edit(&vault, &scanner, &mut cache, &args.file, &rewritten)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!("{}", display_id(&record));
    }
    Ok(())
}

fn cmd_delete(args: DeleteArgs) -> Result<(), Box<dyn std::error::Error>> {
    let vault = open_vault()?;
    let _lock = VaultLock::acquire_default(&vault.sidecar)?;
    let mut cache = load_cache(&vault)?;
    let record = find_record(&cache, &args.id)?;

    let scanner = Scanner::new(&vault.config);
    let document = vault::read_document(&vault.root, &record.file_path)?;

    if is_note_record(&vault, &document, &record)? {
        return Err(format!(
            "{} is a task note: delete the document {} instead",
            args.id, record.file_path
        )
        .into());
    }

    if !args.yes {
        eprint!("delete \"{}\"? [y/n] ", record.title.trim_start());
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("cancelled");
            return Ok(());
        }
    }

    let confirm = vault.config.patch.confirm_conflicts && !args.force;
    let rewritten = match ops::delete_record(&document, &record, confirm) {
        Ok(text) => text,
        Err(error) => {
            journal_edit_error(&vault, &record, &error);
            return Err(error.into());
        }
    };

    // Journal the serialized task before it leaves the document
    journal::log_deletion(
        &vault.sidecar,
        &record.file_path,
        &display_id(&record),
        &serialize_record(&record),
    );

    complete_edit(&vault, &scanner, &mut cache, &record.file_path, &rewritten)?;
    println!("deleted {}", args.id);
    Ok(())
}

fn cmd_archive(args: ArchiveArgs) -> Result<(), Box<dyn std::error::Error>> {
    let vault = open_vault()?;
    let _lock = VaultLock::acquire_default(&vault.sidecar)?;
    let mut cache = load_cache(&vault)?;
    let record = find_record(&cache, &args.id)?;

    let scanner = Scanner::new(&vault.config);
    let document = vault::read_document(&vault.root, &record.file_path)?;

    if is_note_record(&vault, &document, &record)? {
        return Err(format!(
            "{} is a task note: archive the document {} instead",
            args.id, record.file_path
        )
        .into());
    }

    let confirm = vault.config.patch.confirm_conflicts && !args.force;
    let destination_rel = vault.config.archive.file.clone();
    let archive_existing = if destination_rel.is_empty() {
        None
    } else {
        Some(vault::try_read_document(&vault.root, &destination_rel)?.unwrap_or_default())
    };

    let archived = match ops::archive_record(
        &document,
        archive_existing.as_deref(),
        &record,
        Utc::now(),
        confirm,
    ) {
        Ok(archived) => archived,
        Err(error) => {
            journal_edit_error(&vault, &record, &error);
            return Err(error.into());
        }
    };

    // The destination lands before the source row disappears
    if let Some(ref destination) = archived.destination {
        vault::write_document(&vault.root, &destination_rel, destination)?;
    }
    vault::write_document(&vault.root, &record.file_path, &archived.source)?;

    let mut rescan = vec![record.file_path.clone()];
    if archived.destination.is_some() {
        rescan.push(destination_rel.clone());
    }
    scan_paths(&vault, &scanner, &mut cache, &rescan)?;
    cache_io::write_cache(&vault.sidecar, &mut cache)?;

    if archived.destination.is_some() {
        println!("archived {} to {}", args.id, destination_rel);
    } else {
        println!("archived {} in place", args.id);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Maintenance handlers
// ---------------------------------------------------------------------------

fn cmd_queue(args: QueueCmd, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let vault = open_vault()?;

    match args.action {
        None | Some(QueueAction::Show) => {
            let queue = ScanQueue::load(&vault.sidecar);
            if json {
                let listing = QueueJson {
                    pending: queue.paths(),
                };
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else if queue.is_empty() {
                println!("queue is empty");
            } else {
                for path in queue.paths() {
                    println!("{}", path);
                }
            }
            Ok(())
        }
        Some(QueueAction::Drain) => {
            let _lock = VaultLock::acquire_default(&vault.sidecar)?;
            let mut queue = ScanQueue::load(&vault.sidecar);
            if queue.is_empty() {
                println!("queue is empty");
                return Ok(());
            }
            let scanner = Scanner::new(&vault.config);
            let mut cache = cache_io::read_cache(&vault.sidecar)
                .unwrap_or_else(|| TaskCache::new(&vault.config.vault.name));
            let paths = queue.drain();
            let changed = scan_paths(&vault, &scanner, &mut cache, &paths)?;
            cache_io::write_cache(&vault.sidecar, &mut cache)?;
            queue.save()?;
            println!(
                "rescanned {}, {} changed",
                count_word(paths.len(), "document"),
                changed.len()
            );
            Ok(())
        }
    }
}

fn cmd_watch(args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let vault = open_vault()?;
    let scanner = Scanner::new(&vault.config);
    let mut cache = cache_io::read_cache(&vault.sidecar)
        .unwrap_or_else(|| TaskCache::new(&vault.config.vault.name));
    let mut queue = ScanQueue::load(&vault.sidecar);
    let mut debouncer = Debouncer::new(vault.config.watch.debounce_ms);

    let watcher = VaultWatcher::start(&vault.root)?;
    println!("watching {} (ctrl-c to stop)", vault.root.display());

    loop {
        for event in watcher.poll() {
            let ChangeEvent::Changed(paths) = event;
            for path in paths {
                if !debouncer.admit(&path) {
                    continue;
                }
                let Ok(rel) = path.strip_prefix(&vault.root) else {
                    continue;
                };
                let rel = rel.to_string_lossy().into_owned();

                if args.defer {
                    if queue.push(&rel) {
                        queue.save()?;
                        println!("queued {}", rel);
                    }
                } else {
                    let _lock = VaultLock::acquire_default(&vault.sidecar)?;
                    let changed = scan_paths(&vault, &scanner, &mut cache, &[rel.clone()])?;
                    if !changed.is_empty() {
                        cache_io::write_cache(&vault.sidecar, &mut cache)?;
                        println!("rescanned {}", rel);
                    }
                }
            }
        }
        std::thread::sleep(Duration::from_millis(100));
    }
}

fn cmd_journal(args: JournalCmd, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let vault = open_vault()?;

    match args.action {
        Some(JournalAction::Path) => {
            println!("{}", journal::journal_path(&vault.sidecar).display());
            Ok(())
        }
        Some(JournalAction::Prune(prune)) => {
            let before = prune
                .before
                .as_deref()
                .map(parse_timestamp)
                .transpose()
                .map_err(Box::<dyn std::error::Error>::from)?;
            let removed = journal::prune_journal(&vault.sidecar, before, prune.all)?;
            if removed == 1 {
                println!("removed 1 journal entry");
            } else {
                println!("removed {} journal entries", removed);
            }
            Ok(())
        }
        None => {
            let since = args
                .since
                .as_deref()
                .map(parse_timestamp)
                .transpose()
                .map_err(Box::<dyn std::error::Error>::from)?;
            let limit = args.limit.or(Some(10));
            let entries = journal::read_journal_entries(&vault.sidecar, limit, since);

            if json {
                let values: Vec<serde_json::Value> =
                    entries.iter().map(|e| e.to_json()).collect();
                println!("{}", serde_json::to_string_pretty(&values)?);
            } else if entries.is_empty() {
                println!("journal is empty");
            } else {
                let mut first = true;
                for entry in &entries {
                    if !first {
                        println!();
                    }
                    first = false;
                    for line in format_journal_entry(entry) {
                        println!("{}", line);
                    }
                }
            }
            Ok(())
        }
    }
}
