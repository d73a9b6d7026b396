use std::fs;
use std::path::{Path, PathBuf};

use crate::io::journal::{self, JournalCategory, JournalEntry};
use crate::model::config::EngineConfig;

/// Name of the sidecar directory that marks a vault root and holds the
/// config, cache, queue, and journal.
pub const TASKLENS_DIR: &str = ".tasklens";

/// Error type for vault I/O operations
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("not a tasklens vault: no .tasklens/ directory found")]
    NotAVault,
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config.toml: {0}")]
    ConfigParseError(#[from] toml::de::Error),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Discover the vault root by walking up from the given directory,
/// looking for a `.tasklens/` subdirectory.
pub fn discover_vault(start: &Path) -> Result<PathBuf, VaultError> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(TASKLENS_DIR).is_dir() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(VaultError::NotAVault);
        }
    }
}

/// Return the sidecar directory for a vault root.
pub fn tasklens_dir(root: &Path) -> PathBuf {
    root.join(TASKLENS_DIR)
}

/// Load the engine config from `.tasklens/config.toml`.
/// A missing file yields the default config.
pub fn load_config(root: &Path) -> Result<EngineConfig, VaultError> {
    let config_path = tasklens_dir(root).join("config.toml");
    if !config_path.exists() {
        return Ok(EngineConfig::default());
    }
    let text = fs::read_to_string(&config_path).map_err(|e| VaultError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;
    let config: EngineConfig = toml::from_str(&text)?;
    Ok(config)
}

/// List every markdown document in the vault as vault-relative paths,
/// sorted. Hidden entries (the sidecar directory included) are skipped.
pub fn list_documents(root: &Path) -> Result<Vec<String>, VaultError> {
    let mut found = Vec::new();
    collect_documents(root, root, &mut found)?;
    found.sort();
    Ok(found)
}

fn collect_documents(root: &Path, dir: &Path, found: &mut Vec<String>) -> Result<(), VaultError> {
    let entries = fs::read_dir(dir).map_err(|e| VaultError::ReadError {
        path: dir.to_path_buf(),
        source: e,
    })?;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            collect_documents(root, &path, found)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("md")
            && let Ok(rel) = path.strip_prefix(root)
        {
            found.push(rel.to_string_lossy().into_owned());
        }
    }
    Ok(())
}

/// Absolute path of a vault-relative document.
pub fn document_path(root: &Path, rel: &str) -> PathBuf {
    root.join(rel)
}

/// Read a document's full text.
pub fn read_document(root: &Path, rel: &str) -> Result<String, VaultError> {
    let path = root.join(rel);
    fs::read_to_string(&path).map_err(|e| VaultError::ReadError { path, source: e })
}

/// Read a document that may not exist yet.
pub fn try_read_document(root: &Path, rel: &str) -> Result<Option<String>, VaultError> {
    let path = root.join(rel);
    match fs::read_to_string(&path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(VaultError::ReadError { path, source: e }),
    }
}

/// Write a document atomically, creating parent folders on demand.
/// A failed write lands in the journal with the content that was lost.
pub fn write_document(root: &Path, rel: &str, content: &str) -> Result<(), VaultError> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| VaultError::WriteError {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    if let Err(e) = journal::atomic_write(&path, content.as_bytes()) {
        journal::log_journal(
            &tasklens_dir(root),
            JournalEntry {
                timestamp: chrono::Utc::now(),
                category: JournalCategory::Write,
                description: "document write failed".to_string(),
                fields: vec![
                    ("Target".to_string(), rel.to_string()),
                    ("Error".to_string(), e.to_string()),
                ],
                body: content.to_string(),
            },
        );
        return Err(VaultError::WriteError { path, source: e });
    }
    Ok(())
}
