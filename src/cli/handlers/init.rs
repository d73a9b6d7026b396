use std::fs;

use crate::cli::commands::InitArgs;
use crate::io::vault::{self, TASKLENS_DIR};

const CONFIG_TEMPLATE: &str = r##"[vault]
name = "{name}"

# --- Scanning ---
# Restrict which documents feed the cache. Polarity is "allow-only",
# "deny-listed", or "disabled" (the default admits everything).
#
# [scan.folders]
# polarity = "deny-listed"
# values = ["templates", "archive"]
#
# [scan.files]
# polarity = "deny-listed"
# values = ["scratch.md"]
#
# [scan.frontmatter]
# polarity = "allow-only"
# key = "tracked"
# values = ["true"]
#
# [scan.tags]
# polarity = "allow-only"
# values = ["#task"]

# --- Statuses ---
# The builtin set is ' ', '/', 'x', 'X', '-'. Listing [[statuses.entries]]
# blocks replaces it; kind is todo, done, cancelled, in-progress, or custom.
#
# [[statuses.entries]]
# symbol = " "
# name = "unchecked"
# kind = "todo"
# next_symbol = "/"

# --- Editing ---
# [patch]
# confirm_conflicts = true

# --- Archive ---
# With a destination file, archived tasks move there; without one they
# fold in place under %% markers.
#
# [archive]
# file = "archive/done.md"

# --- Task notes ---
# [note]
# identifier = "taskNote"
# reminder_key = "reminder"

# --- Watch ---
# [watch]
# debounce_ms = 500
"##;

pub fn cmd_init(args: InitArgs) -> Result<(), Box<dyn std::error::Error>> {
    let dir = super::start_dir()?;
    let sidecar = dir.join(TASKLENS_DIR);

    if sidecar.is_dir() && !args.force {
        return Err(format!(
            "already a tasklens vault: {} exists (use --force to rewrite the config)",
            sidecar.display()
        )
        .into());
    }

    // Warn when nesting inside an existing vault
    if let Some(parent) = dir.parent()
        && let Ok(enclosing) = vault::discover_vault(parent)
    {
        eprintln!("note: enclosing vault found at {}", enclosing.display());
        eprintln!("creating a nested vault in {}", dir.display());
    }

    let name = args.name.unwrap_or_else(|| {
        dir.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "vault".to_string())
    });

    fs::create_dir_all(&sidecar)?;
    fs::write(
        sidecar.join("config.toml"),
        CONFIG_TEMPLATE.replace("{name}", &name),
    )?;

    println!("initialized tasklens vault: {}", name);
    Ok(())
}
