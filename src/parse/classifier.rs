use std::sync::LazyLock;

use regex::Regex;

use crate::model::status::StatusSet;

/// A task line: `- [<symbol>]` with at least one non-space character after
/// the checkbox. Other list markers (`*`, `+`, numbered) are plain list
/// items, not tasks.
static TASK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^- \[.\] *\S").expect("valid task line regex"));

/// First checkbox on a line, capturing the symbol between the brackets
static CHECKBOX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.)\]").expect("valid checkbox regex"));

/// True iff the trimmed line is a task line with non-empty content.
/// Bare checkboxes (`- [ ]`, `- [ ] `) are rejected.
pub fn is_task_line(line: &str) -> bool {
    TASK_LINE.is_match(line.trim())
}

/// The status symbol inside the first `[ ]` checkbox, `' '` when the line
/// carries no readable checkbox.
pub fn checkbox_symbol(line: &str) -> char {
    CHECKBOX
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().chars().next())
        .unwrap_or(' ')
}

/// Whether the line's status symbol maps to a completed kind (done or
/// cancelled) under the active status set.
pub fn is_completed_line(line: &str, statuses: &StatusSet) -> bool {
    statuses.is_completed(checkbox_symbol(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_task_line_accepts_content() {
        assert!(is_task_line("- [ ] x"));
        assert!(is_task_line("- [x] Buy milk 📅 2025-01-10"));
        assert!(is_task_line("\t- [/] indented task"));
    }

    #[test]
    fn test_is_task_line_rejects_bare_checkbox() {
        assert!(!is_task_line("- [ ]"));
        assert!(!is_task_line("- [ ] "));
    }

    #[test]
    fn test_is_task_line_rejects_other_list_markers() {
        assert!(!is_task_line("* [x] x"));
        assert!(!is_task_line("+ [ ] x"));
        assert!(!is_task_line("1. [ ] x"));
        assert!(!is_task_line("plain text"));
    }

    #[test]
    fn test_checkbox_symbol() {
        assert_eq!(checkbox_symbol("- [x] done"), 'x');
        assert_eq!(checkbox_symbol("- [/] half"), '/');
        assert_eq!(checkbox_symbol("no checkbox here"), ' ');
    }

    #[test]
    fn test_is_completed_line_uses_status_set() {
        let statuses = StatusSet::default();
        assert!(is_completed_line("- [x] done", &statuses));
        assert!(is_completed_line("- [-] dropped", &statuses));
        assert!(!is_completed_line("- [ ] open", &statuses));
        assert!(!is_completed_line("- [/] doing", &statuses));
    }
}
