use std::sync::LazyLock;

use regex::Regex;

/// Leading block-quote marker, with or without its trailing space
static QUOTE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^>\s?").expect("valid quote marker regex"));

/// Collect the body lines belonging to the task line at `start - 1`.
///
/// A body line, after stripping a leading block-quote marker, must be
/// indented one unit deeper than the task line's own depth. Collection
/// stops at the first blank line or the first line failing that test, so
/// an unindented sibling task directly below is never swallowed.
///
/// Lines are returned verbatim, indentation included.
pub fn collect_body(lines: &[&str], start: usize, indent_unit: &str) -> Vec<String> {
    let mut body = Vec::new();
    let Some(task_line) = start.checked_sub(1).and_then(|i| lines.get(i)) else {
        return body;
    };

    let depth = line_depth(task_line, indent_unit);
    let required = indent_unit.repeat(depth + 1);

    for line in lines.iter().skip(start) {
        let stripped = QUOTE_MARKER.replace(line, "");
        if stripped.trim().is_empty() {
            break;
        }
        // A tab always counts as one level under a top-level task, even
        // when the configured unit is a run of spaces
        let indented =
            stripped.starts_with(&required) || (depth == 0 && stripped.starts_with('\t'));
        if !indented {
            break;
        }
        body.push((*line).to_string());
    }

    body
}

/// Indentation depth of a line in whole multiples of `indent_unit`
pub fn line_depth(line: &str, indent_unit: &str) -> usize {
    let mut depth = 0;
    let mut rest = line;
    while rest.starts_with(indent_unit) {
        depth += 1;
        rest = &rest[indent_unit.len()..];
    }
    depth
}
