use regex::Regex;
use toml::Table;

use crate::model::config::{FilterGroup, FrontmatterFilter, Polarity, ScanConfig};
use crate::parse::frontmatter::values_of;

/// Document-level admission. Groups are consulted in a fixed order (files,
/// frontmatter, folders) and the first enabled one decides; a group whose
/// polarity is disabled or whose value list is empty gives no verdict.
/// With every group silent the document is admitted.
pub fn admit(path: &str, frontmatter: Option<&Table>, scan: &ScanConfig) -> bool {
    if let Some(verdict) = path_group_verdict(path, &scan.files) {
        return verdict;
    }
    if let Some(verdict) = frontmatter_verdict(frontmatter, &scan.frontmatter) {
        return verdict;
    }
    if let Some(verdict) = path_group_verdict(path, &scan.folders) {
        return verdict;
    }
    true
}

fn path_group_verdict(path: &str, group: &FilterGroup) -> Option<bool> {
    if group.polarity == Polarity::Disabled || group.values.is_empty() {
        return None;
    }
    let matched = group.values.iter().any(|value| path_matches(path, value));
    Some(apply_polarity(group.polarity, matched))
}

/// One filter value against a path: `/…/` is a regex, anything else is a
/// literal path or a containing folder
fn path_matches(path: &str, value: &str) -> bool {
    if let Some(pattern) = regex_value(value) {
        return pattern.is_match(path);
    }
    path == value || path.starts_with(&format!("{value}/"))
}

fn frontmatter_verdict(frontmatter: Option<&Table>, filter: &FrontmatterFilter) -> Option<bool> {
    if filter.polarity == Polarity::Disabled || filter.values.is_empty() {
        return None;
    }
    let matched = frontmatter.is_some_and(|table| {
        values_of(table, &filter.key)
            .iter()
            .any(|value| filter.values.contains(value))
    });
    Some(apply_polarity(filter.polarity, matched))
}

fn apply_polarity(polarity: Polarity, matched: bool) -> bool {
    match polarity {
        Polarity::AllowOnly => matched,
        Polarity::DenyListed => !matched,
        Polarity::Disabled => true,
    }
}

/// A `/…/`-delimited value compiled to a regex; invalid patterns are
/// treated as matching nothing
fn regex_value(value: &str) -> Option<Regex> {
    let inner = value.strip_prefix('/')?.strip_suffix('/')?;
    if inner.is_empty() {
        return None;
    }
    Regex::new(inner).ok()
}

/// Per-line tag admission, compiled once per scan.
///
/// Configured tags may glob with `*` at either end (`#work/*`, `*-urgent`):
/// each compiles to an anchored, case-insensitive pattern with `*` standing
/// for one-or-more characters. Leading `#` on either side is ignored.
pub struct TagFilter {
    polarity: Polarity,
    patterns: Vec<Regex>,
}

impl TagFilter {
    pub fn new(group: &FilterGroup) -> TagFilter {
        let patterns = group
            .values
            .iter()
            .filter_map(|value| tag_pattern(value))
            .collect();
        TagFilter {
            polarity: group.polarity,
            patterns,
        }
    }

    /// Whether a line carrying `tags` passes. Allow-only rejects lines
    /// with no matching tag (including tagless lines); deny-listed rejects
    /// lines with any matching tag.
    pub fn admits(&self, tags: &[String]) -> bool {
        if self.polarity == Polarity::Disabled {
            return true;
        }
        let matched = tags.iter().any(|tag| {
            let bare = tag.trim_start_matches('#');
            self.patterns.iter().any(|pattern| pattern.is_match(bare))
        });
        apply_polarity(self.polarity, matched)
    }
}

fn tag_pattern(value: &str) -> Option<Regex> {
    let bare = value.trim_start_matches('#');
    if bare.is_empty() {
        return None;
    }
    let escaped = regex::escape(bare).replace(r"\*", ".+");
    Regex::new(&format!("(?i)^{escaped}$")).ok()
}
