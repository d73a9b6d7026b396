use toml::Table;

/// A document's structured header and the text that follows it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frontmatter<'a> {
    /// Text between the delimiter lines, delimiters excluded
    pub header: &'a str,
    /// Everything after the closing delimiter line
    pub body: &'a str,
}

/// Split a document that opens with a `+++` header block. Returns None
/// when the first line is not a delimiter or the block never closes.
pub fn split(text: &str) -> Option<Frontmatter<'_>> {
    let rest = text.strip_prefix("+++")?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\n', '\r']) == "+++" {
            return Some(Frontmatter {
                header: &rest[..offset],
                body: &rest[offset + line.len()..],
            });
        }
        offset += line.len();
    }
    None
}

/// Parse the header into a TOML table. `Ok(None)` when the document has
/// no header; `Err` when it has one that does not parse.
pub fn parse(text: &str) -> Result<Option<Table>, toml::de::Error> {
    let Some(frontmatter) = split(text) else {
        return Ok(None);
    };
    let table: Table = toml::from_str(frontmatter.header)?;
    Ok(Some(table))
}

/// String views of one header value: a scalar yields a single element, an
/// array one per entry. Non-string scalars render plainly.
pub fn values_of(table: &Table, key: &str) -> Vec<String> {
    match table.get(key) {
        None => Vec::new(),
        Some(toml::Value::Array(items)) => items.iter().map(value_string).collect(),
        Some(value) => vec![value_string(value)],
    }
}

fn value_string(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_basic() {
        let doc = "+++\ntitle = \"Trip\"\n+++\n- [ ] pack\n";
        let fm = split(doc).unwrap();
        assert_eq!(fm.header, "title = \"Trip\"\n");
        assert_eq!(fm.body, "- [ ] pack\n");
    }

    #[test]
    fn test_split_requires_leading_delimiter() {
        assert!(split("title = \"x\"\n+++\n").is_none());
        assert!(split("\n+++\ntitle = \"x\"\n+++\n").is_none());
    }

    #[test]
    fn test_split_unclosed_header() {
        assert!(split("+++\ntitle = \"x\"\n").is_none());
        assert!(split("+++").is_none());
    }

    #[test]
    fn test_split_closing_delimiter_at_eof() {
        let fm = split("+++\nkind = \"note\"\n+++").unwrap();
        assert_eq!(fm.header, "kind = \"note\"\n");
        assert_eq!(fm.body, "");
    }

    #[test]
    fn test_split_crlf() {
        let doc = "+++\r\ntitle = \"x\"\r\n+++\r\nbody\r\n";
        let fm = split(doc).unwrap();
        assert_eq!(fm.header, "title = \"x\"\r\n");
        assert_eq!(fm.body, "body\r\n");
    }

    #[test]
    fn test_parse_missing_and_malformed() {
        assert_eq!(parse("plain text").unwrap(), None);
        assert!(parse("+++\nnot = = toml\n+++\n").is_err());
    }

    #[test]
    fn test_values_of() {
        let table: Table =
            toml::from_str("kind = \"project\"\ntags = [\"taskNote\", \"trip\"]\nrank = 2\n")
                .unwrap();
        assert_eq!(values_of(&table, "kind"), vec!["project"]);
        assert_eq!(values_of(&table, "tags"), vec!["taskNote", "trip"]);
        assert_eq!(values_of(&table, "rank"), vec!["2"]);
        assert!(values_of(&table, "missing").is_empty());
    }
}
