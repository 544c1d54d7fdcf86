//! Java-style `.properties` parsing.
//!
//! Flat `key=value` (or `key: value`) lines with `#`/`!` comments. Dotted
//! keys expand into nested trees. Values stay strings; typed access coerces
//! them on read. Later duplicate keys win.

use super::ParseIssue;
use crate::value::{ConfigTree, ConfigValue};

pub fn parse(input: &str) -> Result<ConfigTree, ParseIssue> {
    let mut tree = ConfigTree::new();
    for (idx, raw_line) in input.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let sep = line
            .char_indices()
            .find(|(_, c)| *c == '=' || *c == ':')
            .map(|(i, _)| i)
            .ok_or_else(|| {
                ParseIssue::new(Some(idx + 1), format!("expected 'key=value', found '{line}'"))
            })?;
        let key = line[..sep].trim();
        let value = line[sep + 1..].trim();
        if key.is_empty() {
            return Err(ParseIssue::new(Some(idx + 1), "empty property key"));
        }
        tree.set_path(key, ConfigValue::string_or_reference(value));
    }
    Ok(tree)
}
