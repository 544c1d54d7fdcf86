//! Parser for the `.conf` DSL.
//!
//! A HOCON-style subset: `#` and `//` comments, `key = value` and
//! `key: value`, bare `key { ... }` objects, dotted keys expanding to nested
//! trees, `[...]` lists, quoted strings with escapes, and unquoted scalars
//! (booleans, numbers, `${path}` substitutions, free text). Entries are
//! separated by newlines or commas. On duplicate keys the later entry wins,
//! except that two objects merge (later over earlier).

use super::ParseIssue;
use crate::merge::fallback;
use crate::value::{ConfigTree, ConfigValue};

pub fn parse(input: &str) -> Result<ConfigTree, ParseIssue> {
    let mut parser = Parser {
        src: input,
        bytes: input.as_bytes(),
        pos: 0,
        line: 1,
    };
    parser.skip_blank();

    // Root braces are optional.
    let tree = if parser.peek() == Some(b'{') {
        parser.parse_object()?
    } else {
        parser.parse_object_body(None)?
    };

    parser.skip_blank();
    if let Some(c) = parser.peek() {
        return Err(parser.error(format!("unexpected '{}'", c as char)));
    }
    Ok(tree)
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<u8> {
        self.bytes.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> ParseIssue {
        ParseIssue::new(self.line, message)
    }

    fn at_comment(&self) -> bool {
        self.peek() == Some(b'#') || (self.peek() == Some(b'/') && self.peek2() == Some(b'/'))
    }

    /// Skip spaces and tabs on the current line, plus comments up to (not
    /// including) the newline that ends them.
    fn skip_inline(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r') => {
                    self.bump();
                }
                _ if self.at_comment() => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => return,
            }
        }
    }

    /// Skip all whitespace including newlines, plus comments.
    fn skip_blank(&mut self) {
        loop {
            self.skip_inline();
            if self.peek() == Some(b'\n') {
                self.bump();
            } else {
                return;
            }
        }
    }

    fn parse_object(&mut self) -> Result<ConfigTree, ParseIssue> {
        self.bump(); // '{'
        let tree = self.parse_object_body(Some(b'}'))?;
        if self.bump() != Some(b'}') {
            return Err(self.error("unterminated object, expected '}'"));
        }
        Ok(tree)
    }

    fn parse_object_body(&mut self, terminator: Option<u8>) -> Result<ConfigTree, ParseIssue> {
        let mut tree = ConfigTree::new();
        loop {
            self.skip_blank();
            match self.peek() {
                None => {
                    if terminator.is_some() {
                        return Err(self.error("unterminated object, expected '}'"));
                    }
                    return Ok(tree);
                }
                Some(c) if Some(c) == terminator => return Ok(tree),
                Some(b'}') => return Err(self.error("unexpected '}'")),
                _ => {}
            }

            let segments = self.parse_key()?;
            self.skip_inline();

            let value = match self.peek() {
                Some(b'=' | b':') => {
                    self.bump();
                    self.skip_inline();
                    self.parse_value()?
                }
                Some(b'{') => ConfigValue::Tree(self.parse_object()?),
                _ => return Err(self.error(format!("expected '=', ':' or '{{' after key '{}'", segments.join(".")))),
            };
            insert_entry(&mut tree, &segments, value);

            // Entries end at a newline, a comma, the object terminator, or EOF.
            self.skip_inline();
            match self.peek() {
                None | Some(b'\n') => {}
                Some(b',') => {
                    self.bump();
                }
                Some(c) if Some(c) == terminator => {}
                Some(c) => {
                    return Err(self.error(format!(
                        "expected newline or ',' after value, found '{}'",
                        c as char
                    )));
                }
            }
        }
    }

    /// A key is a quoted string (one literal segment) or an unquoted token,
    /// which is split on '.' into nested path segments.
    fn parse_key(&mut self) -> Result<Vec<String>, ParseIssue> {
        if self.peek() == Some(b'"') {
            return Ok(vec![self.parse_quoted()?]);
        }
        let start = self.pos;
        while let Some(c) = self.peek() {
            match c {
                b' ' | b'\t' | b'\r' | b'\n' | b'=' | b':' | b'{' | b'}' | b'[' | b']' | b','
                | b'"' | b'#' | b'/' => break,
                _ => {
                    self.bump();
                }
            }
        }
        let token = &self.src[start..self.pos];
        if token.is_empty() {
            return Err(self.error("expected a key"));
        }
        let segments: Vec<String> = token.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(self.error(format!("empty path segment in key '{token}'")));
        }
        Ok(segments)
    }

    fn parse_value(&mut self) -> Result<ConfigValue, ParseIssue> {
        match self.peek() {
            None => Err(self.error("expected a value")),
            Some(b'{') => Ok(ConfigValue::Tree(self.parse_object()?)),
            Some(b'[') => self.parse_list(),
            Some(b'"') => Ok(ConfigValue::String(self.parse_quoted()?)),
            Some(_) => self.parse_unquoted(),
        }
    }

    fn parse_list(&mut self) -> Result<ConfigValue, ParseIssue> {
        self.bump(); // '['
        let mut items = Vec::new();
        loop {
            self.skip_blank();
            match self.peek() {
                None => return Err(self.error("unterminated list, expected ']'")),
                Some(b']') => {
                    self.bump();
                    return Ok(ConfigValue::List(items));
                }
                _ => {}
            }
            items.push(self.parse_value()?);
            self.skip_inline();
            match self.peek() {
                Some(b',') => {
                    self.bump();
                }
                Some(b']') | Some(b'\n') => {}
                None => return Err(self.error("unterminated list, expected ']'")),
                Some(c) => {
                    return Err(self.error(format!(
                        "expected ',' or ']' in list, found '{}'",
                        c as char
                    )));
                }
            }
        }
    }

    fn parse_quoted(&mut self) -> Result<String, ParseIssue> {
        self.bump(); // '"'
        let mut out = String::new();
        loop {
            // check before bumping so the error reports the right line
            if matches!(self.peek(), None | Some(b'\n')) {
                return Err(self.error("unterminated string"));
            }
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(b'"') => return Ok(out),
                Some(b'\\') => match self.bump() {
                    Some(b'"') => out.push('"'),
                    Some(b'\\') => out.push('\\'),
                    Some(b'/') => out.push('/'),
                    Some(b'n') => out.push('\n'),
                    Some(b't') => out.push('\t'),
                    Some(b'r') => out.push('\r'),
                    Some(c) => {
                        return Err(self.error(format!("invalid escape '\\{}'", c as char)));
                    }
                    None => return Err(self.error("unterminated string")),
                },
                Some(c) if c.is_ascii() => out.push(c as char),
                Some(_) => {
                    // Re-read a full UTF-8 character starting one byte back.
                    let start = self.pos - 1;
                    let ch = self.src[start..]
                        .chars()
                        .next()
                        .ok_or_else(|| self.error("invalid UTF-8 in string"))?;
                    out.push(ch);
                    self.pos = start + ch.len_utf8();
                }
            }
        }
    }

    /// An unquoted scalar runs to the end of the line, a comma, a closing
    /// bracket/brace, or a comment. A `${...}` placeholder may contain `}`
    /// and is consumed whole.
    fn parse_unquoted(&mut self) -> Result<ConfigValue, ParseIssue> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == b'$' && self.peek2() == Some(b'{') {
                self.bump();
                self.bump();
                loop {
                    match self.peek() {
                        Some(b'}') => {
                            self.bump();
                            break;
                        }
                        Some(b'\n') | None => {
                            return Err(self.error("unterminated '${' substitution"));
                        }
                        Some(_) => {
                            self.bump();
                        }
                    }
                }
                continue;
            }
            if matches!(c, b'\n' | b',' | b']' | b'}') || self.at_comment() {
                break;
            }
            self.bump();
        }
        let token = self.src[start..self.pos].trim();
        if token.is_empty() {
            return Err(self.error("expected a value"));
        }
        Ok(classify_scalar(token))
    }
}

/// Classify an unquoted token.
fn classify_scalar(token: &str) -> ConfigValue {
    match token {
        "true" => return ConfigValue::Bool(true),
        "false" => return ConfigValue::Bool(false),
        "null" => return ConfigValue::Null,
        _ => {}
    }
    if let Ok(i) = token.parse::<i64>() {
        return ConfigValue::Int(i);
    }
    if let Ok(f) = token.parse::<f64>() {
        return ConfigValue::Float(f);
    }
    ConfigValue::string_or_reference(token)
}

/// Insert a parsed entry, expanding dotted-key segments. Later entries win
/// over earlier ones; two objects at the same key merge.
fn insert_entry(tree: &mut ConfigTree, segments: &[String], value: ConfigValue) {
    let Some((leaf, parents)) = segments.split_last() else {
        return;
    };
    let mut current = tree;
    for segment in parents {
        if !matches!(current.get(segment), Some(ConfigValue::Tree(_))) {
            current.insert(segment.clone(), ConfigTree::new());
        }
        current = match current.get_mut_tree(segment) {
            Some(t) => t,
            None => unreachable!("segment was just inserted as a tree"),
        };
    }
    let merged = match (current.remove(leaf), value) {
        (Some(ConfigValue::Tree(old)), ConfigValue::Tree(new)) => {
            ConfigValue::Tree(fallback(new, old))
        }
        (_, new) => new,
    };
    current.insert(leaf.clone(), merged);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::ConfigDuration;

    fn get<'t>(tree: &'t ConfigTree, path: &str) -> &'t ConfigValue {
        tree.lookup(path)
            .unwrap_or_else(|| panic!("missing path {path}"))
    }

    #[test]
    fn test_basic_entries() {
        let tree = parse(
            r#"
            # a comment
            job.name = wordcount
            job.workers: 4
            debug = true  // trailing comment
            ratio = 0.5
            nothing = null
            "#,
        )
        .unwrap();

        assert_eq!(get(&tree, "job.name"), &ConfigValue::String("wordcount".into()));
        assert_eq!(get(&tree, "job.workers"), &ConfigValue::Int(4));
        assert_eq!(get(&tree, "debug"), &ConfigValue::Bool(true));
        assert_eq!(get(&tree, "ratio"), &ConfigValue::Float(0.5));
        assert_eq!(get(&tree, "nothing"), &ConfigValue::Null);
    }

    #[test]
    fn test_nested_objects() {
        let tree = parse(
            r#"
            worker {
                pool { size = 8 }
                timeout = 30s
            }
            "#,
        )
        .unwrap();
        assert_eq!(get(&tree, "worker.pool.size"), &ConfigValue::Int(8));
        assert_eq!(
            get(&tree, "worker.timeout"),
            &ConfigValue::String("30s".into())
        );
    }

    #[test]
    fn test_duration_literal_stays_string_until_read() {
        let tree = parse("timeout = 5s").unwrap();
        let ConfigValue::String(raw) = get(&tree, "timeout") else {
            panic!("expected string");
        };
        assert_eq!(raw.parse::<ConfigDuration>().unwrap().as_millis(), Some(5000));
    }

    #[test]
    fn test_lists() {
        let tree = parse(
            r#"
            inline = [1, 2, 3]
            multiline = [
                alpha
                beta,
                "gamma delta"
            ]
            "#,
        )
        .unwrap();
        assert_eq!(
            get(&tree, "inline"),
            &ConfigValue::List(vec![
                ConfigValue::Int(1),
                ConfigValue::Int(2),
                ConfigValue::Int(3)
            ])
        );
        assert_eq!(
            get(&tree, "multiline"),
            &ConfigValue::List(vec![
                ConfigValue::String("alpha".into()),
                ConfigValue::String("beta".into()),
                ConfigValue::String("gamma delta".into()),
            ])
        );
    }

    #[test]
    fn test_substitution_token() {
        let tree = parse(
            r#"
            base = /data
            out = ${base}/out
            whole = ${base}
            "#,
        )
        .unwrap();
        assert_eq!(
            get(&tree, "out"),
            &ConfigValue::Reference("${base}/out".into())
        );
        assert_eq!(get(&tree, "whole"), &ConfigValue::Reference("${base}".into()));
    }

    #[test]
    fn test_quoted_strings_are_literal() {
        let tree = parse(r#"msg = "no ${sub} here, just text with = and #""#).unwrap();
        assert_eq!(
            get(&tree, "msg"),
            &ConfigValue::String("no ${sub} here, just text with = and #".into())
        );
    }

    #[test]
    fn test_quoted_key_is_single_segment() {
        let tree = parse(r#""a.b" = 1"#).unwrap();
        assert_eq!(tree.get("a.b"), Some(&ConfigValue::Int(1)));
        assert_eq!(tree.lookup("a.b"), None);
    }

    #[test]
    fn test_duplicate_objects_merge_later_wins() {
        let tree = parse(
            r#"
            worker { timeout = 10s, retries = 3 }
            worker { timeout = 20s }
            "#,
        )
        .unwrap();
        assert_eq!(
            get(&tree, "worker.timeout"),
            &ConfigValue::String("20s".into())
        );
        assert_eq!(get(&tree, "worker.retries"), &ConfigValue::Int(3));
    }

    #[test]
    fn test_duplicate_scalar_later_wins() {
        let tree = parse("a = 1\na = 2").unwrap();
        assert_eq!(get(&tree, "a"), &ConfigValue::Int(2));
    }

    #[test]
    fn test_root_braces_optional() {
        let tree = parse("{ a = 1 }").unwrap();
        assert_eq!(get(&tree, "a"), &ConfigValue::Int(1));
    }

    #[test]
    fn test_comma_separated_entries() {
        let tree = parse("a = 1, b = 2").unwrap();
        assert_eq!(get(&tree, "a"), &ConfigValue::Int(1));
        assert_eq!(get(&tree, "b"), &ConfigValue::Int(2));
    }

    #[test]
    fn test_unquoted_free_text() {
        let tree = parse("path = /var/lib/norns data").unwrap();
        assert_eq!(
            get(&tree, "path"),
            &ConfigValue::String("/var/lib/norns data".into())
        );
    }

    #[test]
    fn test_error_reports_line() {
        let err = parse("a = 1\nb = \n").unwrap_err();
        assert_eq!(err.line, Some(2));

        let err = parse("a = 1\nb { c = 2\n").unwrap_err();
        assert!(err.message.contains("unterminated object"));
    }

    #[test]
    fn test_unterminated_string_fails() {
        let err = parse("a = \"oops\n").unwrap_err();
        assert!(err.message.contains("unterminated string"));
    }

    #[test]
    fn test_empty_input() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("  \n # only comments \n").unwrap().is_empty());
    }
}
