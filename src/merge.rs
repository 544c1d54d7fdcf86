//! Fallback merging and `${path}` substitution resolution.
//!
//! Sources merge in priority order: the first tree defining a path wins.
//! Nested objects merge recursively; at a scalar-vs-object conflict the
//! higher-priority shape wins entirely. A higher-priority `null` is a value
//! and shadows lower tiers.
//!
//! After merging, every pending `Reference` is substituted by looking its
//! placeholder path up in the merged tree itself, so references can point
//! forward and across sources. Unresolvable paths and cycles fail the load.

use crate::error::{ConfigError, ConfigResult};
use crate::source::ConfigSource;
use crate::value::{ConfigTree, ConfigValue};

/// Merge two trees with `higher` taking precedence.
pub fn fallback(higher: ConfigTree, lower: ConfigTree) -> ConfigTree {
    let mut out = lower;
    for (key, high_value) in higher {
        let merged = match (out.remove(&key), high_value) {
            (Some(ConfigValue::Tree(low_tree)), ConfigValue::Tree(high_tree)) => {
                ConfigValue::Tree(fallback(high_tree, low_tree))
            }
            (_, high_value) => high_value,
        };
        out.insert(key, merged);
    }
    out
}

/// Merge trees given highest-priority first.
pub fn merge_trees(trees: impl IntoIterator<Item = ConfigTree>) -> ConfigTree {
    trees
        .into_iter()
        .fold(ConfigTree::new(), |winning, next| fallback(winning, next))
}

/// Merge sources given highest-priority first.
pub fn merge_sources(sources: impl IntoIterator<Item = ConfigSource>) -> ConfigTree {
    merge_trees(sources.into_iter().map(ConfigSource::into_tree))
}

/// Substitute every `${path}` reference against the merged tree, producing a
/// reference-free tree. Fails on unresolvable paths, attempts to interpolate
/// a non-scalar into a string, and reference cycles.
pub fn resolve(tree: ConfigTree) -> ConfigResult<ConfigTree> {
    let mut resolver = Resolver {
        root: &tree,
        stack: Vec::new(),
    };
    resolver.resolve_tree(&tree, "")
}

struct Resolver<'a> {
    root: &'a ConfigTree,
    /// Placeholder paths currently being resolved, for cycle detection.
    stack: Vec<String>,
}

impl<'a> Resolver<'a> {
    fn resolve_tree(&mut self, tree: &ConfigTree, prefix: &str) -> ConfigResult<ConfigTree> {
        tree.iter()
            .map(|(key, value)| {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                Ok((key.clone(), self.resolve_value(value, &path)?))
            })
            .collect()
    }

    fn resolve_value(&mut self, value: &ConfigValue, at: &str) -> ConfigResult<ConfigValue> {
        match value {
            ConfigValue::Reference(raw) => self.resolve_reference(raw, at),
            ConfigValue::Tree(subtree) => {
                Ok(ConfigValue::Tree(self.resolve_tree(subtree, at)?))
            }
            ConfigValue::List(items) => Ok(ConfigValue::List(
                items
                    .iter()
                    .map(|item| self.resolve_value(item, at))
                    .collect::<ConfigResult<_>>()?,
            )),
            other => Ok(other.clone()),
        }
    }

    fn resolve_reference(&mut self, raw: &str, at: &str) -> ConfigResult<ConfigValue> {
        let segments = split_placeholders(raw)
            .map_err(|reason| ConfigError::resolution(raw, at, reason))?;

        // A value that is exactly one placeholder takes the referenced
        // value's type; mixed text interpolates scalar renderings.
        if let [Segment::Placeholder(path)] = segments.as_slice() {
            return self.lookup(path, at);
        }

        let mut out = String::new();
        for segment in &segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(path) => {
                    let value = self.lookup(path, at)?;
                    let rendered = value.render_scalar().ok_or_else(|| {
                        ConfigError::resolution(
                            path.clone(),
                            at,
                            format!("cannot interpolate {} into a string", value.type_name()),
                        )
                    })?;
                    out.push_str(&rendered);
                }
            }
        }
        Ok(ConfigValue::String(out))
    }

    /// Look a placeholder path up in the merged root and resolve whatever it
    /// points at, tracking the in-flight paths to catch cycles.
    fn lookup(&mut self, path: &str, at: &str) -> ConfigResult<ConfigValue> {
        if self.stack.iter().any(|p| p == path) {
            return Err(ConfigError::resolution(path, at, "substitution cycle"));
        }
        let value = self
            .root
            .lookup(path)
            .ok_or_else(|| ConfigError::resolution(path, at, "no value at that path"))?
            .clone();
        self.stack.push(path.to_string());
        let resolved = self.resolve_value(&value, path);
        self.stack.pop();
        resolved
    }
}

enum Segment {
    Literal(String),
    Placeholder(String),
}

/// Split raw reference text into literal and `${...}` placeholder segments.
fn split_placeholders(raw: &str) -> Result<Vec<Segment>, String> {
    let mut segments = Vec::new();
    let mut rest = raw;
    while let Some(start) = rest.find("${") {
        if start > 0 {
            segments.push(Segment::Literal(rest[..start].to_string()));
        }
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| format!("unterminated placeholder in '{raw}'"))?;
        let path = after[..end].trim();
        if path.is_empty() {
            return Err(format!("empty placeholder in '{raw}'"));
        }
        segments.push(Segment::Placeholder(path.to_string()));
        rest = &after[end + 1..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(entries: &[(&str, ConfigValue)]) -> ConfigTree {
        let mut t = ConfigTree::new();
        for (path, value) in entries {
            t.set_path(path, value.clone());
        }
        t
    }

    #[test]
    fn test_first_defined_wins() {
        let high = tree(&[("a", ConfigValue::Int(1))]);
        let low = tree(&[("a", ConfigValue::Int(2)), ("b", ConfigValue::Int(3))]);
        let merged = fallback(high, low);
        assert_eq!(merged.lookup("a"), Some(&ConfigValue::Int(1)));
        assert_eq!(merged.lookup("b"), Some(&ConfigValue::Int(3)));
    }

    #[test]
    fn test_nested_trees_merge() {
        let high = tree(&[("job.name", ConfigValue::String("a".into()))]);
        let low = tree(&[("job.workers", ConfigValue::Int(4))]);
        let merged = fallback(high, low);
        assert_eq!(
            merged.lookup("job.name"),
            Some(&ConfigValue::String("a".into()))
        );
        assert_eq!(merged.lookup("job.workers"), Some(&ConfigValue::Int(4)));
    }

    #[test]
    fn test_scalar_shape_wins_over_tree() {
        let high = tree(&[("job", ConfigValue::String("flat".into()))]);
        let low = tree(&[("job.workers", ConfigValue::Int(4))]);
        let merged = fallback(high, low);
        assert_eq!(merged.lookup("job"), Some(&ConfigValue::String("flat".into())));
        assert_eq!(merged.lookup("job.workers"), None);
    }

    #[test]
    fn test_tree_shape_wins_over_scalar() {
        let high = tree(&[("job.workers", ConfigValue::Int(4))]);
        let low = tree(&[("job", ConfigValue::String("flat".into()))]);
        let merged = fallback(high, low);
        assert_eq!(merged.lookup("job.workers"), Some(&ConfigValue::Int(4)));
    }

    #[test]
    fn test_null_defines_the_path() {
        let high = tree(&[("a", ConfigValue::Null)]);
        let low = tree(&[("a", ConfigValue::Int(2))]);
        let merged = fallback(high, low);
        assert_eq!(merged.lookup("a"), Some(&ConfigValue::Null));
    }

    #[test]
    fn test_merge_right_associative() {
        let a = tree(&[("x", ConfigValue::Int(1)), ("only_a", ConfigValue::Int(10))]);
        let b = tree(&[("x", ConfigValue::Int(2)), ("only_b", ConfigValue::Int(20))]);
        let c = tree(&[("x", ConfigValue::Int(3)), ("only_c", ConfigValue::Int(30))]);

        let all = merge_trees([a.clone(), b.clone(), c.clone()]);
        let nested = fallback(a, fallback(b, c));
        assert_eq!(all, nested);
        assert_eq!(all.lookup("x"), Some(&ConfigValue::Int(1)));
    }

    #[test]
    fn test_merge_idempotent_and_deterministic() {
        let a = tree(&[("x.y", ConfigValue::Int(1))]);
        let b = tree(&[("x.z", ConfigValue::Int(2))]);
        let once = merge_trees([a.clone(), b.clone()]);
        assert_eq!(merge_trees([once.clone()]), once);
        assert_eq!(merge_trees([a, b]), once);
    }

    #[test]
    fn test_resolve_whole_value_reference() {
        let t = tree(&[
            ("base", ConfigValue::Int(42)),
            ("copy", ConfigValue::Reference("${base}".into())),
        ]);
        let resolved = resolve(t).unwrap();
        assert_eq!(resolved.lookup("copy"), Some(&ConfigValue::Int(42)));
    }

    #[test]
    fn test_resolve_interpolation() {
        let t = tree(&[
            ("host", ConfigValue::String("localhost".into())),
            ("port", ConfigValue::Int(8080)),
            ("url", ConfigValue::Reference("http://${host}:${port}".into())),
        ]);
        let resolved = resolve(t).unwrap();
        assert_eq!(
            resolved.lookup("url"),
            Some(&ConfigValue::String("http://localhost:8080".into()))
        );
    }

    #[test]
    fn test_resolve_chained_references() {
        // forward reference: a -> b -> c, declared out of order
        let t = tree(&[
            ("a", ConfigValue::Reference("${b}".into())),
            ("b", ConfigValue::Reference("${c}".into())),
            ("c", ConfigValue::String("end".into())),
        ]);
        let resolved = resolve(t).unwrap();
        assert_eq!(resolved.lookup("a"), Some(&ConfigValue::String("end".into())));
        assert_eq!(resolved.lookup("b"), Some(&ConfigValue::String("end".into())));
    }

    #[test]
    fn test_resolve_reference_to_subtree() {
        let t = tree(&[
            ("proto.timeout", ConfigValue::String("30s".into())),
            ("copy", ConfigValue::Reference("${proto}".into())),
        ]);
        let resolved = resolve(t).unwrap();
        assert_eq!(
            resolved.lookup("copy.timeout"),
            Some(&ConfigValue::String("30s".into()))
        );
    }

    #[test]
    fn test_resolve_missing_path_fails() {
        let t = tree(&[("a", ConfigValue::Reference("${nope}".into()))]);
        let err = resolve(t).unwrap_err();
        assert!(matches!(err, ConfigError::Resolution { ref reference, .. } if reference == "nope"));
    }

    #[test]
    fn test_resolve_cycle_fails() {
        let t = tree(&[
            ("a", ConfigValue::Reference("${b}".into())),
            ("b", ConfigValue::Reference("${a}".into())),
        ]);
        let err = resolve(t).unwrap_err();
        assert!(matches!(err, ConfigError::Resolution { ref reason, .. } if reason.contains("cycle")));
    }

    #[test]
    fn test_resolve_self_cycle_fails() {
        let t = tree(&[("a", ConfigValue::Reference("${a}".into()))]);
        assert!(resolve(t).is_err());
    }

    #[test]
    fn test_interpolating_object_fails() {
        let t = tree(&[
            ("obj.x", ConfigValue::Int(1)),
            ("s", ConfigValue::Reference("pre-${obj}".into())),
        ]);
        let err = resolve(t).unwrap_err();
        assert!(matches!(err, ConfigError::Resolution { ref reason, .. } if reason.contains("interpolate")));
    }

    #[test]
    fn test_resolve_inside_lists() {
        let t = tree(&[
            ("base", ConfigValue::String("x".into())),
            (
                "items",
                ConfigValue::List(vec![ConfigValue::Reference("${base}-1".into())]),
            ),
        ]);
        let resolved = resolve(t).unwrap();
        assert_eq!(
            resolved.lookup("items"),
            Some(&ConfigValue::List(vec![ConfigValue::String("x-1".into())]))
        );
    }

    #[test]
    fn test_cross_source_resolution() {
        // reference in a lower-priority source resolves against the
        // higher-priority winner
        let high = tree(&[("env", ConfigValue::String("prod".into()))]);
        let low = tree(&[
            ("env", ConfigValue::String("dev".into())),
            ("topic", ConfigValue::Reference("events-${env}".into())),
        ]);
        let resolved = resolve(merge_trees([high, low])).unwrap();
        assert_eq!(
            resolved.lookup("topic"),
            Some(&ConfigValue::String("events-prod".into()))
        );
    }
}
