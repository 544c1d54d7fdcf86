//! The configuration value model.
//!
//! A `ConfigTree` is a hierarchical map addressable by dotted paths
//! (`worker.pool.size`). Trees are plain data and freely cloneable; once a
//! tree has been merged and resolved it is only ever read.

use crate::duration::ConfigDuration;
use std::collections::{BTreeMap, BTreeSet};

/// A single configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Duration(ConfigDuration),
    List(Vec<ConfigValue>),
    Tree(ConfigTree),
    /// Raw text containing one or more `${path}` placeholders, pending
    /// substitution against the merged tree.
    Reference(String),
}

impl ConfigValue {
    /// Classify a string literal: text containing a `${...}` placeholder
    /// becomes a pending `Reference`, everything else stays a plain string.
    pub fn string_or_reference(s: impl Into<String>) -> ConfigValue {
        let s = s.into();
        if s.contains("${") {
            ConfigValue::Reference(s)
        } else {
            ConfigValue::String(s)
        }
    }

    /// Human-readable type tag used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Null => "null",
            ConfigValue::Bool(_) => "boolean",
            ConfigValue::Int(_) | ConfigValue::Float(_) => "number",
            ConfigValue::String(_) => "string",
            ConfigValue::Duration(_) => "duration",
            ConfigValue::List(_) => "list",
            ConfigValue::Tree(_) => "object",
            ConfigValue::Reference(_) => "unresolved reference",
        }
    }

    /// Render a scalar as text, for substitution interpolation and string
    /// coercion. `None` for null, lists, trees, and unresolved references.
    pub fn render_scalar(&self) -> Option<String> {
        match self {
            ConfigValue::Bool(b) => Some(b.to_string()),
            ConfigValue::Int(i) => Some(i.to_string()),
            ConfigValue::Float(f) => Some(f.to_string()),
            ConfigValue::String(s) => Some(s.clone()),
            ConfigValue::Duration(d) => Some(d.to_string()),
            _ => None,
        }
    }

    pub fn as_tree(&self) -> Option<&ConfigTree> {
        match self {
            ConfigValue::Tree(t) => Some(t),
            _ => None,
        }
    }

    /// Convert to a `serde_json::Value` (durations render as strings,
    /// unresolved references as their raw text).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ConfigValue::Null => serde_json::Value::Null,
            ConfigValue::Bool(b) => serde_json::Value::Bool(*b),
            ConfigValue::Int(i) => serde_json::Value::from(*i),
            ConfigValue::Float(f) => serde_json::Value::from(*f),
            ConfigValue::String(s) | ConfigValue::Reference(s) => {
                serde_json::Value::String(s.clone())
            }
            ConfigValue::Duration(d) => serde_json::Value::String(d.to_string()),
            ConfigValue::List(items) => {
                serde_json::Value::Array(items.iter().map(ConfigValue::to_json).collect())
            }
            ConfigValue::Tree(tree) => tree.to_json(),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::Int(i)
    }
}

impl From<f64> for ConfigValue {
    fn from(f: f64) -> Self {
        ConfigValue::Float(f)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::String(s)
    }
}

impl From<ConfigDuration> for ConfigValue {
    fn from(d: ConfigDuration) -> Self {
        ConfigValue::Duration(d)
    }
}

impl From<ConfigTree> for ConfigValue {
    fn from(t: ConfigTree) -> Self {
        ConfigValue::Tree(t)
    }
}

/// A hierarchical configuration tree.
///
/// Backed by a `BTreeMap` so iteration order (and everything derived from it:
/// merge results, `keys()`, error messages) is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigTree(BTreeMap<String, ConfigValue>);

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Direct child by single key segment (no dots).
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<ConfigValue> {
        self.0.remove(key)
    }

    /// Mutable access to a direct child tree, if the key holds one.
    pub fn get_mut_tree(&mut self, key: &str) -> Option<&mut ConfigTree> {
        match self.0.get_mut(key) {
            Some(ConfigValue::Tree(t)) => Some(t),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConfigValue)> {
        self.0.iter()
    }

    /// Look up a dotted path, descending through nested trees.
    pub fn lookup(&self, path: &str) -> Option<&ConfigValue> {
        let mut current = self;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            let value = current.0.get(segment)?;
            if segments.peek().is_none() {
                return Some(value);
            }
            current = value.as_tree()?;
        }
        None
    }

    /// Set a value at a dotted path, creating intermediate trees as needed.
    /// An existing non-tree value along the path is replaced by a tree.
    pub fn set_path(&mut self, path: &str, value: impl Into<ConfigValue>) {
        let mut segments: Vec<&str> = path.split('.').collect();
        let leaf = segments.pop().unwrap_or(path);
        let mut current = self;
        for segment in segments {
            let entry = current
                .0
                .entry(segment.to_string())
                .or_insert_with(|| ConfigValue::Tree(ConfigTree::new()));
            if !matches!(entry, ConfigValue::Tree(_)) {
                *entry = ConfigValue::Tree(ConfigTree::new());
            }
            current = match entry {
                ConfigValue::Tree(t) => t,
                _ => unreachable!(),
            };
        }
        current.0.insert(leaf.to_string(), value.into());
    }

    /// All fully-qualified leaf paths, sorted. A leaf is any non-tree value.
    pub fn leaf_paths(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_leaves("", &mut out);
        out
    }

    fn collect_leaves(&self, prefix: &str, out: &mut BTreeSet<String>) {
        for (key, value) in &self.0 {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            match value {
                ConfigValue::Tree(subtree) => subtree.collect_leaves(&path, out),
                _ => {
                    out.insert(path);
                }
            }
        }
    }

    /// Immediate child key segments at the root.
    pub fn child_keys(&self) -> BTreeSet<String> {
        self.0.keys().cloned().collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl IntoIterator for ConfigTree {
    type Item = (String, ConfigValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, ConfigValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(String, ConfigValue)> for ConfigTree {
    fn from_iter<I: IntoIterator<Item = (String, ConfigValue)>>(iter: I) -> Self {
        ConfigTree(iter.into_iter().collect())
    }
}
