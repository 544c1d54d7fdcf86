//! Typed, path-addressed access over resolved configuration.
//!
//! `NornsConfig` wraps a merged, substitution-free tree. It is immutable,
//! cheap to clone (the tree is shared), and safe to read from any number of
//! threads.

use crate::duration::ConfigDuration;
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{self, fallback};
use crate::source::ConfigSource;
use crate::value::{ConfigTree, ConfigValue};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Conversion from a config value into a concrete Rust type.
///
/// Coercions follow the usual layered-config conventions: scalars render to
/// strings, numeric strings parse to numbers, `yes`/`no`/`on`/`off` count as
/// booleans, and durations accept a `Duration` value, a bare integer of
/// milliseconds, or a literal like `"5s"` / `"infinite"`.
pub trait FromConfigValue: Sized {
    /// Type tag used in `ConfigError::Type` messages.
    const EXPECTED: &'static str;

    /// Convert, or describe what was found instead.
    fn from_config_value(value: &ConfigValue) -> Result<Self, String>;
}

fn found(value: &ConfigValue) -> String {
    value.type_name().to_string()
}

impl FromConfigValue for String {
    const EXPECTED: &'static str = "string";

    fn from_config_value(value: &ConfigValue) -> Result<Self, String> {
        value.render_scalar().ok_or_else(|| found(value))
    }
}

impl FromConfigValue for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_config_value(value: &ConfigValue) -> Result<Self, String> {
        match value {
            ConfigValue::Bool(b) => Ok(*b),
            ConfigValue::String(s) => match s.to_lowercase().as_str() {
                "true" | "yes" | "on" => Ok(true),
                "false" | "no" | "off" => Ok(false),
                _ => Err(format!("string '{s}'")),
            },
            other => Err(found(other)),
        }
    }
}

impl FromConfigValue for i64 {
    const EXPECTED: &'static str = "number";

    fn from_config_value(value: &ConfigValue) -> Result<Self, String> {
        match value {
            ConfigValue::Int(i) => Ok(*i),
            ConfigValue::Float(f) if f.fract() == 0.0 => Ok(*f as i64),
            ConfigValue::String(s) => {
                s.trim().parse().map_err(|_| format!("string '{s}'"))
            }
            other => Err(found(other)),
        }
    }
}

macro_rules! int_via_i64 {
    ($($ty:ty),*) => {
        $(impl FromConfigValue for $ty {
            const EXPECTED: &'static str = "number";

            fn from_config_value(value: &ConfigValue) -> Result<Self, String> {
                let wide = i64::from_config_value(value)?;
                <$ty>::try_from(wide).map_err(|_| format!("number {wide} (out of range)"))
            }
        })*
    };
}

int_via_i64!(i32, u64, u32, u16);

impl FromConfigValue for f64 {
    const EXPECTED: &'static str = "number";

    fn from_config_value(value: &ConfigValue) -> Result<Self, String> {
        match value {
            ConfigValue::Int(i) => Ok(*i as f64),
            ConfigValue::Float(f) => Ok(*f),
            ConfigValue::String(s) => {
                s.trim().parse().map_err(|_| format!("string '{s}'"))
            }
            other => Err(found(other)),
        }
    }
}

impl FromConfigValue for ConfigDuration {
    const EXPECTED: &'static str = "duration";

    fn from_config_value(value: &ConfigValue) -> Result<Self, String> {
        match value {
            ConfigValue::Duration(d) => Ok(*d),
            // bare numbers are milliseconds
            ConfigValue::Int(i) if *i >= 0 => Ok(ConfigDuration::from_millis(*i as u64)),
            ConfigValue::Int(i) => Err(format!("negative number {i}")),
            ConfigValue::String(s) => s.parse().map_err(|e: String| format!("string '{s}' ({e})")),
            other => Err(found(other)),
        }
    }
}

impl FromConfigValue for Duration {
    const EXPECTED: &'static str = "finite duration";

    fn from_config_value(value: &ConfigValue) -> Result<Self, String> {
        match ConfigDuration::from_config_value(value)? {
            ConfigDuration::Finite(d) => Ok(d),
            ConfigDuration::Infinite => Err("infinite duration".to_string()),
        }
    }
}

impl FromConfigValue for ConfigValue {
    const EXPECTED: &'static str = "value";

    fn from_config_value(value: &ConfigValue) -> Result<Self, String> {
        Ok(value.clone())
    }
}

impl<T: FromConfigValue> FromConfigValue for Vec<T> {
    const EXPECTED: &'static str = "list";

    fn from_config_value(value: &ConfigValue) -> Result<Self, String> {
        match value {
            ConfigValue::List(items) => items.iter().map(T::from_config_value).collect(),
            other => Err(found(other)),
        }
    }
}

impl<T: FromConfigValue> FromConfigValue for BTreeMap<String, T> {
    const EXPECTED: &'static str = "object";

    fn from_config_value(value: &ConfigValue) -> Result<Self, String> {
        match value {
            ConfigValue::Tree(tree) => tree
                .iter()
                .map(|(k, v)| Ok((k.clone(), T::from_config_value(v)?)))
                .collect(),
            other => Err(found(other)),
        }
    }
}

impl FromConfigValue for NornsConfig {
    const EXPECTED: &'static str = "object";

    fn from_config_value(value: &ConfigValue) -> Result<Self, String> {
        match value {
            ConfigValue::Tree(tree) => Ok(NornsConfig::from_resolved(tree.clone())),
            other => Err(found(other)),
        }
    }
}

/// A resolved configuration with typed access.
#[derive(Debug, Clone, PartialEq)]
pub struct NornsConfig {
    tree: Arc<ConfigTree>,
}

impl Default for NornsConfig {
    fn default() -> Self {
        Self::empty()
    }
}

impl NornsConfig {
    pub fn empty() -> Self {
        Self {
            tree: Arc::new(ConfigTree::new()),
        }
    }

    /// Merge sources (highest priority first) and resolve substitutions.
    pub fn from_sources(
        sources: impl IntoIterator<Item = ConfigSource>,
    ) -> ConfigResult<Self> {
        Self::from_tree(merge::merge_sources(sources))
    }

    /// Resolve a merged tree. Idempotent on already-resolved trees.
    pub fn from_tree(tree: ConfigTree) -> ConfigResult<Self> {
        Ok(Self::from_resolved(merge::resolve(tree)?))
    }

    /// Wrap a tree that is known to contain no unresolved references.
    pub(crate) fn from_resolved(tree: ConfigTree) -> Self {
        Self {
            tree: Arc::new(tree),
        }
    }

    pub fn tree(&self) -> &ConfigTree {
        &self.tree
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn has_path(&self, path: &str) -> bool {
        self.tree.lookup(path).is_some()
    }

    /// The value at `path`, coerced to `T`.
    pub fn get<T: FromConfigValue>(&self, path: &str) -> ConfigResult<T> {
        let value = self
            .tree
            .lookup(path)
            .ok_or_else(|| ConfigError::path_missing(path))?;
        T::from_config_value(value)
            .map_err(|found| ConfigError::type_mismatch(path, T::EXPECTED, found))
    }

    /// `Ok(None)` when the path is absent; a present-but-mistyped value still
    /// fails.
    pub fn get_optional<T: FromConfigValue>(&self, path: &str) -> ConfigResult<Option<T>> {
        match self.tree.lookup(path) {
            None => Ok(None),
            Some(value) => T::from_config_value(value)
                .map(Some)
                .map_err(|found| ConfigError::type_mismatch(path, T::EXPECTED, found)),
        }
    }

    /// `default` when the path is absent.
    pub fn get_or_default<T: FromConfigValue>(&self, path: &str, default: T) -> ConfigResult<T> {
        Ok(self.get_optional(path)?.unwrap_or(default))
    }

    /// As `get`, then check membership in `allowed`.
    pub fn get_and_validate<T>(&self, path: &str, allowed: &[T]) -> ConfigResult<T>
    where
        T: FromConfigValue + PartialEq + fmt::Display,
    {
        let value = self.get::<T>(path)?;
        if allowed.contains(&value) {
            return Ok(value);
        }
        let allowed = allowed
            .iter()
            .map(T::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Err(ConfigError::Validation {
            path: path.to_string(),
            value: value.to_string(),
            allowed,
        })
    }

    /// Merge each element of the list at `path` (as higher priority) over the
    /// prototype tree at `prototype_path`, yielding one sub-config per entry.
    ///
    /// Repeated structurally-similar entries (worker definitions and the
    /// like) share defaults through the prototype. Entries and the prototype
    /// must both be objects.
    pub fn get_prototyped_seq(
        &self,
        path: &str,
        prototype_path: &str,
    ) -> ConfigResult<Vec<NornsConfig>> {
        let prototype = self.tree_at(prototype_path)?;
        let entries = match self
            .tree
            .lookup(path)
            .ok_or_else(|| ConfigError::path_missing(path))?
        {
            ConfigValue::List(items) => items,
            other => {
                return Err(ConfigError::type_mismatch(path, "list", other.type_name()));
            }
        };

        entries
            .iter()
            .enumerate()
            .map(|(i, entry)| match entry {
                ConfigValue::Tree(tree) => Ok(NornsConfig::from_resolved(fallback(
                    tree.clone(),
                    prototype.clone(),
                ))),
                other => Err(ConfigError::type_mismatch(
                    format!("{path}[{i}]"),
                    "object",
                    other.type_name(),
                )),
            })
            .collect()
    }

    /// As `get_prototyped_seq`, but over the entries of the object at `path`,
    /// keyed by entry name.
    pub fn get_prototyped_map(
        &self,
        path: &str,
        prototype_path: &str,
    ) -> ConfigResult<BTreeMap<String, NornsConfig>> {
        let prototype = self.tree_at(prototype_path)?;
        let entries = self.tree_at(path)?;

        entries
            .iter()
            .map(|(key, entry)| match entry {
                ConfigValue::Tree(tree) => Ok((
                    key.clone(),
                    NornsConfig::from_resolved(fallback(tree.clone(), prototype.clone())),
                )),
                other => Err(ConfigError::type_mismatch(
                    format!("{path}.{key}"),
                    "object",
                    other.type_name(),
                )),
            })
            .collect()
    }

    /// All fully-qualified leaf paths, sorted.
    pub fn keys(&self) -> BTreeSet<String> {
        self.tree.leaf_paths()
    }

    /// Immediate child path segments at the root.
    pub fn sub_keys(&self) -> BTreeSet<String> {
        self.tree.child_keys()
    }

    /// Deserialize the whole configuration into a typed structure via serde.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> ConfigResult<T> {
        serde_json::from_value(self.tree.to_json()).map_err(|e| ConfigError::Type {
            path: String::new(),
            expected: std::any::type_name::<T>(),
            found: e.to_string(),
        })
    }

    fn tree_at(&self, path: &str) -> ConfigResult<&ConfigTree> {
        match self
            .tree
            .lookup(path)
            .ok_or_else(|| ConfigError::path_missing(path))?
        {
            ConfigValue::Tree(tree) => Ok(tree),
            other => Err(ConfigError::type_mismatch(path, "object", other.type_name())),
        }
    }
}
