//! Configuration sources and their origins.
//!
//! A source is one configuration origin (environment, properties, a file, an
//! embedded resource, or an in-memory tree) already parsed into a
//! `ConfigTree`. The origin descriptor survives only for error reporting.

use crate::error::{ConfigError, ConfigResult};
use crate::format::FileFormat;
use crate::value::{ConfigTree, ConfigValue};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a configuration tree came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Environment,
    Properties,
    File(PathBuf),
    Resource(String),
    Map,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Environment => write!(f, "environment variables"),
            Origin::Properties => write!(f, "properties"),
            Origin::File(path) => write!(f, "file '{}'", path.display()),
            Origin::Resource(name) => write!(f, "resource '{name}'"),
            Origin::Map => write!(f, "in-memory map"),
        }
    }
}

/// Embedded configuration content, looked up by name.
///
/// The stand-in for bundled resources: content compiled into the binary with
/// `include_str!` (or registered at startup) that the default load chain
/// falls back to when no file of the same name exists on disk.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    entries: BTreeMap<String, Cow<'static, str>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, name: impl Into<String>, content: impl Into<Cow<'static, str>>) -> Self {
        self.entries.insert(name.into(), content.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|content| content.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One configuration origin with its parsed tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSource {
    origin: Origin,
    tree: ConfigTree,
}

impl ConfigSource {
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn tree(&self) -> &ConfigTree {
        &self.tree
    }

    pub fn into_tree(self) -> ConfigTree {
        self.tree
    }

    /// Process environment variables under `prefix`, with `NORNS_FOO_BAR`
    /// mapped to `norns.foo.bar`. Empty tree when nothing matches.
    pub fn from_environment(prefix: &str) -> ConfigSource {
        Self::from_env_iter(std::env::vars(), prefix)
    }

    /// Environment-style mapping over an explicit snapshot. This is what
    /// `from_environment` wraps, and what tests use so the real process
    /// environment never has to be mutated.
    pub fn from_env_iter(
        vars: impl IntoIterator<Item = (String, String)>,
        prefix: &str,
    ) -> ConfigSource {
        let mut tree = ConfigTree::new();
        for (key, value) in vars {
            if !key.starts_with(prefix) {
                continue;
            }
            let path = key.to_lowercase().replace('_', ".");
            if path.split('.').any(str::is_empty) {
                debug!(var = %key, "skipping environment variable with empty path segment");
                continue;
            }
            tree.set_path(&path, ConfigValue::string_or_reference(value));
        }
        debug!(origin = %Origin::Environment, leaves = tree.leaf_paths().len(), "loaded config source");
        ConfigSource {
            origin: Origin::Environment,
            tree,
        }
    }

    /// Caller-supplied property overrides (the analog of `-D` flags),
    /// filtered to keys under `prefix`. Keys are already dotted paths.
    pub fn from_properties(props: &BTreeMap<String, String>, prefix: &str) -> ConfigSource {
        let mut tree = ConfigTree::new();
        for (key, value) in props {
            if !key.starts_with(prefix) || key.split('.').any(str::is_empty) {
                continue;
            }
            tree.set_path(key, ConfigValue::string_or_reference(value.clone()));
        }
        debug!(origin = %Origin::Properties, leaves = tree.leaf_paths().len(), "loaded config source");
        ConfigSource {
            origin: Origin::Properties,
            tree,
        }
    }

    /// Parse a file whose format is inferred from its extension. The file is
    /// mandatory: a missing file is `ConfigError::Missing`.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<ConfigSource> {
        let path = path.as_ref();
        match Self::read_file(path, true)? {
            Some(source) => Ok(source),
            None => Err(ConfigError::Missing {
                origin: Origin::File(path.to_path_buf()),
            }),
        }
    }

    /// Like `from_file`, but a missing file contributes an empty tree.
    pub fn from_file_optional(path: impl AsRef<Path>) -> ConfigResult<ConfigSource> {
        let path = path.as_ref();
        Ok(Self::read_file(path, false)?.unwrap_or_else(|| ConfigSource {
            origin: Origin::File(path.to_path_buf()),
            tree: ConfigTree::new(),
        }))
    }

    fn read_file(path: &Path, mandatory: bool) -> ConfigResult<Option<ConfigSource>> {
        let origin = Origin::File(path.to_path_buf());
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if mandatory {
                    return Err(ConfigError::Missing { origin });
                }
                debug!(origin = %origin, "optional config file absent, skipping");
                return Ok(None);
            }
            Err(e) => {
                return Err(ConfigError::Io {
                    origin,
                    message: e.to_string(),
                });
            }
        };
        let format = FileFormat::from_path(path).ok_or_else(|| {
            ConfigError::parse(origin.clone(), None, "unsupported config file extension")
        })?;
        let tree = format
            .parse(&content)
            .map_err(|issue| ConfigError::parse(origin.clone(), issue.line, issue.message))?;
        debug!(origin = %origin, leaves = tree.leaf_paths().len(), "loaded config source");
        Ok(Some(ConfigSource { origin, tree }))
    }

    /// Parse embedded content from the registry. Optional by default: an
    /// unregistered name contributes an empty tree.
    pub fn from_resource(registry: &ResourceRegistry, name: &str) -> ConfigResult<ConfigSource> {
        let origin = Origin::Resource(name.to_string());
        let Some(content) = registry.get(name) else {
            return Ok(ConfigSource {
                origin,
                tree: ConfigTree::new(),
            });
        };
        let format = FileFormat::from_path(Path::new(name)).ok_or_else(|| {
            ConfigError::parse(origin.clone(), None, "unsupported config resource extension")
        })?;
        let tree = format
            .parse(content)
            .map_err(|issue| ConfigError::parse(origin.clone(), issue.line, issue.message))?;
        debug!(origin = %origin, leaves = tree.leaf_paths().len(), "loaded config source");
        Ok(ConfigSource { origin, tree })
    }

    /// Wrap an in-memory tree directly. Never fails.
    pub fn from_map(tree: ConfigTree) -> ConfigSource {
        ConfigSource {
            origin: Origin::Map,
            tree,
        }
    }
}
