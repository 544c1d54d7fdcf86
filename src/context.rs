//! The default configuration pipeline for a job process.
//!
//! `JobContextLoader` assembles one fixed precedence, highest to lowest:
//! 1. Environment variables under `NORNS_`
//! 2. Caller-supplied properties under `norns.`
//! 3. A user-named override file (`NORNS_JOB_CONFIG_PATH` / the
//!    `norns.job.config.path` property) — mandatory once named
//! 4. Conventional files `norns-job.conf`, `norns-job.json`,
//!    `norns-job.properties` — each optional, merged as successive
//!    fallbacks; within one format a file on disk wins over an embedded
//!    resource of the same name
//!
//! If none of the optional sources exist the load still succeeds with an
//! empty configuration.

use crate::config::NornsConfig;
use crate::error::ConfigResult;
use crate::format::FileFormat;
use crate::source::{ConfigSource, ResourceRegistry};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Environment variable namespace for automatic overrides.
pub const ENV_PREFIX: &str = "NORNS_";
/// Property namespace for automatic overrides.
pub const PROPERTY_PREFIX: &str = "norns.";
/// Environment variable naming a mandatory override file.
pub const CONFIG_PATH_ENV: &str = "NORNS_JOB_CONFIG_PATH";
/// Property naming a mandatory override file.
pub const CONFIG_PATH_PROPERTY: &str = "norns.job.config.path";
/// Base name of the conventional job config files.
pub const JOB_CONFIG_BASENAME: &str = "norns-job";

/// Builder for the default job configuration load.
#[derive(Debug, Clone, Default)]
pub struct JobContextLoader {
    base_dir: Option<PathBuf>,
    properties: BTreeMap<String, String>,
    resources: ResourceRegistry,
    env_override: Option<BTreeMap<String, String>>,
}

impl JobContextLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory searched for the conventional config files. Defaults to the
    /// current working directory.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Process-level property overrides (the `-D` flag analog).
    pub fn with_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Embedded resources consulted when a conventional file is not on disk.
    pub fn with_resources(mut self, resources: ResourceRegistry) -> Self {
        self.resources = resources;
        self
    }

    /// Replace the process environment with an explicit snapshot. Intended
    /// for tests, which must not mutate the real environment.
    pub fn with_env_snapshot(mut self, env: BTreeMap<String, String>) -> Self {
        self.env_override = Some(env);
        self
    }

    /// Run the pipeline once and produce the resolved configuration.
    pub fn load(&self) -> ConfigResult<NornsConfig> {
        let env_source = match &self.env_override {
            Some(snapshot) => ConfigSource::from_env_iter(snapshot.clone(), ENV_PREFIX),
            None => ConfigSource::from_environment(ENV_PREFIX),
        };
        let mut sources = vec![
            env_source,
            ConfigSource::from_properties(&self.properties, PROPERTY_PREFIX),
        ];

        // A named override file is mandatory from the moment it is named.
        if let Some(path) = self.override_path() {
            info!(path = %path.display(), "loading user-named config override");
            sources.push(ConfigSource::from_file(&path)?);
        }

        let base_dir = self.base_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        for format in FileFormat::ALL {
            let name = format!("{JOB_CONFIG_BASENAME}.{}", format.extension());
            let file = base_dir.join(&name);
            if file.exists() {
                sources.push(ConfigSource::from_file(&file)?);
            } else {
                sources.push(ConfigSource::from_resource(&self.resources, &name)?);
            }
        }

        debug!(sources = sources.len(), "merging job configuration");
        NornsConfig::from_sources(sources)
    }

    fn override_path(&self) -> Option<PathBuf> {
        self.env_value(CONFIG_PATH_ENV)
            .or_else(|| self.properties.get(CONFIG_PATH_PROPERTY).cloned())
            .map(PathBuf::from)
    }

    fn env_value(&self, key: &str) -> Option<String> {
        match &self.env_override {
            Some(snapshot) => snapshot.get(key).cloned(),
            None => std::env::var(key).ok(),
        }
    }
}

/// Process-wide default configuration, loaded at most once.
pub struct JobContext;

static SHARED: OnceLock<ConfigResult<NornsConfig>> = OnceLock::new();

impl JobContext {
    /// The default configuration for this process.
    ///
    /// The pipeline runs on first access; every later call (from any thread)
    /// returns the same cached result, including a cached failure. Prefer
    /// constructing a `JobContextLoader` and passing the config explicitly;
    /// this exists for hosts that want the load-once singleton behavior.
    pub fn shared() -> Result<&'static NornsConfig, crate::error::ConfigError> {
        SHARED
            .get_or_init(|| JobContextLoader::new().load())
            .as_ref()
            .map_err(Clone::clone)
    }
}
