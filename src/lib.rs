//! Layered job configuration.
//!
//! Configuration for a job process is assembled from ordered sources
//! (environment, properties, files, embedded resources, in-memory maps),
//! merged with first-wins fallback semantics, resolved for `${path}`
//! substitutions, and read through a typed path-addressed accessor.
//!
//! ```
//! use norns_config::{ConfigSource, ConfigTree, NornsConfig};
//!
//! let mut overrides = ConfigTree::new();
//! overrides.set_path("worker.count", 8i64);
//!
//! let defaults = ConfigSource::from_resource(
//!     &norns_config::ResourceRegistry::new()
//!         .register("defaults.conf", "worker.count = 2\nworker.timeout = 30s"),
//!     "defaults.conf",
//! )?;
//!
//! // highest priority first
//! let config = NornsConfig::from_sources([ConfigSource::from_map(overrides), defaults])?;
//! assert_eq!(config.get::<i64>("worker.count")?, 8);
//! # Ok::<(), norns_config::ConfigError>(())
//! ```

pub mod config;
pub mod context;
pub mod duration;
pub mod error;
pub mod format;
pub mod merge;
pub mod source;
pub mod value;

pub use config::{FromConfigValue, NornsConfig};
pub use context::{JobContext, JobContextLoader};
pub use duration::ConfigDuration;
pub use error::{ConfigError, ConfigResult};
pub use format::FileFormat;
pub use source::{ConfigSource, Origin, ResourceRegistry};
pub use value::{ConfigTree, ConfigValue};
