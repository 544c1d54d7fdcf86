//! Typed errors for configuration loading and access.

use crate::source::Origin;
use thiserror::Error;

/// Errors produced while loading, merging, resolving, or reading configuration.
///
/// Every variant carries enough context (path, origin, line) to point at the
/// offending source. Loading is one-shot and fail-fast: the first error aborts
/// the load, except that an *optional* absent source is not an error at all.
///
/// The type is `Clone` so a cached load failure can be handed to every caller
/// of the process-wide context.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// A source exists but its content could not be parsed.
    #[error("failed to parse {origin}{}: {message}", fmt_line(.line))]
    Parse {
        origin: Origin,
        line: Option<usize>,
        message: String,
    },

    /// A mandatory source (explicitly referenced) does not exist.
    #[error("mandatory config source not found: {origin}")]
    Missing { origin: Origin },

    /// A source exists but could not be read.
    #[error("failed to read {origin}: {message}")]
    Io { origin: Origin, message: String },

    /// A value is present at the path but cannot be coerced to the requested type.
    #[error("config value at '{path}' is {found}, expected {expected}")]
    Type {
        path: String,
        expected: &'static str,
        found: String,
    },

    /// No value is present at the path and the read was not optional.
    #[error("missing config value at '{path}'")]
    PathMissing { path: String },

    /// A value is outside its allowed set.
    #[error("config value at '{path}' is '{value}', allowed: [{allowed}]")]
    Validation {
        path: String,
        value: String,
        allowed: String,
    },

    /// A `${path}` substitution could not be resolved.
    #[error("cannot resolve substitution '${{{reference}}}' at '{path}': {reason}")]
    Resolution {
        reference: String,
        path: String,
        reason: String,
    },
}

fn fmt_line(line: &Option<usize>) -> String {
    match line {
        Some(n) => format!(" (line {n})"),
        None => String::new(),
    }
}

impl ConfigError {
    pub fn parse(origin: Origin, line: Option<usize>, message: impl Into<String>) -> Self {
        Self::Parse {
            origin,
            line,
            message: message.into(),
        }
    }

    pub fn path_missing(path: impl Into<String>) -> Self {
        Self::PathMissing { path: path.into() }
    }

    pub fn type_mismatch(
        path: impl Into<String>,
        expected: &'static str,
        found: impl Into<String>,
    ) -> Self {
        Self::Type {
            path: path.into(),
            expected,
            found: found.into(),
        }
    }

    pub fn resolution(
        reference: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Resolution {
            reference: reference.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
