//! Configuration file formats.
//!
//! Three formats are recognized, inferred from the file extension:
//! - `.conf` — a nested key-value DSL with comments, `${path}` substitutions,
//!   and duration-friendly unquoted scalars
//! - `.json` — plain JSON
//! - `.properties` — flat Java-style `key=value` lines

mod conf;
mod json;
mod properties;

use crate::value::ConfigTree;
use std::path::Path;

/// A parse failure, before it is attached to a source origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIssue {
    pub line: Option<usize>,
    pub message: String,
}

impl ParseIssue {
    pub fn new(line: impl Into<Option<usize>>, message: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            message: message.into(),
        }
    }
}

/// A supported configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Conf,
    Json,
    Properties,
}

impl FileFormat {
    /// Formats in default-load fallback order: conf, then JSON, then properties.
    pub const ALL: [FileFormat; 3] = [FileFormat::Conf, FileFormat::Json, FileFormat::Properties];

    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Conf => "conf",
            FileFormat::Json => "json",
            FileFormat::Properties => "properties",
        }
    }

    /// Infer the format from a path's extension.
    pub fn from_path(path: &Path) -> Option<FileFormat> {
        match path.extension()?.to_str()? {
            "conf" => Some(FileFormat::Conf),
            "json" => Some(FileFormat::Json),
            "properties" => Some(FileFormat::Properties),
            _ => None,
        }
    }

    pub fn parse(&self, input: &str) -> Result<ConfigTree, ParseIssue> {
        match self {
            FileFormat::Conf => conf::parse(input),
            FileFormat::Json => json::parse(input),
            FileFormat::Properties => properties::parse(input),
        }
    }
}

pub use json::tree_from_json;
