//! Configuration for image analysis.
//!
//! Every limit has a default; a JSON document only needs the fields it
//! wants to change.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::formats::pe::ParseOptions;
use crate::io::IOLimits;

/// Master configuration for an [`Analyzer`](crate::api::Analyzer).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// I/O limits for opening files and handles.
    pub io: IOLimits,
    /// Directory parsing switches and table limits.
    pub parse: ParseOptions,
}

impl AnalysisOptions {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
