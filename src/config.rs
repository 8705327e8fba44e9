//! Coordinator configuration.
//!
//! The one real knob is the protocol entry mode: whether requests come into
//! existence implicitly on their first stage update, or must be bracketed by
//! explicit `startProcessing`/`endProcessing` calls. Both modes share the
//! same locking engine and state machine; the mode only selects which
//! transitions the dispatch surface admits.
//!
//! Config is YAML, loaded once at construction and passed into the
//! [`crate::dispatch::Coordinator`] explicitly. The crate owns no ambient
//! configuration state.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a request record enters the PROCESSING state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntryMode {
    /// The first `stageUpdate` for an unseen ID creates the request.
    #[default]
    Implicit,
    /// Requests are created and resumed by `startProcessing`, rested by
    /// `endProcessing`; stage updates are accepted only inside a bracket.
    Bracketed,
}

impl EntryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryMode::Implicit => "implicit",
            EntryMode::Bracketed => "bracketed",
        }
    }
}

/// Coordinator configuration, deserialized from YAML.
///
/// Unknown fields are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CoordinatorConfig {
    /// Protocol entry mode. Defaults to implicit.
    #[serde(default)]
    pub entry_mode: EntryMode,
}

impl CoordinatorConfig {
    /// Load config from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::invalid_input(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::invalid_input(format!("failed to parse config YAML: {}", e)))
    }

    /// Serialize config to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| Error::unexpected(format!("failed to serialize config to YAML: {}", e)))
    }
}
