//! Settings and per-capture configuration
//!
//! Settings come from an optional YAML file with camelCase keys and are
//! overridden by CLI flags:
//!
//! ```yaml
//! outputFormat: json          # json | text
//! includeSubprocesses: false
//! showLocalVariables: false
//! samplerPath: /opt/py-spy/bin/py-spy
//! ```
//!
//! [`CaptureConfig`] is the immutable slice of settings handed to the capture
//! engine for one invocation.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Sampler output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Parse the dump into threads and frames
    #[default]
    Json,
    /// Pass the dump through as opaque text
    Text,
}

/// What the engine asks the sampler for. Passed by value per capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureConfig {
    pub output: OutputFormat,
    pub include_subprocesses: bool,
    pub include_locals: bool,
}

impl CaptureConfig {
    #[must_use]
    pub fn structured(&self) -> bool {
        self.output == OutputFormat::Json
    }
}

/// Contents of the settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub output_format: OutputFormat,
    pub include_subprocesses: bool,
    pub show_local_variables: bool,
    pub sampler_path: Option<PathBuf>,
}

impl Settings {
    /// Load settings from `explicit`, or from the default location if it exists.
    ///
    /// An explicit path must exist; the default location is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match default_settings_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid settings file {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    #[must_use]
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            output: self.output_format,
            include_subprocesses: self.include_subprocesses,
            include_locals: self.show_local_variables,
        }
    }
}

/// `<config_dir>/pystacker/config.yaml`
#[must_use]
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pystacker").join("config.yaml"))
}

/// `<data_local_dir>/pystacker`
#[must_use]
pub fn default_state_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("pystacker"))
}
