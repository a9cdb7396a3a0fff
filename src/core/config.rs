//! Stamping configuration.
//!
//! An optional `.omnistamp.toml` is discovered by walking from the target
//! upward through its ancestors, so a repository can pin its author string
//! and traversal settings once at the root. CLI flags override config;
//! config overrides built-in defaults.

use crate::core::error::StampError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = ".omnistamp.toml";

/// Directory names never descended into during traversal.
pub const DEFAULT_IGNORE: &[&str] = &[".git", "target", "node_modules", ".venv", "__pycache__"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StampConfig {
    pub author: Option<String>,
    /// Corrupted-block handling: `regenerate` (default) or `strict`.
    pub corrupted: Option<String>,
    #[serde(default)]
    pub directory: DirectorySection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectorySection {
    pub recursive: Option<bool>,
    pub ignore: Option<Vec<String>>,
}

impl StampConfig {
    /// Walks from `start` (file or directory) upward until a config file is
    /// found. Absence is not an error; it yields the defaults.
    pub fn discover(start: &Path) -> Result<StampConfig, StampError> {
        let mut dir = if start.is_dir() {
            start.to_path_buf()
        } else {
            start
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        };
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                return Self::load(&candidate);
            }
            if !dir.pop() {
                return Ok(StampConfig::default());
            }
        }
    }

    pub fn load(path: &Path) -> Result<StampConfig, StampError> {
        let content = fs::read_to_string(path).map_err(StampError::IoError)?;
        toml::from_str(&content)
            .map_err(|e| StampError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    pub fn ignore_list(&self) -> Vec<String> {
        self.directory
            .ignore
            .clone()
            .unwrap_or_else(|| DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect())
    }
}
