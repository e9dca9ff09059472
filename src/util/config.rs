//! Configuration file support for ndkscan.
//!
//! ndkscan supports two configuration file locations:
//! - Global: `~/.ndkscan/config.toml` - User-wide defaults
//! - Project: `.ndkscan/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config. Command-line flags
//! take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ndkbuild::HostShell;

/// ndkscan configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model generation settings
    pub model: ModelConfig,

    /// How ndk-build is invoked
    #[serde(rename = "ndk-build")]
    pub ndk_build: NdkBuildConfig,
}

/// Settings for generating the native build configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Default variant name (e.g. debug)
    pub variant: Option<String>,

    /// Shell the dry run was produced under (posix, windows)
    pub shell: Option<String>,

    /// Leave per-file compiler flags out of the model
    #[serde(default)]
    pub skip_compiler_flags: bool,

    /// Always write a binary compile-commands file next to the model
    #[serde(default)]
    pub emit_compile_commands_bin: bool,
}

/// Command templates used to build and clean.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NdkBuildConfig {
    /// Build command, one argument per element
    pub build_command: Option<Vec<String>>,

    /// Clean command, one argument per element
    pub clean_command: Option<Vec<String>>,
}

impl NdkBuildConfig {
    /// The build command, `ndk-build` when unset.
    pub fn build_command(&self) -> Vec<String> {
        self.build_command
            .clone()
            .unwrap_or_else(|| vec!["ndk-build".to_string()])
    }

    /// The clean command, `ndk-build clean` when unset.
    pub fn clean_command(&self) -> Vec<String> {
        self.clean_command
            .clone()
            .unwrap_or_else(|| vec!["ndk-build".to_string(), "clean".to_string()])
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        // Model settings
        if other.model.variant.is_some() {
            self.model.variant = other.model.variant;
        }
        if other.model.shell.is_some() {
            self.model.shell = other.model.shell;
        }
        if other.model.skip_compiler_flags {
            self.model.skip_compiler_flags = true;
        }
        if other.model.emit_compile_commands_bin {
            self.model.emit_compile_commands_bin = true;
        }

        // Commands
        if other.ndk_build.build_command.is_some() {
            self.ndk_build.build_command = other.ndk_build.build_command;
        }
        if other.ndk_build.clean_command.is_some() {
            self.ndk_build.clean_command = other.ndk_build.clean_command;
        }
    }

    /// Parse the shell convention from the config string.
    pub fn shell(&self) -> Option<HostShell> {
        self.model.shell.as_ref().and_then(|s| s.parse().ok())
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.ndkscan/config.toml)
/// 2. Global config (~/.ndkscan/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    // Load global config first
    if global_path.exists() {
        let global = Config::load_or_default(global_path);
        config.merge(global);
    }

    // Project config overrides global
    if project_path.exists() {
        let project = Config::load_or_default(project_path);
        config.merge(project);
    }

    config
}

/// Load the configuration that applies to `project_root`.
pub fn load_for_project(project_root: &Path) -> Config {
    let project = project_config_path(project_root);
    match global_config_path() {
        Some(global) => load_config(&global, &project),
        None => Config::load_or_default(&project),
    }
}

/// Get the global ndkscan config directory (~/.ndkscan).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".ndkscan"))
}

/// Get the global config path (~/.ndkscan/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.ndkscan/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".ndkscan").join("config.toml")
}
