//! Serializable native build configuration consumed by IDE sync.
//!
//! JSON keys are camelCase to match what the IDE reads.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Token appended to the build command; replaced with target names later.
pub const BUILD_TARGETS_PLACEHOLDER: &str = "{LIST_OF_TARGETS_TO_BUILD}";

/// The native build configuration of one variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NativeBuildConfigValue {
    /// Files whose change invalidates this configuration.
    pub build_files: Vec<PathBuf>,
    /// Distinct clean commands, each an argument list.
    pub clean_commands_components: Vec<Vec<String>>,
    /// Build command with [`BUILD_TARGETS_PLACEHOLDER`] appended.
    pub build_targets_command_components: Vec<String>,
    /// Library name to library.
    pub libraries: BTreeMap<String, NativeLibraryValue>,
    /// Toolchain name to compilers.
    pub toolchains: BTreeMap<String, NativeToolchainValue>,
    /// Sorted.
    pub c_file_extensions: Vec<String>,
    /// Sorted.
    pub cpp_file_extensions: Vec<String>,
}

/// One native library (a terminal build output).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NativeLibraryValue {
    /// Build command followed by the output path.
    pub build_command_components: Vec<String>,
    pub toolchain: String,
    pub abi: String,
    pub artifact_name: String,
    pub output: PathBuf,
    /// Absent when compiler flag processing was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<NativeSourceFileValue>>,
}

/// A source file and the flags the IDE should compile it with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NativeSourceFileValue {
    pub src: PathBuf,
    /// Raw flags joined with single spaces.
    pub flags: String,
}

/// Compilers of one toolchain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NativeToolchainValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c_compiler_executable: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpp_compiler_executable: Option<PathBuf>,
}

impl NativeBuildConfigValue {
    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize native build config")
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to parse native build config")
    }

    /// Write pretty JSON to `path`, creating parent directories.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        crate::util::fs::write_string(path, &self.to_json()?)
    }

    /// Number of source files across all libraries.
    pub fn source_file_count(&self) -> usize {
        self.libraries
            .values()
            .filter_map(|library| library.files.as_ref())
            .map(Vec::len)
            .sum()
    }
}
