//! Implementation of `ndkscan compile-commands`.
//!
//! Decodes a binary compile-commands file into the JSON compilation database
//! format read by clangd and most other C/C++ tooling.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ndkbuild::compile_commands::stream_compile_commands;
use crate::util::fs;

/// compile_commands.json entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileCommandEntry {
    pub directory: String,
    pub file: String,
    pub arguments: Vec<String>,
}

/// Decode `bin` into compilation database entries.
pub fn decode_compile_commands(bin: &Path) -> Result<Vec<CompileCommandEntry>> {
    let mut entries = Vec::new();
    stream_compile_commands(bin, |command| {
        let file = command.source_file.display().to_string();

        let mut arguments = Vec::with_capacity(command.flags.len() + 2);
        arguments.push(command.compiler.display().to_string());
        arguments.extend(command.flags);
        arguments.push(file.clone());

        entries.push(CompileCommandEntry {
            directory: command.working_directory.display().to_string(),
            file,
            arguments,
        });
    })?;

    tracing::debug!("decoded {} entries from {}", entries.len(), bin.display());
    Ok(entries)
}

/// Decode `bin` and render it as pretty JSON.
pub fn compile_commands_json(bin: &Path) -> Result<String> {
    let entries = decode_compile_commands(bin)?;
    serde_json::to_string_pretty(&entries).context("failed to serialize compile commands")
}

/// Decode `bin` and write the JSON to `output`. Returns the entry count.
pub fn write_compile_commands_json(bin: &Path, output: &Path) -> Result<usize> {
    let entries = decode_compile_commands(bin)?;
    let json =
        serde_json::to_string_pretty(&entries).context("failed to serialize compile commands")?;
    fs::write_string(output, &json)?;
    Ok(entries.len())
}
