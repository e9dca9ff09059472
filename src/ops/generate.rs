//! Implementation of `ndkscan generate`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::ndkbuild::{
    HostShell, NativeBuildConfigValue, NativeBuildConfigValueBuilder, SkippedLine,
};
use crate::util::fs;

/// Options for generating a native build configuration.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// File holding the `ndk-build -n` output
    pub dry_run: PathBuf,

    /// The Android.mk the dry run was produced from
    pub android_mk: PathBuf,

    /// Variant name used in library names
    pub variant: String,

    /// Directory ndk-build ran in; relative sources are resolved against it
    pub execution_root: PathBuf,

    /// Build command, one argument per element
    pub build_command: Vec<String>,

    /// Clean command, one argument per element
    pub clean_command: Vec<String>,

    /// Shell the dry run was produced under
    pub shell: HostShell,

    /// Leave per-file flags out of the model
    pub skip_compiler_flags: bool,

    /// Where to write the binary compile-commands file
    pub compile_commands_bin: Option<PathBuf>,

    /// Where to write the model JSON (None = return it only)
    pub output: Option<PathBuf>,
}

impl GenerateOptions {
    /// Options with default commands for the current host.
    pub fn new(
        dry_run: impl Into<PathBuf>,
        android_mk: impl Into<PathBuf>,
        variant: impl Into<String>,
    ) -> Self {
        GenerateOptions {
            dry_run: dry_run.into(),
            android_mk: android_mk.into(),
            variant: variant.into(),
            execution_root: PathBuf::from("."),
            build_command: vec!["ndk-build".to_string()],
            clean_command: vec!["ndk-build".to_string(), "clean".to_string()],
            shell: HostShell::current(),
            skip_compiler_flags: false,
            compile_commands_bin: None,
            output: None,
        }
    }
}

/// Result of generating a model.
#[derive(Debug)]
pub struct GenerateResult {
    pub config: NativeBuildConfigValue,

    /// Transcript lines that could not be tokenized
    pub skipped: Vec<SkippedLine>,

    /// Path the model was written to
    pub written: Option<PathBuf>,
}

/// Split a command line such as `ndk-build NDK_DEBUG=1` into arguments
/// using the quoting rules of `shell`.
pub fn split_command_line(line: &str, shell: HostShell) -> Result<Vec<String>> {
    let mut commands = shell
        .conventions()
        .tokenize_line(line)
        .with_context(|| format!("invalid command line `{}`", line))?;
    if commands.len() > 1 {
        bail!("command line `{}` holds more than one command", line);
    }
    Ok(commands
        .pop()
        .unwrap_or_default()
        .into_iter()
        .map(|token| token.escaped)
        .collect())
}

/// Default location of the compile-commands file for a model at `output`.
pub fn default_compile_commands_path(output: &Path) -> PathBuf {
    output
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join("compile_commands.json.bin")
}

/// Generate the native build configuration of one variant.
pub fn generate_model(opts: &GenerateOptions) -> Result<GenerateResult> {
    let transcript = fs::read_to_string(&opts.dry_run)?;

    tracing::debug!(
        "generating {} model from {} ({} shell)",
        opts.variant,
        opts.dry_run.display(),
        opts.shell
    );

    let mut builder = NativeBuildConfigValueBuilder::with_conventions(
        &opts.android_mk,
        fs::absolute(&opts.execution_root),
        opts.shell.conventions(),
    );
    builder.transcript_name(opts.dry_run.display().to_string());
    if opts.skip_compiler_flags {
        builder.skip_processing_compiler_flags();
    }
    if let Some(path) = &opts.compile_commands_bin {
        builder.compile_commands_bin_file(path);
    }

    builder.set_commands(
        opts.build_command.clone(),
        opts.clean_command.clone(),
        &opts.variant,
        &transcript,
    )?;
    let config = builder.build()?;

    let written = match &opts.output {
        Some(path) => {
            config
                .write_json(path)
                .with_context(|| format!("failed to write model for variant `{}`", opts.variant))?;
            Some(path.clone())
        }
        None => None,
    };

    Ok(GenerateResult {
        config,
        skipped: builder.take_skipped_lines(),
        written,
    })
}
