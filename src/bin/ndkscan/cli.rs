//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell as CompletionShell;

use ndkscan::ndkbuild::HostShell;

/// ndkscan - Turn ndk-build dry runs into IDE build models
#[derive(Parser)]
#[command(name = "ndkscan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate the native build configuration of one variant
    Generate(GenerateArgs),

    /// Show the build steps and outputs recognized in a dry run
    Classify(ClassifyArgs),

    /// Convert a binary compile-commands file to compile_commands.json
    CompileCommands(CompileCommandsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct GenerateArgs {
    /// File holding the output of `ndk-build -n`
    #[arg(long, value_name = "FILE")]
    pub dry_run: PathBuf,

    /// The Android.mk the dry run was produced from
    #[arg(long, value_name = "PATH")]
    pub android_mk: PathBuf,

    /// Variant name used in library names (defaults to config or "debug")
    #[arg(long)]
    pub variant: Option<String>,

    /// Directory ndk-build ran in (defaults to current directory)
    #[arg(long, value_name = "DIR")]
    pub execution_root: Option<PathBuf>,

    /// Build command line, e.g. "ndk-build NDK_DEBUG=1"
    #[arg(long, value_name = "COMMAND")]
    pub build_command: Option<String>,

    /// Clean command line, e.g. "ndk-build clean"
    #[arg(long, value_name = "COMMAND")]
    pub clean_command: Option<String>,

    /// Shell the dry run was produced under (posix, windows)
    #[arg(long, env = "NDKSCAN_SHELL")]
    pub shell: Option<HostShell>,

    /// Leave per-file compiler flags out of the model
    #[arg(long)]
    pub skip_compiler_flags: bool,

    /// Also write a binary compile-commands file
    #[arg(long, value_name = "PATH")]
    pub compile_commands_bin: Option<PathBuf>,

    /// Write the model here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ClassifyArgs {
    /// File holding the output of `ndk-build -n`
    #[arg(long, value_name = "FILE")]
    pub dry_run: PathBuf,

    /// Shell the dry run was produced under (posix, windows)
    #[arg(long, env = "NDKSCAN_SHELL")]
    pub shell: Option<HostShell>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CompileCommandsArgs {
    /// Binary compile-commands file
    pub bin: PathBuf,

    /// Write compile_commands.json here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: CompletionShell,
}
