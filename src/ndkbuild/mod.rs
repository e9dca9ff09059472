//! Interpretation of `ndk-build -n` dry-run output.
//!
//! The dry run prints every command ndk-build would execute. From that text
//! alone this module recovers which source files end up in which native
//! library, which compilers each toolchain uses and which flags an IDE needs
//! to index every file.

pub mod builder;
pub mod classifier;
pub mod command_line;
pub mod compile_commands;
pub mod conventions;
pub mod error;
pub mod extensions;
pub mod flow;
pub mod ide_flags;
pub mod model;
pub mod naming;

pub use builder::NativeBuildConfigValueBuilder;
pub use classifier::{Classification, CommandClassifier, StepKind};
pub use command_line::{CommandLine, ParsedTranscript, SkippedLine};
pub use compile_commands::{CompileCommand, CompileCommandsEncoder, CompileCommandsError};
pub use conventions::{FileConventions, HostShell, PosixFileConventions, WindowsFileConventions};
pub use error::NdkBuildError;
pub use extensions::Language;
pub use flow::{BuildStepInfo, TerminalOutput};
pub use model::{
    NativeBuildConfigValue, NativeLibraryValue, NativeSourceFileValue, NativeToolchainValue,
    BUILD_TARGETS_PLACEHOLDER,
};
