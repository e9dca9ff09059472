//! Errors raised while building a native build configuration.

use thiserror::Error;

use super::compile_commands::CompileCommandsError;
use super::extensions::Language;
use crate::util::diagnostic::Diagnostic;

/// Fatal errors of [`NativeBuildConfigValueBuilder`](super::NativeBuildConfigValueBuilder).
///
/// Noise in the transcript is never an error; these indicate misuse or a
/// native build whose structure cannot be represented.
#[derive(Debug, Error)]
pub enum NdkBuildError {
    #[error("set_commands should be called once per builder")]
    CommandsAlreadySet,

    #[error("set_commands must be called before build")]
    CommandsNotSet,

    #[error(
        "too many {language} compilers for `{output}` in toolchain `{toolchain}`: {}",
        compilers.join(", ")
    )]
    TooManyCompilers {
        output: String,
        toolchain: String,
        language: Language,
        compilers: Vec<String>,
    },

    #[error("library name `{library}` is produced by both `{first}` and `{second}`")]
    DuplicateLibraryName {
        library: String,
        first: String,
        second: String,
    },

    #[error(transparent)]
    CompileCommands(#[from] CompileCommandsError),
}

impl NdkBuildError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            NdkBuildError::CommandsAlreadySet | NdkBuildError::CommandsNotSet => {
                Diagnostic::error(self.to_string())
                    .with_context("one builder describes exactly one variant's dry run")
            }

            NdkBuildError::TooManyCompilers {
                output,
                toolchain,
                language,
                compilers,
            } => {
                let mut diag = Diagnostic::error(format!(
                    "`{}` is built with more than one {} compiler",
                    output, language
                ))
                .with_context(format!("toolchain: {}", toolchain));
                for compiler in compilers {
                    diag = diag.with_context(format!("{} compiler: {}", language, compiler));
                }
                diag.with_suggestion(
                    "Use one compiler per language for each ABI in Application.mk / Android.mk",
                )
                .with_suggestion(
                    "Check that outputs of different modules are not written to the same path",
                )
            }

            NdkBuildError::DuplicateLibraryName {
                library,
                first,
                second,
            } => Diagnostic::error(format!("duplicate library name `{}`", library))
                .with_context(format!("produced by {}", first))
                .with_context(format!("produced by {}", second))
                .with_suggestion("Give each module a distinct LOCAL_MODULE name"),

            NdkBuildError::CompileCommands(e) => e.to_diagnostic(),
        }
    }
}
