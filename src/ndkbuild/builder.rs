//! Assembly of a [`NativeBuildConfigValue`] from an `ndk-build -n` transcript.
//!
//! The transcript goes through four stages:
//!
//! 1. [`command_line::parse`] splits it into command lines using the host
//!    shell's quoting rules.
//! 2. [`CommandClassifier`] keeps the compiler and archiver invocations and
//!    records their inputs and outputs.
//! 3. [`flow::analyze`] traces outputs back to sources and yields one
//!    [`TerminalOutput`] per final library.
//! 4. [`NativeBuildConfigValueBuilder::build`] names libraries and
//!    toolchains, finds each toolchain's compilers and extracts per-file
//!    flags.
//!
//! Stage 4 is a chain of functions over immutable inputs; each can be called
//! on its own.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use super::classifier::CommandClassifier;
use super::command_line::{self, SkippedLine};
use super::compile_commands::CompileCommandsEncoder;
use super::conventions::{FileConventions, HostShell};
use super::error::NdkBuildError;
use super::extensions::Language;
use super::flow::{self, BuildStepInfo, TerminalOutput};
use super::ide_flags::{ide_flag_indices, strip_args_for_ide};
use super::model::{
    NativeBuildConfigValue, NativeLibraryValue, NativeSourceFileValue, NativeToolchainValue,
    BUILD_TARGETS_PLACEHOLDER,
};
use super::naming;

/// A terminal output with the names derived from its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedOutput<'a> {
    pub output: &'a TerminalOutput,
    pub artifact_name: String,
    pub abi: String,
    pub library_name: String,
    pub toolchain: String,
}

impl NamedOutput<'_> {
    pub fn steps(&self) -> &[BuildStepInfo] {
        &self.output.steps
    }
}

/// Compilers and extensions found across all outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerInventory {
    /// Toolchain name to C compiler executable.
    pub c_compilers: BTreeMap<String, String>,
    /// Toolchain name to C++ compiler executable.
    pub cpp_compilers: BTreeMap<String, String>,
    pub c_extensions: BTreeSet<String>,
    pub cpp_extensions: BTreeSet<String>,
}

/// What the compile steps of one output showed.
#[derive(Debug, Default)]
struct CompilerSightings {
    c: BTreeSet<String>,
    cpp: BTreeSet<String>,
    /// Unrecognized extensions by the compiler that compiled them.
    pending: BTreeMap<String, BTreeSet<String>>,
}

/// Name every output: artifact, ABI, library and toolchain.
pub fn name_outputs<'a>(
    outputs: &'a [TerminalOutput],
    variant_name: &str,
    conventions: &dyn FileConventions,
) -> Vec<NamedOutput<'a>> {
    outputs
        .iter()
        .map(|output| {
            let path = output.output.as_str();
            let artifact_name =
                naming::target_name_from_output_file_name(conventions.file_name(path));
            let abi = naming::derive_abi_from_path(path, conventions);
            NamedOutput {
                library_name: naming::library_name(&artifact_name, variant_name, &abi),
                toolchain: naming::derive_toolchain_from_path(path, conventions),
                output,
                artifact_name,
                abi,
            }
        })
        .collect()
}

/// Fail if two outputs map to the same library name.
pub fn check_unique_library_names(named: &[NamedOutput<'_>]) -> Result<(), NdkBuildError> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for output in named {
        if let Some(first) = seen.insert(&output.library_name, &output.output.output) {
            return Err(NdkBuildError::DuplicateLibraryName {
                library: output.library_name.clone(),
                first: first.to_string(),
                second: output.output.output.clone(),
            });
        }
    }
    Ok(())
}

/// Find the C and C++ compiler of every toolchain.
///
/// Each output may use at most one compiler per language. Outputs sharing a
/// toolchain name may differ (ndk-build puts every ABI under `obj/local`);
/// the last such output in `named` order supplies the toolchain's compiler.
///
/// A file with an unrecognized extension is attributed to whichever language
/// its compiler is confirmed for by other files of the same output;
/// otherwise its extension is ignored.
pub fn discover_compilers(
    named: &[NamedOutput<'_>],
    conventions: &dyn FileConventions,
) -> Result<CompilerInventory, NdkBuildError> {
    let mut inventory = CompilerInventory::default();

    for output in named {
        let mut sightings = CompilerSightings::default();
        for step in output.steps() {
            let compiler = &step.command.executable;
            let extension = conventions.file_extension(&step.only_input).to_string();
            match Language::from_extension(&extension) {
                Some(Language::C) => {
                    sightings.c.insert(compiler.clone());
                    inventory.c_extensions.insert(extension);
                }
                Some(Language::Cxx) => {
                    sightings.cpp.insert(compiler.clone());
                    inventory.cpp_extensions.insert(extension);
                }
                None => {
                    sightings
                        .pending
                        .entry(compiler.clone())
                        .or_default()
                        .insert(extension);
                }
            }
        }

        let c_compiler = single_compiler(output, Language::C, &sightings.c)?;
        let cpp_compiler = single_compiler(output, Language::Cxx, &sightings.cpp)?;

        for (compiler, extensions) in sightings.pending {
            if c_compiler == Some(&compiler) {
                inventory.c_extensions.extend(extensions);
            } else if cpp_compiler == Some(&compiler) {
                inventory.cpp_extensions.extend(extensions);
            } else {
                tracing::debug!(
                    "ignoring extensions {:?} compiled by {} for {}",
                    extensions,
                    compiler,
                    output.output.output
                );
            }
        }

        if let Some(compiler) = c_compiler {
            inventory
                .c_compilers
                .insert(output.toolchain.clone(), compiler.clone());
        }
        if let Some(compiler) = cpp_compiler {
            inventory
                .cpp_compilers
                .insert(output.toolchain.clone(), compiler.clone());
        }
    }

    Ok(inventory)
}

fn single_compiler<'s>(
    output: &NamedOutput<'_>,
    language: Language,
    compilers: &'s BTreeSet<String>,
) -> Result<Option<&'s String>, NdkBuildError> {
    if compilers.len() > 1 {
        return Err(NdkBuildError::TooManyCompilers {
            output: output.output.output.clone(),
            toolchain: output.toolchain.clone(),
            language,
            compilers: compilers.iter().cloned().collect(),
        });
    }
    Ok(compilers.iter().next())
}

/// Raw text of the IDE-relevant flags of `step`, joined with spaces.
///
/// Flags are selected on their escaped form and emitted in their raw form;
/// both lists are positionally aligned.
pub fn ide_flags_for_step(step: &BuildStepInfo) -> String {
    let command = &step.command;
    ide_flag_indices(&step.only_input, &command.escaped_flags)
        .into_iter()
        .filter_map(|i| command.raw_flags.get(i))
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// The commands of one variant, as given to `set_commands`.
#[derive(Debug)]
struct VariantCommands {
    build_command: Vec<String>,
    clean_command: Vec<String>,
    variant_name: String,
    outputs: Vec<TerminalOutput>,
    skipped: Vec<SkippedLine>,
}

/// Builds the [`NativeBuildConfigValue`] of one variant.
///
/// ```no_run
/// use ndkscan::ndkbuild::NativeBuildConfigValueBuilder;
///
/// # fn main() -> Result<(), ndkscan::ndkbuild::NdkBuildError> {
/// let transcript = std::fs::read_to_string("dry-run.txt").unwrap();
/// let mut builder = NativeBuildConfigValueBuilder::new("jni/Android.mk", "/project");
/// builder.set_commands(
///     vec!["ndk-build".into()],
///     vec!["ndk-build".into(), "clean".into()],
///     "debug",
///     &transcript,
/// )?;
/// let config = builder.build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct NativeBuildConfigValueBuilder {
    android_mk: PathBuf,
    execution_root: PathBuf,
    conventions: Box<dyn FileConventions>,
    variant: Option<VariantCommands>,
    skip_processing_compiler_flags: bool,
    compile_commands_bin_file: Option<PathBuf>,
    transcript_name: String,
}

impl NativeBuildConfigValueBuilder {
    /// Create a builder using the conventions of the current host.
    pub fn new(android_mk: impl Into<PathBuf>, execution_root: impl Into<PathBuf>) -> Self {
        Self::with_conventions(android_mk, execution_root, HostShell::current().conventions())
    }

    /// Create a builder for transcripts produced under `conventions`.
    pub fn with_conventions(
        android_mk: impl Into<PathBuf>,
        execution_root: impl Into<PathBuf>,
        conventions: Box<dyn FileConventions>,
    ) -> Self {
        NativeBuildConfigValueBuilder {
            android_mk: android_mk.into(),
            execution_root: execution_root.into(),
            conventions,
            variant: None,
            skip_processing_compiler_flags: false,
            compile_commands_bin_file: None,
            transcript_name: "<dry-run>".to_string(),
        }
    }

    /// Leave per-file compiler flags out of the result.
    pub fn skip_processing_compiler_flags(&mut self) -> &mut Self {
        self.skip_processing_compiler_flags = true;
        self
    }

    /// Also write a binary compile-commands file to `path` during [`build`](Self::build).
    pub fn compile_commands_bin_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.compile_commands_bin_file = Some(path.into());
        self
    }

    /// Name the transcript in reports of skipped lines.
    pub fn transcript_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.transcript_name = name.into();
        self
    }

    /// Parse and store one variant's dry-run output.
    ///
    /// May be called once per builder.
    pub fn set_commands(
        &mut self,
        build_command: Vec<String>,
        clean_command: Vec<String>,
        variant_name: impl Into<String>,
        dry_run_output: &str,
    ) -> Result<&mut Self, NdkBuildError> {
        if self.variant.is_some() {
            return Err(NdkBuildError::CommandsAlreadySet);
        }

        let conventions = self.conventions.as_ref();
        let parsed = command_line::parse_named(&self.transcript_name, dry_run_output, conventions);
        let steps = CommandClassifier::new().classify(&parsed.commands, conventions);
        let outputs = flow::analyze(&steps);

        self.variant = Some(VariantCommands {
            build_command,
            clean_command,
            variant_name: variant_name.into(),
            outputs,
            skipped: parsed.skipped,
        });
        Ok(self)
    }

    /// Transcript lines that could not be tokenized.
    pub fn skipped_lines(&self) -> &[SkippedLine] {
        self.variant
            .as_ref()
            .map(|v| v.skipped.as_slice())
            .unwrap_or_default()
    }

    /// Move the skipped lines out of the builder.
    pub fn take_skipped_lines(&mut self) -> Vec<SkippedLine> {
        self.variant
            .as_mut()
            .map(|v| std::mem::take(&mut v.skipped))
            .unwrap_or_default()
    }

    /// Terminal outputs found by `set_commands`.
    pub fn terminal_outputs(&self) -> &[TerminalOutput] {
        self.variant
            .as_ref()
            .map(|v| v.outputs.as_slice())
            .unwrap_or_default()
    }

    /// Build the configuration.
    ///
    /// When a compile-commands file is configured it is finished before this
    /// returns, whether or not the build succeeded.
    pub fn build(&self) -> Result<NativeBuildConfigValue, NdkBuildError> {
        let variant = self.variant.as_ref().ok_or(NdkBuildError::CommandsNotSet)?;

        let mut encoder = self
            .compile_commands_bin_file
            .as_deref()
            .map(CompileCommandsEncoder::create)
            .transpose()?;

        let result = self.build_variant(variant, encoder.as_mut());

        match encoder {
            Some(encoder) => {
                let finished = encoder.finish();
                let config = result?;
                finished?;
                Ok(config)
            }
            None => result,
        }
    }

    fn build_variant(
        &self,
        variant: &VariantCommands,
        encoder: Option<&mut CompileCommandsEncoder>,
    ) -> Result<NativeBuildConfigValue, NdkBuildError> {
        let conventions = self.conventions.as_ref();

        let mut named = name_outputs(&variant.outputs, &variant.variant_name, conventions);
        check_unique_library_names(&named)?;
        let inventory = discover_compilers(&named, conventions)?;

        // Sorted so that output is stable
        named.sort_by(|a, b| a.library_name.cmp(&b.library_name));

        let libraries = self.generate_libraries(variant, &named, encoder)?;
        let toolchains = self.generate_toolchains(&named, &inventory);

        let mut build_targets_command = variant.build_command.clone();
        build_targets_command.push(BUILD_TARGETS_PLACEHOLDER.to_string());

        tracing::debug!(
            "built {} libraries across {} toolchains",
            libraries.len(),
            toolchains.len()
        );

        Ok(NativeBuildConfigValue {
            build_files: vec![self.android_mk.clone()],
            clean_commands_components: generate_clean_commands(variant, &named),
            build_targets_command_components: build_targets_command,
            libraries,
            toolchains,
            c_file_extensions: inventory.c_extensions.into_iter().collect(),
            cpp_file_extensions: inventory.cpp_extensions.into_iter().collect(),
        })
    }

    fn generate_libraries(
        &self,
        variant: &VariantCommands,
        named: &[NamedOutput<'_>],
        mut encoder: Option<&mut CompileCommandsEncoder>,
    ) -> Result<BTreeMap<String, NativeLibraryValue>, NdkBuildError> {
        let conventions = self.conventions.as_ref();
        let working_directory = crate::util::fs::absolute(&self.execution_root);
        let mut libraries = BTreeMap::new();

        for output in named {
            let output_path = &output.output.output;

            if let Some(encoder) = encoder.as_deref_mut() {
                for step in output.steps() {
                    encoder.write_compile_command(
                        &conventions.to_path(&step.only_input),
                        &conventions.to_path(&step.command.executable),
                        &strip_args_for_ide(&step.only_input, &step.command.escaped_flags),
                        &working_directory,
                    )?;
                }
            }

            let files = if self.skip_processing_compiler_flags {
                None
            } else {
                Some(
                    output
                        .steps()
                        .iter()
                        .map(|step| NativeSourceFileValue {
                            src: conventions.resolve(&self.execution_root, &step.only_input),
                            flags: ide_flags_for_step(step),
                        })
                        .collect(),
                )
            };

            let mut build_command = variant.build_command.clone();
            build_command.push(output_path.clone());

            libraries.insert(
                output.library_name.clone(),
                NativeLibraryValue {
                    build_command_components: build_command,
                    toolchain: output.toolchain.clone(),
                    abi: output.abi.clone(),
                    artifact_name: output.artifact_name.clone(),
                    output: conventions.to_path(output_path),
                    files,
                },
            );
        }

        Ok(libraries)
    }

    fn generate_toolchains(
        &self,
        named: &[NamedOutput<'_>],
        inventory: &CompilerInventory,
    ) -> BTreeMap<String, NativeToolchainValue> {
        let conventions = self.conventions.as_ref();
        named
            .iter()
            .map(|output| output.toolchain.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|toolchain| {
                let value = NativeToolchainValue {
                    c_compiler_executable: inventory
                        .c_compilers
                        .get(toolchain)
                        .map(|c| conventions.to_path(c)),
                    cpp_compiler_executable: inventory
                        .cpp_compilers
                        .get(toolchain)
                        .map(|c| conventions.to_path(c)),
                };
                (toolchain.to_string(), value)
            })
            .collect()
    }
}

/// Distinct clean commands of all outputs.
fn generate_clean_commands(
    variant: &VariantCommands,
    named: &[NamedOutput<'_>],
) -> Vec<Vec<String>> {
    named
        .iter()
        .map(|_| variant.clean_command.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
