//! Recognition of compile, archive and link steps.
//!
//! Only commands run through a GCC/Clang-style compiler driver or an
//! `ar`-style archiver are recognized. Anything else in a transcript
//! (`mkdir`, `echo`, `rm`, `cp`, ...) is dropped. Recognition is
//! deliberately conservative: a command that looks unusual is dropped rather
//! than guessed at, because a wrong edge corrupts the flow graph.

use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::command_line::CommandLine;
use super::conventions::{FileConventions, HostShell};

static COMPILER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:.*-)?(?:gcc|g\+\+|cc|c\+\+|clang|clang\+\+)(?:-\d+(?:\.\d+)*)?$")
        .expect("compiler name pattern is valid")
});

static ARCHIVER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:.*-)?ar$").expect("archiver name pattern is valid"));

/// Compiler wrappers whose first argument is the real compiler.
const COMPILER_WRAPPERS: &[&str] = &["ccache", "sccache"];

/// Driver options whose value is the following word.
const OPTIONS_WITH_VALUE: &[&str] = &[
    "-o",
    "-x",
    "-I",
    "-D",
    "-U",
    "-include",
    "-imacros",
    "-isystem",
    "-iquote",
    "-idirafter",
    "-iprefix",
    "-iwithprefix",
    "-iwithprefixbefore",
    "-isysroot",
    "-MF",
    "-MT",
    "-MQ",
    "-target",
    "-gcc-toolchain",
    "--sysroot",
    "-Xclang",
    "-Xlinker",
    "-Xassembler",
    "-Xpreprocessor",
    "-arch",
    "-mllvm",
    "-L",
    "-l",
    "-T",
    "-z",
    "-u",
    "-e",
    "-B",
    "--serialize-diagnostics",
    "-aux-info",
];

/// Flags that make the driver stop before producing an object.
const NON_OBJECT_MODES: &[&str] = &["-E", "-M", "-MM", "-S", "-fsyntax-only"];

/// What a recognized command does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// Source file to object file.
    Compile,
    /// Object files into a static archive.
    Archive,
    /// Objects and archives into a shared library or executable.
    Link,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Compile => "compile",
            StepKind::Archive => "archive",
            StepKind::Link => "link",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recognized build command with its declared inputs and outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub command: CommandLine,
    pub kind: StepKind,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl Classification {
    /// Whether the inputs are original sources rather than build products.
    pub fn inputs_are_source_files(&self) -> bool {
        self.kind == StepKind::Compile
    }
}

/// A family of tools whose invocations can be recognized.
pub trait BuildTool: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Whether `basename` (no directory, no `.exe`) names this tool.
    fn is_match(&self, basename: &str) -> bool;

    /// Inputs and outputs of `command`, or `None` if it is not a build step.
    fn classify(
        &self,
        command: &CommandLine,
        conventions: &dyn FileConventions,
    ) -> Option<Classification>;
}

/// GCC and Clang compiler drivers.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompilerTool;

/// `ar` and its prefixed variants.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiverTool;

impl BuildTool for CompilerTool {
    fn name(&self) -> &'static str {
        "compiler"
    }

    fn is_match(&self, basename: &str) -> bool {
        COMPILER_NAME.is_match(basename)
    }

    fn classify(
        &self,
        command: &CommandLine,
        conventions: &dyn FileConventions,
    ) -> Option<Classification> {
        let mut compile_only = false;
        let mut non_object_mode = false;
        let mut output: Option<String> = None;
        let mut inputs = Vec::new();

        let flags = &command.escaped_flags;
        let mut i = 0;
        while i < flags.len() {
            let flag = flags[i].as_str();
            if flag == "-c" {
                compile_only = true;
            } else if NON_OBJECT_MODES.contains(&flag) {
                non_object_mode = true;
            } else if flag == "-o" {
                output = flags.get(i + 1).cloned();
                i += 1;
            } else if let Some(joined) = flag
                .strip_prefix("-o")
                .filter(|_| !flag.starts_with("-obj"))
            {
                output = Some(joined.to_string());
            } else if OPTIONS_WITH_VALUE.contains(&flag) {
                i += 1;
            } else if !flag.starts_with('-') && !flag.starts_with('@') {
                inputs.push(flag.to_string());
            }
            i += 1;
        }

        if non_object_mode || inputs.is_empty() {
            return None;
        }

        if compile_only {
            if inputs.len() != 1 {
                return None;
            }
            let output = output.unwrap_or_else(|| default_object_name(&inputs[0], conventions));
            return Some(Classification {
                command: command.clone(),
                kind: StepKind::Compile,
                inputs,
                outputs: vec![output],
            });
        }

        output.map(|output| Classification {
            command: command.clone(),
            kind: StepKind::Link,
            inputs,
            outputs: vec![output],
        })
    }
}

impl BuildTool for ArchiverTool {
    fn name(&self) -> &'static str {
        "archiver"
    }

    fn is_match(&self, basename: &str) -> bool {
        ARCHIVER_NAME.is_match(basename)
    }

    fn classify(
        &self,
        command: &CommandLine,
        _conventions: &dyn FileConventions,
    ) -> Option<Classification> {
        let mut words = command.escaped_flags.iter();
        let mut positional = Vec::new();

        while let Some(word) = words.next() {
            if word == "--plugin" {
                words.next();
            } else if word.starts_with("--") {
                continue;
            } else {
                positional.push(word.as_str());
            }
        }

        let (key, rest) = positional.split_first()?;
        let key = key.trim_start_matches('-');
        if !key.contains(['r', 'q']) {
            return None;
        }

        let (archive, members) = rest.split_first()?;
        if members.is_empty() {
            return None;
        }

        Some(Classification {
            command: command.clone(),
            kind: StepKind::Archive,
            inputs: members.iter().map(|m| m.to_string()).collect(),
            outputs: vec![archive.to_string()],
        })
    }
}

/// The object file gcc writes when `-c` is given without `-o`.
fn default_object_name(source: &str, conventions: &dyn FileConventions) -> String {
    let name = conventions.file_name(source);
    let stem = match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    };
    format!("{}.o", stem)
}

/// Executable name without directory or Windows launcher suffix.
///
/// Windows names are case-insensitive and come back lowercased.
pub fn executable_basename<'a>(
    executable: &'a str,
    conventions: &dyn FileConventions,
) -> Cow<'a, str> {
    let mut name = conventions.file_name(executable);
    for suffix in [".exe", ".cmd", ".bat"] {
        let split = name.len().saturating_sub(suffix.len());
        if split > 0 && name.is_char_boundary(split) && name[split..].eq_ignore_ascii_case(suffix) {
            name = &name[..split];
            break;
        }
    }
    match conventions.shell() {
        HostShell::Windows => Cow::Owned(name.to_ascii_lowercase()),
        HostShell::Posix => Cow::Borrowed(name),
    }
}

/// Peel off a compiler wrapper such as `ccache clang ...`.
fn unwrap_compiler_wrapper(
    command: &CommandLine,
    conventions: &dyn FileConventions,
) -> Option<CommandLine> {
    let basename = executable_basename(&command.executable, conventions);
    if !COMPILER_WRAPPERS.contains(&basename.as_ref()) || command.escaped_flags.is_empty() {
        return None;
    }
    Some(CommandLine {
        executable: command.escaped_flags[0].clone(),
        escaped_flags: command.escaped_flags[1..].to_vec(),
        raw_flags: command.raw_flags[1..].to_vec(),
    })
}

/// Classifies commands with a fixed set of tools.
pub struct CommandClassifier {
    tools: Vec<Box<dyn BuildTool>>,
}

impl Default for CommandClassifier {
    fn default() -> Self {
        CommandClassifier {
            tools: vec![Box::new(CompilerTool), Box::new(ArchiverTool)],
        }
    }
}

impl CommandClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one command; `None` if no tool recognizes it.
    pub fn classify_one(
        &self,
        command: &CommandLine,
        conventions: &dyn FileConventions,
    ) -> Option<Classification> {
        let unwrapped = unwrap_compiler_wrapper(command, conventions);
        let command = unwrapped.as_ref().unwrap_or(command);
        let basename = executable_basename(&command.executable, conventions);

        let tool = self.tools.iter().find(|tool| tool.is_match(&basename))?;
        let classification = tool.classify(command, conventions);
        if classification.is_none() {
            tracing::trace!("{} did not recognize `{}`", tool.name(), command);
        }
        classification
    }

    /// Classify every command, dropping the ones that are not build steps.
    pub fn classify(
        &self,
        commands: &[CommandLine],
        conventions: &dyn FileConventions,
    ) -> Vec<Classification> {
        let classifications: Vec<Classification> = commands
            .iter()
            .filter_map(|command| self.classify_one(command, conventions))
            .collect();

        tracing::debug!(
            "classified {} of {} commands as build steps",
            classifications.len(),
            commands.len()
        );
        classifications
    }
}

/// Tokenize a transcript and classify its commands with the default tools.
pub fn classify(dry_run_output: &str, conventions: &dyn FileConventions) -> Vec<Classification> {
    let parsed = super::command_line::parse(dry_run_output, conventions);
    CommandClassifier::new().classify(&parsed.commands, conventions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ndkbuild::conventions::{PosixFileConventions, WindowsFileConventions};

    fn classify_posix(line: &str) -> Option<Classification> {
        let parsed = crate::ndkbuild::command_line::parse(line, &PosixFileConventions);
        CommandClassifier::new().classify_one(&parsed.commands[0], &PosixFileConventions)
    }

    #[test]
    fn test_compiler_names() {
        let tool = CompilerTool;
        for name in [
            "gcc",
            "g++",
            "clang",
            "clang++",
            "cc",
            "c++",
            "arm-linux-androideabi-gcc",
            "i686-linux-android-g++",
            "aarch64-linux-android21-clang",
            "gcc-4.9",
            "clang-14",
        ] {
            assert!(tool.is_match(name), "{}", name);
        }
        for name in ["mkdir", "echo", "ar", "llvm-ar", "ccache", "gccx", "clang-tidy", "cp"] {
            assert!(!tool.is_match(name), "{}", name);
        }
    }

    #[test]
    fn test_archiver_names() {
        let tool = ArchiverTool;
        for name in ["ar", "gcc-ar", "llvm-ar", "arm-linux-androideabi-ar"] {
            assert!(tool.is_match(name), "{}", name);
        }
        for name in ["tar", "car", "gcc", "ar-wrapper"] {
            assert!(!tool.is_match(name), "{}", name);
        }
    }

    #[test]
    fn test_classify_compile() {
        let c = classify_posix(
            "/ndk/bin/clang -MMD -MP -MF obj/local/x86/objs/foo/a.o.d -target i686-none-linux-android16 -Ijni -c jni/a.c -o obj/local/x86/objs/foo/a.o",
        )
        .unwrap();
        assert_eq!(c.kind, StepKind::Compile);
        assert_eq!(c.inputs, vec!["jni/a.c"]);
        assert_eq!(c.outputs, vec!["obj/local/x86/objs/foo/a.o"]);
        assert!(c.inputs_are_source_files());
        assert_eq!(c.command.executable, "/ndk/bin/clang");
    }

    #[test]
    fn test_classify_compile_default_output() {
        let c = classify_posix("gcc -c src/main.c").unwrap();
        assert_eq!(c.outputs, vec!["main.o"]);
    }

    #[test]
    fn test_classify_compile_joined_output() {
        let c = classify_posix("gcc -c a.c -oout/a.o").unwrap();
        assert_eq!(c.outputs, vec!["out/a.o"]);
    }

    #[test]
    fn test_classify_compile_with_several_inputs_is_dropped() {
        assert!(classify_posix("gcc -c a.c b.c").is_none());
    }

    #[test]
    fn test_classify_preprocess_only_is_dropped() {
        assert!(classify_posix("clang -E a.c -o a.i").is_none());
        assert!(classify_posix("clang -M a.c").is_none());
    }

    #[test]
    fn test_classify_link() {
        let c = classify_posix(
            "clang++ -Wl,-soname,libfoo.so -shared --sysroot /ndk/sysroot obj/a.o obj/b.o obj/libutil.a -lgcc -llog -o obj/local/x86/libfoo.so",
        )
        .unwrap();
        assert_eq!(c.kind, StepKind::Link);
        assert_eq!(c.inputs, vec!["obj/a.o", "obj/b.o", "obj/libutil.a"]);
        assert_eq!(c.outputs, vec!["obj/local/x86/libfoo.so"]);
        assert!(!c.inputs_are_source_files());
    }

    #[test]
    fn test_classify_link_without_output_is_dropped() {
        assert!(classify_posix("clang a.o b.o").is_none());
        assert!(classify_posix("clang --version").is_none());
    }

    #[test]
    fn test_classify_archive() {
        let c = classify_posix(
            "/ndk/bin/llvm-ar crsD obj/local/x86/libutil.a obj/u1.o obj/u2.o",
        )
        .unwrap();
        assert_eq!(c.kind, StepKind::Archive);
        assert_eq!(c.outputs, vec!["obj/local/x86/libutil.a"]);
        assert_eq!(c.inputs, vec!["obj/u1.o", "obj/u2.o"]);

        let c = classify_posix("gcc-ar --plugin /x/liblto.so -rcs lib.a a.o").unwrap();
        assert_eq!(c.outputs, vec!["lib.a"]);
        assert_eq!(c.inputs, vec!["a.o"]);
    }

    #[test]
    fn test_classify_archive_non_insert_operations_are_dropped() {
        assert!(classify_posix("ar t lib.a").is_none());
        assert!(classify_posix("ar x lib.a a.o").is_none());
        assert!(classify_posix("ar rcs lib.a").is_none());
    }

    #[test]
    fn test_unrecognized_commands_are_dropped() {
        assert!(classify_posix("mkdir -p obj/local/x86").is_none());
        assert!(classify_posix("echo \"[x86] Compile: foo <= a.c\"").is_none());
        assert!(classify_posix("rm -f obj/local/x86/libfoo.so").is_none());
    }

    #[test]
    fn test_compiler_wrapper() {
        let c = classify_posix("ccache /ndk/clang -c a.c -o a.o").unwrap();
        assert_eq!(c.command.executable, "/ndk/clang");
        assert_eq!(c.command.escaped_flags, vec!["-c", "a.c", "-o", "a.o"]);
        assert_eq!(c.command.raw_flags.len(), c.command.escaped_flags.len());
    }

    #[test]
    fn test_windows_executable_suffix() {
        let conv = WindowsFileConventions;
        assert_eq!(executable_basename(r"C:\ndk\bin\clang++.exe", &conv), "clang++");
        assert_eq!(executable_basename(r"C:\ndk\bin\AR.EXE", &conv), "ar");
        let parsed = crate::ndkbuild::command_line::parse(
            r#"C:\ndk\bin\clang.exe -c "jni\a b.c" -o obj\a.o"#,
            &conv,
        );
        let c = CommandClassifier::new()
            .classify_one(&parsed.commands[0], &conv)
            .unwrap();
        assert_eq!(c.inputs, vec![r"jni\a b.c"]);
    }

    #[test]
    fn test_windows_executable_names_ignore_case() {
        let conv = WindowsFileConventions;
        let steps = classify(
            "C:\\NDK\\BIN\\CLANG.EXE -c jni\\a.c -o obj\\local\\x86\\a.o\n\
             C:\\NDK\\BIN\\CLANG.EXE -shared -o obj\\local\\x86\\liba.so obj\\local\\x86\\a.o\n\
             C:\\NDK\\BIN\\LLVM-AR.EXE rcs obj\\local\\x86\\libb.a obj\\local\\x86\\a.o\n",
            &conv,
        );
        let kinds: Vec<_> = steps.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![StepKind::Compile, StepKind::Link, StepKind::Archive]);
        assert_eq!(steps[0].command.executable, r"C:\NDK\BIN\CLANG.EXE");

        // POSIX names stay case-sensitive.
        assert_eq!(executable_basename("/ndk/CLANG", &PosixFileConventions), "CLANG");
        assert!(classify_posix("/ndk/CLANG -c a.c -o a.o").is_none());
    }

    #[test]
    fn test_classify_transcript() {
        let steps = classify(
            "mkdir -p obj\nclang -c a.c -o a.o\nclang -o libfoo.so a.o\n",
            &PosixFileConventions,
        );
        let kinds: Vec<_> = steps.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![StepKind::Compile, StepKind::Link]);
    }
}
