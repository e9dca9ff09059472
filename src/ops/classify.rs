//! Implementation of `ndkscan classify`.
//!
//! Shows what the interpreter makes of a transcript without building a
//! model: which commands were recognized as build steps and which outputs
//! are terminal.

use std::fmt::Write;
use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use crate::ndkbuild::command_line::parse_named;
use crate::ndkbuild::flow::analyze;
use crate::ndkbuild::{
    Classification, CommandClassifier, HostShell, SkippedLine, StepKind, TerminalOutput,
};
use crate::util::fs;

/// Options for classifying a transcript.
#[derive(Debug, Clone)]
pub struct ClassifyOptions {
    /// File holding the `ndk-build -n` output
    pub dry_run: PathBuf,

    /// Shell the dry run was produced under
    pub shell: HostShell,
}

/// What a transcript contains.
#[derive(Debug, Serialize)]
pub struct ClassifyReport {
    /// Number of commands in the transcript
    pub commands: usize,

    /// Recognized build steps in transcript order
    pub steps: Vec<Classification>,

    /// Terminal outputs and the sources that feed them
    pub terminals: Vec<TerminalOutput>,

    /// Line numbers of skipped lines
    pub skipped_lines: Vec<usize>,

    #[serde(skip)]
    pub skipped: Vec<SkippedLine>,
}

impl ClassifyReport {
    /// Number of steps of `kind`.
    pub fn count(&self, kind: StepKind) -> usize {
        self.steps.iter().filter(|s| s.kind == kind).count()
    }
}

/// Tokenize, classify and flow-analyze a transcript.
pub fn classify_transcript(opts: &ClassifyOptions) -> Result<ClassifyReport> {
    let transcript = fs::read_to_string(&opts.dry_run)?;
    let conventions = opts.shell.conventions();

    let parsed = parse_named(
        &opts.dry_run.display().to_string(),
        &transcript,
        conventions.as_ref(),
    );
    let steps = CommandClassifier::new().classify(&parsed.commands, conventions.as_ref());
    let terminals = analyze(&steps);

    Ok(ClassifyReport {
        commands: parsed.commands.len(),
        steps,
        terminals,
        skipped_lines: parsed.skipped.iter().map(|s| s.line).collect(),
        skipped: parsed.skipped,
    })
}

/// Format a report for terminal output.
pub fn format_report(report: &ClassifyReport, verbose: bool) -> String {
    let mut output = String::new();

    writeln!(
        output,
        "{} commands, {} build steps ({} compile, {} archive, {} link)",
        report.commands,
        report.steps.len(),
        report.count(StepKind::Compile),
        report.count(StepKind::Archive),
        report.count(StepKind::Link),
    )
    .unwrap();

    if verbose {
        writeln!(output, "\nSteps:").unwrap();
        for step in &report.steps {
            writeln!(
                output,
                "  {:<8} {} <- {}",
                step.kind.as_str(),
                step.outputs.join(", "),
                step.inputs.join(" ")
            )
            .unwrap();
        }
    }

    writeln!(output, "\nTerminal outputs:").unwrap();
    if report.terminals.is_empty() {
        writeln!(output, "  (none)").unwrap();
    }
    for terminal in &report.terminals {
        writeln!(
            output,
            "  {} ({} sources)",
            terminal.output,
            terminal.steps.len()
        )
        .unwrap();
        if verbose {
            for step in &terminal.steps {
                writeln!(output, "      {}", step.only_input).unwrap();
            }
        }
    }

    output
}
