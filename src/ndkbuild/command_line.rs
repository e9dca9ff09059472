//! Dry-run transcript tokenizer.
//!
//! Turns the text printed by `ndk-build -n` into one [`CommandLine`] per
//! command, in transcript order. Lines that cannot be split into words are
//! skipped and reported; they never abort the transcript.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, NamedSource, SourceSpan};
use serde::Serialize;
use thiserror::Error;

use super::conventions::{FileConventions, Token, TokenizeError};

/// One parsed shell invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CommandLine {
    /// The program, as the shell would pass it to exec.
    pub executable: String,
    /// Arguments with quoting and escapes removed.
    pub escaped_flags: Vec<String>,
    /// Arguments exactly as written. Same length and order as `escaped_flags`.
    pub raw_flags: Vec<String>,
}

impl CommandLine {
    /// Build a command line from words; `None` when there are no words.
    pub fn from_tokens(tokens: Vec<Token>) -> Option<Self> {
        let mut tokens = tokens.into_iter();
        let executable = tokens.next()?.escaped;
        let (escaped_flags, raw_flags) = tokens.map(|t| (t.escaped, t.raw)).unzip();
        Some(CommandLine {
            executable,
            escaped_flags,
            raw_flags,
        })
    }

    /// Build a command line whose raw and escaped forms are identical.
    pub fn new<I, S>(executable: impl Into<String>, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let escaped_flags: Vec<String> = flags.into_iter().map(Into::into).collect();
        CommandLine {
            executable: executable.into(),
            raw_flags: escaped_flags.clone(),
            escaped_flags,
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.executable)?;
        for flag in &self.raw_flags {
            write!(f, " {}", flag)?;
        }
        Ok(())
    }
}

/// A transcript line that was left out of the parse.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("skipped line {line}: {reason}")]
#[diagnostic(
    code(ndkscan::transcript::skipped_line),
    severity(Warning),
    help("the line is ignored; commands on it will not appear in the model")
)]
pub struct SkippedLine {
    /// 1-based line number in the transcript.
    pub line: usize,
    pub reason: TokenizeError,
    /// The logical line as it appeared in the transcript.
    pub text: String,
    #[source_code]
    pub src: NamedSource<String>,
    #[label("{reason}")]
    pub span: SourceSpan,
}

impl SkippedLine {
    fn new(name: &str, line: usize, text: &str, reason: TokenizeError) -> Self {
        let offset = reason.offset().min(text.len());
        SkippedLine {
            line,
            span: (offset, text.len() - offset).into(),
            src: NamedSource::new(format!("{}:{}", name, line), text.to_string()),
            text: text.to_string(),
            reason,
        }
    }
}

/// Result of tokenizing a transcript.
#[derive(Debug, Default)]
pub struct ParsedTranscript {
    pub commands: Vec<CommandLine>,
    pub skipped: Vec<SkippedLine>,
}

/// Tokenize a whole dry-run transcript.
pub fn parse(transcript: &str, conventions: &dyn FileConventions) -> ParsedTranscript {
    parse_named("<dry-run>", transcript, conventions)
}

/// Like [`parse`], with a name used when reporting skipped lines.
pub fn parse_named(
    name: &str,
    transcript: &str,
    conventions: &dyn FileConventions,
) -> ParsedTranscript {
    let mut parsed = ParsedTranscript::default();

    for line in conventions.logical_lines(transcript) {
        if line.text.trim().is_empty() {
            continue;
        }
        match conventions.tokenize_line(&line.text) {
            Ok(commands) => {
                parsed
                    .commands
                    .extend(commands.into_iter().filter_map(CommandLine::from_tokens));
            }
            Err(reason) => {
                tracing::debug!("skipping line {} of {}: {}", line.number, name, reason);
                parsed
                    .skipped
                    .push(SkippedLine::new(name, line.number, &line.text, reason));
            }
        }
    }

    tracing::debug!(
        "tokenized {} commands ({} lines skipped)",
        parsed.commands.len(),
        parsed.skipped.len()
    );
    parsed
}
