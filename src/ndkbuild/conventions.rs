//! Host shell and file-path conventions.
//!
//! `ndk-build -n` prints commands the way the host shell would run them, so
//! quoting, line continuation and path syntax all depend on whether the build
//! ran under a POSIX shell or under `cmd.exe`. Everything downstream compares
//! flags and paths as strings, which means these rules have to match the host
//! exactly.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which host shell produced a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostShell {
    /// bash, sh, zsh (Linux and macOS hosts)
    Posix,
    /// cmd.exe
    Windows,
}

impl HostShell {
    /// The shell of the machine this process runs on.
    pub fn current() -> Self {
        if cfg!(windows) {
            HostShell::Windows
        } else {
            HostShell::Posix
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HostShell::Posix => "posix",
            HostShell::Windows => "windows",
        }
    }

    /// Create the conventions implementation for this shell.
    pub fn conventions(&self) -> Box<dyn FileConventions> {
        match self {
            HostShell::Posix => Box::new(PosixFileConventions),
            HostShell::Windows => Box::new(WindowsFileConventions),
        }
    }
}

impl Default for HostShell {
    fn default() -> Self {
        HostShell::current()
    }
}

impl fmt::Display for HostShell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HostShell {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "posix" | "bash" | "sh" | "unix" => Ok(HostShell::Posix),
            "windows" | "cmd" | "win" => Ok(HostShell::Windows),
            _ => Err(format!(
                "invalid shell '{}'; expected 'posix' or 'windows'",
                s
            )),
        }
    }
}

/// One shell word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The word as the program receives it (quotes and escapes removed).
    pub escaped: String,
    /// The word exactly as it appears in the transcript.
    pub raw: String,
    /// Byte offset of the word within its logical line.
    pub offset: usize,
}

/// A transcript line with continuations already joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// 1-based number of the first physical line.
    pub number: usize,
    pub text: String,
}

/// A line that could not be split into words.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("unterminated {quote} quote")]
    UnterminatedQuote { quote: char, offset: usize },

    #[error("dangling `{escape}` escape at end of line")]
    DanglingEscape { escape: char, offset: usize },
}

impl TokenizeError {
    /// Byte offset within the logical line where the problem starts.
    pub fn offset(&self) -> usize {
        match self {
            TokenizeError::UnterminatedQuote { offset, .. } => *offset,
            TokenizeError::DanglingEscape { offset, .. } => *offset,
        }
    }
}

/// Quoting and path rules of a host.
///
/// Path helpers operate on strings rather than [`Path`] because transcripts
/// from one host may be interpreted on another.
pub trait FileConventions: fmt::Debug {
    /// Which shell these conventions describe.
    fn shell(&self) -> HostShell;

    /// Character that, at the end of a physical line, continues the command
    /// on the next line.
    fn continuation_char(&self) -> char;

    /// Split one logical line into commands, each a list of words.
    ///
    /// Commands are separated by unquoted control operators.
    fn tokenize_line(&self, line: &str) -> Result<Vec<Vec<Token>>, TokenizeError>;

    /// Whether `c` separates path components.
    fn is_separator(&self, c: char) -> bool;

    /// Whether `path` is absolute on this host.
    fn is_path_absolute(&self, path: &str) -> bool;

    /// Join physical lines that end in the continuation character.
    fn logical_lines(&self, transcript: &str) -> Vec<LogicalLine> {
        let continuation = self.continuation_char();
        let mut lines = Vec::new();
        let mut pending: Option<LogicalLine> = None;

        for (index, physical) in transcript.lines().enumerate() {
            let trailing = physical
                .chars()
                .rev()
                .take_while(|&c| c == continuation)
                .count();
            let continues = trailing % 2 == 1;
            let content = if continues {
                &physical[..physical.len() - continuation.len_utf8()]
            } else {
                physical
            };

            let line = pending.get_or_insert_with(|| LogicalLine {
                number: index + 1,
                text: String::new(),
            });
            line.text.push_str(content);

            if !continues {
                lines.extend(pending.take());
            }
        }

        // A continuation on the last line has nothing left to join.
        lines.extend(pending);
        lines
    }

    /// Last component of `path`.
    fn file_name<'a>(&self, path: &'a str) -> &'a str {
        match path.rfind(|c| self.is_separator(c)) {
            Some(idx) => &path[idx + 1..],
            None => path,
        }
    }

    /// Everything before the last component of `path`, or `""` if there is
    /// no separator.
    fn file_parent<'a>(&self, path: &'a str) -> &'a str {
        match path.rfind(|c| self.is_separator(c)) {
            Some(0) => &path[..1],
            Some(idx) => &path[..idx],
            None => "",
        }
    }

    /// Extension of the last component of `path`, without the dot.
    fn file_extension<'a>(&self, path: &'a str) -> &'a str {
        let name = self.file_name(path);
        match name.rfind('.') {
            Some(0) | None => "",
            Some(idx) => &name[idx + 1..],
        }
    }

    fn to_path(&self, path: &str) -> PathBuf {
        PathBuf::from(path)
    }

    /// Resolve `path` against `base` unless it is already absolute.
    fn resolve(&self, base: &Path, path: &str) -> PathBuf {
        if self.is_path_absolute(path) {
            self.to_path(path)
        } else {
            base.join(path)
        }
    }
}

/// Conventions of bash-like shells.
#[derive(Debug, Clone, Copy, Default)]
pub struct PosixFileConventions;

/// Conventions of `cmd.exe`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsFileConventions;

/// Accumulates words and commands while a line is scanned.
struct Splitter<'a> {
    line: &'a str,
    commands: Vec<Vec<Token>>,
    current: Vec<Token>,
    word: String,
    word_start: Option<usize>,
}

impl<'a> Splitter<'a> {
    fn new(line: &'a str) -> Self {
        Splitter {
            line,
            commands: Vec::new(),
            current: Vec::new(),
            word: String::new(),
            word_start: None,
        }
    }

    fn start_word(&mut self, offset: usize) {
        if self.word_start.is_none() {
            self.word_start = Some(offset);
        }
    }

    fn push(&mut self, offset: usize, c: char) {
        self.start_word(offset);
        self.word.push(c);
    }

    fn in_word(&self) -> bool {
        self.word_start.is_some()
    }

    /// `>&` and `<&` are redirections, not control operators.
    fn after_redirect(&self) -> bool {
        self.in_word() && (self.word.ends_with('>') || self.word.ends_with('<'))
    }

    fn end_word(&mut self, end: usize) {
        if let Some(start) = self.word_start.take() {
            self.current.push(Token {
                escaped: std::mem::take(&mut self.word),
                raw: self.line[start..end].to_string(),
                offset: start,
            });
        }
    }

    fn end_command(&mut self, end: usize) {
        self.end_word(end);
        if !self.current.is_empty() {
            self.commands.push(std::mem::take(&mut self.current));
        }
    }

    fn finish(mut self) -> Vec<Vec<Token>> {
        let end = self.line.len();
        self.end_command(end);
        self.commands
    }
}

impl FileConventions for PosixFileConventions {
    fn shell(&self) -> HostShell {
        HostShell::Posix
    }

    fn continuation_char(&self) -> char {
        '\\'
    }

    fn tokenize_line(&self, line: &str) -> Result<Vec<Vec<Token>>, TokenizeError> {
        let mut splitter = Splitter::new(line);
        let mut chars = line.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            match c {
                c if c.is_whitespace() => splitter.end_word(offset),
                '\'' => {
                    splitter.start_word(offset);
                    loop {
                        match chars.next() {
                            Some((_, '\'')) => break,
                            Some((_, inner)) => splitter.word.push(inner),
                            None => {
                                return Err(TokenizeError::UnterminatedQuote {
                                    quote: '\'',
                                    offset,
                                })
                            }
                        }
                    }
                }
                '"' => {
                    splitter.start_word(offset);
                    loop {
                        match chars.next() {
                            Some((_, '"')) => break,
                            Some((_, '\\')) => match chars.peek() {
                                Some(&(_, next)) if matches!(next, '"' | '\\' | '$' | '`') => {
                                    splitter.word.push(next);
                                    chars.next();
                                }
                                _ => splitter.word.push('\\'),
                            },
                            Some((_, inner)) => splitter.word.push(inner),
                            None => {
                                return Err(TokenizeError::UnterminatedQuote {
                                    quote: '"',
                                    offset,
                                })
                            }
                        }
                    }
                }
                '\\' => match chars.next() {
                    Some((_, next)) => splitter.push(offset, next),
                    None => {
                        return Err(TokenizeError::DanglingEscape {
                            escape: '\\',
                            offset,
                        })
                    }
                },
                '#' if !splitter.in_word() => break,
                '&' if splitter.after_redirect() => splitter.push(offset, c),
                ';' | '&' | '|' => {
                    splitter.end_command(offset);
                    if let Some(&(_, next)) = chars.peek() {
                        if next == c && c != ';' {
                            chars.next();
                        }
                    }
                }
                _ => splitter.push(offset, c),
            }
        }

        Ok(splitter.finish())
    }

    fn is_separator(&self, c: char) -> bool {
        c == '/'
    }

    fn is_path_absolute(&self, path: &str) -> bool {
        path.starts_with('/')
    }
}

impl FileConventions for WindowsFileConventions {
    fn shell(&self) -> HostShell {
        HostShell::Windows
    }

    fn continuation_char(&self) -> char {
        '^'
    }

    fn tokenize_line(&self, line: &str) -> Result<Vec<Vec<Token>>, TokenizeError> {
        let mut splitter = Splitter::new(line);
        let mut chars = line.char_indices().peekable();
        let mut quote_start: Option<usize> = None;

        while let Some((offset, c)) = chars.next() {
            if quote_start.is_some() {
                match c {
                    '"' => {
                        if let Some(&(_, '"')) = chars.peek() {
                            splitter.word.push('"');
                            chars.next();
                        } else {
                            quote_start = None;
                        }
                    }
                    '\\' => {
                        if let Some(&(_, '"')) = chars.peek() {
                            splitter.word.push('"');
                            chars.next();
                        } else {
                            splitter.word.push('\\');
                        }
                    }
                    _ => splitter.word.push(c),
                }
                continue;
            }

            match c {
                c if c.is_whitespace() => splitter.end_word(offset),
                '"' => {
                    splitter.start_word(offset);
                    quote_start = Some(offset);
                }
                '\\' => {
                    if let Some(&(_, '"')) = chars.peek() {
                        splitter.push(offset, '"');
                        chars.next();
                    } else {
                        splitter.push(offset, '\\');
                    }
                }
                '^' => match chars.next() {
                    Some((_, next)) => splitter.push(offset, next),
                    None => {
                        return Err(TokenizeError::DanglingEscape {
                            escape: '^',
                            offset,
                        })
                    }
                },
                '&' if splitter.after_redirect() => splitter.push(offset, c),
                '&' | '|' => {
                    splitter.end_command(offset);
                    if let Some(&(_, next)) = chars.peek() {
                        if next == c {
                            chars.next();
                        }
                    }
                }
                _ => splitter.push(offset, c),
            }
        }

        if let Some(offset) = quote_start {
            return Err(TokenizeError::UnterminatedQuote { quote: '"', offset });
        }

        Ok(splitter.finish())
    }

    fn is_separator(&self, c: char) -> bool {
        c == '\\' || c == '/'
    }

    fn is_path_absolute(&self, path: &str) -> bool {
        let bytes = path.as_bytes();
        if bytes.len() >= 2
            && self.is_separator(bytes[0] as char)
            && self.is_separator(bytes[1] as char)
        {
            // UNC path
            return true;
        }
        bytes.len() >= 3
            && bytes[0].is_ascii_alphabetic()
            && bytes[1] == b':'
            && self.is_separator(bytes[2] as char)
    }
}
