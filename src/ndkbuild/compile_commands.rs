//! Binary compile-commands side file.
//!
//! A compact index from each source file to the compiler invocation that
//! builds it, written while the build configuration is assembled and read
//! back by IDE tooling.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! header   MAGIC | u32 version | u64 string-table offset
//! records  0x01 context: u32 compiler | u32 working dir | u32 n | n x u32 flag
//!          0x02 file:    u32 source
//! strings  u32 count | count x (u32 len | utf-8 bytes)
//! ```
//!
//! Every string is stored once in the trailing table and referenced by id. A
//! context record is only emitted when compiler, working directory or flags
//! differ from the previous record, so files sharing a command line cost five
//! bytes each. The string-table offset is patched in when the encoder is
//! finished; a file with offset zero was never finished.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::diagnostic::Diagnostic;

/// File signature.
pub const MAGIC: &[u8] = b"C/C++ Build Metadata\0";

/// Current format version.
pub const VERSION: u32 = 1;

const TAG_CONTEXT: u8 = 0x01;
const TAG_FILE: u8 = 0x02;

const OFFSET_POSITION: u64 = (MAGIC.len() + 4) as u64;
const HEADER_LEN: usize = MAGIC.len() + 4 + 8;

/// Errors reading or writing a compile-commands file.
#[derive(Debug, Error)]
pub enum CompileCommandsError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not a compile commands file", path.display())]
    BadMagic { path: PathBuf },

    #[error("{} has unsupported format version {version}", path.display())]
    UnsupportedVersion { path: PathBuf, version: u32 },

    #[error("{} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
}

impl CompileCommandsError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> CompileCommandsError + '_ {
        move |source| CompileCommandsError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn corrupt(path: &Path, reason: impl Into<String>) -> CompileCommandsError {
        CompileCommandsError::Corrupt {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            CompileCommandsError::Io { .. } => diag,
            CompileCommandsError::BadMagic { .. }
            | CompileCommandsError::UnsupportedVersion { .. } => diag.with_suggestion(
                "Regenerate the file with `ndkscan generate --compile-commands-bin`",
            ),
            CompileCommandsError::Corrupt { .. } => diag
                .with_context("the writer may have been interrupted before the file was finished")
                .with_suggestion(
                    "Regenerate the file with `ndkscan generate --compile-commands-bin`",
                ),
        }
    }
}

/// One decoded compile command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileCommand {
    pub source_file: PathBuf,
    pub compiler: PathBuf,
    pub flags: Vec<String>,
    pub working_directory: PathBuf,
}

/// Streaming writer for the compile-commands format.
///
/// Call [`finish`](Self::finish) to observe errors from writing the string
/// table. If the encoder is dropped unfinished (an error or panic unwound past
/// it) it finishes itself and logs any failure.
#[derive(Debug)]
pub struct CompileCommandsEncoder {
    path: PathBuf,
    out: BufWriter<File>,
    strings: Vec<String>,
    ids: HashMap<String, u32>,
    context: Option<(u32, u32, Vec<u32>)>,
    records: usize,
    finished: bool,
}

impl CompileCommandsEncoder {
    /// Create (or truncate) `path` and write the header.
    pub fn create(path: &Path) -> Result<Self, CompileCommandsError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(CompileCommandsError::io(parent))?;
        }
        let file = File::create(path).map_err(CompileCommandsError::io(path))?;

        let mut encoder = CompileCommandsEncoder {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
            strings: Vec::new(),
            ids: HashMap::new(),
            context: None,
            records: 0,
            finished: false,
        };
        encoder.write_header().map_err(CompileCommandsError::io(path))?;
        Ok(encoder)
    }

    /// The file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of files recorded so far.
    pub fn len(&self) -> usize {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    /// Record that `source_file` is compiled by `compiler` with `flags` from
    /// `working_directory`.
    pub fn write_compile_command(
        &mut self,
        source_file: &Path,
        compiler: &Path,
        flags: &[String],
        working_directory: &Path,
    ) -> Result<(), CompileCommandsError> {
        let compiler = self.intern(&compiler.to_string_lossy());
        let working_directory = self.intern(&working_directory.to_string_lossy());
        let flags: Vec<u32> = flags.iter().map(|f| self.intern(f)).collect();
        let source = self.intern(&source_file.to_string_lossy());

        let context = (compiler, working_directory, flags);
        let result = self.write_records(&context, source);
        self.context = Some(context);
        self.records += 1;
        result.map_err(CompileCommandsError::io(&self.path))
    }

    /// Write the string table and header offset, then flush.
    pub fn finish(mut self) -> Result<(), CompileCommandsError> {
        self.finalize()
    }

    fn intern(&mut self, s: &str) -> u32 {
        if let Some(&id) = self.ids.get(s) {
            return id;
        }
        let id = self.strings.len() as u32;
        self.strings.push(s.to_string());
        self.ids.insert(s.to_string(), id);
        id
    }

    fn write_header(&mut self) -> io::Result<()> {
        self.out.write_all(MAGIC)?;
        self.out.write_all(&VERSION.to_le_bytes())?;
        self.out.write_all(&0u64.to_le_bytes())
    }

    fn write_records(&mut self, context: &(u32, u32, Vec<u32>), source: u32) -> io::Result<()> {
        if self.context.as_ref() != Some(context) {
            let (compiler, working_directory, flags) = context;
            self.out.write_all(&[TAG_CONTEXT])?;
            self.out.write_all(&compiler.to_le_bytes())?;
            self.out.write_all(&working_directory.to_le_bytes())?;
            self.out.write_all(&(flags.len() as u32).to_le_bytes())?;
            for flag in flags {
                self.out.write_all(&flag.to_le_bytes())?;
            }
        }
        self.out.write_all(&[TAG_FILE])?;
        self.out.write_all(&source.to_le_bytes())
    }

    fn write_string_table(&mut self) -> io::Result<()> {
        let offset = self.out.stream_position()?;
        self.out.write_all(&(self.strings.len() as u32).to_le_bytes())?;
        for s in &self.strings {
            self.out.write_all(&(s.len() as u32).to_le_bytes())?;
            self.out.write_all(s.as_bytes())?;
        }
        self.out.seek(SeekFrom::Start(OFFSET_POSITION))?;
        self.out.write_all(&offset.to_le_bytes())?;
        self.out.flush()
    }

    fn finalize(&mut self) -> Result<(), CompileCommandsError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        tracing::debug!(
            "writing {} compile commands ({} strings) to {}",
            self.records,
            self.strings.len(),
            self.path.display()
        );
        self.write_string_table()
            .map_err(CompileCommandsError::io(&self.path))
    }
}

impl Drop for CompileCommandsEncoder {
    fn drop(&mut self) {
        if let Err(e) = self.finalize() {
            tracing::warn!("failed to finish compile commands file: {}", e);
        }
    }
}

/// Bounds-checked little-endian reader.
struct Reader<'a> {
    path: &'a Path,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], CompileCommandsError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| CompileCommandsError::corrupt(self.path, "unexpected end of data"))?;
        let bytes = self.bytes;
        let slice = &bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, CompileCommandsError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, CompileCommandsError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn u64(&mut self) -> Result<u64, CompileCommandsError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }
}

fn read_string_table(
    path: &Path,
    bytes: &[u8],
    offset: usize,
) -> Result<Vec<String>, CompileCommandsError> {
    let mut reader = Reader {
        path,
        bytes,
        pos: offset,
    };
    let count = reader.u32()? as usize;
    let mut strings = Vec::with_capacity(count.min(bytes.len()));
    for _ in 0..count {
        let len = reader.u32()? as usize;
        let raw = reader.take(len)?;
        let s = std::str::from_utf8(raw)
            .map_err(|_| CompileCommandsError::corrupt(path, "string is not valid UTF-8"))?;
        strings.push(s.to_string());
    }
    Ok(strings)
}

/// Decode `path`, calling `action` once per recorded file in write order.
pub fn stream_compile_commands<F>(path: &Path, mut action: F) -> Result<(), CompileCommandsError>
where
    F: FnMut(CompileCommand),
{
    let bytes = fs::read(path).map_err(CompileCommandsError::io(path))?;
    if bytes.len() < HEADER_LEN || &bytes[..MAGIC.len()] != MAGIC {
        return Err(CompileCommandsError::BadMagic {
            path: path.to_path_buf(),
        });
    }

    let mut reader = Reader {
        path,
        bytes: &bytes,
        pos: MAGIC.len(),
    };
    let version = reader.u32()?;
    if version != VERSION {
        return Err(CompileCommandsError::UnsupportedVersion {
            path: path.to_path_buf(),
            version,
        });
    }
    let table_offset = reader.u64()? as usize;
    if table_offset < HEADER_LEN || table_offset > bytes.len() {
        return Err(CompileCommandsError::corrupt(path, "string table offset out of range"));
    }

    let strings = read_string_table(path, &bytes, table_offset)?;
    let lookup = |id: u32| -> Result<&str, CompileCommandsError> {
        strings
            .get(id as usize)
            .map(String::as_str)
            .ok_or_else(|| {
                CompileCommandsError::corrupt(path, format!("string id {} out of range", id))
            })
    };

    let mut records = Reader {
        path,
        bytes: &bytes[..table_offset],
        pos: HEADER_LEN,
    };
    let mut context: Option<(PathBuf, PathBuf, Vec<String>)> = None;

    while records.pos < table_offset {
        match records.u8()? {
            TAG_CONTEXT => {
                let compiler = PathBuf::from(lookup(records.u32()?)?);
                let working_directory = PathBuf::from(lookup(records.u32()?)?);
                let count = records.u32()?;
                let flags = (0..count)
                    .map(|_| records.u32().and_then(|id| lookup(id).map(str::to_string)))
                    .collect::<Result<Vec<_>, _>>()?;
                context = Some((compiler, working_directory, flags));
            }
            TAG_FILE => {
                let source_file = PathBuf::from(lookup(records.u32()?)?);
                let (compiler, working_directory, flags) = context.as_ref().ok_or_else(|| {
                    CompileCommandsError::corrupt(path, "file record before any context")
                })?;
                action(CompileCommand {
                    source_file,
                    compiler: compiler.clone(),
                    flags: flags.clone(),
                    working_directory: working_directory.clone(),
                });
            }
            tag => {
                return Err(CompileCommandsError::corrupt(
                    path,
                    format!("unknown record tag {:#04x}", tag),
                ))
            }
        }
    }

    Ok(())
}

/// Decode every record of `path`.
pub fn read_compile_commands(path: &Path) -> Result<Vec<CompileCommand>, CompileCommandsError> {
    let mut commands = Vec::new();
    stream_compile_commands(path, |command| commands.push(command))?;
    Ok(commands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn flags(words: &[&str]) -> Vec<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_write_and_read_back() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("compile_commands.json.bin");

        let mut encoder = CompileCommandsEncoder::create(&path).unwrap();
        let common = flags(&["-target", "x86_64-none-linux-android21", "-Ijni"]);
        encoder
            .write_compile_command(
                Path::new("jni/a.c"),
                Path::new("/ndk/clang"),
                &common,
                Path::new("/project"),
            )
            .unwrap();
        encoder
            .write_compile_command(
                Path::new("jni/b.c"),
                Path::new("/ndk/clang"),
                &common,
                Path::new("/project"),
            )
            .unwrap();
        encoder
            .write_compile_command(
                Path::new("jni/c.cpp"),
                Path::new("/ndk/clang++"),
                &flags(&["-std=c++17"]),
                Path::new("/project"),
            )
            .unwrap();
        assert_eq!(encoder.len(), 3);
        encoder.finish().unwrap();

        let commands = read_compile_commands(&path).unwrap();
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0].source_file, PathBuf::from("jni/a.c"));
        assert_eq!(commands[1].flags, common);
        assert_eq!(commands[1].compiler, PathBuf::from("/ndk/clang"));
        assert_eq!(commands[2].compiler, PathBuf::from("/ndk/clang++"));
        assert_eq!(commands[2].flags, vec!["-std=c++17"]);
        assert_eq!(commands[2].working_directory, PathBuf::from("/project"));
    }

    #[test]
    fn test_shared_context_is_written_once() {
        let tmp = TempDir::new().unwrap();
        let one = tmp.path().join("one.bin");
        let two = tmp.path().join("two.bin");
        let common = flags(&["-O2", "-fPIC", "-DLONG_DEFINE_NAME=1"]);

        let mut encoder = CompileCommandsEncoder::create(&one).unwrap();
        encoder
            .write_compile_command(Path::new("a.c"), Path::new("cc"), &common, Path::new("/w"))
            .unwrap();
        encoder.finish().unwrap();

        let mut encoder = CompileCommandsEncoder::create(&two).unwrap();
        for source in ["a.c", "b.c"] {
            encoder
                .write_compile_command(Path::new(source), Path::new("cc"), &common, Path::new("/w"))
                .unwrap();
        }
        encoder.finish().unwrap();

        let one_len = fs::metadata(&one).unwrap().len();
        let two_len = fs::metadata(&two).unwrap().len();
        // One extra file record plus the new string "b.c" in the table.
        assert_eq!(two_len - one_len, 5 + 4 + 3);
    }

    #[test]
    fn test_drop_finishes_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("dropped.bin");
        {
            let mut encoder = CompileCommandsEncoder::create(&path).unwrap();
            encoder
                .write_compile_command(Path::new("a.c"), Path::new("cc"), &[], Path::new("/w"))
                .unwrap();
        }
        let commands = read_compile_commands(&path).unwrap();
        assert_eq!(commands.len(), 1);
        assert!(commands[0].flags.is_empty());
    }

    #[test]
    fn test_empty_file_is_valid() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/dir/empty.bin");
        CompileCommandsEncoder::create(&path).unwrap().finish().unwrap();
        assert!(read_compile_commands(&path).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_bad_magic() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.bin");
        fs::write(&path, b"not a compile commands file at all").unwrap();
        let err = read_compile_commands(&path).unwrap_err();
        assert!(matches!(err, CompileCommandsError::BadMagic { .. }));
    }

    #[test]
    fn test_rejects_unknown_version() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("v9.bin");
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&9u32.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        fs::write(&path, bytes).unwrap();
        let err = read_compile_commands(&path).unwrap_err();
        assert!(matches!(err, CompileCommandsError::UnsupportedVersion { version: 9, .. }));
    }

    #[test]
    fn test_rejects_unfinished_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("unfinished.bin");
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        bytes.extend_from_slice(&[TAG_FILE, 0, 0, 0, 0]);
        fs::write(&path, bytes).unwrap();
        let err = read_compile_commands(&path).unwrap_err();
        assert!(matches!(err, CompileCommandsError::Corrupt { .. }));
        assert!(err.to_diagnostic().format(false).contains("help"));
    }

    #[test]
    fn test_rejects_truncated_string_table() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("truncated.bin");
        let mut encoder = CompileCommandsEncoder::create(&path).unwrap();
        encoder
            .write_compile_command(Path::new("a.c"), Path::new("cc"), &[], Path::new("/w"))
            .unwrap();
        encoder.finish().unwrap();

        let mut bytes = fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 2);
        fs::write(&path, bytes).unwrap();
        let err = read_compile_commands(&path).unwrap_err();
        assert!(err.to_string().contains("unexpected end of data"));
    }
}
