//! High-level operations.
//!
//! This module contains the implementation of ndkscan commands.

pub mod classify;
pub mod compile_commands;
pub mod generate;

pub use classify::{classify_transcript, format_report, ClassifyOptions, ClassifyReport};
pub use compile_commands::{
    compile_commands_json, decode_compile_commands, write_compile_commands_json,
    CompileCommandEntry,
};
pub use generate::{default_compile_commands_path, generate_model, GenerateOptions, GenerateResult};
