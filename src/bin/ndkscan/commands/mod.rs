//! Command implementations

pub mod classify;
pub mod compile_commands;
pub mod completions;
pub mod generate;
