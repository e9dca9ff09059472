//! `ndkscan compile-commands` command

use std::sync::Arc;

use anyhow::Result;

use crate::cli::CompileCommandsArgs;
use ndkscan::ops::{compile_commands_json, write_compile_commands_json};
use ndkscan::util::shell::Status;
use ndkscan::util::Shell;

pub fn execute(args: CompileCommandsArgs, shell: &Arc<Shell>) -> Result<()> {
    let _span = shell.span(Status::Decoding, args.bin.display());
    match &args.output {
        Some(output) => {
            let count = write_compile_commands_json(&args.bin, output)?;
            shell.status(
                Status::Wrote,
                format!("{} entries to {}", count, output.display()),
            );
        }
        None => println!("{}", compile_commands_json(&args.bin)?),
    }
    Ok(())
}
