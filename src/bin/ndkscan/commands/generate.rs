//! `ndkscan generate` command

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::GenerateArgs;
use ndkscan::ndkbuild::HostShell;
use ndkscan::ops::generate::split_command_line;
use ndkscan::ops::{default_compile_commands_path, generate_model, GenerateOptions};
use ndkscan::util::config::load_for_project;
use ndkscan::util::diagnostic::emit_report;
use ndkscan::util::shell::Status;
use ndkscan::util::Shell;

pub fn execute(args: GenerateArgs, shell: &Arc<Shell>) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let config = load_for_project(&cwd);

    // Flags beat project config, which beats global config
    let host_shell = args.shell.or_else(|| config.shell()).unwrap_or_default();
    let variant = args
        .variant
        .or_else(|| config.model.variant.clone())
        .unwrap_or_else(|| "debug".to_string());
    let build_command = match &args.build_command {
        Some(line) => split_command_line(line, HostShell::current())?,
        None => config.ndk_build.build_command(),
    };
    let clean_command = match &args.clean_command {
        Some(line) => split_command_line(line, HostShell::current())?,
        None => config.ndk_build.clean_command(),
    };
    let compile_commands_bin = args.compile_commands_bin.or_else(|| {
        if config.model.emit_compile_commands_bin {
            args.output.as_deref().map(default_compile_commands_path)
        } else {
            None
        }
    });

    let opts = GenerateOptions {
        dry_run: args.dry_run,
        android_mk: args.android_mk,
        variant,
        execution_root: args.execution_root.unwrap_or(cwd),
        build_command,
        clean_command,
        shell: host_shell,
        skip_compiler_flags: args.skip_compiler_flags || config.model.skip_compiler_flags,
        compile_commands_bin,
        output: args.output,
    };

    let span = shell.span(
        Status::Generating,
        format!("{} model from {}", opts.variant, opts.dry_run.display()),
    );
    let result = generate_model(&opts)?;

    if !shell.is_quiet() {
        for skipped in &result.skipped {
            emit_report(skipped, shell.use_color());
        }
    }
    if !result.skipped.is_empty() {
        shell.status(
            Status::Skipped,
            format!("{} lines of {}", result.skipped.len(), opts.dry_run.display()),
        );
    }
    if result.config.libraries.is_empty() {
        shell.warn(format!(
            "no native libraries found in {}",
            opts.dry_run.display()
        ));
    }

    match &result.written {
        Some(path) => {
            if let Some(bin) = &opts.compile_commands_bin {
                shell.status(Status::Wrote, bin.display());
            }
            span.finish_with_message(format!(
                "{} libraries, {} sources -> {}",
                result.config.libraries.len(),
                result.config.source_file_count(),
                path.display()
            ));
        }
        None => {
            drop(span);
            println!("{}", result.config.to_json()?);
        }
    }

    Ok(())
}
