//! ndkscan CLI - ndk-build dry-run interpreter

use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ndkscan::ndkbuild::{CompileCommandsError, NdkBuildError};
use ndkscan::util::diagnostic::emit;
use ndkscan::util::shell::ColorChoice;
use ndkscan::util::Shell;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli) {
        report_error(&e, color);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("ndkscan=debug")
    } else {
        EnvFilter::new("ndkscan=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let color = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    let json = matches!(&cli.command, Commands::Classify(args) if args.json);
    let shell = Arc::new(Shell::from_flags(cli.quiet, cli.verbose, color, json));

    match cli.command {
        Commands::Generate(args) => commands::generate::execute(args, &shell),
        Commands::Classify(args) => commands::classify::execute(args, &shell),
        Commands::CompileCommands(args) => commands::compile_commands::execute(args, &shell),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

/// Print `e`, with suggestions when it is a known failure.
fn report_error(e: &anyhow::Error, color: bool) {
    if let Some(err) = e.downcast_ref::<NdkBuildError>() {
        emit(&err.to_diagnostic(), color);
    } else if let Some(err) = e.downcast_ref::<CompileCommandsError>() {
        emit(&err.to_diagnostic(), color);
    } else {
        eprintln!("error: {:#}", e);
    }
}
