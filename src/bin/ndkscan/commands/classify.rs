//! `ndkscan classify` command

use std::sync::Arc;

use anyhow::Result;

use crate::cli::ClassifyArgs;
use ndkscan::ops::{classify_transcript, format_report, ClassifyOptions};
use ndkscan::util::config::load_for_project;
use ndkscan::util::diagnostic::{emit, emit_report, suggestions, Diagnostic};
use ndkscan::util::shell::Status;
use ndkscan::util::Shell;

pub fn execute(args: ClassifyArgs, shell: &Arc<Shell>) -> Result<()> {
    let host_shell = match args.shell {
        Some(host_shell) => host_shell,
        None => {
            let cwd = std::env::current_dir()?;
            load_for_project(&cwd).shell().unwrap_or_default()
        }
    };

    let span = shell.span(Status::Classifying, args.dry_run.display());
    let report = classify_transcript(&ClassifyOptions {
        dry_run: args.dry_run.clone(),
        shell: host_shell,
    })?;
    drop(span);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if !shell.is_quiet() {
        for skipped in &report.skipped {
            emit_report(skipped, shell.use_color());
        }
    }
    if !report.skipped.is_empty() {
        shell.status(
            Status::Skipped,
            format!("{} lines of {}", report.skipped.len(), args.dry_run.display()),
        );
    }

    print!("{}", format_report(&report, shell.is_verbose()));

    if report.steps.is_empty() && !shell.is_quiet() {
        let diag = Diagnostic::warning("no build steps recognized")
            .with_location(&args.dry_run)
            .with_suggestion(suggestions::NO_BUILD_STEPS)
            .with_suggestion(suggestions::WRONG_SHELL);
        emit(&diag, shell.use_color());
    }

    Ok(())
}
