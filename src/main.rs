//! sig-prune-contact - Export a Signal conversation, then optionally delete it.
//!
//! The export is written first and sealed with a manifest; deletion is only
//! ever attempted against a directory that holds one.
//!
//!   sig-prune-contact                                # interactive selection
//!   sig-prune-contact -c +15551234567 -f json,md     # export only
//!   sig-prune-contact -c +15551234567 --delete       # export, then delete
//!   sig-prune-contact -c <uuid> --delete --dry-run   # preview everything

mod application;
mod cli;
mod domain;
mod infrastructure;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{Outcome, Workflow};
use cli::Cli;
use domain::{CancelFlag, Terminal};
use infrastructure::{
    build_run_config, install_interrupt_handler, load_config, SignalCli, StdTerminal,
    StructuredLogger,
};

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    std::process::exit(run(&cli).exit_code());
}

/// Main application logic.
fn run(cli: &Cli) -> Outcome {
    let file_config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return fail(&e),
    };

    let config = match build_run_config(cli, &file_config) {
        Ok(config) => config,
        Err(e) => return fail(&e),
    };

    let log = match config.log_file.as_deref() {
        Some(path) => match StructuredLogger::with_file(path) {
            Ok(log) => log,
            Err(e) => return fail(&e),
        },
        None => StructuredLogger::new(),
    };

    let cancel = CancelFlag::new();
    if let Err(e) = install_interrupt_handler(cancel.clone()) {
        log.warning(format!("Ctrl-C will end the run immediately: {e}"));
    }

    let terminal = StdTerminal::new(cancel.clone());
    terminal.show(&banner());

    let source = SignalCli::new(&file_config.signal).with_cancel(cancel.clone());
    let outcome = Workflow::new(config, &source, &terminal, &log)
        .with_cancel(cancel)
        .run();

    match outcome {
        Outcome::Success => {}
        Outcome::ExportFailed => eprintln!("{} export did not complete", "Error:".red().bold()),
        Outcome::DeletionFailed => eprintln!(
            "{} export complete, but the deletion failed (see deletion_log.json)",
            "Error:".red().bold()
        ),
    }

    outcome
}

fn fail(error: &domain::AppError) -> Outcome {
    eprintln!("{} {}", "Error:".red().bold(), error);
    Outcome::ExportFailed
}

fn banner() -> String {
    format!(
        "{} {}\n{}",
        "sig-prune-contact".bold(),
        env!("CARGO_PKG_VERSION").dimmed(),
        "Export first, delete second.".dimmed()
    )
}

/// Setup logging based on verbosity flag.
fn setup_logging(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
