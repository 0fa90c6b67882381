//! `mitrastat` CLI - polls a Mitrastar GPT-2541GNAC router over SSH
//!
//! Provides one-shot inspection (`show`, `info`, `check`), a rate monitor
//! (`watch`), offline parsing of captured output (`parse`) and the
//! long-running sensor bridge (`run`).

mod cli;
mod commands;
mod error;
mod util;

use clap::Parser;
use cli::Cli;
use mitrastat_core::config::AppSettings;
use mitrastat_core::tracing::{TracingConfig, TracingLevel, init_tracing};

fn main() {
    let cli = Cli::parse();
    let settings = util::load_settings(cli.config.as_deref(), cli.password.as_deref());

    init_logging(&cli, settings.as_ref().ok());

    let result = commands::dispatch(settings, cli.command);

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e}");
        }
        std::process::exit(e.exit_code());
    }
}

/// Installs the log subscriber from `[logging]`, `-v` and `-q`
fn init_logging(cli: &Cli, settings: Option<&AppSettings>) {
    let mut config = settings
        .map_or_else(TracingConfig::new, |s| TracingConfig::from_settings(&s.logging))
        .with_verbosity(cli.verbose);
    if cli.quiet {
        config = config.with_level(TracingLevel::Error);
        config.filter = None;
    }

    if let Err(e) = init_tracing(&config) {
        eprintln!("Warning: logging disabled: {e}");
    }
}
