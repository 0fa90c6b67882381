//! Command handler modules for the CLI.

mod check;
mod completions;
mod info;
mod parse;
mod run;
mod sensors;
mod show;
mod watch;

use mitrastat_core::config::AppSettings;

use crate::cli::Commands;
use crate::error::CliError;

/// Dispatch a CLI command to the appropriate handler.
///
/// `settings` is only required by commands that talk to the router or
/// build the sensor catalog, so a broken config file does not block
/// `parse` or `completions`.
pub fn dispatch(settings: Result<AppSettings, CliError>, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Show { format } => show::cmd_show(&settings?, format),
        Commands::Watch { count, interval } => watch::cmd_watch(&settings?, count, interval),
        Commands::Run { publisher } => run::cmd_run(&settings?, publisher),
        Commands::Check => check::cmd_check(&settings?),
        Commands::Info { format } => info::cmd_info(&settings?, format),
        Commands::Parse { kind, file, format } => parse::cmd_parse(kind, &file, format),
        Commands::Sensors { format } => sensors::cmd_sensors(&settings?, format),
        Commands::Completions { shell } => completions::cmd_completions(shell),
    }
}
