//! lexicheck - CLI entry point

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ConfigCommands};

/// Environment variable overriding the log filter.
const LOG_ENV: &str = "LEXICHECK_LOG";

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(format!("lexicheck={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(not(tarpaulin_include))]
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    tracing::debug!("lexicheck v{} starting", env!("CARGO_PKG_VERSION"));

    let verbose = cli.verbose > 0;
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Check(args) => {
            let config = commands::load_config(config_path)?;
            commands::check::handle_check(&args, config, cli.json, verbose)
        }
        Commands::Errors(args) => {
            let config = commands::load_config(config_path)?;
            commands::check::handle_errors(&args, config, cli.json, verbose)
        }
        Commands::Tone(args) => {
            let config = commands::load_config(config_path)?;
            commands::check::handle_tone(&args, config, cli.json, verbose)
        }
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::handle_show(config_path),
            ConfigCommands::Path => commands::config::handle_path(config_path),
            ConfigCommands::Reset => commands::config::handle_reset(config_path),
        },
        Commands::Completions { shell } => commands::completions::handle::<Cli>(shell),
    }
}
