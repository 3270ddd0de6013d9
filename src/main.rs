mod cli;

use clap::Parser;
use cli::{handle_config_action, list_displays, Args, Command};
use tapmeter::config::Config;
use tapmeter::exit_code;
use tracing_subscriber::EnvFilter;

fn main() {
    // Parse CLI arguments first so --verbose can set the log level
    let args = Args::parse();

    // Logs go to stderr; stdout carries records
    let default_level = if args.verbose {
        "tapmeter=debug"
    } else {
        "tapmeter=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let command = match args.command {
        Some(Command::Config { action }) => {
            handle_config_action(action, args.config.as_deref());
            return;
        }
        other => other,
    };

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(exit_code::CONFIG_INVALID);
        }
    };

    match command {
        Some(Command::Displays) => list_displays(&config),
        Some(Command::Run { output, capacity }) => cli::run(config, output, capacity),
        _ => cli::run(config, None, None),
    }
}
