//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Measures how you use your keyboard and mouse, in physical units
#[derive(Parser, Debug)]
#[command(name = "tapmeter")]
#[command(version, about = "Keyboard and mouse usage meter", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG overrides this)
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Listen for input and write records (the default)
    Run {
        /// Write JSON lines to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Maximum number of samples per mouse-move stroke
        #[arg(long, value_parser = parse_capacity)]
        capacity: Option<usize>,
    },
    /// List the displays tapmeter can see
    Displays,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

/// Parse and validate stroke capacity (at least 1)
fn parse_capacity(s: &str) -> Result<usize, String> {
    let capacity: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid capacity", s))?;
    if capacity == 0 {
        return Err("Capacity must be at least 1".to_string());
    }
    Ok(capacity)
}
