//! Command-line interface definition.

use std::path::PathBuf;

use clap::Parser;

use crate::config::ServerConfig;

/// lspwire - JSON-RPC message codec over stdin/stdout
#[derive(Debug, Parser)]
#[command(name = "lspwire")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "LSPWIRE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for event log files
    #[arg(long, env = "LSPWIRE_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Enable debug output on stderr
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Do not write re-encoded messages to stdout
    #[arg(long)]
    pub no_echo: bool,

    /// Log a parameter tree for every message with object params
    #[arg(long)]
    pub dump_params: bool,
}

impl Cli {
    /// Applies command-line overrides on top of file configuration.
    pub fn apply(&self, mut config: ServerConfig) -> ServerConfig {
        if let Some(dir) = &self.log_dir {
            config.log_dir = Some(dir.clone());
        }
        if self.no_echo {
            config.echo = false;
        }
        if self.dump_params {
            config.dump_params = true;
        }
        config
    }
}
