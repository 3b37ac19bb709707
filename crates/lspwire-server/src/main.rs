//! lspwire entry point.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use lspwire_core::{EventLog, TracingConfig, TracingOutputFormat, init_tracing};
use lspwire_server::{Cli, ServerConfig, ServerResult, Session};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    };
    let tracing_config = if cli.json_logs {
        tracing_config.with_format(TracingOutputFormat::Json)
    } else {
        tracing_config
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "lspwire stopped");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> ServerResult<()> {
    let config = match &cli.config {
        Some(path) => ServerConfig::load_from(path)?,
        None => ServerConfig::load()?,
    };
    let config = cli.apply(config);
    config.validate()?;

    let stdin = io::stdin().lock();
    let stdout = io::stdout().lock();
    let mut session = Session::new(stdin, stdout, config.clone());

    if let Some(dir) = &config.log_dir {
        let log = EventLog::create(dir)?;
        info!(path = %log.path().display(), "Writing event log");
        session = session.with_event_log(log);
    }

    session.run()?;
    Ok(())
}
