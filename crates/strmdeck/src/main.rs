mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::path::Path;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use strmdeck_core::Session;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity; the guard flushes the log file
    let guard = init_tracing(cli.global.verbose, cli.global.log_file.as_deref());

    // Dispatch and handle errors with proper exit codes
    let result = run(cli).await;
    drop(guard);
    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let (file_layer, guard) = match log_dir.map(open_log_file) {
        Some(Ok(appender)) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        Some(Err(e)) => {
            eprintln!("warning: file logging disabled: {e}");
            (None, None)
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    guard
}

fn open_log_file(dir: &Path) -> Result<RollingFileAppender, tracing_appender::rolling::InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("strmdeck")
        .filename_suffix("log")
        .build(dir)
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a service connection
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "strmdeck", &mut std::io::stdout());
            Ok(())
        }

        // All other commands talk to the service through a session
        cmd => {
            let session_config = config::resolve_session_config(&cli.global)?;
            let server = session_config.server.to_string();
            let session = Session::new(session_config)?;

            // `watch` prints the feed live; one-shot commands report it after
            let live = matches!(cmd, Command::Watch);
            let mut feed = session.notifier().subscribe();

            tracing::debug!(command = ?cmd, "dispatching command");
            let result = commands::dispatch(cmd, &session, &cli.global).await;
            session.shutdown().await;

            if !live {
                commands::flush_notifications(&mut feed, &cli.global, result.is_err());
            }
            result.map_err(|e| e.at_url(&server))
        }
    }
}
