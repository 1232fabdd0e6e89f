//! Command dispatch: bridges CLI args -> session operations -> output formatting.

pub mod config_cmd;
pub mod logs;
pub mod scrapers;
pub mod settings;
pub mod stats;
pub mod tasks;
pub mod util;
pub mod watch;

use tokio::sync::broadcast;

use strmdeck_core::{Notification, Session, Severity};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;
use crate::output;

/// Dispatch a service-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    session: &Session,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Tasks(args) => tasks::handle(session, args, global).await,
        Command::Scrapers(args) => scrapers::handle(session, args, global).await,
        Command::Settings(args) => settings::handle(session, args, global).await,
        Command::Stats => stats::handle(session, global).await,
        Command::Logs(args) => logs::handle(session, args, global).await,
        Command::Watch => watch::handle(session, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "local command reached service dispatch".into(),
        )),
    }
}

/// Print what the session reported while a one-shot command ran. When the
/// command failed, its error notification duplicates the final report and
/// is skipped.
pub fn flush_notifications(
    feed: &mut broadcast::Receiver<Notification>,
    global: &GlobalOpts,
    failed: bool,
) {
    let color = output::should_color(&global.color);
    while let Ok(note) = feed.try_recv() {
        let is_error = note.severity == Severity::Error;
        if (failed && is_error) || (global.quiet && !is_error) {
            continue;
        }
        eprintln!("{}", output::paint_severity(note.severity, &note.text, color));
    }
}
