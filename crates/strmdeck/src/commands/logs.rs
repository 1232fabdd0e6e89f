//! Log command handlers.

use tabled::Tabled;

use strmdeck_core::{LogEntry, LogQuery, Session};

use crate::cli::{GlobalOpts, LogsArgs, LogsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct LogRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "Message")]
    message: String,
}

impl LogRow {
    fn new(entry: &LogEntry, color: bool) -> Self {
        Self {
            time: entry.timestamp.clone().unwrap_or_default(),
            level: output::paint_level(&entry.level, color),
            message: entry.message.clone(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &Session,
    args: LogsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        LogsCommand::Show { level, limit } => {
            if limit == 0 {
                return Err(CliError::Validation {
                    field: "limit".into(),
                    reason: "must be at least 1".into(),
                });
            }
            let query = LogQuery {
                level,
                limit: Some(limit),
            };
            let entries = session.fetch_logs(&query).await?;

            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                &entries,
                |e| LogRow::new(e, color),
                |e| e.message.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        LogsCommand::Clear => {
            if !util::confirm("Clear the service's log history?", "logs clear", global.yes)? {
                return Ok(());
            }
            session.clear_logs().await?;
            Ok(())
        }
    }
}
