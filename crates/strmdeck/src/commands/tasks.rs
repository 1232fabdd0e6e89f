//! Task command handlers.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use strmdeck_core::{DataKind, NewTask, Session, Task, TaskStatus};

use crate::cli::{GlobalOpts, TasksArgs, TasksCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Progress")]
    progress: String,
    #[tabled(rename = "Files")]
    files: String,
    #[tabled(rename = "Strategy")]
    strategy: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Destination")]
    destination: String,
}

impl TaskRow {
    fn new(t: &Arc<Task>, color: bool) -> Self {
        let files = if t.failed_files > 0 {
            format!("{}/{} ({} failed)", t.processed_files, t.total_files, t.failed_files)
        } else {
            format!("{}/{}", t.processed_files, t.total_files)
        };
        Self {
            id: t.id,
            name: t.name.clone(),
            status: output::paint_status(t.status, color),
            progress: util::percent(t.progress),
            files,
            strategy: t.organize_strategy.to_string(),
            source: t.source_path.clone(),
            destination: t.destination_path.clone(),
        }
    }
}

#[derive(Serialize)]
struct Created {
    task_id: i64,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &Session,
    args: TasksArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        TasksCommand::List { status } => {
            session.load_full(DataKind::Tasks).await?;
            let status: Option<TaskStatus> = status.map(Into::into);
            let snap: Vec<Arc<Task>> = session
                .store()
                .tasks_snapshot()
                .iter()
                .filter(|t| status.is_none_or(|s| t.status == s))
                .cloned()
                .collect();

            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                &snap,
                |t| TaskRow::new(t, color),
                |t| t.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        TasksCommand::Create {
            name,
            source,
            destination,
            strategy,
        } => {
            let task = NewTask {
                name,
                source_path: source,
                destination_path: destination,
                organize_strategy: strategy.into(),
            };
            let task_id = session.create_task(&task).await?;
            let out = output::render_single(
                &global.output,
                &Created { task_id },
                |c| format!("Task ID: {}", c.task_id),
                |c| c.task_id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        TasksCommand::Start { id } => {
            session.start_task(id).await?;
            Ok(())
        }

        TasksCommand::Pause { id } => {
            session.pause_task(id).await?;
            Ok(())
        }

        TasksCommand::Cancel { id } => {
            session.cancel_task(id).await?;
            Ok(())
        }

        TasksCommand::Retry { id } => {
            session.retry_task(id).await?;
            Ok(())
        }

        TasksCommand::Delete { id } => {
            if !util::confirm(
                &format!("Delete task {id}? Its history is removed."),
                "tasks delete",
                global.yes,
            )? {
                return Ok(());
            }
            session.delete_task(id).await?;
            Ok(())
        }
    }
}
