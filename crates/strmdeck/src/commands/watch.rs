//! Live view: follows the push channel and prints what changes.
//!
//! Opens the real-time channel, shows the dashboard (which starts the
//! periodic stats refresh), then prints notifications, connection
//! transitions and task progress until Ctrl-C. The caller tears the session
//! down afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use strmdeck_core::{
    ConnectionState, ConnectionStatus, Notification, Page, Session, Severity, Task, TaskStatus,
};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

// ── Events ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WatchEvent<'a> {
    Notification(&'a Notification),
    Connection(ConnectionStatus),
    Task(TaskChange),
    TaskRemoved { id: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct TaskChange {
    id: i64,
    name: String,
    status: TaskStatus,
    progress: f64,
    processed_files: u64,
    total_files: u64,
}

impl From<&Task> for TaskChange {
    fn from(t: &Task) -> Self {
        Self {
            id: t.id,
            name: t.name.clone(),
            status: t.status,
            progress: t.progress,
            processed_files: t.processed_files,
            total_files: t.total_files,
        }
    }
}

// ── Task diffing ────────────────────────────────────────────────────

/// What was last printed per task: status and whole percent. Finer
/// progress updates are not worth a line each.
#[derive(Default)]
struct TaskTracker {
    seen: HashMap<i64, (TaskStatus, u8)>,
}

impl TaskTracker {
    fn key(t: &Task) -> (TaskStatus, u8) {
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::as_conversions
        )]
        let whole = t.progress.clamp(0.0, 100.0).floor() as u8;
        (t.status, whole)
    }

    /// Record `snapshot` without reporting anything.
    fn prime(&mut self, snapshot: &[Arc<Task>]) {
        self.seen = snapshot.iter().map(|t| (t.id, Self::key(t))).collect();
    }

    /// Changes since the last call: new or moved tasks, then removals.
    fn diff(&mut self, snapshot: &[Arc<Task>]) -> (Vec<TaskChange>, Vec<i64>) {
        let mut changed = Vec::new();
        let mut next = HashMap::with_capacity(snapshot.len());
        for task in snapshot {
            let key = Self::key(task);
            if self.seen.get(&task.id) != Some(&key) {
                changed.push(TaskChange::from(task.as_ref()));
            }
            next.insert(task.id, key);
        }
        let mut removed: Vec<i64> = self
            .seen
            .keys()
            .filter(|id| !next.contains_key(id))
            .copied()
            .collect();
        removed.sort_unstable();
        self.seen = next;
        (changed, removed)
    }
}

// ── Printing ────────────────────────────────────────────────────────

struct Printer {
    /// One compact JSON object per line instead of timestamped text.
    json: bool,
    color: bool,
    quiet: bool,
}

impl Printer {
    fn new(global: &GlobalOpts) -> Self {
        Self {
            json: matches!(global.output, OutputFormat::Json | OutputFormat::JsonCompact),
            color: output::should_color(&global.color),
            quiet: global.quiet,
        }
    }

    fn emit(&self, event: &WatchEvent<'_>) {
        // Errors are shown even in quiet mode.
        let is_error = matches!(event, WatchEvent::Notification(n) if n.severity == Severity::Error);
        if self.quiet && !is_error {
            return;
        }
        let line = if self.json {
            output::render_json_compact(event)
        } else {
            format!(
                "{} {}",
                chrono::Local::now().format("%H:%M:%S"),
                self.human(event)
            )
        };
        output::print_output(&line, false);
    }

    fn human(&self, event: &WatchEvent<'_>) -> String {
        match event {
            WatchEvent::Notification(n) => output::paint_severity(n.severity, &n.text, self.color),
            WatchEvent::Connection(s) => match s.state {
                ConnectionState::Disconnected if s.attempt > 0 => {
                    format!("connection: reconnecting (attempt {})", s.attempt)
                }
                ConnectionState::Failed => {
                    format!("connection: failed after {} attempts", s.attempt)
                }
                state => format!("connection: {state}"),
            },
            WatchEvent::Task(t) => format!(
                "task {} \"{}\": {} {} ({}/{} files)",
                t.id,
                t.name,
                output::paint_status(t.status, self.color),
                super::util::percent(t.progress),
                t.processed_files,
                t.total_files
            ),
            WatchEvent::TaskRemoved { id } => format!("task {id} removed"),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let printer = Printer::new(global);

    // Subscribe before anything can happen so no early event is missed.
    let mut notes = session.notifier().subscribe();
    let mut status = session.connection().watch();
    let mut tasks = session.store().subscribe_tasks();

    session.connect().await;
    if let Err(e) = session.switch_page(Page::Dashboard).await {
        // Already surfaced as a notification; keep following the channel.
        debug!(error = %e, "initial dashboard load failed");
    }

    let mut tracker = TaskTracker::default();
    let initial = session.store().tasks_snapshot();
    for task in initial.iter() {
        printer.emit(&WatchEvent::Task(TaskChange::from(task.as_ref())));
    }
    tracker.prime(&initial);

    if !global.quiet {
        eprintln!("Watching {} (Ctrl-C to stop)", session.config().server);
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            biased;

            _ = &mut ctrl_c => {
                debug!("interrupted, leaving watch");
                break;
            }

            note = notes.recv() => match note {
                Ok(n) => printer.emit(&WatchEvent::Notification(&n)),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "notification feed lagged"),
                Err(RecvError::Closed) => break,
            },

            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                printer.emit(&WatchEvent::Connection(current));
            }

            snap = tasks.changed() => {
                let Some(snap) = snap else { break };
                let (changed, removed) = tracker.diff(&snap);
                for change in changed {
                    printer.emit(&WatchEvent::Task(change));
                }
                for id in removed {
                    printer.emit(&WatchEvent::TaskRemoved { id });
                }
            }
        }
    }

    Ok(())
}
