//! Dashboard statistics handler.

use strmdeck_core::{DataKind, Session, Stats};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

fn stats_detail(s: &Stats) -> String {
    let mut lines = vec![
        format!(
            "Tasks:    {} total, {} running, {} completed, {} failed",
            s.total_tasks, s.running_tasks, s.completed_tasks, s.failed_tasks
        ),
        format!("CPU:      {}", util::percent(s.cpu_usage)),
        format!("Memory:   {}", util::percent(s.memory_usage)),
        format!("Disk:     {}", util::percent(s.disk_usage)),
    ];
    if let Some(net) = s.network {
        lines.push(format!(
            "Network:  {} sent, {} received",
            human_bytes(net.bytes_sent),
            human_bytes(net.bytes_recv)
        ));
    }
    lines.push(format!(
        "Updated:  {}",
        s.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    lines.join("\n")
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

pub async fn handle(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    session.load_full(DataKind::Stats).await?;
    let Some(stats) = session.store().stats() else {
        return Err(CliError::UnexpectedResponse {
            message: "no statistics returned".into(),
        });
    };
    let out = output::render_single(
        &global.output,
        stats.as_ref(),
        stats_detail,
        |s| s.total_tasks.to_string(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
