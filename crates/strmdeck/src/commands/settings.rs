//! Settings command handlers.

use std::fmt::Write as _;

use tabled::Tabled;

use strmdeck_core::{DataKind, Session, Settings};

use crate::cli::{GlobalOpts, SettingsArgs, SettingsCommand};
use crate::error::CliError;
use crate::output;

use super::scrapers::render_probe;

// ── Detail view ─────────────────────────────────────────────────────

#[derive(Tabled)]
struct SettingRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Description")]
    description: String,
}

fn settings_detail(s: &Settings) -> String {
    let rows: Vec<SettingRow> = s
        .entries
        .iter()
        .map(|(key, entry)| SettingRow {
            key: key.clone(),
            value: entry.value.clone().unwrap_or_default(),
            description: entry.description.clone().unwrap_or_default(),
        })
        .collect();
    let mut out = output::render_table(&rows);

    let _ = writeln!(out);
    match &s.proxy {
        Some(p) if p.enabled => {
            let health = if p.is_working { "working" } else { "not working" };
            let _ = write!(out, "\nProxy:   {}://{}:{} ({health})", p.kind, p.host, p.port);
            if let Some(ref at) = p.last_test {
                let _ = write!(out, ", last tested {at}");
            }
        }
        Some(_) => {
            let _ = write!(out, "\nProxy:   disabled");
        }
        None => {
            let _ = write!(out, "\nProxy:   unavailable");
        }
    }
    match &s.memory {
        Some(m) => {
            let _ = write!(
                out,
                "\nMemory:  limit {} MB, warn at {:.0}%, critical at {:.0}%",
                m.max_memory_mb,
                m.warning_threshold * 100.0,
                m.critical_threshold * 100.0
            );
            if let Some(rss) = m.measurements.get("rss_mb").and_then(serde_json::Value::as_f64) {
                let _ = write!(out, ", using {rss:.0} MB");
            }
        }
        None => {
            let _ = write!(out, "\nMemory:  unavailable");
        }
    }
    out
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &Session,
    args: SettingsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        SettingsCommand::Show => {
            session.load_full(DataKind::Settings).await?;
            let settings = session.store().settings().unwrap_or_default();
            let out = output::render_single(
                &global.output,
                settings.as_ref(),
                settings_detail,
                |s| s.entries.keys().cloned().collect::<Vec<_>>().join("\n"),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SettingsCommand::Set {
            key,
            value,
            description,
        } => {
            if key.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "key".into(),
                    reason: "must not be empty".into(),
                });
            }
            session.update_setting(&key, &value, description).await?;
            Ok(())
        }

        SettingsCommand::ProxyTest => {
            let result = session.test_proxy().await?;
            render_probe(global, "Proxy", &result);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_managers_are_reported() {
        let detail = settings_detail(&Settings::default());
        assert!(detail.contains("Proxy:   unavailable"));
        assert!(detail.contains("Memory:  unavailable"));
    }
}
