//! Scraper command handlers.

use std::sync::Arc;

use secrecy::SecretString;
use tabled::Tabled;

use strmdeck_core::{DataKind, ProbeResult, ScraperConfig, Session};

use crate::cli::{GlobalOpts, ScraperUpdateArgs, ScrapersArgs, ScrapersCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct ScraperRow {
    #[tabled(rename = "Priority")]
    priority: i32,
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Timeout")]
    timeout: String,
    #[tabled(rename = "Retries")]
    retries: u32,
    #[tabled(rename = "Credentials")]
    credentials: String,
}

impl From<&Arc<ScraperConfig>> for ScraperRow {
    fn from(s: &Arc<ScraperConfig>) -> Self {
        let credentials = match (s.has_api_key, s.has_cookie) {
            (true, true) => "api key, cookie",
            (true, false) => "api key",
            (false, true) => "cookie",
            (false, false) => "",
        };
        Self {
            priority: s.priority,
            id: s.id,
            name: s.display_name.clone(),
            enabled: if s.enabled { "yes" } else { "no" }.into(),
            timeout: format!("{}s", s.timeout),
            retries: s.retry_count,
            credentials: credentials.into(),
        }
    }
}

fn probe_detail(label: &str, r: &ProbeResult) -> String {
    let mut lines = vec![format!(
        "{label}: {}",
        if r.success { "ok" } else { "failed" }
    )];
    if let Some(ref message) = r.message {
        lines.push(format!("  Message:  {message}"));
    }
    if let Some(secs) = r.response_time {
        lines.push(format!("  Latency:  {secs:.2}s"));
    }
    if let Some(ref ip) = r.ip {
        lines.push(format!("  Exit IP:  {ip}"));
    }
    lines.join("\n")
}

pub(super) fn render_probe(global: &GlobalOpts, label: &str, result: &ProbeResult) {
    let out = output::render_single(
        &global.output,
        result,
        |r| probe_detail(label, r),
        |r| r.success.to_string(),
    );
    output::print_output(&out, global.quiet);
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &Session,
    args: ScrapersArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ScrapersCommand::List => {
            session.load_full(DataKind::Scrapers).await?;
            let snap = session.store().scrapers_snapshot();
            let out = output::render_list(
                &global.output,
                snap.as_slice(),
                |s| ScraperRow::from(s),
                |s| s.name.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ScrapersCommand::Update(update) => apply_update(session, update).await,

        ScrapersCommand::Test { scraper } => {
            let scraper = util::resolve_scraper(session, &scraper).await?;
            let result = session.test_scraper(scraper.id).await?;
            render_probe(global, &scraper.display_name, &result);
            Ok(())
        }

        ScrapersCommand::Reorder { names } => {
            let updated = session.reorder_scrapers(&names).await?;
            tracing::debug!(updated, "reorder applied");
            let snap = session.store().scrapers_snapshot();
            let out = output::render_list(
                &global.output,
                snap.as_slice(),
                |s| ScraperRow::from(s),
                |s| s.name.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

/// Start from the scraper's current values; the service replaces the whole
/// record on update.
async fn apply_update(session: &Session, args: ScraperUpdateArgs) -> Result<(), CliError> {
    let scraper = util::resolve_scraper(session, &args.scraper).await?;
    let mut update = scraper.to_update();

    if let Some(enabled) = args.enabled {
        update.enabled = enabled;
    }
    if let Some(priority) = args.priority {
        update.priority = priority;
    }
    if let Some(key) = args.api_key {
        update.api_key = non_empty_secret(key);
    }
    if let Some(cookie) = args.cookie {
        update.cookie = non_empty_secret(cookie);
    }
    if let Some(timeout) = args.upstream_timeout {
        if timeout == 0 {
            return Err(CliError::Validation {
                field: "upstream-timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        update.timeout = timeout;
    }
    if let Some(retries) = args.retry_count {
        update.retry_count = retries;
    }

    session.update_scraper(scraper.id, &update).await?;
    Ok(())
}

/// An empty string clears the credential.
fn non_empty_secret(value: String) -> Option<SecretString> {
    if value.is_empty() {
        None
    } else {
        Some(SecretString::from(value))
    }
}
