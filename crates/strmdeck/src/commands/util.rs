//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::sync::Arc;

use strmdeck_core::{CoreError, DataKind, ScraperConfig, Session};

use crate::error::CliError;

/// Resolve a scraper by numeric ID or by name, loading scrapers first.
pub async fn resolve_scraper(
    session: &Session,
    identifier: &str,
) -> Result<Arc<ScraperConfig>, CliError> {
    session.load_full(DataKind::Scrapers).await?;
    let store = session.store();

    let found = identifier
        .parse::<i64>()
        .ok()
        .and_then(|id| store.scraper(id))
        .or_else(|| store.scraper_by_name(identifier));

    found.ok_or_else(|| {
        CoreError::NotFound {
            kind: "scraper".into(),
            name: identifier.into(),
        }
        .into()
    })
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal to prompt on, refuses instead of guessing.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Render an optional value, or an empty cell.
pub fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Render a percentage with one decimal.
pub fn percent(value: f64) -> String {
    format!("{value:.1}%")
}
