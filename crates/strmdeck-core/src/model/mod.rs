// ── Session domain model ──
//
// Canonical client-side representations of the service's entities. Wire
// types from `strmdeck_api::models` are converted at the boundary; the
// store and every consumer work with these.

pub mod log;
pub mod scraper;
pub mod settings;
pub mod stats;
pub mod task;

use serde::Serialize;
use strum::{AsRefStr, Display, EnumIter, EnumString};

// ── Re-exports ──────────────────────────────────────────────────────

pub use log::LogEntry;
pub use scraper::{ScraperConfig, display_name};
pub use settings::{SettingEntry, Settings};
pub use stats::Stats;
pub use task::{PatchOutcome, Task};

pub use strmdeck_api::models::{OrganizeStrategy, TaskStatus};

// ── Data kinds and pages ────────────────────────────────────────────

/// A category of server state the store mirrors.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DataKind {
    Tasks,
    Scrapers,
    Settings,
    Stats,
    Logs,
}

/// A view the host can show. Switching to a page loads what it displays.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Page {
    Dashboard,
    Tasks,
    Scrapers,
    Settings,
    Logs,
}

impl Page {
    /// Data kinds this page displays, loaded on every switch to it.
    pub fn kinds(self) -> &'static [DataKind] {
        match self {
            Self::Dashboard => &[DataKind::Stats, DataKind::Tasks],
            Self::Tasks => &[DataKind::Tasks],
            Self::Scrapers => &[DataKind::Scrapers],
            Self::Settings => &[DataKind::Settings],
            Self::Logs => &[DataKind::Logs],
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn every_page_loads_something() {
        for page in Page::iter() {
            assert!(!page.kinds().is_empty(), "{page} loads nothing");
        }
    }

    #[test]
    fn dashboard_loads_stats_and_tasks() {
        assert_eq!(Page::Dashboard.kinds(), &[DataKind::Stats, DataKind::Tasks]);
        assert_eq!("scrapers".parse::<Page>().ok(), Some(Page::Scrapers));
    }
}
