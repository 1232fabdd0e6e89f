// ── Scraper configuration domain types ──

use chrono::NaiveDateTime;
use secrecy::SecretString;
use serde::Serialize;

use strmdeck_api::models::{ScraperConfigRecord, ScraperConfigUpdate};

/// A metadata source. Credentials are held but never serialized or
/// printed; consumers see only whether one is set.
#[derive(Debug, Clone, Serialize)]
pub struct ScraperConfig {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub enabled: bool,
    /// Lower runs first.
    pub priority: i32,
    pub timeout: u32,
    pub retry_count: u32,
    pub has_api_key: bool,
    pub has_cookie: bool,
    pub updated_at: Option<NaiveDateTime>,
    #[serde(skip)]
    pub(crate) api_key: Option<SecretString>,
    #[serde(skip)]
    pub(crate) cookie: Option<SecretString>,
}

impl From<ScraperConfigRecord> for ScraperConfig {
    fn from(r: ScraperConfigRecord) -> Self {
        Self {
            id: r.id,
            display_name: display_name(&r.name),
            name: r.name,
            enabled: r.enabled,
            priority: r.priority,
            timeout: r.timeout,
            retry_count: r.retry_count,
            has_api_key: r.api_key.is_some(),
            has_cookie: r.cookie.is_some(),
            updated_at: r.updated_at.or(r.created_at),
            api_key: r.api_key,
            cookie: r.cookie,
        }
    }
}

impl ScraperConfig {
    /// Full-replacement body carrying the current values, for callers to
    /// adjust before sending.
    pub fn to_update(&self) -> ScraperConfigUpdate {
        ScraperConfigUpdate {
            name: self.name.clone(),
            enabled: self.enabled,
            api_key: self.api_key.clone(),
            cookie: self.cookie.clone(),
            priority: self.priority,
            timeout: self.timeout,
            retry_count: self.retry_count,
        }
    }

    pub(crate) fn display_order(a: &Self, b: &Self) -> std::cmp::Ordering {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.name.cmp(&b.name))
    }
}

/// Human-facing name for a scraper source.
pub fn display_name(name: &str) -> String {
    match name.to_ascii_lowercase().as_str() {
        "tmdb" => "TMDB".into(),
        "douban" => "Douban".into(),
        "bangumi" => "Bangumi".into(),
        "imdb" => "IMDb".into(),
        "tvdb" => "TheTVDB".into(),
        _ => title_case(name),
    }
}

fn title_case(s: &str) -> String {
    s.split(['_', '-', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
