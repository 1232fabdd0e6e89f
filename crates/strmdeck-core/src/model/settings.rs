// ── Settings domain types ──

use std::collections::BTreeMap;

use serde::Serialize;

use strmdeck_api::models::{MemoryStatus, ProxyStatus, SystemConfigEntry};

/// Well-known system-config keys.
pub mod keys {
    pub const MAX_WORKERS: &str = "max_workers";
    pub const TASK_TIMEOUT: &str = "task_timeout";
    pub const RENAME_TEMPLATE: &str = "rename_template";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingEntry {
    pub value: Option<String>,
    pub description: Option<String>,
}

/// Everything the settings page shows. Proxy and memory sections are
/// absent when the service has not initialized those managers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Settings {
    pub entries: BTreeMap<String, SettingEntry>,
    pub proxy: Option<ProxyStatus>,
    pub memory: Option<MemoryStatus>,
}

impl Settings {
    pub fn from_parts(
        entries: Vec<SystemConfigEntry>,
        proxy: Option<ProxyStatus>,
        memory: Option<MemoryStatus>,
    ) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| {
                (
                    e.key,
                    SettingEntry {
                        value: e.value,
                        description: e.description,
                    },
                )
            })
            .collect();
        Self {
            entries,
            proxy,
            memory,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key)?.value.as_deref()
    }

    /// Parse a numeric setting such as [`keys::MAX_WORKERS`].
    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key)?.trim().parse().ok()
    }
}
