//! User settings stored as settings.json in the app data directory

use crate::constants::{
    DETAIL_FETCH_CONCURRENCY, LIST_FETCH_LIMIT, PAGE_SIZE, STORAGE_POLL_INTERVAL_MS,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // List
    pub page_size: usize,
    pub list_limit: u32,

    // Fetching
    pub detail_concurrency: usize,

    // Cross-process favorites sync
    pub storage_poll_ms: u64,

    // Logging (EnvFilter directive, RUST_LOG wins when set)
    pub log_filter: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            list_limit: LIST_FETCH_LIMIT,
            detail_concurrency: DETAIL_FETCH_CONCURRENCY,
            storage_poll_ms: STORAGE_POLL_INTERVAL_MS,
            log_filter: None,
        }
    }
}

impl Settings {
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join("settings.json");
        match std::fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str::<Settings>(&s) {
                Ok(settings) => {
                    debug!(path = %path.display(), "Settings loaded");
                    settings.sanitized()
                }
                Err(e) => {
                    warn!(error = %e, "Failed to parse settings, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                debug!("No settings file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, data_dir: &Path) {
        let path = data_dir.join("settings.json");
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    warn!(error = %e, "Failed to save settings");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize settings"),
        }
    }

    pub fn storage_poll_interval(&self) -> Duration {
        Duration::from_millis(self.storage_poll_ms)
    }

    // Zero values would stall paging, fetching or polling
    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.page_size == 0 {
            self.page_size = defaults.page_size;
        }
        if self.list_limit == 0 {
            self.list_limit = defaults.list_limit;
        }
        if self.detail_concurrency == 0 {
            self.detail_concurrency = defaults.detail_concurrency;
        }
        if self.storage_poll_ms == 0 {
            self.storage_poll_ms = defaults.storage_poll_ms;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Settings::load(dir.path()), Settings::default());
    }

    #[test]
    fn malformed_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("settings.json"), "{ not json").unwrap();
        assert_eq!(Settings::load(dir.path()), Settings::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{ "page_size": 12, "detail_concurrency": 0 }"#,
        )
        .unwrap();
        let settings = Settings::load(dir.path());
        assert_eq!(settings.page_size, 12);
        assert_eq!(settings.list_limit, LIST_FETCH_LIMIT);
        assert_eq!(settings.detail_concurrency, DETAIL_FETCH_CONCURRENCY);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            page_size: 48,
            log_filter: Some("warn".into()),
            ..Settings::default()
        };
        settings.save(dir.path());
        assert_eq!(Settings::load(dir.path()), settings);
    }
}
