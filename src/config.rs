use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "Labsight";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Catalog table version read from disk and compiled into the binary.
pub const CATALOG_VERSION: &str = "v1";

pub const ENV_CATALOG_DIR: &str = "LABSIGHT_CATALOG_DIR";
pub const ENV_MANIFEST: &str = "LABSIGHT_MANIFEST";
pub const ENV_NARRATIVE: &str = "LABSIGHT_NARRATIVE";
pub const ENV_OLLAMA_URL: &str = "LABSIGHT_OLLAMA_URL";
pub const ENV_NARRATIVE_MODEL: &str = "LABSIGHT_NARRATIVE_MODEL";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "labsight_lib=debug,labsight=debug,warn"
    } else {
        "labsight_lib=info,labsight=info,warn"
    }
}

/// Per-user data directory, `<data_dir>/Labsight`. Falls back to the working
/// directory when the platform reports none.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Catalog root; `None` means use the bundled tables.
pub fn catalog_dir() -> Option<PathBuf> {
    non_empty_env(ENV_CATALOG_DIR).map(PathBuf::from).or_else(|| {
        let dir = app_data_dir().join("catalog");
        dir.join(CATALOG_VERSION).is_dir().then_some(dir)
    })
}

/// Manifest file; `None` means use the bundled manifest.
pub fn manifest_path() -> Option<PathBuf> {
    non_empty_env(ENV_MANIFEST).map(PathBuf::from).or_else(|| {
        let path = app_data_dir().join("manifest.json");
        path.is_file().then_some(path)
    })
}

pub fn narrative_enabled() -> bool {
    non_empty_env(ENV_NARRATIVE).is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Narrative capability endpoint and retry budget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NarrativeSettings {
    pub base_url: String,
    pub model: String,
    pub attempt_timeout_ms: u64,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub jitter_ms: u64,
}

impl Default for NarrativeSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "medgemma:4b".to_string(),
            attempt_timeout_ms: 60_000,
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
            jitter_ms: 250,
        }
    }
}

impl NarrativeSettings {
    /// Defaults with `LABSIGHT_OLLAMA_URL` / `LABSIGHT_NARRATIVE_MODEL` applied.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Some(url) = non_empty_env(ENV_OLLAMA_URL) {
            settings.base_url = url;
        }
        if let Some(model) = non_empty_env(ENV_NARRATIVE_MODEL) {
            settings.model = model;
        }
        settings
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}
