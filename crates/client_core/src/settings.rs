use std::{collections::HashMap, fs};

use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Release tag this build was shipped with; compared against the
    /// version probe result.
    pub version_tag: String,
    pub version_check_url: String,
    pub service_url: String,
    pub shutdown_url_base: String,
    pub user_profile_url: Option<String>,
    pub release_notes_url: Option<String>,
    /// Save-size ceiling enforced by the backing store, cited in the
    /// size-limit save error. Not enforced here.
    pub max_document_size_bytes: u64,
    /// Periodic version re-check. Off unless configured.
    pub version_recheck_minutes: Option<u64>,
    pub widget_ready_timeout_secs: u64,
    /// Settle delay between a successful shutdown request and the page
    /// reload, so the response path can finish.
    pub reload_delay_ms: u64,
    /// Named service endpoints surfaced in the session-properties view.
    pub urls: HashMap<String, String>,
    /// Endpoint names excluded from the session-properties view.
    pub internal_url_keys: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version_tag: env!("CARGO_PKG_VERSION").to_string(),
            version_check_url: "http://127.0.0.1:8600/version_check".into(),
            service_url: "http://127.0.0.1:8600/service".into(),
            shutdown_url_base: "http://127.0.0.1:8600/session_shutdown".into(),
            user_profile_url: None,
            release_notes_url: None,
            max_document_size_bytes: 4 * 1024 * 1024,
            version_recheck_minutes: None,
            widget_ready_timeout_secs: 30,
            reload_delay_ms: 200,
            urls: HashMap::new(),
            internal_url_keys: vec!["job_proxy".into(), "support_ticket".into()],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    version_tag: Option<String>,
    version_check_url: Option<String>,
    service_url: Option<String>,
    shutdown_url_base: Option<String>,
    user_profile_url: Option<String>,
    release_notes_url: Option<String>,
    max_document_size_bytes: Option<u64>,
    version_recheck_minutes: Option<u64>,
    widget_ready_timeout_secs: Option<u64>,
    reload_delay_ms: Option<u64>,
    urls: Option<HashMap<String, String>>,
    internal_url_keys: Option<Vec<String>>,
}

pub fn load_settings() -> Settings {
    load_settings_from("workbench.toml")
}

fn load_settings_from(path: &str) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => apply_file_settings(&mut settings, file_cfg),
            Err(err) => warn!("ignoring malformed {path}: {err}"),
        }
    }

    if let Ok(v) = std::env::var("WORKBENCH_VERSION_TAG") {
        settings.version_tag = v;
    }
    if let Ok(v) = std::env::var("APP__VERSION_CHECK_URL") {
        settings.version_check_url = v;
    }
    if let Ok(v) = std::env::var("APP__SERVICE_URL") {
        settings.service_url = v;
    }
    if let Ok(v) = std::env::var("APP__SHUTDOWN_URL_BASE") {
        settings.shutdown_url_base = v;
    }
    if let Ok(v) = std::env::var("APP__USER_PROFILE_URL") {
        settings.user_profile_url = Some(v);
    }
    if let Ok(v) = std::env::var("APP__VERSION_RECHECK_MINUTES") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.version_recheck_minutes = Some(parsed);
        }
    }
    if let Ok(v) = std::env::var("APP__WIDGET_READY_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.widget_ready_timeout_secs = parsed;
        }
    }

    settings
}

fn apply_file_settings(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.version_tag {
        settings.version_tag = v;
    }
    if let Some(v) = file_cfg.version_check_url {
        settings.version_check_url = v;
    }
    if let Some(v) = file_cfg.service_url {
        settings.service_url = v;
    }
    if let Some(v) = file_cfg.shutdown_url_base {
        settings.shutdown_url_base = v;
    }
    if let Some(v) = file_cfg.user_profile_url {
        settings.user_profile_url = Some(v);
    }
    if let Some(v) = file_cfg.release_notes_url {
        settings.release_notes_url = Some(v);
    }
    if let Some(v) = file_cfg.max_document_size_bytes {
        settings.max_document_size_bytes = v;
    }
    if let Some(v) = file_cfg.version_recheck_minutes {
        settings.version_recheck_minutes = Some(v);
    }
    if let Some(v) = file_cfg.widget_ready_timeout_secs {
        settings.widget_ready_timeout_secs = v;
    }
    if let Some(v) = file_cfg.reload_delay_ms {
        settings.reload_delay_ms = v;
    }
    if let Some(v) = file_cfg.urls {
        settings.urls = v;
    }
    if let Some(v) = file_cfg.internal_url_keys {
        settings.internal_url_keys = v;
    }
}

/// Version and endpoint summary for the host's properties dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProperties {
    pub version_tag: String,
    pub release_notes_url: Option<String>,
    /// `(name, url)` pairs, sorted by name. Internal endpoints and
    /// non-HTTP entries are left out.
    pub service_urls: Vec<(String, String)>,
}

impl Settings {
    pub fn session_properties(&self) -> SessionProperties {
        let mut service_urls: Vec<(String, String)> = self
            .urls
            .iter()
            .filter(|(name, url)| {
                !self.internal_url_keys.contains(*name)
                    && url.to_ascii_lowercase().starts_with("http")
            })
            .map(|(name, url)| (name.clone(), url.clone()))
            .collect();
        service_urls.sort();

        SessionProperties {
            version_tag: self.version_tag.clone(),
            release_notes_url: self.release_notes_url.clone(),
            service_urls,
        }
    }
}

/// Human-readable size for the save-ceiling message, e.g. "4 MB".
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes >= MB && bytes % MB == 0 {
        format!("{} MB", bytes / MB)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{} KB", bytes.div_ceil(KB))
    } else {
        format!("{bytes} B")
    }
}
