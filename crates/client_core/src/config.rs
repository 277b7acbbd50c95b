use std::{fs, path::Path, time::Duration};

use anyhow::{anyhow, Context};
use serde::Deserialize;
use url::Url;

pub const SETTINGS_FILE: &str = "marketplace.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub login_path: String,
    /// Dual-role accounts load the inactive tab's dataset as well.
    pub prefetch_dual_role: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".into(),
            request_timeout: Duration::from_secs(15),
            login_path: "/auth/login".into(),
            prefetch_dual_role: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    login_path: Option<String>,
    prefetch_dual_role: Option<bool>,
}

pub fn load_settings() -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        if let Err(err) = apply_file_settings(&mut settings, &raw) {
            tracing::warn!(file = SETTINGS_FILE, error = %err, "config: ignoring unreadable settings file");
        }
    }

    if let Ok(v) = std::env::var("MARKETPLACE_API_URL") {
        settings.api_base_url = v;
    }
    if let Ok(v) = std::env::var("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Ok(v) = std::env::var("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout = Duration::from_secs(parsed);
        }
    }

    if let Ok(v) = std::env::var("APP__LOGIN_PATH") {
        settings.login_path = v;
    }

    if let Ok(v) = std::env::var("APP__PREFETCH_DUAL_ROLE") {
        if let Ok(parsed) = v.parse::<bool>() {
            settings.prefetch_dual_role = parsed;
        }
    }

    settings
}

pub fn load_settings_from(path: &Path) -> anyhow::Result<ClientSettings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
    let mut settings = ClientSettings::default();
    apply_file_settings(&mut settings, &raw)?;
    Ok(settings)
}

fn apply_file_settings(settings: &mut ClientSettings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw).context("invalid settings toml")?;

    if let Some(v) = file_cfg.api_base_url {
        settings.api_base_url = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout = Duration::from_secs(v);
    }
    if let Some(v) = file_cfg.login_path {
        settings.login_path = v;
    }
    if let Some(v) = file_cfg.prefetch_dual_role {
        settings.prefetch_dual_role = v;
    }
    Ok(())
}

/// Parses the API root and makes sure relative endpoint paths join under it.
pub fn normalize_base_url(raw: &str) -> anyhow::Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(anyhow!("api base url must not be empty"));
    }

    let mut url = Url::parse(raw).with_context(|| format!("invalid api base url '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(anyhow!("api base url must use http or https, got '{}'", url.scheme()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
