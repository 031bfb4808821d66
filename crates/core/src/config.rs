use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use once_cell::sync::Lazy;

static SETTINGS_FILE_NAME: &str = "settings.json";
static ENV_DATA_DIR: &str = "LIFEOS_DATA_DIR";
static ENV_API_URL: &str = "LIFEOS_API_URL";
pub static DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("dev", "lifeos", "lifeos"));

#[derive(Debug, Clone)]
pub struct AppConfig {
    data_dir: PathBuf,
    settings_path: PathBuf,
    api_url: String,
    request_timeout: Option<Duration>,
}

impl AppConfig {
    /// Construct [`AppConfig`] by resolving the data directory and API base URL from the
    /// provided overrides, environment variables, and platform defaults.
    pub fn discover(data_dir_override: Option<PathBuf>, api_url_override: Option<String>) -> Result<Self> {
        let data_dir = resolve_data_dir(data_dir_override)?;
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).with_context(|| {
                format!("Failed to create data directory at {}", data_dir.display())
            })?;
        }
        Ok(Self::from_parts(data_dir, resolve_api_url(api_url_override)))
    }

    /// Construct [`AppConfig`] directly from a resolved data directory and base URL.
    pub fn from_parts(data_dir: PathBuf, api_url: String) -> Self {
        let settings_path = data_dir.join(SETTINGS_FILE_NAME);
        Self {
            data_dir,
            settings_path,
            api_url,
            request_timeout: None,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Where provider and model choices persist across sessions.
    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn chat_url(&self) -> String {
        format!("{}/chat/", self.api_url.trim_end_matches('/'))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }
}

fn resolve_api_url(api_url_override: Option<String>) -> String {
    if let Some(url) = api_url_override {
        return url;
    }

    match env::var(ENV_API_URL) {
        Ok(url) if !url.trim().is_empty() => url,
        _ => DEFAULT_API_URL.to_string(),
    }
}

fn resolve_data_dir(data_dir_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = data_dir_override {
        return Ok(dir);
    }

    if let Ok(env_dir) = env::var(ENV_DATA_DIR) {
        return Ok(PathBuf::from(env_dir));
    }

    if let Some(project) = &*PROJECT_DIRS {
        return Ok(project.data_dir().to_path_buf());
    }

    if let Some(base) = BaseDirs::new() {
        return Ok(base.home_dir().join(".lifeos"));
    }

    Ok(env::current_dir()?.join(".lifeos"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn overrides_win_and_paths_derive_from_them() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::discover(
            Some(dir.path().join("nested")),
            Some("http://example.test/api/".into()),
        )
        .unwrap();

        assert!(config.data_dir().exists());
        assert_eq!(config.settings_path(), dir.path().join("nested").join("settings.json"));
        assert_eq!(config.chat_url(), "http://example.test/api/chat/");
        assert!(config.request_timeout().is_none());
    }
}
