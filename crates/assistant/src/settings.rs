//! Assistant provider, model and credential.
//!
//! Provider and model persist to `settings.json`; the credential lives only as long as the
//! process. Every change is pushed to subscribers through a `watch` channel.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

use crate::providers::{self, DEFAULT_MODEL, DEFAULT_PROVIDER};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to access settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to encode settings: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Unknown provider '{0}'")]
    UnknownProvider(String),
    #[error("Model cannot be empty")]
    EmptyModel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantSettings {
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
        }
    }
}

impl AssistantSettings {
    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Persisted {
    provider: String,
    model: String,
}

#[derive(Debug)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    sender: watch::Sender<AssistantSettings>,
}

impl SettingsStore {
    /// Load persisted choices from `path`. A missing or unreadable file yields defaults.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = read_persisted(&path).unwrap_or_default();
        Self {
            path: Some(path),
            sender: watch::channel(settings).0,
        }
    }

    /// Settings that are never written to disk.
    pub fn ephemeral() -> Self {
        Self {
            path: None,
            sender: watch::channel(AssistantSettings::default()).0,
        }
    }

    pub fn current(&self) -> AssistantSettings {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AssistantSettings> {
        self.sender.subscribe()
    }

    /// Switching provider resets the model to that provider's default.
    pub fn set_provider(&self, provider_id: &str) -> Result<(), SettingsError> {
        let model = providers::default_model(provider_id)
            .ok_or_else(|| SettingsError::UnknownProvider(provider_id.to_string()))?;
        self.update(|settings| {
            settings.provider = provider_id.to_string();
            settings.model = model.to_string();
        })
    }

    pub fn set_model(&self, model: &str) -> Result<(), SettingsError> {
        let model = model.trim();
        if model.is_empty() {
            return Err(SettingsError::EmptyModel);
        }
        self.update(|settings| settings.model = model.to_string())
    }

    /// Blank keys clear the credential.
    pub fn set_api_key(&self, key: Option<&str>) {
        let key = key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string);
        self.sender.send_modify(|settings| settings.api_key = key);
    }

    pub fn reset(&self) -> Result<(), SettingsError> {
        self.update(|settings| *settings = AssistantSettings::default())
    }

    fn update(&self, change: impl FnOnce(&mut AssistantSettings)) -> Result<(), SettingsError> {
        let mut next = self.current();
        change(&mut next);
        if let Some(path) = &self.path {
            write_persisted(path, &next)?;
        }
        tracing::debug!(provider = %next.provider, model = %next.model, "assistant settings changed");
        self.sender.send_replace(next);
        Ok(())
    }
}

fn read_persisted(path: &Path) -> Option<AssistantSettings> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "unable to read settings");
            return None;
        }
    };
    match serde_json::from_str::<Persisted>(&raw) {
        Ok(persisted) => Some(AssistantSettings {
            provider: persisted.provider,
            model: persisted.model,
            api_key: None,
        }),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "ignoring malformed settings");
            None
        }
    }
}

fn write_persisted(path: &Path, settings: &AssistantSettings) -> Result<(), SettingsError> {
    let persisted = Persisted {
        provider: settings.provider.clone(),
        model: settings.model.clone(),
    };
    let rendered = serde_json::to_string_pretty(&persisted)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| SettingsError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, rendered).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })
}
