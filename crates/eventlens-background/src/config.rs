//! Host configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/eventlens/config.toml` by default.
//!
//! Credential values (`client_id`, `client_secret`) support secret references:
//! - `pass::path/in/store` resolved via `pass show`
//! - `env::VAR_NAME` resolved from the environment
//! - plain text used as-is

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use eventlens_google::{GoogleConfig, GoogleEndpoints, OAuthCredentials};
use eventlens_protocol::SHOW_EVENT;

use crate::auth::{CALLBACK_TIMEOUT, LoopbackPrompt};
use crate::error::BackgroundResult;

/// Configuration for the eventlens host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Google OAuth and API settings.
    pub google: GoogleSettings,

    /// Where events are relayed.
    pub relay: RelaySettings,

    /// Token and calendar map storage.
    pub storage: StorageSettings,
}

/// Google settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// OAuth client ID (supports `pass::` and `env::` prefixes).
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    pub client_secret: Option<String>,

    /// Google Cloud Console credentials JSON, used when the inline values are unset.
    pub credentials_file: Option<PathBuf>,

    /// OAuth scopes to request.
    pub scopes: Vec<String>,

    /// Ports tried, in order, for the loopback redirect listener.
    pub redirect_port_range: (u16, u16),

    /// Request timeout in seconds.
    pub timeout: u64,

    /// Seconds `install` waits for the browser to come back with a code.
    pub callback_timeout: u64,

    /// Send every request to this server instead of Google (keeps Google's paths).
    pub api_base: Option<String>,

    /// Authorization endpoint override.
    pub auth_url: Option<String>,

    /// Token endpoint override.
    pub token_url: Option<String>,

    /// Token-info endpoint override.
    pub token_info_url: Option<String>,

    /// Calendar API base override.
    pub calendar_api_base: Option<String>,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            credentials_file: None,
            scopes: vec![GoogleConfig::DEFAULT_SCOPE.to_string()],
            redirect_port_range: (8080, 8090),
            timeout: GoogleConfig::DEFAULT_TIMEOUT_SECS,
            callback_timeout: CALLBACK_TIMEOUT.as_secs(),
            api_base: None,
            auth_url: None,
            token_url: None,
            token_info_url: None,
            calendar_api_base: None,
        }
    }
}

/// Relay settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// URL pattern of the tabs that receive events (`*` matches anything).
    pub tab_url_pattern: String,

    /// Message tag of relayed events.
    pub message: String,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            tab_url_pattern: "https://calendar.google.com/calendar*".to_string(),
            message: SHOW_EVENT.to_string(),
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Path of the JSON store; defaults to the data directory.
    pub path: Option<PathBuf>,
}

impl BackgroundConfig {
    /// Loads configuration from the default path, or defaults if it is absent.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("eventlens")
    }

    /// Returns the default data directory.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("eventlens")
    }

    /// Returns the store path, falling back to `<data dir>/store.json`.
    pub fn store_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("store.json"))
    }
}

impl GoogleSettings {
    /// Builds the Google client configuration.
    ///
    /// Resolves credentials (expanding `pass::` / `env::` references) and
    /// applies endpoint overrides.
    pub fn to_google_config(&self) -> Result<GoogleConfig, String> {
        let credentials = self.resolve_credentials()?;
        credentials.validate().map_err(|e| e.to_string())?;

        let config = GoogleConfig::new(credentials)
            .with_scopes(self.scopes.clone())
            .with_endpoints(self.endpoints())
            .with_timeout(Duration::from_secs(self.timeout));
        config.validate()?;

        if self.redirect_port_range.0 > self.redirect_port_range.1 {
            return Err(format!(
                "invalid redirect_port_range {}-{}",
                self.redirect_port_range.0, self.redirect_port_range.1
            ));
        }

        Ok(config)
    }

    /// Binds the loopback listener `install` waits on.
    pub fn loopback_prompt(&self) -> BackgroundResult<LoopbackPrompt> {
        Ok(LoopbackPrompt::bind(self.redirect_port_range)?
            .with_timeout(Duration::from_secs(self.callback_timeout)))
    }

    fn endpoints(&self) -> GoogleEndpoints {
        let mut endpoints = match self.api_base {
            Some(ref base) => GoogleEndpoints::with_base(base),
            None => GoogleEndpoints::default(),
        };
        if let Some(ref url) = self.auth_url {
            endpoints.auth_url = url.clone();
        }
        if let Some(ref url) = self.token_url {
            endpoints.token_url = url.clone();
        }
        if let Some(ref url) = self.token_info_url {
            endpoints.token_info_url = url.clone();
        }
        if let Some(ref url) = self.calendar_api_base {
            endpoints.calendar_api_base = url.clone();
        }
        endpoints
    }

    /// Resolves OAuth credentials from the inline fields or the credentials file.
    pub(crate) fn resolve_credentials(&self) -> Result<OAuthCredentials, String> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(raw_id), Some(raw_secret)) => {
                let client_id = crate::secret::resolve(raw_id)
                    .map_err(|e| format!("failed to resolve client_id: {}", e))?;
                let client_secret = crate::secret::resolve(raw_secret)
                    .map_err(|e| format!("failed to resolve client_secret: {}", e))?;
                Ok(OAuthCredentials::new(client_id, client_secret))
            }
            (Some(_), None) => {
                Err("client_secret is missing from [google] section in config.toml".to_string())
            }
            (None, _) => match self.credentials_file {
                Some(ref path) => OAuthCredentials::from_file(path),
                None => Err(format!(
                    "Google credentials not found. Add to {}:\n  \
                     [google]\n  \
                     client_id = \"YOUR_ID.apps.googleusercontent.com\"\n  \
                     client_secret = \"YOUR_SECRET\"",
                    BackgroundConfig::default_path().display()
                )),
            },
        }
    }
}
