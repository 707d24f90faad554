//! Client credentials, endpoints and HTTP settings.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// The OAuth client registered for the extension.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// A `client_secret_*.json` download. The pair sits under `installed` or
/// `web` depending on the client type; hand-written files may put it at the
/// top level.
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientPair>,
    web: Option<ClientPair>,
    #[serde(flatten)]
    flat: Option<ClientPair>,
}

#[derive(Debug, Deserialize)]
struct ClientPair {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Reads a client secret file as downloaded from the Cloud Console.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read client secret file {:?}: {}", path, e))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, String> {
        let file: ClientSecretFile = serde_json::from_str(json)
            .map_err(|e| format!("cannot parse client secret JSON: {}", e))?;

        file.installed
            .or(file.web)
            .or(file.flat)
            .map(|pair| Self::new(pair.client_id, pair.client_secret))
            .ok_or_else(|| {
                "client secret JSON has no client_id/client_secret pair \
                 (expected under `installed`, `web` or at the top level)"
                    .to_string()
            })
    }

    /// Rejects empty values and ids that are not Google OAuth client ids.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is empty");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id is not a Google OAuth client id");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is empty");
        }
        Ok(())
    }
}

/// Google endpoint URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleEndpoints {
    /// Interactive authorization endpoint.
    pub auth_url: String,
    /// Token endpoint (authorization_code and refresh_token grants).
    pub token_url: String,
    /// Token-info endpoint used to validate an access token.
    pub token_info_url: String,
    /// Calendar API v3 base URL.
    pub calendar_api_base: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://www.googleapis.com/oauth2/v3/token".to_string(),
            token_info_url: "https://www.googleapis.com/oauth2/v3/tokeninfo".to_string(),
            calendar_api_base: "https://www.googleapis.com/calendar/v3".to_string(),
        }
    }
}

impl GoogleEndpoints {
    /// Points every endpoint at one server, keeping Google's paths.
    ///
    /// Used to run against a local mock server.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            auth_url: format!("{}/o/oauth2/v2/auth", base),
            token_url: format!("{}/oauth2/v3/token", base),
            token_info_url: format!("{}/oauth2/v3/tokeninfo", base),
            calendar_api_base: format!("{}/calendar/v3", base),
        }
    }
}

/// Configuration for the Google clients.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// OAuth credentials for API access.
    pub credentials: OAuthCredentials,

    /// OAuth scopes to request.
    ///
    /// Defaults to `["https://www.googleapis.com/auth/calendar.readonly"]`.
    pub scopes: Vec<String>,

    /// Endpoint URLs.
    pub endpoints: GoogleEndpoints,

    /// Request timeout.
    pub timeout: Duration,

    /// User agent string for API requests.
    pub user_agent: String,
}

impl GoogleConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Default OAuth scope for read-only calendar access.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar.readonly";

    /// Creates a new Google configuration with the given credentials.
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            scopes: vec![Self::DEFAULT_SCOPE.to_string()],
            endpoints: GoogleEndpoints::default(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("eventlens/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the endpoint URLs.
    pub fn with_endpoints(mut self, endpoints: GoogleEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the HTTP client shared by the OAuth and Calendar clients.
    pub(crate) fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.credentials
            .validate()
            .map_err(|e| format!("invalid credentials: {}", e))?;

        if self.scopes.is_empty() {
            return Err("at least one OAuth scope is required".to_string());
        }

        Ok(())
    }
}
