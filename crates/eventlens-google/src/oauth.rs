//! OAuth 2.0 authorization code flow for Google APIs.
//!
//! # Flow Overview
//!
//! 1. Build the authorization URL (offline access, forced consent)
//! 2. The host shows Google's consent page and hands back the redirect URL
//! 3. Extract the authorization code from the redirect
//! 4. Exchange the code for access and refresh tokens
//!
//! Later access tokens come from the refresh grant. The interactive part
//! (step 2) lives with the host; this module only does HTTP.

use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::config::{GoogleConfig, GoogleEndpoints, OAuthCredentials};
use crate::error::{GoogleError, GoogleResult};

/// OAuth client for Google APIs.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    scopes: Vec<String>,
    endpoints: GoogleEndpoints,
    http_client: reqwest::Client,
}

/// Response from Google's token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    /// The new access token.
    pub access_token: String,
    /// Only present on the authorization code grant.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds as reported by Google (informational).
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl OAuthClient {
    /// Creates a new OAuth client from the configuration.
    pub fn new(config: &GoogleConfig) -> GoogleResult<Self> {
        let http_client = config.http_client().map_err(|e| {
            GoogleError::configuration(format!("failed to create HTTP client: {}", e))
                .with_source(e)
        })?;

        Ok(Self {
            credentials: config.credentials.clone(),
            scopes: config.scopes.clone(),
            endpoints: config.endpoints.clone(),
            http_client,
        })
    }

    /// Builds the Google OAuth authorization URL.
    pub fn authorization_url(&self, redirect_uri: &str) -> String {
        let scope = self.scopes.join(" ");

        format!(
            "{}?client_id={}&scope={}&redirect_uri={}&response_type=code&\
            access_type=offline&prompt=consent",
            self.endpoints.auth_url,
            urlencoding::encode(&self.credentials.client_id),
            urlencoding::encode(&scope),
            urlencoding::encode(redirect_uri),
        )
    }

    /// Extracts the authorization code from the redirect URL.
    ///
    /// `#` characters are stripped from the code. An `error` parameter or a
    /// missing code is an authentication error.
    pub fn code_from_redirect(redirect_url: &str) -> GoogleResult<String> {
        let url = Url::parse(redirect_url).map_err(|e| {
            GoogleError::authentication(format!("invalid redirect URL: {}", e)).with_source(e)
        })?;

        let mut code = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "error" => {
                    return Err(GoogleError::authentication(format!(
                        "authorization denied: {}",
                        value
                    )));
                }
                "code" => code = Some(value.replace('#', "")),
                _ => {}
            }
        }

        match code {
            Some(code) if !code.is_empty() => Ok(code),
            _ => Err(GoogleError::authentication(
                "missing authorization code in redirect",
            )),
        }
    }

    /// Exchanges an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> GoogleResult<TokenResponse> {
        let params = [
            ("code", code),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];

        let tokens = self.token_request(&params, "token exchange").await?;
        info!("successfully obtained tokens");
        Ok(tokens)
    }

    /// Obtains a new access token using the refresh token.
    pub async fn refresh_token(&self, refresh_token: &str) -> GoogleResult<TokenResponse> {
        let params = [
            ("refresh_token", refresh_token),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let tokens = self.token_request(&params, "token refresh").await?;
        info!("successfully refreshed access token");
        Ok(tokens)
    }

    /// Asks the token-info endpoint whether `access_token` is still valid.
    ///
    /// Returns `Ok(false)` for any non-200 answer; transport failures are
    /// errors.
    pub async fn token_info(&self, access_token: &str) -> GoogleResult<bool> {
        let response = self
            .http_client
            .get(&self.endpoints.token_info_url)
            .query(&[("access_token", access_token)])
            .send()
            .await
            .map_err(GoogleError::from_reqwest)?;

        let status = response.status();
        debug!("token info answered {}", status);
        Ok(status == reqwest::StatusCode::OK)
    }

    async fn token_request(
        &self,
        params: &[(&str, &str)],
        what: &str,
    ) -> GoogleResult<TokenResponse> {
        debug!("{} request to {}", what, self.endpoints.token_url);

        let response = self
            .http_client
            .post(&self.endpoints.token_url)
            .form(params)
            .send()
            .await
            .map_err(GoogleError::from_reqwest)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GoogleError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(GoogleError::authentication(format!(
                "{} failed ({}): {}",
                what, status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            GoogleError::invalid_response(format!("invalid token response: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GoogleErrorCode;
    use mockito::Matcher;

    const REDIRECT_URI: &str = "http://127.0.0.1:8080/provider_cb";

    fn config_for(base: &str) -> GoogleConfig {
        GoogleConfig::new(OAuthCredentials::new(
            "test-client.apps.googleusercontent.com",
            "test-secret",
        ))
        .with_endpoints(GoogleEndpoints::with_base(base))
    }

    #[test]
    fn auth_url_format() {
        let client = OAuthClient::new(&config_for("https://accounts.example.com")).unwrap();
        let url = client.authorization_url(REDIRECT_URI);

        assert!(url.starts_with("https://accounts.example.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=test-client.apps.googleusercontent.com"));
        assert!(url.contains(
            "scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fcalendar.readonly"
        ));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8080%2Fprovider_cb"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
    }

    #[test]
    fn auth_url_joins_scopes_with_space() {
        let config = config_for("https://accounts.example.com")
            .with_scopes(vec!["a".to_string(), "b".to_string()]);
        let url = OAuthClient::new(&config).unwrap().authorization_url(REDIRECT_URI);
        assert!(url.contains("scope=a%20b"));
    }

    #[test]
    fn code_from_redirect_strips_hash() {
        let code =
            OAuthClient::code_from_redirect("http://127.0.0.1:8080/provider_cb?code=4%2F0Ab%23")
                .unwrap();
        assert_eq!(code, "4/0Ab");

        let code =
            OAuthClient::code_from_redirect("http://127.0.0.1:8080/provider_cb?code=xyz#").unwrap();
        assert_eq!(code, "xyz");
    }

    #[test]
    fn code_from_redirect_errors() {
        let err = OAuthClient::code_from_redirect(
            "http://127.0.0.1:8080/provider_cb?error=access_denied",
        )
        .unwrap_err();
        assert_eq!(err.code(), GoogleErrorCode::AuthenticationFailed);
        assert!(err.message().contains("access_denied"));

        assert!(OAuthClient::code_from_redirect("http://127.0.0.1:8080/provider_cb").is_err());
        assert!(OAuthClient::code_from_redirect("http://127.0.0.1:8080/provider_cb?code=").is_err());
        assert!(OAuthClient::code_from_redirect("not a url").is_err());
    }

    #[tokio::test]
    async fn exchange_code_posts_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth2/v3/token")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("code".into(), "4/abc".into()),
                Matcher::UrlEncoded(
                    "client_id".into(),
                    "test-client.apps.googleusercontent.com".into(),
                ),
                Matcher::UrlEncoded("client_secret".into(), "test-secret".into()),
                Matcher::UrlEncoded("redirect_uri".into(), REDIRECT_URI.into()),
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "A", "refresh_token": "B", "expires_in": 3599}"#)
            .create_async()
            .await;

        let client = OAuthClient::new(&config_for(&server.url())).unwrap();
        let tokens = client.exchange_code("4/abc", REDIRECT_URI).await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            tokens,
            TokenResponse {
                access_token: "A".to_string(),
                refresh_token: Some("B".to_string()),
                expires_in: Some(3599),
            }
        );
    }

    #[tokio::test]
    async fn refresh_uses_refresh_grant() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth2/v3/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("refresh_token".into(), "B".into()),
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token": "A2", "expires_in": 3599}"#)
            .create_async()
            .await;

        let client = OAuthClient::new(&config_for(&server.url())).unwrap();
        let tokens = client.refresh_token("B").await.unwrap();

        mock.assert_async().await;
        assert_eq!(tokens.access_token, "A2");
        assert_eq!(tokens.refresh_token, None);
    }

    #[tokio::test]
    async fn refresh_failure_is_authentication_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth2/v3/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant"}"#)
            .create_async()
            .await;

        let client = OAuthClient::new(&config_for(&server.url())).unwrap();
        let err = client.refresh_token("revoked").await.unwrap_err();
        assert_eq!(err.code(), GoogleErrorCode::AuthenticationFailed);
        assert!(err.message().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn malformed_token_body_is_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth2/v3/token")
            .with_status(200)
            .with_body(r#"{"token_type": "Bearer"}"#)
            .create_async()
            .await;

        let client = OAuthClient::new(&config_for(&server.url())).unwrap();
        let err = client.refresh_token("B").await.unwrap_err();
        assert_eq!(err.code(), GoogleErrorCode::InvalidResponse);
    }

    #[tokio::test]
    async fn token_info_reports_validity() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/oauth2/v3/tokeninfo")
            .match_query(Matcher::UrlEncoded("access_token".into(), "good".into()))
            .with_status(200)
            .with_body(r#"{"aud": "test-client"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/oauth2/v3/tokeninfo")
            .match_query(Matcher::UrlEncoded("access_token".into(), "stale".into()))
            .with_status(400)
            .with_body(r#"{"error_description": "Invalid Value"}"#)
            .create_async()
            .await;

        let client = OAuthClient::new(&config_for(&server.url())).unwrap();
        assert!(client.token_info("good").await.unwrap());
        assert!(!client.token_info("stale").await.unwrap());
    }
}
