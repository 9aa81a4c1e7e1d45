use super::credentials::AuthorizedUserCredentials;
use crate::error::{google_calendar_error, AppResult};
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

/// Fallback lifetime when the token endpoint omits `expires_in`
const DEFAULT_EXPIRES_IN: i64 = 3600;

/// Response of the OAuth2 token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    scope: Option<String>,
}

/// Hands out access tokens, refreshing them when they are missing or stale
#[derive(Clone, Default)]
pub struct TokenManager {
    client: Client,
}

impl TokenManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Get a usable access token for `creds`
    pub async fn access_token(&self, creds: &AuthorizedUserCredentials) -> AppResult<String> {
        if creds.has_fresh_access_token(Utc::now()) {
            if let Some(token) = &creds.token {
                return Ok(token.clone());
            }
        }

        let refreshed = self.refresh_token(creds).await?;
        refreshed
            .token
            .ok_or_else(|| google_calendar_error("Token response missing 'access_token' field"))
    }

    /// Exchange the refresh token for a new access token
    pub async fn refresh_token(
        &self,
        creds: &AuthorizedUserCredentials,
    ) -> AppResult<AuthorizedUserCredentials> {
        info!("Refreshing Google access token");

        let params = [
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
            ("refresh_token", creds.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self.request_token(&creds.token_uri, &params).await?;

        let mut refreshed = creds.clone();
        Self::apply_response(&mut refreshed, response)?;
        Ok(refreshed)
    }

    /// Exchange an authorization code from the consent screen for credentials
    pub async fn exchange_code(
        &self,
        token_uri: &str,
        client_id: &str,
        client_secret: &str,
        code: &str,
        redirect_uri: &str,
    ) -> AppResult<AuthorizedUserCredentials> {
        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];

        let response = self.request_token(token_uri, &params).await?;

        let refresh_token = response
            .refresh_token
            .clone()
            .ok_or_else(|| google_calendar_error("Token response missing 'refresh_token' field"))?;

        let mut creds = AuthorizedUserCredentials {
            token: None,
            refresh_token,
            token_uri: token_uri.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            scopes: Vec::new(),
            expiry: None,
        };
        Self::apply_response(&mut creds, response)?;
        Ok(creds)
    }

    async fn request_token(
        &self,
        token_uri: &str,
        params: &[(&str, &str)],
    ) -> AppResult<TokenResponse> {
        let response = self
            .client
            .post(token_uri)
            .form(params)
            .send()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to request token: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(google_calendar_error(&format!(
                "Failed to request token: HTTP {} - {}",
                status, error_body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to parse token response: {}", e)))
    }

    fn apply_response(
        creds: &mut AuthorizedUserCredentials,
        response: TokenResponse,
    ) -> AppResult<()> {
        let access_token = response
            .access_token
            .ok_or_else(|| google_calendar_error("Token response missing 'access_token' field"))?;

        let now = Utc::now();
        let expires_in = response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);
        let expiry = Duration::try_seconds(expires_in)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .or_else(|| {
                warn!("Ignoring out-of-range expires_in {} from token endpoint", expires_in);
                now.checked_add_signed(Duration::seconds(DEFAULT_EXPIRES_IN))
            })
            .ok_or_else(|| google_calendar_error("Could not compute access token expiry"))?;

        creds.token = Some(access_token);
        creds.expiry = Some(expiry);

        // Google only sends a new refresh token when it rotates the old one
        if let Some(refresh_token) = response.refresh_token {
            creds.refresh_token = refresh_token;
        }
        if let Some(scope) = response.scope {
            creds.scopes = scope.split_whitespace().map(str::to_string).collect();
        }

        Ok(())
    }
}
