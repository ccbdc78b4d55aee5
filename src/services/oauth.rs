// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth2 token exchange and refresh against the provider's token endpoint.

use crate::config::Config;
use crate::error::AppError;
use crate::models::OAuthToken;
use crate::services::hh::{check_response, transport_error};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;

/// A token is refreshed once it is this close to expiring.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 10;

/// Token operations the service needs from the identity provider.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Trade an authorization code for a token.
    async fn exchange_code(&self, code: &str) -> Result<OAuthToken, AppError>;

    /// Return a usable token for `current`.
    ///
    /// Hands back `current` unchanged while it is still valid; callers detect
    /// a refresh by comparing access tokens.
    async fn refresh_token(&self, current: &OAuthToken) -> Result<OAuthToken, AppError>;
}

/// hh.ru OAuth client.
#[derive(Clone)]
pub struct HhOAuthClient {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    redirect_url: String,
}

impl HhOAuthClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.provider_timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_url: config.redirect_url.clone(),
        })
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_response(response).await.map_err(|e| {
            tracing::error!(error = %e, "hh.ru token request failed");
            e
        })?;

        response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to parse token response: {}", e)))
    }
}

#[async_trait]
impl OAuthProvider for HhOAuthClient {
    async fn exchange_code(&self, code: &str) -> Result<OAuthToken, AppError> {
        let response = self
            .token_request(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("code", code),
            ])
            .await?;

        response
            .into_token(None)
            .ok_or_else(|| AppError::Provider("Token response without refresh token".into()))
    }

    async fn refresh_token(&self, current: &OAuthToken) -> Result<OAuthToken, AppError> {
        if current.is_valid_for(Duration::seconds(TOKEN_EXPIRY_MARGIN_SECS)) {
            return Ok(current.clone());
        }

        tracing::debug!("Access token expired, refreshing");
        let response = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", current.refresh_token.as_str()),
            ])
            .await?;

        response
            .into_token(Some(&current.refresh_token))
            .ok_or_else(|| AppError::Provider("Token response without refresh token".into()))
    }
}

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenResponse {
    /// Convert to a stored token. A missing refresh token falls back to
    /// `previous_refresh`, as providers may omit it on refresh.
    pub fn into_token(self, previous_refresh: Option<&str>) -> Option<OAuthToken> {
        let refresh_token = self
            .refresh_token
            .or_else(|| previous_refresh.map(str::to_string))?;
        // Without a declared lifetime, assume the token is good for a day.
        let lifetime = self.expires_in.unwrap_or(24 * 60 * 60);

        Some(OAuthToken {
            access_token: self.access_token,
            refresh_token,
            expires_at: Utc::now() + Duration::seconds(lifetime),
            token_type: self.token_type.unwrap_or_else(|| "bearer".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_response_keeps_previous_refresh_token() {
        let response = TokenResponse {
            access_token: "new".to_string(),
            refresh_token: None,
            expires_in: Some(3600),
            token_type: None,
        };

        let token = response.into_token(Some("old-refresh")).unwrap();
        assert_eq!(token.access_token, "new");
        assert_eq!(token.refresh_token, "old-refresh");
        assert!(token.is_valid_for(Duration::minutes(59)));
        assert!(!token.is_valid_for(Duration::minutes(61)));
    }

    #[test]
    fn exchange_response_requires_refresh_token() {
        let response = TokenResponse {
            access_token: "new".to_string(),
            refresh_token: None,
            expires_in: Some(3600),
            token_type: None,
        };
        assert!(response.into_token(None).is_none());
    }

    #[tokio::test]
    async fn valid_token_is_returned_unchanged() {
        let client = HhOAuthClient::new(&Config::test_default()).unwrap();
        let current = OAuthToken {
            access_token: "still-good".to_string(),
            refresh_token: "r".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            token_type: "bearer".to_string(),
        };

        // No network call is made for a valid token.
        let token = client.refresh_token(&current).await.unwrap();
        assert_eq!(token, current);
    }
}
