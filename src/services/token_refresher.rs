// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Keeps registry tokens fresh ahead of each reconciliation.

use crate::error::AppError;
use crate::models::User;
use crate::services::hh::with_timeout;
use crate::services::{OAuthProvider, UserRegistry};
use std::sync::Arc;
use std::time::Duration;

pub struct TokenRefresher {
    oauth: Arc<dyn OAuthProvider>,
    registry: Arc<UserRegistry>,
    timeout: Duration,
}

impl TokenRefresher {
    pub fn new(
        oauth: Arc<dyn OAuthProvider>,
        registry: Arc<UserRegistry>,
        timeout: Duration,
    ) -> Self {
        Self {
            oauth,
            registry,
            timeout,
        }
    }

    /// Ask the provider for a current token and store it if it changed.
    ///
    /// Returns the user carrying the token to use for this cycle. On error
    /// the registry entry is left untouched; the next cycle retries.
    pub async fn refresh(&self, mut user: User) -> Result<User, AppError> {
        let token = with_timeout(self.timeout, self.oauth.refresh_token(&user.token))
            .await
            .map_err(|e| {
                if e.is_provider_token_error() {
                    tracing::warn!(
                        user_id = %user.id,
                        email = %user.masked_email(),
                        "Refresh token rejected, user must log in again"
                    );
                } else {
                    tracing::error!(
                        user_id = %user.id,
                        email = %user.masked_email(),
                        error = %e,
                        "Error getting token"
                    );
                }
                e
            })?;

        if token.access_token == user.token.access_token {
            return Ok(user);
        }

        // Only replace the token this refresh started from; a login that
        // landed in the meantime wins.
        let expires_at = token.expires_at;
        let previous = user.token.access_token.clone();
        let stored = self.registry.update(&user.id, |u| {
            if u.token.access_token == previous {
                u.token = token.clone();
                None
            } else {
                Some(u.token.clone())
            }
        });

        match stored {
            Some(None) => {
                tracing::info!(
                    user_id = %user.id,
                    expires_at = %expires_at,
                    "Token refreshed"
                );
                user.token = token;
            }
            Some(Some(newer)) => {
                tracing::debug!(user_id = %user.id, "Token replaced by a login during refresh");
                user.token = newer;
            }
            None => {
                tracing::debug!(user_id = %user.id, "User removed during token refresh");
                user.token = token;
            }
        }
        Ok(user)
    }
}
