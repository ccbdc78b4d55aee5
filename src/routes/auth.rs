// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! hh.ru OAuth authentication routes.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::middleware::auth::{removal_cookie, session_cookie};
use crate::models::{OAuthToken, User};
use crate::services::hh::with_timeout;
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long an issued OAuth state stays acceptable.
const STATE_MAX_AGE_MS: u128 = 10 * 60 * 1000;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/authorize", get(authorize))
        .route("/callback", get(callback))
        .route("/logout", get(logout))
}

/// Start OAuth flow - redirect to hh.ru authorization.
async fn authorize(State(state): State<Arc<AppState>>) -> Result<Redirect> {
    let oauth_state = issue_state(&state.config.oauth_state_key, now_millis()?)?;

    let auth_url = format!(
        "{}?response_type=code&client_id={}&redirect_uri={}&state={}",
        state.config.authorize_url,
        urlencoding::encode(&state.config.client_id),
        urlencoding::encode(&state.config.redirect_url),
        oauth_state
    );

    tracing::info!(client_id = %state.config.client_id, "Starting OAuth flow, redirecting to hh.ru");
    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code for a token, register the user, set the session cookie.
async fn callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    match login(&state, params).await {
        Ok(user) => match state.sessions.seal(&user.to_safe_user()) {
            Ok(sealed) => {
                let jar = jar.add(session_cookie(&state.config, sealed));
                (jar, Redirect::to(&state.config.success_redirect)).into_response()
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to seal session cookie");
                Redirect::to(&state.config.error_redirect).into_response()
            }
        },
        Err(e) => {
            tracing::error!(error = %e, "OAuth callback failed");
            Redirect::to(&state.config.error_redirect).into_response()
        }
    }
}

/// Validate the callback, resolve the user and store them in the registry.
async fn login(state: &AppState, params: CallbackParams) -> Result<User> {
    if let Some(error) = params.error {
        return Err(AppError::BadRequest(format!("OAuth error from hh.ru: {}", error)));
    }

    let oauth_state = params
        .state
        .ok_or_else(|| AppError::BadRequest("Missing OAuth state".to_string()))?;
    if !verify_state(&oauth_state, &state.config.oauth_state_key, now_millis()?) {
        tracing::warn!("Invalid or tampered OAuth state parameter");
        return Err(AppError::BadRequest("Invalid OAuth state".to_string()));
    }

    let code = params
        .code
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    tracing::info!("Exchanging authorization code for token");
    let timeout = state.config.provider_timeout;
    let token = with_timeout(timeout, state.oauth.exchange_code(&code)).await?;
    let me = with_timeout(timeout, state.resumes.who_am_i(&token.access_token)).await?;

    Ok(register(state, me.id, me.email.unwrap_or_default(), token))
}

/// Insert a new user or refresh the credentials of a known one.
fn register(state: &AppState, id: String, email: String, token: OAuthToken) -> User {
    let (user, is_new) = state.registry.register(User::new(id, email, token));

    if is_new {
        tracing::info!(user_id = %user.id, email = %user.masked_email(), "User added");
    } else {
        tracing::debug!(user_id = %user.id, email = %user.masked_email(), "User logged in");
    }
    user
}

/// Logout - clear the session cookie and go home.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, Redirect) {
    (jar.add(removal_cookie(&state.config)), Redirect::to("/"))
}

fn now_millis() -> Result<u128> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis())
}

fn sign(payload: &str, secret: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Build a signed OAuth state: `base64url("nonce_hex|timestamp_hex|signature_hex")`.
fn issue_state(secret: &[u8], now_ms: u128) -> Result<String> {
    let mut nonce = [0u8; 16];
    SystemRandom::new()
        .fill(&mut nonce)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Random generator failure")))?;

    let payload = format!("{}|{:x}", hex::encode(nonce), now_ms);
    let signature = sign(&payload, secret)?;

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Verify signature and age of an OAuth state parameter.
fn verify_state(state: &str, secret: &[u8], now_ms: u128) -> bool {
    let Some(state_str) = URL_SAFE_NO_PAD
        .decode(state)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
    else {
        return false;
    };

    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    let [nonce_hex, timestamp_hex, signature_hex] = parts.as_slice() else {
        return false;
    };

    let payload = format!("{}|{}", nonce_hex, timestamp_hex);
    let Ok(expected) = sign(&payload, secret) else {
        return false;
    };
    if !bool::from(expected.as_bytes().ct_eq(signature_hex.as_bytes())) {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return false;
    }

    match u128::from_str_radix(timestamp_hex, 16) {
        Ok(issued) => now_ms.saturating_sub(issued) <= STATE_MAX_AGE_MS,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"secret_key";
    const NOW: u128 = 1_700_000_000_000;

    #[test]
    fn test_state_round_trip() {
        let state = issue_state(SECRET, NOW).unwrap();
        assert!(verify_state(&state, SECRET, NOW + 1000));
    }

    #[test]
    fn test_state_is_url_safe_and_unique() {
        let a = issue_state(SECRET, NOW).unwrap();
        let b = issue_state(SECRET, NOW).unwrap();
        assert_ne!(a, b);
        assert!(!a.contains('+') && !a.contains('/') && !a.contains('='));
    }

    #[test]
    fn test_state_wrong_secret() {
        let state = issue_state(SECRET, NOW).unwrap();
        assert!(!verify_state(&state, b"wrong_key", NOW));
    }

    #[test]
    fn test_state_expired() {
        let state = issue_state(SECRET, NOW).unwrap();
        assert!(!verify_state(&state, SECRET, NOW + STATE_MAX_AGE_MS + 1));
    }

    #[test]
    fn test_state_tampered_timestamp() {
        let state = issue_state(SECRET, NOW).unwrap();
        let decoded = String::from_utf8(URL_SAFE_NO_PAD.decode(&state).unwrap()).unwrap();
        let parts: Vec<&str> = decoded.split('|').collect();
        let forged = format!("{}|{:x}|{}", parts[0], NOW + 5, parts[2]);

        assert!(!verify_state(&URL_SAFE_NO_PAD.encode(forged), SECRET, NOW));
    }

    #[test]
    fn test_state_malformed() {
        assert!(!verify_state("", SECRET, NOW));
        assert!(!verify_state("not-valid-base64!!!", SECRET, NOW));
        assert!(!verify_state(&URL_SAFE_NO_PAD.encode("a|b"), SECRET, NOW));
    }
}
