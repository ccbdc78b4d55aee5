// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session cookie authentication middleware.

use crate::config::Config;
use crate::models::{SafeUser, User};
use crate::time_utils::cookie_expiry;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use std::sync::Arc;

/// Session cookies live for a year.
const SESSION_COOKIE_DAYS: i64 = 365;

/// Authenticated user, resolved from the registry.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// Middleware that requires a valid session cookie for a registered user.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let cookie = jar
        .get(&state.config.cookie_name)
        .filter(|c| !c.value().is_empty())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let session: SafeUser = state
        .sessions
        .open(cookie.value())
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let user = state.registry.get(&session.id).ok_or_else(|| {
        tracing::debug!(user_id = %session.id, "Session for unknown user");
        StatusCode::UNAUTHORIZED
    })?;

    request.extensions_mut().insert(AuthUser(user));

    Ok(next.run(request).await)
}

/// Build the session cookie carrying a sealed [`SafeUser`].
pub fn session_cookie(config: &Config, value: String) -> Cookie<'static> {
    let mut cookie = Cookie::build((config.cookie_name.clone(), value))
        .path("/")
        .expires(cookie_expiry(SESSION_COOKIE_DAYS))
        .secure(config.cookie_secure)
        .http_only(true)
        .build();
    if !config.cookie_domain.is_empty() {
        cookie.set_domain(config.cookie_domain.clone());
    }
    cookie
}

/// Cookie that clears the session; attributes match [`session_cookie`].
pub fn removal_cookie(config: &Config) -> Cookie<'static> {
    let mut cookie = session_cookie(config, String::new());
    cookie.set_max_age(time::Duration::ZERO);
    cookie.set_expires(time::OffsetDateTime::UNIX_EPOCH);
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_attributes() {
        let mut config = Config::test_default();
        config.cookie_domain = "updater.example.com".to_string();
        config.cookie_secure = true;

        let rendered = session_cookie(&config, "sealed".to_string()).to_string();
        assert!(rendered.starts_with("hh_session=sealed"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Domain=updater.example.com"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("Expires="));
    }

    #[test]
    fn insecure_origin_omits_secure() {
        let config = Config::test_default();
        let rendered = session_cookie(&config, "sealed".to_string()).to_string();
        assert!(rendered.contains("HttpOnly"));
        assert!(!rendered.contains("Secure"));
    }

    #[test]
    fn removal_cookie_expires_immediately() {
        let config = Config::test_default();
        let rendered = removal_cookie(&config).to_string();
        assert!(rendered.starts_with("hh_session=;"));
        assert!(rendered.contains("Max-Age=0"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Domain=localhost"));
    }
}
