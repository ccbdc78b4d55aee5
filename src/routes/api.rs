// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Routes for users holding a valid session cookie.

use crate::middleware::auth::{removal_cookie, AuthUser};
use crate::models::SafeUser;
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use std::sync::Arc;

/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/me", get(get_me))
        .route("/delete", get(delete_account))
}

/// Get the current user, without credentials.
async fn get_me(Extension(AuthUser(user)): Extension<AuthUser>) -> Json<SafeUser> {
    Json(user.to_safe_user())
}

#[derive(Debug, Serialize)]
pub struct DeleteAccountResponse {
    pub success: bool,
    pub message: String,
}

/// Remove the caller from the registry and drop their session cookie.
async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    jar: CookieJar,
) -> (CookieJar, Json<DeleteAccountResponse>) {
    let removed = state.registry.delete(&user.id).is_some();
    tracing::info!(
        user_id = %user.id,
        email = %user.masked_email(),
        removed,
        "User-initiated account deletion"
    );

    (
        jar.add(removal_cookie(&state.config)),
        Json(DeleteAccountResponse {
            success: true,
            message: "Account removed, resumes will no longer be updated".to_string(),
        }),
    )
}
