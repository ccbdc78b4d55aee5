// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for the registry and the API.

use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OAuth token pair as issued by the provider.
///
/// Only ever serialized into the registry snapshot, never into a response
/// or a cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: String,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl OAuthToken {
    /// Whether the access token is still usable `margin` from now.
    pub fn is_valid_for(&self, margin: chrono::Duration) -> bool {
        Utc::now() + margin < self.expires_at
    }
}

/// A registered user, keyed by the provider-issued identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Provider user ID (registry key)
    pub id: String,
    pub email: String,
    pub token: OAuthToken,
    /// Last time at least one resume was published
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Total resumes published on the user's behalf
    #[serde(default)]
    pub update_count: u64,
}

impl User {
    pub fn new(id: String, email: String, token: OAuthToken) -> Self {
        Self {
            id,
            email,
            token,
            updated_at: None,
            update_count: 0,
        }
    }

    /// Email with the local part replaced, e.g. `***@example.com`.
    pub fn masked_email(&self) -> String {
        match self.email.find('@') {
            Some(at) => format!("***{}", &self.email[at..]),
            None => "***".to_string(),
        }
    }

    /// Redacted projection safe to hand to clients.
    pub fn to_safe_user(&self) -> SafeUser {
        SafeUser {
            id: self.id.clone(),
            email: Some(self.masked_email()),
            updated_at: self.updated_at.map(format_utc_rfc3339),
            update_count: self.update_count,
        }
    }
}

/// Client-visible view of a user. Sealed into the session cookie and
/// returned by `/me`; carries no token material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeUser {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub update_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> OAuthToken {
        OAuthToken {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
            token_type: "bearer".to_string(),
        }
    }

    #[test]
    fn masked_email_hides_local_part() {
        let user = User::new("1".into(), "john.doe@example.com".into(), token());
        assert_eq!(user.masked_email(), "***@example.com");

        let user = User::new("1".into(), "no-at-sign".into(), token());
        assert_eq!(user.masked_email(), "***");
    }

    #[test]
    fn safe_user_never_carries_token() {
        let user = User::new("42".into(), "a@b.c".into(), token());
        let json = serde_json::to_string(&user.to_safe_user()).unwrap();

        assert!(json.contains("\"id\":\"42\""));
        assert!(!json.contains("access"));
        assert!(!json.contains("refresh"));
    }

    #[test]
    fn token_validity_margin() {
        let mut t = token();
        assert!(t.is_valid_for(chrono::Duration::seconds(10)));

        t.expires_at = Utc::now() + chrono::Duration::seconds(5);
        assert!(!t.is_valid_for(chrono::Duration::seconds(10)));
    }
}
