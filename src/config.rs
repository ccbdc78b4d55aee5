// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup. Any malformed value is a startup
//! error: the process refuses to run with a half-valid configuration.

use std::env;
use std::time::Duration;

/// Default hh.ru endpoints.
pub const DEFAULT_API_URL: &str = "https://api.hh.ru";
pub const DEFAULT_AUTHORIZE_URL: &str = "https://hh.ru/oauth/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://hh.ru/oauth/token";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- OAuth client ---
    /// hh.ru OAuth client ID (public)
    pub client_id: String,
    /// hh.ru OAuth client secret
    pub client_secret: String,
    /// Callback URL registered with the provider
    pub redirect_url: String,
    /// Provider authorization page
    pub authorize_url: String,
    /// Provider token endpoint
    pub token_url: String,
    /// Provider REST API base URL (no trailing slash)
    pub api_url: String,
    /// HMAC key for the OAuth CSRF state parameter
    pub oauth_state_key: Vec<u8>,

    // --- HTTP surface ---
    /// Socket address to listen on
    pub listen_address: String,
    /// Public base URL of this service
    pub public_url: String,
    /// Where `/callback` sends the browser on success
    pub success_redirect: String,
    /// Where `/callback` sends the browser on failure
    pub error_redirect: String,

    // --- Session cookie ---
    pub cookie_name: String,
    /// Cookie domain, derived from `public_url` (port stripped)
    pub cookie_domain: String,
    /// Set when `public_url` is https
    pub cookie_secure: bool,
    /// Raw AES-GCM key (16 or 32 bytes)
    pub cookie_encryption_key: Vec<u8>,

    // --- Background work ---
    pub database_path: String,
    pub update_interval: Duration,
    pub dump_interval: Duration,
    /// Upper bound for any single provider call
    pub provider_timeout: Duration,
    pub max_concurrent_users: usize,
    /// Suffix toggled on experience entries; empty disables the edit step
    pub experience_suffix: String,
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let public_url = required("PUBLIC_URL")?;
        let (cookie_domain, cookie_secure) = cookie_attributes(&public_url)?;

        let cookie_encryption_key = required("COOKIE_ENCRYPTION_KEY")?.into_bytes();
        validate_cookie_key(&cookie_encryption_key)?;

        Ok(Self {
            client_id: required("HH_CLIENT_ID")?,
            client_secret: required("HH_CLIENT_SECRET").map(|v| v.trim().to_string())?,
            redirect_url: required("REDIRECT_URL")?,
            authorize_url: optional("HH_AUTHORIZE_URL", DEFAULT_AUTHORIZE_URL),
            token_url: optional("HH_TOKEN_URL", DEFAULT_TOKEN_URL),
            api_url: optional("HH_API_URL", DEFAULT_API_URL)
                .trim_end_matches('/')
                .to_string(),
            oauth_state_key: required("OAUTH_STATE_KEY")?.into_bytes(),

            listen_address: optional("LISTEN_ADDRESS", "0.0.0.0:8080"),
            public_url,
            success_redirect: optional("SUCCESS_REDIRECT", "/logged.html"),
            error_redirect: optional("ERROR_REDIRECT", "/error.html"),

            cookie_name: optional("COOKIE_NAME", "hh_session"),
            cookie_domain,
            cookie_secure,
            cookie_encryption_key,

            database_path: optional("DATABASE_PATH", "hh-updater.redb"),
            update_interval: positive_secs("UPDATE_INTERVAL_SECS", 3600)?,
            dump_interval: positive_secs("DUMP_INTERVAL_SECS", 60)?,
            provider_timeout: positive_secs("PROVIDER_TIMEOUT_SECS", 30)?,
            max_concurrent_users: number("MAX_CONCURRENT_USERS", 4)?.max(1) as usize,
            experience_suffix: env::var("EXPERIENCE_SUFFIX").unwrap_or_default(),
        })
    }

    /// Deterministic configuration for tests.
    pub fn test_default() -> Self {
        Self {
            client_id: "test_client_id".to_string(),
            client_secret: "test_secret".to_string(),
            redirect_url: "http://localhost:8080/callback".to_string(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            oauth_state_key: b"test_state_key".to_vec(),
            listen_address: "127.0.0.1:0".to_string(),
            public_url: "http://localhost:8080".to_string(),
            success_redirect: "/logged.html".to_string(),
            error_redirect: "/error.html".to_string(),
            cookie_name: "hh_session".to_string(),
            cookie_domain: "localhost".to_string(),
            cookie_secure: false,
            cookie_encryption_key: b"0123456789abcdef0123456789abcdef".to_vec(),
            database_path: "hh-updater-test.redb".to_string(),
            update_interval: Duration::from_secs(3600),
            dump_interval: Duration::from_secs(60),
            provider_timeout: Duration::from_secs(5),
            max_concurrent_users: 4,
            experience_suffix: String::new(),
        }
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn optional(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn number(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// A duration in whole seconds; zero is rejected.
fn positive_secs(name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    match number(name, default)? {
        0 => Err(ConfigError::Invalid(name, "must be greater than zero".to_string())),
        secs => Ok(Duration::from_secs(secs)),
    }
}

/// Derive the cookie domain and `Secure` flag from the public base URL.
pub fn cookie_attributes(public_url: &str) -> Result<(String, bool), ConfigError> {
    let url = url::Url::parse(public_url)
        .map_err(|e| ConfigError::Invalid("PUBLIC_URL", format!("{public_url}: {e}")))?;
    // `host_str` never includes the port.
    let host = url
        .host_str()
        .ok_or_else(|| ConfigError::Invalid("PUBLIC_URL", public_url.to_string()))?;
    Ok((host.to_string(), url.scheme() == "https"))
}

/// AES-GCM accepts 128- or 256-bit keys.
pub fn validate_cookie_key(key: &[u8]) -> Result<(), ConfigError> {
    match key.len() {
        16 | 32 => Ok(()),
        n => Err(ConfigError::Invalid(
            "COOKIE_ENCRYPTION_KEY",
            format!("key must be 16 or 32 bytes, got {n}"),
        )),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
