// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! hh-updater: keep hh.ru resumes fresh on the user's behalf
//!
//! Users authorize through hh.ru OAuth once; a background scheduler then
//! refreshes their tokens and republishes their resumes on a fixed interval,
//! while the registry of users is flushed to an embedded database.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::{OAuthProvider, ResumeProvider, SessionCodec, UserRegistry};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub registry: Arc<UserRegistry>,
    pub sessions: SessionCodec,
    pub oauth: Arc<dyn OAuthProvider>,
    pub resumes: Arc<dyn ResumeProvider>,
}
