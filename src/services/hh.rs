// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! hh.ru REST client for the current user's resumes.
//!
//! Handles:
//! - "who am I" checks
//! - Resume listing, status and publishing
//! - Read-modify-write of resume details

use crate::error::AppError;
use crate::models::resume::ResumeList;
use crate::models::{Me, Resume, ResumeStatus};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Resume operations the reconciler needs from the provider.
#[async_trait]
pub trait ResumeProvider: Send + Sync {
    /// Identity of the token owner.
    async fn who_am_i(&self, access_token: &str) -> Result<Me, AppError>;

    /// All resumes owned by the token owner.
    async fn list_mine(&self, access_token: &str) -> Result<Vec<Resume>, AppError>;

    async fn status(&self, access_token: &str, resume_id: &str)
        -> Result<ResumeStatus, AppError>;

    /// Bump the resume's publication date.
    async fn publish(&self, access_token: &str, resume_id: &str) -> Result<(), AppError>;

    /// Full resume detail.
    async fn read(&self, access_token: &str, resume_id: &str) -> Result<Resume, AppError>;

    /// Push an edited resume back.
    async fn update(&self, access_token: &str, resume: &Resume) -> Result<(), AppError>;
}

/// hh.ru API client.
#[derive(Clone)]
pub struct HhClient {
    http: reqwest::Client,
    base_url: String,
}

impl HhClient {
    /// User agent hh.ru requires on every API request.
    const USER_AGENT: &'static str = concat!("hh-updater/", env!("CARGO_PKG_VERSION"));

    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(Self::USER_AGENT)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        access_token: &str,
    ) -> Result<T, AppError> {
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_response(response).await?;
        response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl ResumeProvider for HhClient {
    async fn who_am_i(&self, access_token: &str) -> Result<Me, AppError> {
        self.get_json("me", access_token).await
    }

    async fn list_mine(&self, access_token: &str) -> Result<Vec<Resume>, AppError> {
        let list: ResumeList = self.get_json("resumes/mine", access_token).await?;
        Ok(list.items)
    }

    async fn status(
        &self,
        access_token: &str,
        resume_id: &str,
    ) -> Result<ResumeStatus, AppError> {
        self.get_json(&format!("resumes/{}/status", resume_id), access_token)
            .await
    }

    async fn publish(&self, access_token: &str, resume_id: &str) -> Result<(), AppError> {
        let response = self
            .http
            .post(self.url(&format!("resumes/{}/publish", resume_id)))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(transport_error)?;

        check_response(response).await?;
        Ok(())
    }

    async fn read(&self, access_token: &str, resume_id: &str) -> Result<Resume, AppError> {
        self.get_json(&format!("resumes/{}", resume_id), access_token)
            .await
    }

    async fn update(&self, access_token: &str, resume: &Resume) -> Result<(), AppError> {
        let response = self
            .http
            .put(self.url(&format!("resumes/{}", resume.id)))
            .bearer_auth(access_token)
            .json(resume)
            .send()
            .await
            .map_err(transport_error)?;

        check_response(response).await?;
        Ok(())
    }
}

pub(crate) fn transport_error(e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::Provider(AppError::PROVIDER_TIMEOUT.to_string())
    } else {
        AppError::Provider(e.to_string())
    }
}

/// Check response status and return error if not successful.
pub(crate) async fn check_response(
    response: reqwest::Response,
) -> Result<reqwest::Response, AppError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if status.as_u16() == 429 {
        tracing::warn!("hh.ru rate limit hit (429)");
        return Err(AppError::Provider(AppError::PROVIDER_RATE_LIMIT.to_string()));
    }

    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(AppError::Provider(AppError::PROVIDER_TOKEN_ERROR.to_string()));
    }

    Err(AppError::Provider(format!("HTTP {}: {}", status, body)))
}

/// Run a provider call under a time budget; overrunning is a provider error.
pub(crate) async fn with_timeout<T>(
    limit: Duration,
    call: impl std::future::Future<Output = Result<T, AppError>>,
) -> Result<T, AppError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| AppError::Provider(AppError::PROVIDER_TIMEOUT.to_string()))?
}
