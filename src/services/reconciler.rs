// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user resume reconciliation.
//!
//! For one user: confirm the token still resolves to an account, publish
//! every resume the provider allows to be bumped, and optionally toggle a
//! marker suffix on each experience entry so the resume registers as edited.

use crate::error::AppError;
use crate::models::{Resume, User};
use crate::services::hh::with_timeout;
use crate::services::ResumeProvider;
use std::sync::Arc;
use std::time::Duration;

/// What a reconciliation pass concluded for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Number of resumes published this pass (may be zero).
    Published(usize),
    /// The user has no resumes left; they should be dropped from the registry.
    NoResumes,
}

/// Append `suffix` to `text`, or strip it if `text` already ends with it.
///
/// An empty suffix leaves `text` unchanged.
pub fn toggle_suffix(text: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        return text.to_string();
    }
    match text.strip_suffix(suffix) {
        Some(stripped) => stripped.to_string(),
        None => format!("{text}{suffix}"),
    }
}

/// Toggle `suffix` on the company name of every experience entry.
pub fn toggle_company_names(resume: &mut Resume, suffix: &str) {
    for entry in &mut resume.experience {
        entry.company = toggle_suffix(&entry.company, suffix);
    }
}

pub struct ResumeReconciler {
    provider: Arc<dyn ResumeProvider>,
    suffix: String,
    timeout: Duration,
}

impl ResumeReconciler {
    pub fn new(provider: Arc<dyn ResumeProvider>, suffix: String, timeout: Duration) -> Self {
        Self {
            provider,
            suffix,
            timeout,
        }
    }

    /// Run one reconciliation pass for `user`, whose token must be current.
    ///
    /// Fails only if the user cannot be identified or their resumes cannot be
    /// listed. Per-resume failures are logged and skipped.
    pub async fn reconcile(&self, user: &User) -> Result<ReconcileOutcome, AppError> {
        let token = user.token.access_token.as_str();

        with_timeout(self.timeout, self.provider.who_am_i(token))
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user.id, error = %e, "Error getting user information");
                e
            })?;

        tracing::debug!(user_id = %user.id, "Getting resumes");
        let resumes = with_timeout(self.timeout, self.provider.list_mine(token))
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user.id, error = %e, "Error listing resumes");
                e
            })?;

        if resumes.is_empty() {
            return Ok(ReconcileOutcome::NoResumes);
        }

        let mut published = 0;
        for resume in &resumes {
            if self.publish_resume(user, token, resume).await {
                published += 1;
            }
        }

        Ok(ReconcileOutcome::Published(published))
    }

    /// Publish one resume if the provider allows it. Returns whether it was published.
    async fn publish_resume(&self, user: &User, token: &str, resume: &Resume) -> bool {
        tracing::debug!(resume = %resume.title, "Requesting resume status");
        let status = match with_timeout(self.timeout, self.provider.status(token, &resume.id)).await
        {
            Ok(status) => status,
            Err(e) => {
                tracing::error!(
                    user_id = %user.id,
                    resume = %resume.title,
                    error = %e,
                    "Error getting resume status"
                );
                return false;
            }
        };

        if !status.can_publish_or_update {
            tracing::debug!(resume = %resume.title, "Skipping publish, resume not eligible");
            return false;
        }

        if let Err(e) = with_timeout(self.timeout, self.provider.publish(token, &resume.id)).await {
            tracing::error!(
                user_id = %user.id,
                resume = %resume.title,
                error = %e,
                "Error publishing resume"
            );
            return false;
        }

        // The publish already counts; a failed edit only loses the cosmetic bump.
        if let Err(e) = self.toggle_experience(token, &resume.id).await {
            tracing::error!(
                user_id = %user.id,
                resume = %resume.title,
                error = %e,
                "Error editing resume"
            );
        }

        tracing::info!(user_id = %user.id, resume = %resume.title, "Resume updated");
        true
    }

    async fn toggle_experience(&self, token: &str, resume_id: &str) -> Result<(), AppError> {
        if self.suffix.is_empty() {
            return Ok(());
        }

        let mut detail = with_timeout(self.timeout, self.provider.read(token, resume_id)).await?;
        toggle_company_names(&mut detail, &self.suffix);
        with_timeout(self.timeout, self.provider.update(token, &detail)).await
    }
}
