// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Periodic reconciliation over every registered user.

use crate::models::User;
use crate::services::{ReconcileOutcome, ResumeReconciler, TokenRefresher, UserRegistry};
use chrono::Utc;
use futures_util::{stream, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Result of one reconciliation pass over the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Users visited.
    pub processed: usize,
    /// Users with at least one resume published.
    pub updated: usize,
    /// Users dropped because they have no resumes left.
    pub removed: usize,
    /// Users skipped after a refresh or provider error.
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UserOutcome {
    Updated,
    Unchanged,
    Removed,
    Failed,
}

pub struct ReconciliationScheduler {
    registry: Arc<UserRegistry>,
    refresher: TokenRefresher,
    reconciler: ResumeReconciler,
    interval: Duration,
    max_concurrent_users: usize,
}

impl ReconciliationScheduler {
    pub fn new(
        registry: Arc<UserRegistry>,
        refresher: TokenRefresher,
        reconciler: ResumeReconciler,
        interval: Duration,
        max_concurrent_users: usize,
    ) -> Self {
        Self {
            registry,
            refresher,
            reconciler,
            interval,
            max_concurrent_users: max_concurrent_users.max(1),
        }
    }

    /// Run cycles every `interval` until `cancel` fires.
    ///
    /// The first cycle starts immediately. Cancellation interrupts both the
    /// wait between cycles and a cycle in flight; registry writes are
    /// individually atomic, so an abandoned cycle leaves no torn state.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        tracing::info!(interval = ?self.interval, "Reconciliation scheduler started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Abandoning in-flight reconciliation cycle");
                    break;
                }
                summary = self.run_cycle() => {
                    tracing::info!(
                        processed = summary.processed,
                        updated = summary.updated,
                        removed = summary.removed,
                        failed = summary.failed,
                        "Reconciliation cycle finished"
                    );
                }
            }
        }

        tracing::info!("Reconciliation scheduler stopped");
    }

    /// One pass over every user currently in the registry.
    ///
    /// Users are processed concurrently up to `max_concurrent_users`; one
    /// user's failure never stops the others.
    pub async fn run_cycle(&self) -> CycleSummary {
        let users = self.registry.users();
        let processed = users.len();

        let updated = AtomicUsize::new(0);
        let removed = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);

        stream::iter(users)
            .for_each_concurrent(self.max_concurrent_users, |user| {
                let (updated, removed, failed) = (&updated, &removed, &failed);
                async move {
                    match self.process_user(user).await {
                        UserOutcome::Updated => updated.fetch_add(1, Ordering::Relaxed),
                        UserOutcome::Removed => removed.fetch_add(1, Ordering::Relaxed),
                        UserOutcome::Failed => failed.fetch_add(1, Ordering::Relaxed),
                        UserOutcome::Unchanged => 0,
                    };
                }
            })
            .await;

        CycleSummary {
            processed,
            updated: updated.into_inner(),
            removed: removed.into_inner(),
            failed: failed.into_inner(),
        }
    }

    /// Refresh the token, then reconcile.
    async fn process_user(&self, user: User) -> UserOutcome {
        tracing::debug!(user_id = %user.id, email = %user.masked_email(), "Processing user");

        // Errors are logged by the refresher; skip until next cycle.
        let Ok(user) = self.refresher.refresh(user).await else {
            return UserOutcome::Failed;
        };

        match self.reconciler.reconcile(&user).await {
            Ok(ReconcileOutcome::NoResumes) => {
                tracing::info!(
                    user_id = %user.id,
                    email = %user.masked_email(),
                    "Deleting user with empty resume list"
                );
                self.registry.delete(&user.id);
                UserOutcome::Removed
            }
            Ok(ReconcileOutcome::Published(0)) => UserOutcome::Unchanged,
            Ok(ReconcileOutcome::Published(count)) => {
                let now = Utc::now();
                self.registry.update(&user.id, |u| {
                    u.update_count += count as u64;
                    u.updated_at = Some(now);
                });
                UserOutcome::Updated
            }
            Err(_) => UserOutcome::Failed,
        }
    }
}
