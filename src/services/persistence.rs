// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Debounced persistence of the user registry.
//!
//! The registry is written as one JSON blob, and only when it changed since
//! the last successful write. Flushes are serialized by an async mutex.

use crate::db::PersistenceStore;
use crate::error::AppError;
use crate::services::UserRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub struct PersistenceLoop {
    registry: Arc<UserRegistry>,
    store: Arc<dyn PersistenceStore>,
    interval: Duration,
    flush_lock: Mutex<()>,
}

impl PersistenceLoop {
    pub fn new(
        registry: Arc<UserRegistry>,
        store: Arc<dyn PersistenceStore>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            store,
            interval,
            flush_lock: Mutex::new(()),
        }
    }

    /// Load the saved snapshot into the registry. Returns the user count.
    pub async fn restore(&self) -> Result<usize, AppError> {
        let store = Arc::clone(&self.store);
        let blob = tokio::task::spawn_blocking(move || store.load())
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Restore task failed: {}", e)))??;

        match blob {
            Some(blob) => self
                .registry
                .restore(&blob)
                .map_err(|e| AppError::Storage(format!("Corrupt registry snapshot: {}", e))),
            None => {
                tracing::warn!("No entries in database");
                Ok(0)
            }
        }
    }

    /// Write the registry if it is dirty. Returns whether a write happened.
    pub async fn flush_if_dirty(&self) -> Result<bool, AppError> {
        let _guard = self.flush_lock.lock().await;
        if !self.registry.is_dirty() {
            return Ok(false);
        }
        self.write_snapshot().await?;
        Ok(true)
    }

    /// Write the registry regardless of the dirty flag.
    pub async fn flush(&self) -> Result<(), AppError> {
        let _guard = self.flush_lock.lock().await;
        self.write_snapshot().await
    }

    /// Caller must hold `flush_lock`.
    async fn write_snapshot(&self) -> Result<(), AppError> {
        let snapshot = self.registry.snapshot();
        let blob = snapshot
            .to_json()
            .map_err(|e| AppError::Storage(format!("Registry serialization failed: {}", e)))?;

        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.save(&blob))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Save task failed: {}", e)))??;

        self.registry.clear_dirty(snapshot.revision);
        tracing::debug!(users = snapshot.users.len(), "Saved to disk");
        Ok(())
    }

    /// Flush every `interval` until `cancel` fires.
    ///
    /// Failed writes are logged and retried on the next tick. The final
    /// shutdown flush is the caller's job.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        tracing::info!(interval = ?self.interval, "Persistence loop started");
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.flush_if_dirty().await {
                tracing::error!(error = %e, "Error saving to disk");
            }
        }

        tracing::info!("Persistence loop stopped");
    }
}
