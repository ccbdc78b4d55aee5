// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! hh-updater server
//!
//! Serves the OAuth login flow and runs the background resume updater
//! until SIGINT or SIGTERM, then saves the registry one last time.

use anyhow::Context;
use hh_updater::{
    config::Config,
    db::RedbStore,
    services::{
        HhClient, HhOAuthClient, PersistenceLoop, ReconciliationScheduler, ResumeReconciler,
        SessionCodec, TokenRefresher, UserRegistry,
    },
    AppState,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging()?;

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(address = %config.listen_address, "Starting hh-updater");

    let sessions = SessionCodec::new(&config.cookie_encryption_key)
        .context("Failed to initialize session codec")?;

    // Open the embedded database and load the saved registry
    let store = RedbStore::open(&config.database_path)
        .with_context(|| format!("Failed to open database {}", config.database_path))?;
    let registry = Arc::new(UserRegistry::new());
    let persistence = Arc::new(PersistenceLoop::new(
        Arc::clone(&registry),
        Arc::new(store),
        config.dump_interval,
    ));
    let restored = persistence
        .restore()
        .await
        .context("Failed to restore users")?;
    tracing::info!(count = restored, "Users loaded from database");

    // Provider clients
    let oauth = Arc::new(HhOAuthClient::new(&config).context("Failed to build OAuth client")?);
    let resumes = Arc::new(
        HhClient::new(&config.api_url, config.provider_timeout)
            .context("Failed to build hh.ru client")?,
    );

    let scheduler = Arc::new(ReconciliationScheduler::new(
        Arc::clone(&registry),
        TokenRefresher::new(oauth.clone(), Arc::clone(&registry), config.provider_timeout),
        ResumeReconciler::new(
            resumes.clone(),
            config.experience_suffix.clone(),
            config.provider_timeout,
        ),
        config.update_interval,
        config.max_concurrent_users,
    ));

    // Background tasks share one cancellation token
    let cancel = CancellationToken::new();
    let scheduler_task = tokio::spawn(scheduler.run(cancel.clone()));
    let persistence_task = tokio::spawn(Arc::clone(&persistence).run(cancel.clone()));

    let state = Arc::new(AppState {
        config: config.clone(),
        registry,
        sessions,
        oauth,
        resumes,
    });
    let app = hh_updater::routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_address))?;
    tracing::info!(address = %config.listen_address, "Server listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    cancel.cancel();
    for (name, task) in [("scheduler", scheduler_task), ("persistence", persistence_task)] {
        if let Err(e) = task.await {
            tracing::error!(task = name, error = %e, "Background task panicked");
        }
    }

    persistence
        .flush()
        .await
        .context("Failed to save users on shutdown")?;
    tracing::info!("Users saved, exiting");

    served.context("Server error")
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Initialize structured JSON logging.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hh_updater=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
