// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod hh;
pub mod oauth;
pub mod persistence;
pub mod reconciler;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod token_refresher;

pub use hh::{HhClient, ResumeProvider};
pub use oauth::{HhOAuthClient, OAuthProvider};
pub use persistence::PersistenceLoop;
pub use reconciler::{toggle_suffix, ReconcileOutcome, ResumeReconciler};
pub use registry::{RegistrySnapshot, UserRegistry};
pub use scheduler::{CycleSummary, ReconciliationScheduler};
pub use session::{SessionCodec, SessionError};
pub use token_refresher::TokenRefresher;
