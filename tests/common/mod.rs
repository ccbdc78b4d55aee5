// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use hh_updater::config::Config;
use hh_updater::error::AppError;
use hh_updater::models::{Experience, Me, OAuthToken, Resume, ResumeStatus, User};
use hh_updater::routes::create_router;
use hh_updater::services::{
    OAuthProvider, ReconciliationScheduler, ResumeProvider, ResumeReconciler, SessionCodec,
    TokenRefresher, UserRegistry,
};
use hh_updater::AppState;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Ordered log of provider calls shared by both fakes.
pub type Events = Arc<Mutex<Vec<String>>>;

/// Token issued to `id` by the fake provider.
pub fn token_for(id: &str) -> OAuthToken {
    OAuthToken {
        access_token: format!("access-{id}"),
        refresh_token: format!("refresh-{id}"),
        expires_at: Utc::now() + Duration::hours(1),
        token_type: "bearer".to_string(),
    }
}

pub fn test_user(id: &str) -> User {
    User::new(id.to_string(), format!("{id}@example.com"), token_for(id))
}

pub fn resume(id: &str, company: &str) -> Resume {
    Resume {
        id: id.to_string(),
        title: format!("Resume {id}"),
        experience: vec![Experience {
            company: company.to_string(),
            position: "Engineer".to_string(),
            ..Default::default()
        }],
        ..Default::default()
    }
}

/// Owner of a fake access token (`access-<id>` or `access-<id>#<generation>`).
fn owner(access_token: &str) -> String {
    access_token
        .trim_start_matches("access-")
        .split('#')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// OAuth provider that accepts `code-<id>` and refreshes on demand.
#[derive(Default)]
pub struct FakeOAuth {
    pub events: Events,
    /// Users whose refresh fails.
    pub fail_refresh: Mutex<HashSet<String>>,
    /// Issue a new access token on every refresh.
    pub rotate: AtomicBool,
    generation: AtomicUsize,
}

#[async_trait]
impl OAuthProvider for FakeOAuth {
    async fn exchange_code(&self, code: &str) -> Result<OAuthToken, AppError> {
        let id = code
            .strip_prefix("code-")
            .ok_or_else(|| AppError::Provider("invalid_grant".to_string()))?;
        Ok(token_for(id))
    }

    async fn refresh_token(&self, current: &OAuthToken) -> Result<OAuthToken, AppError> {
        let id = owner(&current.access_token);
        self.events.lock().unwrap().push(format!("refresh:{id}"));

        if self.fail_refresh.lock().unwrap().contains(&id) {
            return Err(AppError::Provider(AppError::PROVIDER_TOKEN_ERROR.to_string()));
        }
        if !self.rotate.load(Ordering::SeqCst) {
            return Ok(current.clone());
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(OAuthToken {
            access_token: format!("access-{id}#{generation}"),
            ..current.clone()
        })
    }
}

/// In-memory hh.ru with per-user resumes.
#[derive(Default)]
pub struct FakeResumes {
    pub events: Events,
    /// Resumes per user ID.
    pub accounts: Mutex<HashMap<String, Vec<Resume>>>,
    /// Resume IDs the provider refuses to publish.
    pub ineligible: Mutex<HashSet<String>>,
    /// Users whose resume listing fails.
    pub fail_list: Mutex<HashSet<String>>,
    /// `(user, resume)` pairs published so far.
    pub published: Mutex<Vec<(String, String)>>,
    /// Make every call hang forever.
    pub hang: AtomicBool,
}

impl FakeResumes {
    pub fn set_resumes(&self, user_id: &str, resumes: Vec<Resume>) {
        self.accounts
            .lock()
            .unwrap()
            .insert(user_id.to_string(), resumes);
    }

    pub fn resumes_of(&self, user_id: &str) -> Vec<Resume> {
        self.accounts
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn published_by(&self, user_id: &str) -> usize {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|(user, _)| user == user_id)
            .count()
    }

    async fn maybe_hang(&self) {
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl ResumeProvider for FakeResumes {
    async fn who_am_i(&self, access_token: &str) -> Result<Me, AppError> {
        self.maybe_hang().await;
        let id = owner(access_token);
        Ok(Me {
            email: Some(format!("{id}@example.com")),
            id,
            first_name: None,
            last_name: None,
        })
    }

    async fn list_mine(&self, access_token: &str) -> Result<Vec<Resume>, AppError> {
        self.maybe_hang().await;
        self.events
            .lock()
            .unwrap()
            .push(format!("list:{access_token}"));

        let id = owner(access_token);
        if self.fail_list.lock().unwrap().contains(&id) {
            return Err(AppError::Provider("HTTP 500: boom".to_string()));
        }
        Ok(self.resumes_of(&id))
    }

    async fn status(&self, _access_token: &str, resume_id: &str) -> Result<ResumeStatus, AppError> {
        self.maybe_hang().await;
        Ok(ResumeStatus {
            can_publish_or_update: !self.ineligible.lock().unwrap().contains(resume_id),
            ..Default::default()
        })
    }

    async fn publish(&self, access_token: &str, resume_id: &str) -> Result<(), AppError> {
        self.maybe_hang().await;
        self.published
            .lock()
            .unwrap()
            .push((owner(access_token), resume_id.to_string()));
        Ok(())
    }

    async fn read(&self, access_token: &str, resume_id: &str) -> Result<Resume, AppError> {
        self.maybe_hang().await;
        self.resumes_of(&owner(access_token))
            .into_iter()
            .find(|r| r.id == resume_id)
            .ok_or_else(|| AppError::Provider("HTTP 404: resume not found".to_string()))
    }

    async fn update(&self, access_token: &str, resume: &Resume) -> Result<(), AppError> {
        self.maybe_hang().await;
        let mut accounts = self.accounts.lock().unwrap();
        let stored = accounts
            .get_mut(&owner(access_token))
            .and_then(|list| list.iter_mut().find(|r| r.id == resume.id))
            .ok_or_else(|| AppError::Provider("HTTP 404: resume not found".to_string()))?;
        *stored = resume.clone();
        Ok(())
    }
}

/// Both fakes, sharing one event log.
pub fn fakes() -> (Arc<FakeOAuth>, Arc<FakeResumes>) {
    let events = Events::default();
    let oauth = FakeOAuth {
        events: events.clone(),
        ..Default::default()
    };
    let resumes = FakeResumes {
        events,
        ..Default::default()
    };
    (Arc::new(oauth), Arc::new(resumes))
}

pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub oauth: Arc<FakeOAuth>,
    pub resumes: Arc<FakeResumes>,
}

impl TestApp {
    /// `Cookie` header value carrying a valid session for `user`.
    pub fn cookie_for(&self, user: &User) -> String {
        let sealed = self.state.sessions.seal(&user.to_safe_user()).unwrap();
        format!("{}={}", self.state.config.cookie_name, sealed)
    }
}

/// Create a test app with fake providers.
pub fn create_test_app() -> TestApp {
    let config = Config::test_default();
    let sessions = SessionCodec::new(&config.cookie_encryption_key).unwrap();
    let (oauth, resumes) = fakes();

    let state = Arc::new(AppState {
        config,
        registry: Arc::new(UserRegistry::new()),
        sessions,
        oauth: oauth.clone(),
        resumes: resumes.clone(),
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        oauth,
        resumes,
    }
}

/// Scheduler over the fakes with the given suffix and per-call timeout.
pub fn scheduler(
    registry: &Arc<UserRegistry>,
    oauth: &Arc<FakeOAuth>,
    resumes: &Arc<FakeResumes>,
    suffix: &str,
    timeout: std::time::Duration,
) -> ReconciliationScheduler {
    ReconciliationScheduler::new(
        registry.clone(),
        TokenRefresher::new(oauth.clone(), registry.clone(), timeout),
        ResumeReconciler::new(resumes.clone(), suffix.to_string(), timeout),
        std::time::Duration::from_secs(3600),
        4,
    )
}
