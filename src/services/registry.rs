// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory user registry shared by request handlers and background tasks.
//!
//! All access goes through one lock. Dirty tracking is a pair of revision
//! counters kept under the same lock: every mutation bumps `revision`, and a
//! flush marks the registry clean only up to the revision it actually wrote.

use crate::models::User;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Point-in-time copy of the registry, ready for serialization.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    pub users: HashMap<String, User>,
    /// Revision the copy was taken at; pass to [`UserRegistry::clear_dirty`].
    pub revision: u64,
}

impl RegistrySnapshot {
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.users)
    }
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    revision: u64,
    persisted_revision: u64,
}

impl Inner {
    fn touch(&mut self) {
        self.revision += 1;
    }
}

/// Concurrency-safe map of provider identity to [`User`].
#[derive(Default)]
pub struct UserRegistry {
    inner: RwLock<Inner>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave `Inner` half-updated
    // (every mutation is a single map operation plus a counter bump), so
    // poisoning is safe to ignore.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }

    /// Insert or replace a user. Marks the registry dirty.
    pub fn upsert(&self, user: User) {
        let mut inner = self.write();
        inner.users.insert(user.id.clone(), user);
        inner.touch();
    }

    /// Store a user from a fresh login.
    ///
    /// A known user keeps their update history while identity details and
    /// token come from `user`. Returns the stored user and whether it is new.
    pub fn register(&self, mut user: User) -> (User, bool) {
        let mut inner = self.write();
        let is_new = match inner.users.get(&user.id) {
            Some(existing) => {
                user.updated_at = existing.updated_at;
                user.update_count = existing.update_count;
                false
            }
            None => true,
        };
        inner.users.insert(user.id.clone(), user.clone());
        inner.touch();
        (user, is_new)
    }

    /// Clone of the user with the given identity.
    pub fn get(&self, id: &str) -> Option<User> {
        self.read().users.get(id).cloned()
    }

    /// Remove a user. Returns the removed entry; marks dirty only if one existed.
    pub fn delete(&self, id: &str) -> Option<User> {
        let mut inner = self.write();
        let removed = inner.users.remove(id);
        if removed.is_some() {
            inner.touch();
        }
        removed
    }

    /// Mutate an existing user in place.
    ///
    /// Returns `None` without calling `f` if the user is gone, so a
    /// background task never resurrects a user deleted in the meantime.
    pub fn update<R>(&self, id: &str, f: impl FnOnce(&mut User) -> R) -> Option<R> {
        let mut inner = self.write();
        let result = inner.users.get_mut(id).map(f)?;
        inner.touch();
        Some(result)
    }

    /// Clones of every user, in no particular order.
    pub fn users(&self) -> Vec<User> {
        self.read().users.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().users.is_empty()
    }

    /// Consistent copy of the whole registry.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let inner = self.read();
        RegistrySnapshot {
            users: inner.users.clone(),
            revision: inner.revision,
        }
    }

    /// Replace the whole registry with the serialized snapshot in `blob`.
    ///
    /// The restored state counts as persisted.
    pub fn restore(&self, blob: &[u8]) -> Result<usize, serde_json::Error> {
        let users: HashMap<String, User> = serde_json::from_slice(blob)?;
        let count = users.len();

        let mut inner = self.write();
        inner.users = users;
        inner.touch();
        inner.persisted_revision = inner.revision;
        Ok(count)
    }

    /// Whether the registry changed since the last successful flush.
    pub fn is_dirty(&self) -> bool {
        let inner = self.read();
        inner.revision != inner.persisted_revision
    }

    /// Record that the state at `revision` is durable.
    ///
    /// Mutations made after that snapshot keep the registry dirty.
    pub fn clear_dirty(&self, revision: u64) {
        let mut inner = self.write();
        if revision > inner.persisted_revision {
            inner.persisted_revision = revision;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OAuthToken;
    use chrono::{Duration, Utc};

    fn user(id: &str) -> User {
        User::new(
            id.to_string(),
            format!("{id}@example.com"),
            OAuthToken {
                access_token: format!("access-{id}"),
                refresh_token: format!("refresh-{id}"),
                expires_at: Utc::now() + Duration::hours(1),
                token_type: "bearer".to_string(),
            },
        )
    }

    #[test]
    fn starts_clean_and_empty() {
        let registry = UserRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.is_dirty());
    }

    #[test]
    fn upsert_get_delete() {
        let registry = UserRegistry::new();
        registry.upsert(user("a"));
        assert!(registry.is_dirty());
        assert_eq!(registry.get("a").unwrap().email, "a@example.com");

        assert!(registry.delete("a").is_some());
        assert!(registry.get("a").is_none());
        assert!(registry.delete("a").is_none());
    }

    #[test]
    fn delete_of_missing_user_keeps_clean() {
        let registry = UserRegistry::new();
        registry.delete("ghost");
        assert!(!registry.is_dirty());
    }

    #[test]
    fn update_does_not_resurrect() {
        let registry = UserRegistry::new();
        assert!(registry.update("ghost", |u| u.update_count += 1).is_none());
        assert!(registry.get("ghost").is_none());
        assert!(!registry.is_dirty());

        registry.upsert(user("a"));
        assert_eq!(
            registry.update("a", |u| {
                u.update_count += 2;
                u.update_count
            }),
            Some(2)
        );
    }

    #[test]
    fn register_keeps_history_and_replaces_token() {
        let registry = UserRegistry::new();
        let mut first = user("a");
        first.update_count = 5;
        registry.upsert(first);

        let mut relogin = user("a");
        relogin.token.access_token = "fresh".to_string();
        let (stored, is_new) = registry.register(relogin);

        assert!(!is_new);
        assert_eq!(stored.update_count, 5);
        assert_eq!(registry.get("a").unwrap().token.access_token, "fresh");

        let (_, is_new) = registry.register(user("b"));
        assert!(is_new);
    }

    #[test]
    fn clear_dirty_respects_later_mutations() {
        let registry = UserRegistry::new();
        registry.upsert(user("a"));

        let snapshot = registry.snapshot();
        registry.upsert(user("b"));
        registry.clear_dirty(snapshot.revision);
        assert!(registry.is_dirty(), "write after snapshot must stay dirty");

        let snapshot = registry.snapshot();
        registry.clear_dirty(snapshot.revision);
        assert!(!registry.is_dirty());
    }

    #[test]
    fn stale_clear_does_not_regress() {
        let registry = UserRegistry::new();
        registry.upsert(user("a"));
        let old = registry.snapshot();
        registry.upsert(user("b"));
        let new = registry.snapshot();

        registry.clear_dirty(new.revision);
        registry.clear_dirty(old.revision);
        assert!(!registry.is_dirty());
    }

    #[test]
    fn snapshot_restore_round_trip() {
        let registry = UserRegistry::new();
        let mut a = user("a");
        a.update_count = 7;
        a.updated_at = Some(Utc::now());
        registry.upsert(a);
        registry.upsert(user("b"));

        let blob = registry.snapshot().to_json().unwrap();

        let restored = UserRegistry::new();
        restored.upsert(user("stale"));
        assert_eq!(restored.restore(&blob).unwrap(), 2);

        assert_eq!(restored.snapshot().users, registry.snapshot().users);
        assert!(restored.get("stale").is_none());
        assert!(!restored.is_dirty());
    }

    #[test]
    fn restore_rejects_garbage() {
        let registry = UserRegistry::new();
        registry.upsert(user("a"));
        assert!(registry.restore(b"not json").is_err());
        assert!(registry.get("a").is_some());
    }
}
