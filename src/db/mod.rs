// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable storage for the user registry snapshot.

pub mod memory;
pub mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

/// Bucket (redb table) holding the registry.
pub const USERS_BUCKET: &str = "usersv1";
/// Key of the serialized registry inside [`USERS_BUCKET`].
pub const USERS_KEY: &str = "list";

/// Whole-value persistence for the serialized registry.
///
/// Implementations are blocking; async callers go through
/// `spawn_blocking`.
pub trait PersistenceStore: Send + Sync {
    /// Read the last saved snapshot, if any.
    fn load(&self) -> Result<Option<Vec<u8>>, StoreError>;

    /// Atomically replace the saved snapshot.
    fn save(&self, value: &[u8]) -> Result<(), StoreError>;
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Storage(String),
}
