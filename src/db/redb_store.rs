// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! redb-backed registry storage.
//!
//! The database file holds OAuth tokens in the clear and is created with
//! owner-only permissions on Unix.

use super::{PersistenceStore, StoreError, USERS_BUCKET, USERS_KEY};
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new(USERS_BUCKET);

/// Registry store on an embedded redb database.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create the database and make sure the users bucket exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        prepare_file(path)?;
        let db = Database::create(path).map_err(storage)?;

        let write_txn = db.begin_write().map_err(storage)?;
        {
            let _table = write_txn.open_table(USERS).map_err(storage)?;
        }
        write_txn.commit().map_err(storage)?;

        tracing::debug!(path = %path.display(), "Registry database opened");
        Ok(Self { db: Arc::new(db) })
    }
}

impl PersistenceStore for RedbStore {
    fn load(&self) -> Result<Option<Vec<u8>>, StoreError> {
        let read_txn = self.db.begin_read().map_err(storage)?;
        let table = read_txn.open_table(USERS).map_err(storage)?;

        let value = table.get(USERS_KEY).map_err(storage)?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn save(&self, value: &[u8]) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = write_txn.open_table(USERS).map_err(storage)?;
            table.insert(USERS_KEY, value).map_err(storage)?;
        }
        write_txn.commit().map_err(storage)?;
        Ok(())
    }
}

fn storage(e: impl std::fmt::Display) -> StoreError {
    StoreError::Storage(e.to_string())
}

/// Make sure the file exists with owner-only permissions before redb opens it.
#[cfg(unix)]
fn prepare_file(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .mode(0o600)
        .open(path)
        .map_err(storage)?;
    // `mode` only applies on creation; tighten files left by older runs.
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(storage)
}

#[cfg(not(unix))]
fn prepare_file(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}
