//! The Catalog Store (§4.1): a single-writer-at-a-time embedded relational
//! store fronted by a process-wide counting semaphore held across every
//! write transaction.

use crate::error::{CatalogError, Result};
use crate::schema::MIGRATIONS;
use concurrency::NamedSemaphore;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One of the three logical databases a run maintains (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Source,
    Filter,
    Target,
}

impl Role {
    pub fn file_name(self) -> &'static str {
        match self {
            Role::Source => "source.db",
            Role::Filter => "filter.db",
            Role::Target => "target.db",
        }
    }
}

/// A single-file embedded relational store. `rusqlite::Connection` is
/// synchronous, so every public method on [`crate::CatalogStore`] (the
/// façade built from this type's submodules) runs its body on a blocking
/// task and surfaces [`CatalogError`] to async callers.
#[derive(Clone)]
pub struct CatalogStore {
    role: Role,
    path: PathBuf,
    conn: Arc<Mutex<Connection>>,
    /// Serializes writers across every task sharing this store, mirroring
    /// the reference's process-wide catalog semaphore.
    write_lock: NamedSemaphore,
}

impl CatalogStore {
    /// Opens (creating if needed) the catalog file at `path`, running
    /// pending migrations. Idempotent: reopening an existing file with an
    /// up-to-date schema is a no-op beyond the connection handshake, which
    /// is what makes `--resume` safe.
    pub fn open(role: Role, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        MIGRATIONS.to_latest(&mut conn)?;
        Ok(Self {
            role,
            path,
            conn: Arc::new(Mutex::new(conn)),
            write_lock: NamedSemaphore::catalog(),
        })
    }

    /// In-memory store, used by unit tests that don't need file durability.
    pub fn open_in_memory(role: Role) -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        MIGRATIONS.to_latest(&mut conn)?;
        Ok(Self {
            role,
            path: PathBuf::from(":memory:"),
            conn: Arc::new(Mutex::new(conn)),
            write_lock: NamedSemaphore::catalog(),
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs a read-only closure on the blocking pool without taking the
    /// catalog write semaphore; iteration is still serialized against
    /// writers by SQLite's own file-level locking.
    pub(crate) async fn read<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().expect("catalog connection mutex poisoned");
            f(&guard).map_err(CatalogError::from)
        })
        .await?
    }

    /// Runs a write closure on the blocking pool, holding the named catalog
    /// semaphore across the whole transaction (§4.2.2).
    pub(crate) async fn write<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let _permit = self.write_lock.acquire().await;
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().expect("catalog connection mutex poisoned");
            f(&mut guard).map_err(CatalogError::from)
        })
        .await?
    }
}

/// Opens the three per-run catalog files together (§4.1, §6 directory layout).
pub struct CatalogTriplet {
    pub source: CatalogStore,
    pub filter: CatalogStore,
    pub target: CatalogStore,
}

impl CatalogTriplet {
    pub fn open_triplet(run_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = run_dir.as_ref();
        Ok(Self {
            source: CatalogStore::open(Role::Source, dir.join(Role::Source.file_name()))?,
            filter: CatalogStore::open(Role::Filter, dir.join(Role::Filter.file_name()))?,
            target: CatalogStore::open(Role::Target, dir.join(Role::Target.file_name()))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opening_an_existing_file_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.db");
        let store1 = CatalogStore::open(Role::Source, &path).unwrap();
        drop(store1);
        let store2 = CatalogStore::open(Role::Source, &path).unwrap();
        assert_eq!(store2.path(), path);
    }
}
