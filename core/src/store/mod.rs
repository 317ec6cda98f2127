//! SQLite persistence layer.
//!
//! RULE: Only store/ talks to the database.
//! The engine sees the ProfileStore trait, a plain key-value contract:
//! load(key) -> Option<Profile>, save(key, profile), clear(key).
//! An absent key means "no profile yet"; there is no migration of
//! profile contents beyond that.

use crate::{error::LensResult, profile::Profile};
use rusqlite::Connection;
mod profile;

/// External key-value collaborator holding the single Profile.
pub trait ProfileStore: Send {
    fn load(&self, key: &str) -> LensResult<Option<Profile>>;
    /// Replace the whole stored value.
    fn save(&self, key: &str, profile: &Profile) -> LensResult<()>;
    fn clear(&self, key: &str) -> LensResult<()>;
}

pub struct SqliteProfileStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl SqliteProfileStore {
    pub fn open(path: &str) -> LensResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> LensResult<Self> {
        let conn = Connection::open(":memory:")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases, this returns a new, empty database.
    pub fn reopen(&self) -> LensResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> LensResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_profile.sql"))?;
        Ok(())
    }
}
