//! Store methods for the profile key-value table.

use crate::{
    error::LensResult,
    profile::Profile,
};
use rusqlite::{params, OptionalExtension};

use super::{ProfileStore, SqliteProfileStore};

impl ProfileStore for SqliteProfileStore {
    /// Loaded profiles are checked against their invariants; a corrupt
    /// row is an error, not an absent profile.
    fn load(&self, key: &str) -> LensResult<Option<Profile>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT profile_json FROM profile WHERE storage_key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        let Some(json) = json else {
            log::debug!("store: no profile under '{key}'");
            return Ok(None);
        };
        let profile: Profile = serde_json::from_str(&json)?;
        profile.check_invariants()?;
        Ok(Some(profile))
    }

    fn save(&self, key: &str, profile: &Profile) -> LensResult<()> {
        let json = serde_json::to_string(profile)?;
        self.conn.execute(
            "INSERT INTO profile (storage_key, profile_json, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(storage_key) DO UPDATE SET
                 profile_json = excluded.profile_json,
                 updated_at   = excluded.updated_at",
            params![key, json],
        )?;
        log::debug!(
            "store: saved '{key}' actions={} total_saved={:.2}",
            profile.actions_count,
            profile.total_saved
        );
        Ok(())
    }

    fn clear(&self, key: &str) -> LensResult<()> {
        let removed = self.conn.execute(
            "DELETE FROM profile WHERE storage_key = ?1",
            params![key],
        )?;
        log::debug!("store: cleared '{key}' ({removed} row(s))");
        Ok(())
    }
}

// ── Test / summary helpers ────────────────────────────────────────

impl SqliteProfileStore {
    /// Number of stored profiles (for tests).
    pub fn profile_count(&self) -> LensResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM profile",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Write raw JSON under a key, bypassing validation (for tests that
    /// exercise corrupt rows).
    pub fn save_raw(&self, key: &str, profile_json: &str) -> LensResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO profile (storage_key, profile_json, updated_at)
             VALUES (?1, ?2, datetime('now'))",
            params![key, profile_json],
        )?;
        Ok(())
    }
}
