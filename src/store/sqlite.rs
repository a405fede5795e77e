//! SQLite-backed profile store -- one small local database holding the
//! saved credentials, the resolved seat, and the recurring windows the
//! scheduler fires on.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use rusqlite::{params, Connection};

use super::profile::{BookingProfile, BookingWindow, ProfileStore};
use crate::library::seat::SeatId;

/// Default database location under the user's home directory.
pub fn default_store_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".campanile")
        .join("booking.db")
}

/// Profile store on a single SQLite file.
///
/// The connection sits behind a mutex so the store can be shared with
/// the scheduler task; every access is a short synchronous statement.
pub struct SqliteStore {
    db: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (and if needed creates) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating store directory {}", parent.display()))?;
        }
        let db = Connection::open(path)
            .with_context(|| format!("opening booking store {}", path.display()))?;
        db.execute_batch(
            "CREATE TABLE IF NOT EXISTS profiles (
                 student_id   TEXT PRIMARY KEY,
                 password     TEXT NOT NULL,
                 seat_label   TEXT NOT NULL,
                 seat_id      INTEGER,
                 auto_enabled INTEGER NOT NULL DEFAULT 0,
                 updated_at   TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS windows (
                 id              INTEGER PRIMARY KEY AUTOINCREMENT,
                 student_id      TEXT NOT NULL,
                 start_time      TEXT NOT NULL,
                 end_time        TEXT NOT NULL,
                 auto_start_time TEXT NOT NULL,
                 active          INTEGER NOT NULL DEFAULT 1,
                 created_at      TEXT NOT NULL
             );",
        )
        .context("creating booking store schema")?;
        Ok(Self { db: Mutex::new(db) })
    }

    /// Opens the store at its default location.
    pub fn open_default() -> Result<Self> {
        Self::open(&default_store_path())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| anyhow!("store connection mutex poisoned"))
    }

    // ---- Profiles ----

    /// Inserts or updates a profile, leaving the auto flag of an
    /// existing row untouched.
    pub fn upsert_profile(
        &self,
        student_id: &str,
        password: &str,
        seat_label: &str,
        seat_id: Option<SeatId>,
    ) -> Result<()> {
        let db = self.conn()?;
        db.execute(
            "INSERT INTO profiles (student_id, password, seat_label, seat_id, auto_enabled, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)
             ON CONFLICT(student_id) DO UPDATE SET
                 password = excluded.password,
                 seat_label = excluded.seat_label,
                 seat_id = excluded.seat_id,
                 updated_at = excluded.updated_at",
            params![student_id, password, seat_label, seat_id, now_stamp()],
        )
        .context("saving booking profile")?;
        Ok(())
    }

    /// Flips automatic booking for one student; `Ok(false)` when the
    /// profile does not exist.
    pub fn set_auto_enabled(&self, student_id: &str, enabled: bool) -> Result<bool> {
        let db = self.conn()?;
        let changed = db
            .execute(
                "UPDATE profiles SET auto_enabled = ?2, updated_at = ?3 WHERE student_id = ?1",
                params![student_id, enabled as i64, now_stamp()],
            )
            .context("updating auto-booking flag")?;
        Ok(changed > 0)
    }

    /// Removes a profile together with its windows.
    pub fn remove_profile(&self, student_id: &str) -> Result<bool> {
        let db = self.conn()?;
        db.execute("DELETE FROM windows WHERE student_id = ?1", params![student_id])
            .context("removing profile windows")?;
        let changed = db
            .execute("DELETE FROM profiles WHERE student_id = ?1", params![student_id])
            .context("removing booking profile")?;
        Ok(changed > 0)
    }

    // ---- Windows ----

    /// Adds a window and returns its row id.
    pub fn add_window(
        &self,
        student_id: &str,
        start_time: &str,
        end_time: &str,
        auto_start_time: &str,
    ) -> Result<i64> {
        let db = self.conn()?;
        db.execute(
            "INSERT INTO windows (student_id, start_time, end_time, auto_start_time, active, created_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5)",
            params![student_id, start_time, end_time, auto_start_time, now_stamp()],
        )
        .context("adding booking window")?;
        Ok(db.last_insert_rowid())
    }

    /// Every window for one student, active or not.
    pub fn windows(&self, student_id: &str) -> Result<Vec<BookingWindow>> {
        let db = self.conn()?;
        let mut stmt = db
            .prepare(
                "SELECT id, student_id, start_time, end_time, auto_start_time, active, created_at
                 FROM windows WHERE student_id = ?1 ORDER BY id",
            )
            .context("preparing window query")?;
        let rows = stmt
            .query_map(params![student_id], window_from_row)
            .context("listing booking windows")?;
        let mut windows = Vec::new();
        for row in rows {
            windows.push(row.context("reading booking window row")?);
        }
        Ok(windows)
    }

    /// Deletes one window by id.
    pub fn remove_window(&self, id: i64) -> Result<bool> {
        let db = self.conn()?;
        let changed = db
            .execute("DELETE FROM windows WHERE id = ?1", params![id])
            .context("removing booking window")?;
        Ok(changed > 0)
    }

    /// Activates or pauses one window by id.
    pub fn set_window_active(&self, id: i64, active: bool) -> Result<bool> {
        let db = self.conn()?;
        let changed = db
            .execute(
                "UPDATE windows SET active = ?2 WHERE id = ?1",
                params![id, active as i64],
            )
            .context("updating booking window")?;
        Ok(changed > 0)
    }
}

impl ProfileStore for SqliteStore {
    fn auto_enabled_profiles(&self) -> Result<Vec<BookingProfile>> {
        let db = self.conn()?;
        let mut stmt = db
            .prepare(
                "SELECT student_id, password, seat_label, seat_id, auto_enabled, updated_at
                 FROM profiles WHERE auto_enabled = 1 ORDER BY student_id",
            )
            .context("preparing profile query")?;
        let rows = stmt
            .query_map([], profile_from_row)
            .context("listing auto-enabled profiles")?;
        let mut profiles = Vec::new();
        for row in rows {
            profiles.push(row.context("reading booking profile row")?);
        }
        Ok(profiles)
    }

    fn active_windows(&self, student_id: &str) -> Result<Vec<BookingWindow>> {
        let db = self.conn()?;
        let mut stmt = db
            .prepare(
                "SELECT id, student_id, start_time, end_time, auto_start_time, active, created_at
                 FROM windows WHERE student_id = ?1 AND active = 1 ORDER BY id",
            )
            .context("preparing window query")?;
        let rows = stmt
            .query_map(params![student_id], window_from_row)
            .context("listing active windows")?;
        let mut windows = Vec::new();
        for row in rows {
            windows.push(row.context("reading booking window row")?);
        }
        Ok(windows)
    }

    fn profile(&self, student_id: &str) -> Result<Option<BookingProfile>> {
        let db = self.conn()?;
        let row = db.query_row(
            "SELECT student_id, password, seat_label, seat_id, auto_enabled, updated_at
             FROM profiles WHERE student_id = ?1",
            params![student_id],
            profile_from_row,
        );
        match row {
            Ok(profile) => Ok(Some(profile)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e).context("reading booking profile"),
        }
    }
}

fn profile_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BookingProfile> {
    Ok(BookingProfile {
        student_id: row.get(0)?,
        password: row.get(1)?,
        seat_label: row.get(2)?,
        seat_id: row.get::<_, Option<i64>>(3)?,
        auto_enabled: row.get::<_, i64>(4)? != 0,
        updated_at: row.get(5)?,
    })
}

fn window_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BookingWindow> {
    Ok(BookingWindow {
        id: row.get(0)?,
        student_id: row.get(1)?,
        start_time: row.get(2)?,
        end_time: row.get(3)?,
        auto_start_time: row.get(4)?,
        active: row.get::<_, i64>(5)? != 0,
        created_at: row.get(6)?,
    })
}

fn now_stamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
