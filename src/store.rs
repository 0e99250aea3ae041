//! Run record store
//!
//! Single `buses` table, one row per tracked run, keyed by `uid`. Every
//! mutation is a single-row update that reads the row back so callers can
//! tell whether the key existed and broadcast the resulting state. The
//! insert is `INSERT OR IGNORE`, so duplicate discovery attempts are no-ops
//! and report `None`.

use crate::tracking::{NewRun, ProgressCheckpoints, TrackedRun};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Database(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "IO error: {}", e),
            StoreError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

/// Keyed storage for run records.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Insert-if-absent; returns the row only when the insert happened.
    async fn insert_new(&self, run: &NewRun) -> Result<Option<TrackedRun>, StoreError>;

    async fn get(&self, uid: &str) -> Result<Option<TrackedRun>, StoreError>;

    /// Rows not suppressed and still missing a departure or arrival.
    async fn active_runs(&self) -> Result<Vec<TrackedRun>, StoreError>;

    /// Non-suppressed rows with both endpoints, ordered by departure.
    async fn completed_runs(&self) -> Result<Vec<TrackedRun>, StoreError>;

    /// Completed, non-suppressed, non-unreliable rows of one route.
    async fn completed_runs_for_route(&self, route: &str)
        -> Result<Vec<TrackedRun>, StoreError>;

    /// Overwrite the four checkpoint columns in one update.
    async fn update_checkpoints(
        &self,
        uid: &str,
        checkpoints: &ProgressCheckpoints,
    ) -> Result<Option<TrackedRun>, StoreError>;

    async fn set_arrival(
        &self,
        uid: &str,
        arrival: DateTime<Utc>,
    ) -> Result<Option<TrackedRun>, StoreError>;

    /// Mark the run suppressed; it leaves every future tracking batch.
    async fn disable(&self, uid: &str) -> Result<Option<TrackedRun>, StoreError>;

    async fn mark_unreliable(&self, uid: &str) -> Result<Option<TrackedRun>, StoreError>;

    /// Clear all progress fields and flags back to the pending state.
    async fn reset(&self, uid: &str) -> Result<Option<TrackedRun>, StoreError>;
}

const RUN_COLUMNS: &str = "uid, bus_id, origin, destination, via, departure, arrival, \
     intermediate_1, intermediate_2, intermediate_3, suppressed, unreliable, route";

/// SQLite-backed implementation with WAL journaling.
pub struct SqliteRunStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRunStore {
    /// Open (or create) the database and bootstrap the schema.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS buses (
                uid TEXT PRIMARY KEY NOT NULL,
                bus_id TEXT NOT NULL,
                origin TEXT,
                destination TEXT,
                via TEXT,
                departure TEXT,
                arrival TEXT,
                intermediate_1 TEXT,
                intermediate_2 TEXT,
                intermediate_3 TEXT,
                suppressed BOOLEAN NOT NULL DEFAULT 0,
                unreliable BOOLEAN NOT NULL DEFAULT 0,
                route TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_buses_route ON buses(route)",
            [],
        )?;

        log::info!("✅ Run store initialized with WAL mode");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_run(row: &Row<'_>) -> rusqlite::Result<TrackedRun> {
        Ok(TrackedRun {
            uid: row.get(0)?,
            bus_id: row.get(1)?,
            origin: row.get(2)?,
            destination: row.get(3)?,
            via: row.get(4)?,
            departure: row.get(5)?,
            arrival: row.get(6)?,
            intermediate_1: row.get(7)?,
            intermediate_2: row.get(8)?,
            intermediate_3: row.get(9)?,
            suppressed: row.get(10)?,
            unreliable: row.get(11)?,
            route: row.get(12)?,
        })
    }

    fn get_locked(conn: &Connection, uid: &str) -> Result<Option<TrackedRun>, StoreError> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM buses WHERE uid = ?1",
            RUN_COLUMNS
        ))?;
        let mut rows = stmt.query_map(params![uid], Self::row_to_run)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    fn select_many(
        conn: &Connection,
        filter: &str,
        filter_params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<TrackedRun>, StoreError> {
        let mut stmt =
            conn.prepare(&format!("SELECT {} FROM buses {}", RUN_COLUMNS, filter))?;
        let rows = stmt.query_map(filter_params, Self::row_to_run)?;
        let mut runs = Vec::new();
        for row in rows {
            runs.push(row?);
        }
        Ok(runs)
    }

    /// Run an update and read the row back; `None` when the key is unknown.
    fn update_and_fetch(
        conn: &Connection,
        sql: &str,
        update_params: &[&dyn rusqlite::ToSql],
        uid: &str,
    ) -> Result<Option<TrackedRun>, StoreError> {
        let changed = conn.execute(sql, update_params)?;
        if changed == 0 {
            return Ok(None);
        }
        Self::get_locked(conn, uid)
    }
}

#[async_trait]
impl RunStore for SqliteRunStore {
    async fn insert_new(&self, run: &NewRun) -> Result<Option<TrackedRun>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO buses (uid, bus_id, origin, destination, via, suppressed, route)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run.uid,
                run.bus_id,
                run.origin,
                run.destination,
                run.via,
                run.suppressed,
                run.route,
            ],
        )?;

        if inserted == 0 {
            return Ok(None);
        }
        Self::get_locked(&conn, &run.uid)
    }

    async fn get(&self, uid: &str) -> Result<Option<TrackedRun>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::get_locked(&conn, uid)
    }

    async fn active_runs(&self) -> Result<Vec<TrackedRun>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::select_many(
            &conn,
            "WHERE suppressed = 0 AND (departure IS NULL OR arrival IS NULL)",
            &[],
        )
    }

    async fn completed_runs(&self) -> Result<Vec<TrackedRun>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::select_many(
            &conn,
            "WHERE suppressed = 0 AND departure IS NOT NULL AND arrival IS NOT NULL \
             ORDER BY departure",
            &[],
        )
    }

    async fn completed_runs_for_route(
        &self,
        route: &str,
    ) -> Result<Vec<TrackedRun>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::select_many(
            &conn,
            "WHERE suppressed = 0 AND unreliable = 0 \
             AND departure IS NOT NULL AND arrival IS NOT NULL AND route = ?1",
            &[&route],
        )
    }

    async fn update_checkpoints(
        &self,
        uid: &str,
        checkpoints: &ProgressCheckpoints,
    ) -> Result<Option<TrackedRun>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::update_and_fetch(
            &conn,
            "UPDATE buses SET departure = ?1, intermediate_1 = ?2, intermediate_2 = ?3, \
             intermediate_3 = ?4 WHERE uid = ?5",
            &[
                &checkpoints.departure,
                &checkpoints.intermediate_1,
                &checkpoints.intermediate_2,
                &checkpoints.intermediate_3,
                &uid,
            ],
            uid,
        )
    }

    async fn set_arrival(
        &self,
        uid: &str,
        arrival: DateTime<Utc>,
    ) -> Result<Option<TrackedRun>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::update_and_fetch(
            &conn,
            "UPDATE buses SET arrival = ?1 WHERE uid = ?2",
            &[&arrival, &uid],
            uid,
        )
    }

    async fn disable(&self, uid: &str) -> Result<Option<TrackedRun>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::update_and_fetch(
            &conn,
            "UPDATE buses SET suppressed = 1 WHERE uid = ?1",
            &[&uid],
            uid,
        )
    }

    async fn mark_unreliable(&self, uid: &str) -> Result<Option<TrackedRun>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::update_and_fetch(
            &conn,
            "UPDATE buses SET unreliable = 1 WHERE uid = ?1",
            &[&uid],
            uid,
        )
    }

    async fn reset(&self, uid: &str) -> Result<Option<TrackedRun>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::update_and_fetch(
            &conn,
            "UPDATE buses SET departure = NULL, arrival = NULL, intermediate_1 = NULL, \
             intermediate_2 = NULL, intermediate_3 = NULL, suppressed = 0, unreliable = 0 \
             WHERE uid = ?1",
            &[&uid],
            uid,
        )
    }
}
