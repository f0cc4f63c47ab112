use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::ingest::aggregate::Aggregate;

/// Fixed cap on the number of retained snapshots.
pub const RETENTION_LIMIT: usize = 5;

/// One persisted summary of an uploaded equipment dataset.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub total_count: i64,
    pub avg_flowrate: f64,
    pub avg_pressure: f64,
    pub avg_temperature: f64,
    pub type_distribution: Vec<TypeCount>,
}

/// Count of equipment records per type, scoped to one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    pub equipment_type: String,
    pub count: i64,
}

/// Get the default database path (~/.local/share/equiflow/equiflow.db or
/// platform equivalent)
pub fn default_db_path() -> ApiResult<PathBuf> {
    let data_dir = directories::ProjectDirs::from("", "", "equiflow")
        .ok_or_else(|| ApiError::Internal("could not determine data directory".to_string()))?
        .data_dir()
        .to_path_buf();

    std::fs::create_dir_all(&data_dir)?;
    Ok(data_dir.join("equiflow.db"))
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS summaries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at INTEGER NOT NULL,
            total_count INTEGER NOT NULL,
            avg_flowrate REAL NOT NULL,
            avg_pressure REAL NOT NULL,
            avg_temperature REAL NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS type_distribution (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            summary_id INTEGER NOT NULL,
            equipment_type TEXT NOT NULL,
            count INTEGER NOT NULL,
            FOREIGN KEY(summary_id) REFERENCES summaries(id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_type_distribution_summary_id
         ON type_distribution(summary_id)",
        [],
    )?;

    Ok(())
}

/// Database handle shared across request handlers.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &Path) -> ApiResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        init_schema(&conn)?;
        Ok(Store {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> ApiResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ApiError::Internal("store mutex poisoned".to_string()))
    }

    /// Persists one summary plus its per-type breakdown and prunes the
    /// history down to the retention window, all in a single transaction.
    /// Readers never observe a summary without its breakdowns, and the
    /// retention cap holds at every commit point.
    pub fn create_snapshot(&self, aggregate: &Aggregate) -> ApiResult<Snapshot> {
        let created_at = Utc::now().timestamp();

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO summaries (created_at, total_count, avg_flowrate, avg_pressure, avg_temperature)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                created_at,
                aggregate.total_count,
                aggregate.avg_flowrate,
                aggregate.avg_pressure,
                aggregate.avg_temperature,
            ],
        )?;

        let summary_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO type_distribution (summary_id, equipment_type, count)
                 VALUES (?1, ?2, ?3)",
            )?;
            for (equipment_type, count) in &aggregate.type_counts {
                stmt.execute(params![summary_id, equipment_type, count])?;
            }
        }

        // Keep only the newest summaries; breakdowns go with their parent
        // via ON DELETE CASCADE.
        let pruned = tx.execute(
            "DELETE FROM summaries WHERE id NOT IN (
                SELECT id FROM summaries ORDER BY created_at DESC, id DESC LIMIT ?1
            )",
            params![RETENTION_LIMIT as i64],
        )?;

        tx.commit()?;
        if pruned > 0 {
            tracing::debug!(pruned, "retention prune removed old summaries");
        }

        Ok(Snapshot {
            id: summary_id,
            created_at: timestamp_to_datetime(created_at),
            total_count: aggregate.total_count,
            avg_flowrate: aggregate.avg_flowrate,
            avg_pressure: aggregate.avg_pressure,
            avg_temperature: aggregate.avg_temperature,
            type_distribution: aggregate
                .type_counts
                .iter()
                .map(|(equipment_type, count)| TypeCount {
                    equipment_type: equipment_type.clone(),
                    count: *count,
                })
                .collect(),
        })
    }

    /// Get the most recent snapshot with its breakdowns.
    pub fn latest(&self) -> ApiResult<Option<Snapshot>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, created_at, total_count, avg_flowrate, avg_pressure, avg_temperature
             FROM summaries
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
        )?;

        let mut rows = stmt.query([])?;
        if let Some(row) = rows.next()? {
            let mut snapshot = snapshot_from_row(row)?;
            snapshot.type_distribution = load_distribution(&conn, snapshot.id)?;
            Ok(Some(snapshot))
        } else {
            Ok(None)
        }
    }

    /// Up to `limit` most recent snapshots, newest first, breakdowns attached.
    pub fn history(&self, limit: usize) -> ApiResult<Vec<Snapshot>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, created_at, total_count, avg_flowrate, avg_pressure, avg_temperature
             FROM summaries
             ORDER BY created_at DESC, id DESC
             LIMIT ?1",
        )?;

        let mut snapshots = stmt
            .query_map(params![limit as i64], snapshot_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        for snapshot in &mut snapshots {
            snapshot.type_distribution = load_distribution(&conn, snapshot.id)?;
        }
        Ok(snapshots)
    }
}

fn load_distribution(conn: &Connection, summary_id: i64) -> ApiResult<Vec<TypeCount>> {
    let mut stmt = conn.prepare(
        "SELECT equipment_type, count FROM type_distribution
         WHERE summary_id = ?1
         ORDER BY id",
    )?;

    let counts = stmt
        .query_map(params![summary_id], |row| {
            Ok(TypeCount {
                equipment_type: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(counts)
}

fn snapshot_from_row(row: &rusqlite::Row) -> rusqlite::Result<Snapshot> {
    Ok(Snapshot {
        id: row.get(0)?,
        created_at: timestamp_to_datetime(row.get(1)?),
        total_count: row.get(2)?,
        avg_flowrate: row.get(3)?,
        avg_pressure: row.get(4)?,
        avg_temperature: row.get(5)?,
        type_distribution: Vec::new(),
    })
}

fn timestamp_to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH)
}
