use crate::errors::{AppError, AppResult};
use crate::models::{AppSettings, DashboardSnapshot};
use crate::periods::PeriodWindow;
use crate::store::ScoreStore;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SCHEMA_SQL: &str = include_str!("schema.sql");

pub const QUARTERS_KEY: &str = "kpiQuarters";
pub const DATA_KEY: &str = "kpiData";

/// Result of reading the persisted snapshot. Each half is `None` when its
/// entry was absent or unreadable, so callers can default them separately.
#[derive(Debug, Default)]
pub struct LoadedSnapshot {
    pub quarters: Option<PeriodWindow>,
    pub scores: Option<ScoreStore>,
}

impl LoadedSnapshot {
    pub fn is_empty(&self) -> bool {
        self.quarters.is_none() && self.scores.is_none()
    }
}

#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl Database {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;

        let db = Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        };

        db.ensure_default_settings()?;

        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Overwrites both snapshot entries in one transaction.
    pub fn save_snapshot(&self, snapshot: &DashboardSnapshot) -> AppResult<()> {
        let now = Utc::now().to_rfc3339();
        let quarters_json = serde_json::to_string(&snapshot.quarters)?;
        let data_json = serde_json::to_string(&snapshot.data)?;

        let mut conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let tx = conn.transaction()?;
        for (key, value) in [(QUARTERS_KEY, &quarters_json), (DATA_KEY, &data_json)] {
            tx.execute(
                "INSERT INTO kv_store (key, value_json, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
                params![key, value, now],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Reads the snapshot. Unreadable entries are logged and reported as
    /// absent rather than failing the load.
    pub fn load_snapshot(&self) -> AppResult<LoadedSnapshot> {
        let quarters = match self.read_entry(QUARTERS_KEY)? {
            Some(raw) => match parse_quarters(&raw) {
                Ok(window) => Some(window),
                Err(error) => {
                    tracing::warn!(error = %error, "discarding unreadable persisted quarters");
                    None
                }
            },
            None => None,
        };

        let scores = match self.read_entry(DATA_KEY)? {
            Some(raw) => match serde_json::from_str::<serde_json::Value>(&raw) {
                Ok(value) if value.is_object() => Some(ScoreStore::deserialize(&value)),
                Ok(_) => {
                    tracing::warn!("discarding persisted scores that are not an object");
                    None
                }
                Err(error) => {
                    tracing::warn!(error = %error, "discarding unreadable persisted scores");
                    None
                }
            },
            None => None,
        };

        Ok(LoadedSnapshot { quarters, scores })
    }

    pub fn clear_snapshot(&self) -> AppResult<()> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        conn.execute(
            "DELETE FROM kv_store WHERE key IN (?1, ?2)",
            params![QUARTERS_KEY, DATA_KEY],
        )?;
        Ok(())
    }

    pub fn get_settings(&self) -> AppResult<AppSettings> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let raw = conn
            .query_row(
                "SELECT value_json FROM settings WHERE key = 'app'",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        match raw {
            Some(raw) => Ok(serde_json::from_str::<AppSettings>(&raw).unwrap_or_default()),
            None => Ok(AppSettings::default()),
        }
    }

    pub fn update_settings(&self, update: serde_json::Value) -> AppResult<AppSettings> {
        let current = self.get_settings()?;
        let mut merged = serde_json::to_value(current)?;
        merge_json(&mut merged, update);
        let settings: AppSettings = serde_json::from_value(merged)
            .map_err(|error| AppError::InvalidInput(format!("Invalid settings: {}", error)))?;

        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        conn.execute(
            "INSERT INTO settings (key, value_json, updated_at)
             VALUES ('app', ?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
            params![serde_json::to_string(&settings)?, Utc::now().to_rfc3339()],
        )?;

        Ok(settings)
    }

    fn read_entry(&self, key: &str) -> AppResult<Option<String>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let raw = conn
            .query_row(
                "SELECT value_json FROM kv_store WHERE key = ?1",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(raw)
    }

    fn ensure_default_settings(&self) -> AppResult<()> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let count: i64 = conn.query_row("SELECT COUNT(1) FROM settings WHERE key = 'app'", [], |row| row.get(0))?;
        if count == 0 {
            conn.execute(
                "INSERT INTO settings (key, value_json, updated_at) VALUES ('app', ?1, ?2)",
                params![
                    serde_json::to_string(&AppSettings::default())?,
                    Utc::now().to_rfc3339()
                ],
            )?;
        }
        Ok(())
    }
}

fn parse_quarters(raw: &str) -> AppResult<PeriodWindow> {
    let labels: Vec<String> = serde_json::from_str(raw)
        .map_err(|error| AppError::PersistenceRead(format!("quarters: {}", error)))?;
    Ok(PeriodWindow::from_labels(labels))
}

fn merge_json(target: &mut serde_json::Value, update: serde_json::Value) {
    match (target, update) {
        (serde_json::Value::Object(target_map), serde_json::Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_json(target_map.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, update) => {
            *target = update;
        }
    }
}
