//! SQLite schema and queries for ReportFlow.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use reportflow_core::error::{ReportFlowError, Result};
use reportflow_core::types::{
    ExecutionRecord, ExecutionStatus, FilterSet, FilterValue, Frequency, Recipient, ReportType,
    ScheduleDefinition,
};

/// Shared SELECT column list for schedule queries: single source of truth.
const SCHEDULE_SELECT: &str = "SELECT id,shop,name,description,report_type,frequency,time_of_day,day_of_week,day_of_month,timezone,active,last_run_at,next_run_at,created_at FROM schedules";

const EXECUTION_SELECT: &str = "SELECT id,schedule_id,status,started_at,completed_at,record_count,file_size,file_path,error_message,error_category,emails_sent,emails_failed FROM executions";

/// ReportFlow database manager.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)
            .map_err(|e| ReportFlowError::Store(format!("DB open error: {e}")))?;
        Self::init(conn)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ReportFlowError::Store(format!("DB open error: {e}")))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        // WAL allows concurrent readers while an execution writes its ledger row.
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(|e| ReportFlowError::Store(format!("DB pragma error: {e}")))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run schema migrations.
    fn migrate(&self) -> Result<()> {
        self.conn()
            .execute_batch(
                "
            CREATE TABLE IF NOT EXISTS schedules (
                id TEXT PRIMARY KEY,
                shop TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                report_type TEXT NOT NULL,
                frequency TEXT NOT NULL DEFAULT 'DAILY',
                time_of_day TEXT NOT NULL DEFAULT '09:00',
                day_of_week INTEGER,
                day_of_month INTEGER,
                timezone TEXT NOT NULL DEFAULT 'UTC',
                active INTEGER NOT NULL DEFAULT 1,
                last_run_at TEXT,
                next_run_at TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS schedule_recipients (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                schedule_id TEXT NOT NULL REFERENCES schedules(id) ON DELETE CASCADE,
                email TEXT NOT NULL,
                name TEXT
            );

            CREATE TABLE IF NOT EXISTS schedule_filters (
                schedule_id TEXT NOT NULL REFERENCES schedules(id) ON DELETE CASCADE,
                key TEXT NOT NULL,
                value TEXT NOT NULL,          -- JSON-encoded typed filter value
                PRIMARY KEY (schedule_id, key)
            );

            CREATE TABLE IF NOT EXISTS schedule_fields (
                schedule_id TEXT NOT NULL REFERENCES schedules(id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                key TEXT NOT NULL,
                PRIMARY KEY (schedule_id, position)
            );

            -- Execution ledger: one row per attempt, never updated except for
            -- the RUNNING -> SUCCESS/FAILED transition.
            CREATE TABLE IF NOT EXISTS executions (
                id TEXT PRIMARY KEY,
                schedule_id TEXT NOT NULL REFERENCES schedules(id) ON DELETE CASCADE,
                status TEXT NOT NULL DEFAULT 'RUNNING',
                started_at TEXT NOT NULL,
                completed_at TEXT,
                record_count INTEGER,
                file_size INTEGER,
                file_path TEXT,
                error_message TEXT,
                error_category TEXT,
                emails_sent INTEGER NOT NULL DEFAULT 0,
                emails_failed INTEGER NOT NULL DEFAULT 0
            );

            -- Offline API tokens, one per shop.
            CREATE TABLE IF NOT EXISTS api_sessions (
                shop TEXT PRIMARY KEY,
                access_token TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_schedules_due
                ON schedules(active, next_run_at);
            CREATE INDEX IF NOT EXISTS idx_executions_schedule
                ON executions(schedule_id, started_at);
         ",
            )
            .map_err(|e| ReportFlowError::Store(format!("Migration: {e}")))?;
        Ok(())
    }

    // ─── Schedules ────────────────────────────────────────────

    /// Insert a schedule with its recipient/filter/field children.
    pub fn insert_schedule(&self, schedule: &ScheduleDefinition) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .map_err(|e| ReportFlowError::Store(format!("Begin: {e}")))?;
        tx.execute(
            "INSERT INTO schedules (id,shop,name,description,report_type,frequency,time_of_day,day_of_week,day_of_month,timezone,active,last_run_at,next_run_at,created_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)",
            params![
                schedule.id,
                schedule.shop,
                schedule.name,
                schedule.description,
                schedule.report_type.as_str(),
                schedule.frequency.as_str(),
                schedule.time_of_day,
                schedule.day_of_week,
                schedule.day_of_month,
                schedule.timezone,
                schedule.active,
                schedule.last_run_at.map(|d| d.to_rfc3339()),
                schedule.next_run_at.map(|d| d.to_rfc3339()),
                schedule.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| ReportFlowError::Store(format!("Insert schedule: {e}")))?;
        write_children(&tx, schedule)?;
        tx.commit()
            .map_err(|e| ReportFlowError::Store(format!("Commit: {e}")))?;
        tracing::debug!("💾 Saved schedule '{}' ({})", schedule.name, schedule.id);
        Ok(())
    }

    /// Replace a schedule and all of its children.
    pub fn update_schedule(&self, schedule: &ScheduleDefinition) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .map_err(|e| ReportFlowError::Store(format!("Begin: {e}")))?;
        let changed = tx
            .execute(
                "UPDATE schedules SET shop=?2,name=?3,description=?4,report_type=?5,frequency=?6,time_of_day=?7,day_of_week=?8,day_of_month=?9,timezone=?10,active=?11,last_run_at=?12,next_run_at=?13 WHERE id=?1",
                params![
                    schedule.id,
                    schedule.shop,
                    schedule.name,
                    schedule.description,
                    schedule.report_type.as_str(),
                    schedule.frequency.as_str(),
                    schedule.time_of_day,
                    schedule.day_of_week,
                    schedule.day_of_month,
                    schedule.timezone,
                    schedule.active,
                    schedule.last_run_at.map(|d| d.to_rfc3339()),
                    schedule.next_run_at.map(|d| d.to_rfc3339()),
                ],
            )
            .map_err(|e| ReportFlowError::Store(format!("Update schedule: {e}")))?;
        if changed == 0 {
            return Err(ReportFlowError::Store(format!(
                "schedule not found: {}",
                schedule.id
            )));
        }
        for table in ["schedule_recipients", "schedule_filters", "schedule_fields"] {
            tx.execute(&format!("DELETE FROM {table} WHERE schedule_id=?1"), params![schedule.id])
                .map_err(|e| ReportFlowError::Store(format!("Clear children: {e}")))?;
        }
        write_children(&tx, schedule)?;
        tx.commit()
            .map_err(|e| ReportFlowError::Store(format!("Commit: {e}")))?;
        Ok(())
    }

    /// Fetch a schedule with its children.
    pub fn get_schedule(&self, id: &str) -> Result<Option<ScheduleDefinition>> {
        let conn = self.conn();
        let base = conn
            .query_row(
                &format!("{SCHEDULE_SELECT} WHERE id=?1"),
                params![id],
                row_to_schedule,
            )
            .optional()
            .map_err(|e| ReportFlowError::Store(format!("Get schedule: {e}")))?;
        match base {
            Some(schedule) => Ok(Some(load_children(&conn, schedule)?)),
            None => Ok(None),
        }
    }

    /// All schedules for a shop, newest first.
    pub fn list_schedules(&self, shop: &str) -> Result<Vec<ScheduleDefinition>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "{SCHEDULE_SELECT} WHERE shop=?1 ORDER BY created_at DESC"
            ))
            .map_err(|e| ReportFlowError::Store(format!("Prepare: {e}")))?;
        let rows = stmt
            .query_map(params![shop], row_to_schedule)
            .map_err(|e| ReportFlowError::Store(format!("List schedules: {e}")))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| ReportFlowError::Store(format!("List schedules: {e}")))?;
        rows.into_iter()
            .map(|s| load_children(&conn, s))
            .collect()
    }

    /// Active schedules whose next run is at or before `now`, in id order.
    pub fn due_schedules(&self, now: DateTime<Utc>) -> Result<Vec<ScheduleDefinition>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "{SCHEDULE_SELECT} WHERE active=1 AND next_run_at IS NOT NULL AND next_run_at<=?1 ORDER BY id"
            ))
            .map_err(|e| ReportFlowError::Store(format!("Prepare: {e}")))?;
        let rows = stmt
            .query_map(params![now.to_rfc3339()], row_to_schedule)
            .map_err(|e| ReportFlowError::Store(format!("Due query: {e}")))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| ReportFlowError::Store(format!("Due query: {e}")))?;
        rows.into_iter()
            .map(|s| load_children(&conn, s))
            .collect()
    }

    /// Delete a schedule; children and executions cascade.
    pub fn delete_schedule(&self, id: &str) -> Result<bool> {
        let deleted = self
            .conn()
            .execute("DELETE FROM schedules WHERE id=?1", params![id])
            .map_err(|e| ReportFlowError::Store(format!("Delete schedule: {e}")))?;
        Ok(deleted > 0)
    }

    /// Record the outcome of a run: last-run stamp and the recomputed next run.
    pub fn set_run_times(
        &self,
        id: &str,
        last_run_at: DateTime<Utc>,
        next_run_at: DateTime<Utc>,
    ) -> Result<()> {
        self.conn()
            .execute(
                "UPDATE schedules SET last_run_at=?2, next_run_at=?3 WHERE id=?1",
                params![id, last_run_at.to_rfc3339(), next_run_at.to_rfc3339()],
            )
            .map_err(|e| ReportFlowError::Store(format!("Set run times: {e}")))?;
        Ok(())
    }

    // ─── Execution ledger ─────────────────────────────────────

    /// Insert a fresh RUNNING execution record (the durability checkpoint).
    pub fn insert_execution(&self, record: &ExecutionRecord) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO executions (id,schedule_id,status,started_at,completed_at,record_count,file_size,file_path,error_message,error_category,emails_sent,emails_failed)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)",
                params![
                    record.id,
                    record.schedule_id,
                    record.status.as_str(),
                    record.started_at.to_rfc3339(),
                    record.completed_at.map(|d| d.to_rfc3339()),
                    record.record_count,
                    record.file_size,
                    record.file_path,
                    record.error_message,
                    record.error_category,
                    record.emails_sent,
                    record.emails_failed,
                ],
            )
            .map_err(|e| ReportFlowError::Store(format!("Insert execution: {e}")))?;
        Ok(())
    }

    /// Write the terminal state of an execution.
    pub fn update_execution(&self, record: &ExecutionRecord) -> Result<()> {
        self.conn()
            .execute(
                "UPDATE executions SET status=?3,started_at=?4,completed_at=?5,record_count=?6,file_size=?7,file_path=?8,error_message=?9,error_category=?10,emails_sent=?11,emails_failed=?12 WHERE id=?1 AND schedule_id=?2",
                params![
                    record.id,
                    record.schedule_id,
                    record.status.as_str(),
                    record.started_at.to_rfc3339(),
                    record.completed_at.map(|d| d.to_rfc3339()),
                    record.record_count,
                    record.file_size,
                    record.file_path,
                    record.error_message,
                    record.error_category,
                    record.emails_sent,
                    record.emails_failed,
                ],
            )
            .map_err(|e| ReportFlowError::Store(format!("Update execution: {e}")))?;
        Ok(())
    }

    pub fn get_execution(&self, id: &str) -> Result<Option<ExecutionRecord>> {
        self.conn()
            .query_row(
                &format!("{EXECUTION_SELECT} WHERE id=?1"),
                params![id],
                row_to_execution,
            )
            .optional()
            .map_err(|e| ReportFlowError::Store(format!("Get execution: {e}")))
    }

    /// Most recent execution for a schedule.
    pub fn latest_execution(&self, schedule_id: &str) -> Result<Option<ExecutionRecord>> {
        self.conn()
            .query_row(
                &format!("{EXECUTION_SELECT} WHERE schedule_id=?1 ORDER BY started_at DESC LIMIT 1"),
                params![schedule_id],
                row_to_execution,
            )
            .optional()
            .map_err(|e| ReportFlowError::Store(format!("Latest execution: {e}")))
    }

    /// Execution history for a schedule, newest first.
    pub fn list_executions(&self, schedule_id: &str, limit: u32) -> Result<Vec<ExecutionRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "{EXECUTION_SELECT} WHERE schedule_id=?1 ORDER BY started_at DESC LIMIT ?2"
            ))
            .map_err(|e| ReportFlowError::Store(format!("Prepare: {e}")))?;
        stmt.query_map(params![schedule_id, limit], row_to_execution)
            .map_err(|e| ReportFlowError::Store(format!("List executions: {e}")))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| ReportFlowError::Store(format!("List executions: {e}")))
    }

    // ─── API sessions ─────────────────────────────────────────

    /// Store or replace the offline access token for a shop.
    pub fn put_session(&self, shop: &str, access_token: &str) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO api_sessions (shop,access_token,created_at) VALUES (?1,?2,?3)
                 ON CONFLICT(shop) DO UPDATE SET access_token=excluded.access_token",
                params![shop, access_token, Utc::now().to_rfc3339()],
            )
            .map_err(|e| ReportFlowError::Store(format!("Put session: {e}")))?;
        Ok(())
    }

    pub fn access_token(&self, shop: &str) -> Result<Option<String>> {
        self.conn()
            .query_row(
                "SELECT access_token FROM api_sessions WHERE shop=?1",
                params![shop],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| ReportFlowError::Store(format!("Get session: {e}")))
    }

    /// Uninstall cleanup: remove every schedule and session owned by a shop.
    pub fn purge_shop(&self, shop: &str) -> Result<usize> {
        let conn = self.conn();
        let schedules = conn
            .execute("DELETE FROM schedules WHERE shop=?1", params![shop])
            .map_err(|e| ReportFlowError::Store(format!("Purge schedules: {e}")))?;
        conn.execute("DELETE FROM api_sessions WHERE shop=?1", params![shop])
            .map_err(|e| ReportFlowError::Store(format!("Purge session: {e}")))?;
        tracing::info!("🧹 Purged {} schedule(s) for {}", schedules, shop);
        Ok(schedules)
    }
}

fn write_children(tx: &rusqlite::Transaction<'_>, schedule: &ScheduleDefinition) -> Result<()> {
    for recipient in &schedule.recipients {
        tx.execute(
            "INSERT INTO schedule_recipients (schedule_id,email,name) VALUES (?1,?2,?3)",
            params![schedule.id, recipient.email, recipient.name],
        )
        .map_err(|e| ReportFlowError::Store(format!("Insert recipient: {e}")))?;
    }
    for (key, value) in schedule.filters.iter() {
        let encoded = serde_json::to_string(value)
            .map_err(|e| ReportFlowError::Store(format!("Encode filter: {e}")))?;
        tx.execute(
            "INSERT INTO schedule_filters (schedule_id,key,value) VALUES (?1,?2,?3)",
            params![schedule.id, key, encoded],
        )
        .map_err(|e| ReportFlowError::Store(format!("Insert filter: {e}")))?;
    }
    for (position, key) in schedule.fields.iter().enumerate() {
        tx.execute(
            "INSERT INTO schedule_fields (schedule_id,position,key) VALUES (?1,?2,?3)",
            params![schedule.id, position as i64, key],
        )
        .map_err(|e| ReportFlowError::Store(format!("Insert field: {e}")))?;
    }
    Ok(())
}

fn load_children(conn: &Connection, mut schedule: ScheduleDefinition) -> Result<ScheduleDefinition> {
    let mut stmt = conn
        .prepare("SELECT email,name FROM schedule_recipients WHERE schedule_id=?1 ORDER BY id")
        .map_err(|e| ReportFlowError::Store(format!("Prepare: {e}")))?;
    schedule.recipients = stmt
        .query_map(params![schedule.id], |row| {
            Ok(Recipient {
                email: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .map_err(|e| ReportFlowError::Store(format!("Load recipients: {e}")))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| ReportFlowError::Store(format!("Load recipients: {e}")))?;

    let mut stmt = conn
        .prepare("SELECT key,value FROM schedule_filters WHERE schedule_id=?1")
        .map_err(|e| ReportFlowError::Store(format!("Prepare: {e}")))?;
    let filters = stmt
        .query_map(params![schedule.id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(|e| ReportFlowError::Store(format!("Load filters: {e}")))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| ReportFlowError::Store(format!("Load filters: {e}")))?;
    let mut set = FilterSet::new();
    for (key, raw) in filters {
        let value: FilterValue = serde_json::from_str(&raw)
            .map_err(|e| ReportFlowError::Store(format!("Decode filter '{key}': {e}")))?;
        set.insert(key, value);
    }
    schedule.filters = set;

    let mut stmt = conn
        .prepare("SELECT key FROM schedule_fields WHERE schedule_id=?1 ORDER BY position")
        .map_err(|e| ReportFlowError::Store(format!("Prepare: {e}")))?;
    schedule.fields = stmt
        .query_map(params![schedule.id], |row| row.get(0))
        .map_err(|e| ReportFlowError::Store(format!("Load fields: {e}")))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| ReportFlowError::Store(format!("Load fields: {e}")))?;

    Ok(schedule)
}

/// Map a database row to a ScheduleDefinition (children loaded separately).
fn row_to_schedule(row: &rusqlite::Row) -> rusqlite::Result<ScheduleDefinition> {
    let report_type: String = row.get(4)?;
    let frequency: String = row.get(5)?;
    Ok(ScheduleDefinition {
        id: row.get(0)?,
        shop: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        report_type: ReportType::parse(&report_type)
            .ok_or_else(|| bad_column(4, &report_type))?,
        frequency: Frequency::parse(&frequency).ok_or_else(|| bad_column(5, &frequency))?,
        time_of_day: row.get(6)?,
        day_of_week: row.get(7)?,
        day_of_month: row.get(8)?,
        timezone: row.get(9)?,
        active: row.get(10)?,
        last_run_at: opt_datetime(row.get(11)?, 11)?,
        next_run_at: opt_datetime(row.get(12)?, 12)?,
        created_at: datetime(row.get(13)?, 13)?,
        fields: Vec::new(),
        filters: FilterSet::new(),
        recipients: Vec::new(),
    })
}

fn row_to_execution(row: &rusqlite::Row) -> rusqlite::Result<ExecutionRecord> {
    let status: String = row.get(2)?;
    Ok(ExecutionRecord {
        id: row.get(0)?,
        schedule_id: row.get(1)?,
        status: ExecutionStatus::parse(&status).ok_or_else(|| bad_column(2, &status))?,
        started_at: datetime(row.get(3)?, 3)?,
        completed_at: opt_datetime(row.get(4)?, 4)?,
        record_count: row.get(5)?,
        file_size: row.get(6)?,
        file_path: row.get(7)?,
        error_message: row.get(8)?,
        error_category: row.get(9)?,
        emails_sent: row.get(10)?,
        emails_failed: row.get(11)?,
    })
}

fn datetime(raw: String, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn opt_datetime(raw: Option<String>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| datetime(s, idx)).transpose()
}

fn bad_column(idx: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("unrecognized value: {value}"),
        )),
    )
}
