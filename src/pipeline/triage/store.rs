use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::models::{
    AuditEntry, PatientContext, TriageAnalytics, TriageRecord, TriageStatus,
};

/// Persistence capability used by the pipeline.
///
/// Implementations must make `transition_status` atomic: the status only
/// changes when it still equals `expected`.
pub trait TriageStore: Send + Sync {
    fn find_patient_by_user_id(&self, user_id: &str)
        -> Result<Option<PatientContext>, DatabaseError>;

    fn insert_record(&self, record: &TriageRecord) -> Result<(), DatabaseError>;

    fn get_record(&self, id: &Uuid) -> Result<Option<TriageRecord>, DatabaseError>;

    /// Pending records ordered by priority, at most `limit`.
    fn list_pending(&self, limit: u32) -> Result<Vec<TriageRecord>, DatabaseError>;

    /// A patient's records, newest first, at most `limit`.
    fn patient_history(
        &self,
        patient_id: &Uuid,
        limit: u32,
    ) -> Result<Vec<TriageRecord>, DatabaseError>;

    fn transition_status(
        &self,
        id: &Uuid,
        expected: TriageStatus,
        next: TriageStatus,
        assignee: &str,
    ) -> Result<bool, DatabaseError>;
}

/// SQLite-backed store. The connection lock is held for one statement at a time.
pub struct SqliteTriageStore {
    conn: Mutex<Connection>,
}

impl SqliteTriageStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Open (creating if needed) and migrate the database file.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, DatabaseError> {
        Ok(Self::new(db::open_database(path, busy_timeout)?))
    }

    pub fn in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::new(db::open_memory_database()?))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    /// Run `f` with exclusive access to the connection.
    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, DatabaseError>,
    ) -> Result<T, DatabaseError> {
        let conn = self.lock()?;
        f(&conn)
    }

    pub fn upsert_patient(&self, patient: &PatientContext) -> Result<PatientContext, DatabaseError> {
        self.with_conn(|conn| db::upsert_patient(conn, patient))
    }

    pub fn record_audit(&self, entry: &AuditEntry) -> Result<(), DatabaseError> {
        self.with_conn(|conn| db::insert_audit_entry(conn, entry))
    }

    pub fn recent_audit(&self, limit: u32) -> Result<Vec<AuditEntry>, DatabaseError> {
        self.with_conn(|conn| db::list_recent_audit_entries(conn, limit))
    }

    pub fn analytics(&self) -> Result<TriageAnalytics, DatabaseError> {
        self.with_conn(|conn| db::get_triage_analytics(conn, Utc::now()))
    }
}

impl TriageStore for SqliteTriageStore {
    fn find_patient_by_user_id(
        &self,
        user_id: &str,
    ) -> Result<Option<PatientContext>, DatabaseError> {
        self.with_conn(|conn| db::get_patient_by_user_id(conn, user_id))
    }

    fn insert_record(&self, record: &TriageRecord) -> Result<(), DatabaseError> {
        self.with_conn(|conn| db::insert_triage_record(conn, record))
    }

    fn get_record(&self, id: &Uuid) -> Result<Option<TriageRecord>, DatabaseError> {
        self.with_conn(|conn| db::get_triage_record(conn, id))
    }

    fn list_pending(&self, limit: u32) -> Result<Vec<TriageRecord>, DatabaseError> {
        self.with_conn(|conn| db::list_pending_by_priority(conn, limit))
    }

    fn patient_history(
        &self,
        patient_id: &Uuid,
        limit: u32,
    ) -> Result<Vec<TriageRecord>, DatabaseError> {
        self.with_conn(|conn| db::get_patient_history(conn, patient_id, limit))
    }

    fn transition_status(
        &self,
        id: &Uuid,
        expected: TriageStatus,
        next: TriageStatus,
        assignee: &str,
    ) -> Result<bool, DatabaseError> {
        self.with_conn(|conn| db::transition_triage_status(conn, id, expected, next, assignee))
    }
}
