use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::*;

const TRIAGE_COLUMNS: &str = "id, patient_id, symptoms, vitals, risk_level, priority_score,
     ai_confidence, recommendations, primary_concerns, reasoning, status, assigned_to, created_at";

/// Timestamps are stored as fixed-width RFC 3339 UTC so they sort as text.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad timestamp {raw}: {e}")))
}

pub fn insert_triage_record(conn: &Connection, record: &TriageRecord) -> Result<(), DatabaseError> {
    let symptoms = serde_json::to_string(&record.symptoms)
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;
    let vitals = serde_json::to_string(&record.vitals)
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;
    let concerns = record
        .primary_concerns
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;

    conn.execute(
        "INSERT INTO triage_records (id, patient_id, symptoms, vitals, risk_level, priority_score,
         ai_confidence, recommendations, primary_concerns, reasoning, status, assigned_to, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            record.id.to_string(),
            record.patient_id.to_string(),
            symptoms,
            vitals,
            record.risk_level.as_str(),
            record.priority_score,
            record.ai_confidence,
            record.recommendations,
            concerns,
            record.reasoning,
            record.status.as_str(),
            record.assigned_to,
            format_timestamp(&record.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_triage_record(conn: &Connection, id: &Uuid) -> Result<Option<TriageRecord>, DatabaseError> {
    let sql = format!("SELECT {TRIAGE_COLUMNS} FROM triage_records WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id.to_string()], read_row)
        .optional()?;
    row.map(row_to_record).transpose()
}

/// Pending records, most urgent first. Equal scores keep insertion order.
pub fn list_pending_by_priority(
    conn: &Connection,
    limit: u32,
) -> Result<Vec<TriageRecord>, DatabaseError> {
    let sql = format!(
        "SELECT {TRIAGE_COLUMNS} FROM triage_records
         WHERE status = 'pending'
         ORDER BY priority_score DESC, rowid ASC
         LIMIT ?1"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![limit], read_row)?;
    rows_to_records(rows)
}

/// A patient's records, newest first.
pub fn get_patient_history(
    conn: &Connection,
    patient_id: &Uuid,
    limit: u32,
) -> Result<Vec<TriageRecord>, DatabaseError> {
    let sql = format!(
        "SELECT {TRIAGE_COLUMNS} FROM triage_records
         WHERE patient_id = ?1
         ORDER BY created_at DESC
         LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![patient_id.to_string(), limit], read_row)?;
    rows_to_records(rows)
}

/// Compare-and-set status change. Returns `false` (and writes nothing)
/// when the record's current status is not `expected`.
pub fn transition_triage_status(
    conn: &Connection,
    id: &Uuid,
    expected: TriageStatus,
    next: TriageStatus,
    assignee: &str,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE triage_records SET status = ?1, assigned_to = ?2
         WHERE id = ?3 AND status = ?4",
        params![next.as_str(), assignee, id.to_string(), expected.as_str()],
    )?;
    Ok(changed == 1)
}

pub fn get_triage_analytics(
    conn: &Connection,
    now: DateTime<Utc>,
) -> Result<TriageAnalytics, DatabaseError> {
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM triage_records", [], |row| row.get(0))?;

    let mut stmt =
        conn.prepare("SELECT risk_level, COUNT(*) FROM triage_records GROUP BY risk_level")?;
    let risk_distribution: BTreeMap<String, u64> = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .map(|r| r.map(|(level, count)| (level, count.max(0) as u64)))
        .collect::<Result<_, _>>()?;

    let cutoff = format_timestamp(&(now - Duration::hours(24)));
    let recent: i64 = conn.query_row(
        "SELECT COUNT(*) FROM triage_records WHERE created_at >= ?1",
        params![cutoff],
        |row| row.get(0),
    )?;

    Ok(TriageAnalytics {
        total_triages: total.max(0) as u64,
        risk_distribution,
        recent_triages_24h: recent.max(0) as u64,
    })
}

type TriageRow = (
    String, String, String, String, String, i64, f64,
    String, Option<String>, Option<String>, String, Option<String>, String,
);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TriageRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
        row.get(11)?,
        row.get(12)?,
    ))
}

fn rows_to_records(
    rows: rusqlite::MappedRows<'_, impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<TriageRow>>,
) -> Result<Vec<TriageRecord>, DatabaseError> {
    let mut records = Vec::new();
    for row in rows {
        records.push(row_to_record(row?)?);
    }
    Ok(records)
}

fn row_to_record(row: TriageRow) -> Result<TriageRecord, DatabaseError> {
    let (
        id, patient_id, symptoms, vitals, risk_level, priority_score, ai_confidence,
        recommendations, primary_concerns, reasoning, status, assigned_to, created_at,
    ) = row;

    Ok(TriageRecord {
        id: parse_uuid(&id)?,
        patient_id: parse_uuid(&patient_id)?,
        symptoms: parse_observations(&symptoms)?,
        vitals: parse_observations(&vitals)?,
        risk_level: RiskLevel::from_str(&risk_level)?,
        priority_score: u8::try_from(priority_score).map_err(|_| {
            DatabaseError::ConstraintViolation(format!("priority_score {priority_score} out of range"))
        })?,
        ai_confidence,
        recommendations,
        primary_concerns: primary_concerns
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        reasoning,
        status: TriageStatus::from_str(&status)?,
        assigned_to,
        created_at: parse_timestamp(&created_at)?,
    })
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

fn parse_observations(raw: &str) -> Result<ObservationMap, DatabaseError> {
    serde_json::from_str(raw).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::insert_patient;
    use crate::db::sqlite::open_memory_database;
    use serde_json::json;

    fn setup() -> (Connection, PatientContext) {
        let conn = open_memory_database().unwrap();
        let patient = PatientContext::new("user-1");
        insert_patient(&conn, &patient).unwrap();
        (conn, patient)
    }

    fn record_with(patient: &PatientContext, score: u8, risk: RiskLevel) -> TriageRecord {
        let mut symptoms = ObservationMap::new();
        symptoms.insert("chest_pain".into(), json!(true));
        let mut vitals = ObservationMap::new();
        vitals.insert("heart_rate".into(), json!(110));
        vitals.insert("blood_pressure".into(), json!("160/95"));
        TriageRecord::new_pending(
            patient.id,
            symptoms,
            vitals,
            Assessment {
                risk_level: risk,
                priority_score: score,
                ai_confidence: 0.8,
                recommendations: "See a clinician".into(),
                primary_concerns: Some(vec!["cardiac".into()]),
                reasoning: Some("Elevated heart rate".into()),
            },
        )
    }

    #[test]
    fn insert_and_fetch_preserves_fields() {
        let (conn, patient) = setup();
        let record = record_with(&patient, 8, RiskLevel::High);
        insert_triage_record(&conn, &record).unwrap();

        let fetched = get_triage_record(&conn, &record.id).unwrap().unwrap();
        assert_eq!(fetched, record);
        assert_eq!(fetched.vitals["blood_pressure"], json!("160/95"));
    }

    #[test]
    fn missing_record_returns_none() {
        let (conn, _) = setup();
        assert!(get_triage_record(&conn, &Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn pending_list_orders_by_priority_desc() {
        let (conn, patient) = setup();
        for score in [3, 9, 5, 9, 1] {
            insert_triage_record(&conn, &record_with(&patient, score, RiskLevel::Moderate))
                .unwrap();
        }
        let pending = list_pending_by_priority(&conn, 10).unwrap();
        let scores: Vec<u8> = pending.iter().map(|r| r.priority_score).collect();
        assert_eq!(scores, vec![9, 9, 5, 3, 1]);
    }

    #[test]
    fn pending_list_equal_scores_keep_insertion_order() {
        let (conn, patient) = setup();
        let first = record_with(&patient, 7, RiskLevel::High);
        let second = record_with(&patient, 7, RiskLevel::High);
        insert_triage_record(&conn, &first).unwrap();
        insert_triage_record(&conn, &second).unwrap();
        let pending = list_pending_by_priority(&conn, 10).unwrap();
        assert_eq!(pending[0].id, first.id);
        assert_eq!(pending[1].id, second.id);
    }

    #[test]
    fn pending_list_respects_limit_and_status() {
        let (conn, patient) = setup();
        let claimed = record_with(&patient, 10, RiskLevel::Critical);
        insert_triage_record(&conn, &claimed).unwrap();
        for score in [2, 4, 6] {
            insert_triage_record(&conn, &record_with(&patient, score, RiskLevel::Low)).unwrap();
        }
        assert!(transition_triage_status(
            &conn,
            &claimed.id,
            TriageStatus::Pending,
            TriageStatus::InReview,
            "doc-1"
        )
        .unwrap());

        let pending = list_pending_by_priority(&conn, 2).unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|r| r.status == TriageStatus::Pending));
        assert_eq!(pending[0].priority_score, 6);
    }

    #[test]
    fn transition_is_compare_and_set() {
        let (conn, patient) = setup();
        let record = record_with(&patient, 6, RiskLevel::Moderate);
        insert_triage_record(&conn, &record).unwrap();

        let first = transition_triage_status(
            &conn,
            &record.id,
            TriageStatus::Pending,
            TriageStatus::InReview,
            "doc-a",
        )
        .unwrap();
        let second = transition_triage_status(
            &conn,
            &record.id,
            TriageStatus::Pending,
            TriageStatus::InReview,
            "doc-b",
        )
        .unwrap();
        assert!(first);
        assert!(!second);

        let stored = get_triage_record(&conn, &record.id).unwrap().unwrap();
        assert_eq!(stored.status, TriageStatus::InReview);
        assert_eq!(stored.assigned_to.as_deref(), Some("doc-a"));
    }

    #[test]
    fn history_is_newest_first() {
        let (conn, patient) = setup();
        let mut older = record_with(&patient, 4, RiskLevel::Low);
        older.created_at = Utc::now() - Duration::hours(2);
        let newer = record_with(&patient, 6, RiskLevel::Moderate);
        insert_triage_record(&conn, &older).unwrap();
        insert_triage_record(&conn, &newer).unwrap();

        let history = get_patient_history(&conn, &patient.id, 100).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, newer.id);
        assert_eq!(history[1].id, older.id);
    }

    #[test]
    fn analytics_counts_by_risk_and_recency() {
        let (conn, patient) = setup();
        let mut stale = record_with(&patient, 2, RiskLevel::Low);
        stale.created_at = Utc::now() - Duration::days(3);
        insert_triage_record(&conn, &stale).unwrap();
        insert_triage_record(&conn, &record_with(&patient, 9, RiskLevel::Critical)).unwrap();
        insert_triage_record(&conn, &record_with(&patient, 8, RiskLevel::Critical)).unwrap();

        let analytics = get_triage_analytics(&conn, Utc::now()).unwrap();
        assert_eq!(analytics.total_triages, 3);
        assert_eq!(analytics.recent_triages_24h, 2);
        assert_eq!(analytics.risk_distribution.get("critical"), Some(&2));
        assert_eq!(analytics.risk_distribution.get("low"), Some(&1));
    }
}
