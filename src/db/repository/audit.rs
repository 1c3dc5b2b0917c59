use rusqlite::{params, Connection};

use super::triage::{format_timestamp, parse_timestamp};
use crate::db::DatabaseError;
use crate::models::AuditEntry;

pub fn insert_audit_entry(conn: &Connection, entry: &AuditEntry) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO audit_log (user_id, action, details, ip_address, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.user_id,
            entry.action,
            entry.details,
            entry.ip_address,
            format_timestamp(&entry.timestamp),
        ],
    )?;
    Ok(())
}

/// Most recent audit entries first.
pub fn list_recent_audit_entries(
    conn: &Connection,
    limit: u32,
) -> Result<Vec<AuditEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT user_id, action, details, ip_address, timestamp FROM audit_log
         ORDER BY timestamp DESC, id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![limit], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(user_id, action, details, ip_address, timestamp)| {
            Ok(AuditEntry {
                user_id,
                action,
                details,
                ip_address,
                timestamp: parse_timestamp(&timestamp)?,
            })
        })
        .collect()
}
