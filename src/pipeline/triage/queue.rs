//! Staff-facing read and claim path over persisted records.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::store::TriageStore;
use super::TriageError;
use crate::models::{RiskLevel, TriageRecord, TriageStatus};

pub const MAX_QUEUE_LIMIT: u32 = 100;

/// Queue row shown to staff.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingCase {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub risk_level: RiskLevel,
    pub priority_score: u8,
    pub ai_confidence: f64,
    pub primary_concerns: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl From<&TriageRecord> for PendingCase {
    fn from(record: &TriageRecord) -> Self {
        Self {
            id: record.id,
            patient_id: record.patient_id,
            risk_level: record.risk_level,
            priority_score: record.priority_score,
            ai_confidence: record.ai_confidence,
            primary_concerns: record.primary_concerns.clone(),
            created_at: record.created_at,
        }
    }
}

/// Pending records in non-increasing priority, at most `limit` (capped at
/// 100). A limit of zero yields an empty queue. Equal priorities keep the
/// store's order.
pub fn list_pending(store: &dyn TriageStore, limit: u32) -> Result<Vec<TriageRecord>, TriageError> {
    let limit = limit.min(MAX_QUEUE_LIMIT);
    if limit == 0 {
        return Ok(Vec::new());
    }
    let mut records: Vec<TriageRecord> = store
        .list_pending(limit)?
        .into_iter()
        .filter(|r| r.status == TriageStatus::Pending)
        .collect();
    records.sort_by(|a, b| b.priority_score.cmp(&a.priority_score));
    records.truncate(limit as usize);
    Ok(records)
}

/// Move a record to `next` and assign it to `staff_user_id`.
///
/// `expected` defaults to the status read just before the write. The write
/// itself is compare-and-set, so a concurrent change yields `StatusConflict`.
pub fn update_case_status(
    store: &dyn TriageStore,
    id: &Uuid,
    next: TriageStatus,
    expected: Option<TriageStatus>,
    staff_user_id: &str,
) -> Result<TriageRecord, TriageError> {
    let current = store
        .get_record(id)?
        .ok_or(TriageError::RecordNotFound(*id))?;

    let expected = expected.unwrap_or(current.status);
    if expected != current.status {
        return Err(TriageError::StatusConflict { id: *id, expected });
    }
    if !current.status.can_transition_to(next) {
        return Err(TriageError::InvalidTransition {
            from: current.status,
            to: next,
        });
    }

    if !store.transition_status(id, expected, next, staff_user_id)? {
        return Err(TriageError::StatusConflict { id: *id, expected });
    }
    tracing::info!(record_id = %id, from = %expected, to = %next, "Triage status updated");

    store
        .get_record(id)?
        .ok_or(TriageError::RecordNotFound(*id))
}
