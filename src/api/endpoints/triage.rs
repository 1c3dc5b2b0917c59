//! Patient triage endpoints.
//!
//! - `POST /api/triage/analyze` submits symptoms and vitals
//! - `GET /api/triage/history/:patient_id` lists past submissions

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, State};
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, Identity};
use crate::models::{ObservationMap, RiskLevel, TriageRecord, TriageStatus, UserRole};
use crate::pipeline::triage::TriageStore;

pub const TRIAGE_ANALYSIS_ACTION: &str = "TRIAGE_ANALYSIS";

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub symptoms: ObservationMap,
    pub vitals: ObservationMap,
}

/// Patient-facing projection of a new record.
#[derive(Debug, Serialize)]
pub struct TriageResponse {
    pub id: Uuid,
    pub risk_level: RiskLevel,
    pub priority_score: u8,
    pub ai_confidence: f64,
    pub recommendations: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_concerns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub status: TriageStatus,
    pub created_at: DateTime<Utc>,
}

impl From<TriageRecord> for TriageResponse {
    fn from(record: TriageRecord) -> Self {
        Self {
            id: record.id,
            risk_level: record.risk_level,
            priority_score: record.priority_score,
            ai_confidence: record.ai_confidence,
            recommendations: record.recommendations,
            primary_concerns: record.primary_concerns,
            reasoning: record.reasoning,
            status: record.status,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub risk_level: RiskLevel,
    pub priority_score: u8,
    pub status: TriageStatus,
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub symptoms: ObservationMap,
    pub vitals: ObservationMap,
}

impl From<TriageRecord> for HistoryEntry {
    fn from(record: TriageRecord) -> Self {
        Self {
            id: record.id,
            risk_level: record.risk_level,
            priority_score: record.priority_score,
            status: record.status,
            assigned_to: record.assigned_to,
            created_at: record.created_at,
            symptoms: record.symptoms,
            vitals: record.vitals,
        }
    }
}

/// Observation values must be text, numbers or booleans.
fn check_scalar_values(field: &str, map: &ObservationMap) -> Result<(), ApiError> {
    match map.iter().find(|(_, v)| !(v.is_string() || v.is_number() || v.is_boolean())) {
        Some((key, _)) => Err(ApiError::BadRequest(format!(
            "{field}.{key} must be a string, number, or boolean"
        ))),
        None => Ok(()),
    }
}

/// `POST /api/triage/analyze`
pub async fn analyze(
    State(ctx): State<ApiContext>,
    Extension(identity): Extension<Identity>,
    client: Option<ConnectInfo<SocketAddr>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<TriageResponse>, ApiError> {
    identity.require(UserRole::Patient)?;
    check_scalar_values("symptoms", &request.symptoms)?;
    check_scalar_values("vitals", &request.vitals)?;

    let orchestrator = ctx.core.orchestrator.clone();
    let user_id = identity.user_id.clone();
    let record = tokio::task::spawn_blocking(move || {
        orchestrator.analyze(&user_id, request.symptoms, request.vitals)
    })
    .await??;

    let core = ctx.core.clone();
    let details = format!(
        "Risk level: {}, Priority: {}",
        record.risk_level, record.priority_score
    );
    let ip = client.map(|ConnectInfo(addr)| addr.ip().to_string());
    let user_id = identity.user_id;
    run_audit(move || core.log_audit(&user_id, TRIAGE_ANALYSIS_ACTION, Some(details), ip)).await;

    Ok(Json(record.into()))
}

/// Run an audit write off the async threads. The record is already stored,
/// so a failed audit task is logged and never fails the request.
async fn run_audit<F>(write: F)
where
    F: FnOnce() + Send + 'static,
{
    if let Err(e) = tokio::task::spawn_blocking(write).await {
        tracing::error!(error = %e, "Audit task failed");
    }
}

/// `GET /api/triage/history/:patient_id`. Patients may only read their own.
pub async fn history(
    State(ctx): State<ApiContext>,
    Extension(identity): Extension<Identity>,
    Path(patient_id): Path<String>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let patient_id = Uuid::parse_str(&patient_id)
        .map_err(|_| ApiError::BadRequest("Invalid patient id".into()))?;

    let core = ctx.core.clone();
    let records = tokio::task::spawn_blocking(move || -> Result<Vec<TriageRecord>, ApiError> {
        if identity.role == UserRole::Patient {
            let own = core.store.find_patient_by_user_id(&identity.user_id)?;
            if own.map(|p| p.id) != Some(patient_id) {
                return Err(ApiError::Forbidden);
            }
        }
        Ok(core.orchestrator.history(&patient_id)?)
    })
    .await??;

    Ok(Json(records.into_iter().map(HistoryEntry::from).collect()))
}
