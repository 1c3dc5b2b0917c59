//! Staff queue endpoints (doctors and admins).
//!
//! - `GET /api/staff/pending` ordered pending queue
//! - `PATCH /api/staff/triage/:id/status` claim or resolve a case

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, Identity};
use crate::models::TriageStatus;
use crate::pipeline::triage::{self, PendingCase, MAX_QUEUE_LIMIT};

pub const STATUS_UPDATE_ACTION: &str = "TRIAGE_STATUS_UPDATE";

#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    pub limit: Option<u32>,
}

/// `GET /api/staff/pending`
pub async fn pending(
    State(ctx): State<ApiContext>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<PendingQuery>,
) -> Result<Json<Vec<PendingCase>>, ApiError> {
    identity.require_staff()?;
    let limit = query.limit.unwrap_or(MAX_QUEUE_LIMIT);

    let core = ctx.core.clone();
    let records =
        tokio::task::spawn_blocking(move || triage::list_pending(core.store.as_ref(), limit))
            .await??;

    Ok(Json(records.iter().map(PendingCase::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
    pub expected_status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusUpdateResponse {
    pub message: &'static str,
    pub triage_id: Uuid,
    pub status: TriageStatus,
    pub assigned_to: Option<String>,
}

fn parse_status(field: &str, raw: &str) -> Result<TriageStatus, ApiError> {
    TriageStatus::from_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid {field}: {raw}")))
}

/// `PATCH /api/staff/triage/:id/status`
pub async fn update_status(
    State(ctx): State<ApiContext>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<StatusUpdateResponse>, ApiError> {
    identity.require_staff()?;
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::BadRequest("Invalid triage id".into()))?;
    let next = parse_status("status", &request.status)?;
    let expected = request
        .expected_status
        .as_deref()
        .map(|raw| parse_status("expected_status", raw))
        .transpose()?;

    let core = ctx.core.clone();
    let record = tokio::task::spawn_blocking(move || -> Result<_, ApiError> {
        let record =
            triage::update_case_status(core.store.as_ref(), &id, next, expected, &identity.user_id)?;
        core.log_audit(
            &identity.user_id,
            STATUS_UPDATE_ACTION,
            Some(format!("Record {id} status: {next}")),
            None,
        );
        Ok(record)
    })
    .await??;

    Ok(Json(StatusUpdateResponse {
        message: "Status updated successfully",
        triage_id: record.id,
        status: record.status,
        assigned_to: record.assigned_to,
    }))
}
