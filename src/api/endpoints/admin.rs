//! Admin endpoints.
//!
//! - `GET /api/admin/analytics`
//! - `GET /api/admin/audit?limit=N`

use axum::extract::{Query, State};
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, Identity};
use crate::models::{AuditEntry, TriageAnalytics, UserRole};

const DEFAULT_AUDIT_LIMIT: u32 = 100;
const MAX_AUDIT_LIMIT: u32 = 1000;

/// `GET /api/admin/analytics`
pub async fn analytics(
    State(ctx): State<ApiContext>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<TriageAnalytics>, ApiError> {
    identity.require(UserRole::Admin)?;
    let core = ctx.core.clone();
    let analytics = tokio::task::spawn_blocking(move || core.store.analytics()).await??;
    Ok(Json(analytics))
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<u32>,
}

/// `GET /api/admin/audit`
pub async fn audit(
    State(ctx): State<ApiContext>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    identity.require(UserRole::Admin)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_AUDIT_LIMIT)
        .clamp(1, MAX_AUDIT_LIMIT);
    let core = ctx.core.clone();
    let entries = tokio::task::spawn_blocking(move || core.store.recent_audit(limit)).await??;
    Ok(Json(entries))
}
