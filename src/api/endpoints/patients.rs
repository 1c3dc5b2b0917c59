//! Patient profile endpoints.
//!
//! - `GET /api/patients/me`
//! - `PUT /api/patients/me`

use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, Identity};
use crate::models::{PatientContext, UserRole};
use crate::pipeline::triage::TriageStore;

/// `GET /api/patients/me`
pub async fn me(
    State(ctx): State<ApiContext>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<PatientContext>, ApiError> {
    identity.require(UserRole::Patient)?;

    let core = ctx.core.clone();
    let patient =
        tokio::task::spawn_blocking(move || core.store.find_patient_by_user_id(&identity.user_id))
            .await??
            .ok_or_else(|| ApiError::NotFound("Patient profile not found".into()))?;

    Ok(Json(patient))
}

#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub medical_history: Option<String>,
}

impl ProfileUpdate {
    fn apply_to(self, patient: &mut PatientContext) {
        if self.age.is_some() {
            patient.age = self.age;
        }
        if self.gender.is_some() {
            patient.gender = self.gender;
        }
        if self.medical_history.is_some() {
            patient.medical_history = self.medical_history;
        }
    }
}

/// `PUT /api/patients/me`. Creates the profile on first use; fields absent
/// from the body keep their stored value.
pub async fn update_me(
    State(ctx): State<ApiContext>,
    Extension(identity): Extension<Identity>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<PatientContext>, ApiError> {
    identity.require(UserRole::Patient)?;
    if update.age.is_some_and(|age| age > 150) {
        return Err(ApiError::BadRequest("Age must be between 0 and 150".into()));
    }

    let core = ctx.core.clone();
    let stored = tokio::task::spawn_blocking(move || {
        let mut patient = core
            .store
            .find_patient_by_user_id(&identity.user_id)?
            .unwrap_or_else(|| PatientContext::new(&identity.user_id));
        update.apply_to(&mut patient);
        core.store.upsert_patient(&patient)
    })
    .await??;
    tracing::info!(patient_id = %stored.id, "Patient profile saved");

    Ok(Json(stored))
}
