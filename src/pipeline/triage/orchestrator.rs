use std::sync::Arc;

use uuid::Uuid;

use super::fallback::fallback_assessment;
use super::invoker::ModelInvoker;
use super::prompt::build_triage_prompt;
use super::retry::InvocationOutcome;
use super::store::TriageStore;
use super::TriageError;
use crate::models::{ObservationMap, TriageRecord};

pub const HISTORY_LIMIT: u32 = 100;

/// Runs one triage analysis end to end.
pub struct TriageOrchestrator {
    invoker: ModelInvoker,
    store: Arc<dyn TriageStore>,
}

impl TriageOrchestrator {
    pub fn new(invoker: ModelInvoker, store: Arc<dyn TriageStore>) -> Self {
        Self { invoker, store }
    }

    pub fn invoker(&self) -> &ModelInvoker {
        &self.invoker
    }

    /// Analyze a submission for the patient owned by `user_id` and persist
    /// exactly one record. Nothing is written when the profile is missing.
    pub fn analyze(
        &self,
        user_id: &str,
        symptoms: ObservationMap,
        vitals: ObservationMap,
    ) -> Result<TriageRecord, TriageError> {
        let _span = tracing::info_span!("analyze_triage", user_id).entered();

        // Step 1: Resolve the patient profile
        let patient = self
            .store
            .find_patient_by_user_id(user_id)?
            .ok_or_else(|| TriageError::PatientProfileNotFound(user_id.to_string()))?;

        // Step 2: Prompt and model, falling back when the budget is spent
        let prompt = build_triage_prompt(&symptoms, &vitals, patient.medical_history.as_deref());
        let assessment = match self.invoker.invoke(&prompt) {
            InvocationOutcome::Succeeded {
                assessment,
                attempts,
                ..
            } => {
                tracing::info!(attempts, "Triage assessment accepted");
                assessment
            }
            InvocationOutcome::Exhausted { attempts, failures } => {
                tracing::warn!(
                    attempts,
                    last_reason = failures.last().map(|r| r.failure.kind()).unwrap_or("none"),
                    "Model retry budget exhausted, using fallback assessment"
                );
                fallback_assessment()
            }
        };

        // Step 3: Build the pending record
        let record = TriageRecord::new_pending(patient.id, symptoms, vitals, assessment);

        // Step 4: Persist last
        self.store.insert_record(&record)?;
        tracing::info!(
            record_id = %record.id,
            risk_level = %record.risk_level,
            priority_score = record.priority_score,
            "Triage record stored"
        );

        Ok(record)
    }

    /// A patient's records, newest first.
    pub fn history(&self, patient_id: &Uuid) -> Result<Vec<TriageRecord>, TriageError> {
        Ok(self.store.patient_history(patient_id, HISTORY_LIMIT)?)
    }
}
