use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Patient profile as seen by the triage pipeline. Read-only to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientContext {
    pub id: Uuid,
    pub user_id: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub medical_history: Option<String>,
}

impl PatientContext {
    pub fn new(user_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            age: None,
            gender: None,
            medical_history: None,
        }
    }

    pub fn with_medical_history(mut self, history: &str) -> Self {
        self.medical_history = Some(history.to_string());
        self
    }
}
