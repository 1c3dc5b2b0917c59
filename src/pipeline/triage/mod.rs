pub mod prompt;
pub mod parser;
pub mod validation;
pub mod fallback;
pub mod llm;
pub mod ollama;
pub mod gemini;
pub mod retry;
pub mod invoker;
pub mod store;
pub mod orchestrator;
pub mod queue;

pub use prompt::*;
pub use parser::*;
pub use validation::*;
pub use fallback::*;
pub use llm::*;
pub use ollama::*;
pub use gemini::*;
pub use retry::*;
pub use invoker::*;
pub use store::*;
pub use orchestrator::*;
pub use queue::*;

use thiserror::Error;

use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::TriageStatus;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Model service is not reachable at {0}")]
    ModelConnection(String),

    #[error("Model service returned error (status {status}): {body}")]
    ModelService { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Model output is not valid JSON: {0}")]
    OutputUnparseable(String),

    #[error("Patient profile not found for user {0}")]
    PatientProfileNotFound(String),

    #[error("Triage record not found: {0}")]
    RecordNotFound(Uuid),

    #[error("Status change from {from} to {to} is not allowed")]
    InvalidTransition { from: TriageStatus, to: TriageStatus },

    #[error("Triage record {id} is no longer {expected}")]
    StatusConflict { id: Uuid, expected: TriageStatus },

    #[error("Persistence failure: {0}")]
    Persistence(#[from] DatabaseError),
}

impl TriageError {
    /// Failures of the model call itself, each counted against the retry budget.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            TriageError::ModelConnection(_)
                | TriageError::ModelService { .. }
                | TriageError::HttpClient(_)
                | TriageError::ResponseParsing(_)
        )
    }
}
