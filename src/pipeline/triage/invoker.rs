use std::sync::Arc;
use std::time::Duration;

use super::llm::LlmClient;
use super::parser::parse_model_output;
use super::retry::{AttemptFailure, AttemptState, InvocationOutcome, RetryMachine};
use super::validation::validate_assessment;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Pause between attempts. Zero retries immediately.
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: Duration::ZERO,
        }
    }
}

/// Calls the model until a response passes parsing and validation, or the
/// attempt budget runs out. Every kind of failure costs one attempt.
pub struct ModelInvoker {
    llm: Arc<dyn LlmClient + Send + Sync>,
    policy: RetryPolicy,
}

impl ModelInvoker {
    pub fn new(llm: Arc<dyn LlmClient + Send + Sync>, policy: RetryPolicy) -> Self {
        Self { llm, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn describe_model(&self) -> String {
        self.llm.describe()
    }

    pub fn invoke(&self, prompt: &str) -> InvocationOutcome {
        let mut machine = RetryMachine::new(self.policy.max_attempts);
        machine.start();

        while let Some(attempt) = machine.current_attempt() {
            if attempt > 1 && !self.policy.retry_delay.is_zero() {
                std::thread::sleep(self.policy.retry_delay);
            }

            match self.attempt(prompt) {
                Ok(assessment) => {
                    tracing::debug!(attempt, "Model response accepted");
                    machine.succeed(assessment);
                }
                Err(failure) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = machine.max_attempts(),
                        kind = failure.kind(),
                        reason = %failure,
                        "Triage model attempt failed"
                    );
                    machine.fail(failure);
                }
            }
        }

        if *machine.state() == AttemptState::Exhausted {
            tracing::warn!(
                attempts = machine.attempts_made(),
                last_kind = machine.last_failure().map(AttemptFailure::kind),
                "Triage model attempts exhausted"
            );
        }

        machine.into_outcome()
    }

    fn attempt(&self, prompt: &str) -> Result<crate::models::Assessment, AttemptFailure> {
        let raw = self.llm.generate(prompt).map_err(|e| {
            if e.is_transport() {
                AttemptFailure::Transport(e.to_string())
            } else {
                AttemptFailure::Unparseable(e.to_string())
            }
        })?;
        let value = parse_model_output(&raw).map_err(|e| AttemptFailure::Unparseable(e.to_string()))?;
        validate_assessment(&value).map_err(AttemptFailure::Invalid)
    }
}
