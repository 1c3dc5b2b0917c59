//! Attempt bookkeeping for model invocation.
//!
//! `Idle -> Attempting(1) -> ... -> Attempting(max) -> Exhausted`, with any
//! `Attempting(n)` able to move to `Succeeded`. Terminal states ignore
//! further events.

use std::fmt;

use super::validation::Rejection;
use crate::models::Assessment;

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptState {
    Idle,
    Attempting(u32),
    Succeeded(Assessment),
    Exhausted,
}

/// Why a single attempt did not yield an accepted assessment.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptFailure {
    Transport(String),
    Unparseable(String),
    Invalid(Rejection),
}

impl AttemptFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            AttemptFailure::Transport(_) => "transport_failure",
            AttemptFailure::Unparseable(_) => "parse_failure",
            AttemptFailure::Invalid(_) => "validation_failure",
        }
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Transport(msg) | AttemptFailure::Unparseable(msg) => {
                write!(f, "{}: {msg}", self.kind())
            }
            AttemptFailure::Invalid(rejection) => write!(f, "{}: {rejection}", self.kind()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub failure: AttemptFailure,
}

/// Result of a full invocation: an accepted assessment or a spent budget.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    Succeeded {
        assessment: Assessment,
        attempts: u32,
        failures: Vec<AttemptRecord>,
    },
    Exhausted {
        attempts: u32,
        failures: Vec<AttemptRecord>,
    },
}

impl InvocationOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            InvocationOutcome::Succeeded { attempts, .. }
            | InvocationOutcome::Exhausted { attempts, .. } => *attempts,
        }
    }

    pub fn failures(&self) -> &[AttemptRecord] {
        match self {
            InvocationOutcome::Succeeded { failures, .. }
            | InvocationOutcome::Exhausted { failures, .. } => failures,
        }
    }
}

pub struct RetryMachine {
    max_attempts: u32,
    state: AttemptState,
    failures: Vec<AttemptRecord>,
}

impl RetryMachine {
    /// A budget of zero is raised to one; at least one call is always made.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            state: AttemptState::Idle,
            failures: Vec::new(),
        }
    }

    pub fn state(&self) -> &AttemptState {
        &self.state
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Number of the attempt in flight, if any.
    pub fn current_attempt(&self) -> Option<u32> {
        match self.state {
            AttemptState::Attempting(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            AttemptState::Succeeded(_) | AttemptState::Exhausted
        )
    }

    /// Leave `Idle` for the first attempt.
    pub fn start(&mut self) {
        if self.state == AttemptState::Idle {
            self.state = AttemptState::Attempting(1);
        }
    }

    pub fn succeed(&mut self, assessment: Assessment) {
        if let AttemptState::Attempting(_) = self.state {
            self.state = AttemptState::Succeeded(assessment);
        }
    }

    /// Record a failed attempt and advance, or exhaust at the budget.
    pub fn fail(&mut self, failure: AttemptFailure) {
        if let AttemptState::Attempting(n) = self.state {
            self.failures.push(AttemptRecord {
                attempt: n,
                failure,
            });
            self.state = if n >= self.max_attempts {
                AttemptState::Exhausted
            } else {
                AttemptState::Attempting(n + 1)
            };
        }
    }

    pub fn attempts_made(&self) -> u32 {
        match &self.state {
            AttemptState::Idle => 0,
            // The in-flight attempt has not completed yet.
            AttemptState::Attempting(n) => n - 1,
            AttemptState::Succeeded(_) => self.failures.len() as u32 + 1,
            AttemptState::Exhausted => self.failures.len() as u32,
        }
    }

    pub fn last_failure(&self) -> Option<&AttemptFailure> {
        self.failures.last().map(|r| &r.failure)
    }

    /// Final outcome. An unfinished machine is reported as exhausted.
    pub fn into_outcome(self) -> InvocationOutcome {
        let attempts = self.attempts_made();
        match self.state {
            AttemptState::Succeeded(assessment) => InvocationOutcome::Succeeded {
                assessment,
                attempts,
                failures: self.failures,
            },
            _ => InvocationOutcome::Exhausted {
                attempts,
                failures: self.failures,
            },
        }
    }
}
