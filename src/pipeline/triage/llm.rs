use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::TriageError;

/// Generative-model capability: one prompt in, raw text out.
///
/// Implementations perform exactly one outbound call per `generate` and
/// must bound it with a timeout.
pub trait LlmClient {
    fn generate(&self, prompt: &str) -> Result<String, TriageError>;

    /// Provider/model label for logs and the health endpoint.
    fn describe(&self) -> String;
}

enum Script {
    Always(String),
    Unreachable,
    Sequence(Mutex<VecDeque<Result<String, TriageError>>>),
}

/// Mock LLM client for testing. Canned responses, no network.
pub struct MockLlmClient {
    script: Script,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmClient {
    /// Returns the same response on every call.
    pub fn new(response: &str) -> Self {
        Self::with_script(Script::Always(response.to_string()))
    }

    /// Fails every call with a connection error.
    pub fn unreachable() -> Self {
        Self::with_script(Script::Unreachable)
    }

    /// Returns the given results in order; calls past the end fail with a
    /// connection error.
    pub fn scripted(results: Vec<Result<String, TriageError>>) -> Self {
        Self::with_script(Script::Sequence(Mutex::new(results.into())))
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl LlmClient for MockLlmClient {
    fn generate(&self, prompt: &str) -> Result<String, TriageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        match &self.script {
            Script::Always(response) => Ok(response.clone()),
            Script::Unreachable => Err(TriageError::ModelConnection("mock://unreachable".into())),
            Script::Sequence(queue) => queue
                .lock()
                .ok()
                .and_then(|mut q| q.pop_front())
                .unwrap_or_else(|| Err(TriageError::ModelConnection("mock://exhausted".into()))),
        }
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}
