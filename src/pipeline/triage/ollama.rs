use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::llm::LlmClient;
use super::TriageError;

/// Sampling settings shared by both HTTP backends.
pub const GENERATION_TEMPERATURE: f32 = 0.3;
pub const MAX_OUTPUT_TOKENS: u32 = 1000;

/// Ollama HTTP client for local LLM inference.
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    /// Create a new OllamaClient pointing at an Ollama instance.
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self, TriageError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TriageError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
        })
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl LlmClient for OllamaClient {
    fn generate(&self, prompt: &str) -> Result<String, TriageError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                temperature: GENERATION_TEMPERATURE,
                num_predict: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| map_send_error(e, &self.base_url, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(TriageError::ModelService {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .map_err(|e| TriageError::ResponseParsing(e.to_string()))?;

        Ok(parsed.response)
    }

    fn describe(&self) -> String {
        format!("ollama:{}", self.model)
    }
}

/// Classify a reqwest send error. Timeouts count as transport failures.
pub(crate) fn map_send_error(e: reqwest::Error, base_url: &str, timeout_secs: u64) -> TriageError {
    if e.is_timeout() {
        TriageError::HttpClient(format!("Request timed out after {timeout_secs}s"))
    } else if e.is_connect() {
        TriageError::ModelConnection(base_url.to_string())
    } else {
        TriageError::HttpClient(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ollama_client_constructor() {
        let client = OllamaClient::new("http://localhost:11434", "medgemma", 120).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.timeout_secs, 120);
        assert_eq!(client.describe(), "ollama:medgemma");
    }

    #[test]
    fn ollama_client_trims_trailing_slash() {
        let client = OllamaClient::new("http://localhost:11434/", "medgemma", 60).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn request_body_disables_streaming() {
        let body = OllamaGenerateRequest {
            model: "medgemma",
            prompt: "p",
            stream: false,
            options: OllamaOptions {
                temperature: GENERATION_TEMPERATURE,
                num_predict: MAX_OUTPUT_TOKENS,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 1000);
    }

    #[test]
    fn unreachable_server_is_transport_failure() {
        // Port 9 (discard) on localhost is not expected to run an HTTP server.
        let client = OllamaClient::new("http://127.0.0.1:9", "medgemma", 2).unwrap();
        let err = client.generate("prompt").unwrap_err();
        assert!(err.is_transport(), "unexpected error: {err}");
    }

    /// Accepts connections and holds them open without ever answering.
    fn silent_server() -> std::net::SocketAddr {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let mut held = Vec::new();
            for stream in listener.incoming().flatten() {
                held.push(stream);
            }
        });
        addr
    }

    #[test]
    fn hung_model_times_out_and_spends_the_budget() {
        use crate::pipeline::triage::{InvocationOutcome, ModelInvoker, RetryPolicy};
        use std::sync::Arc;

        let addr = silent_server();
        let client = OllamaClient::new(&format!("http://{addr}"), "medgemma", 1).unwrap();
        let invoker = ModelInvoker::new(Arc::new(client), RetryPolicy::default());

        let outcome = invoker.invoke("prompt");
        assert!(matches!(outcome, InvocationOutcome::Exhausted { attempts: 3, .. }));
        assert_eq!(outcome.failures().len(), 3);
        for record in outcome.failures() {
            assert_eq!(record.failure.kind(), "transport_failure");
            assert!(record.failure.to_string().contains("timed out"), "{}", record.failure);
        }
    }
}
