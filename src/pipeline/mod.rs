pub mod triage; // Prompt, model invocation, validation, fallback, persistence, queue
