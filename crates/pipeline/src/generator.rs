//! The seam to the artifact-generation backend.
//!
//! The backend executes a named tool against structured input and returns
//! raw text. It is opaque, potentially slow, and flaky; callers must
//! tolerate repeated invocation for one job and never assume idempotency.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

/// Errors from a generation backend.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// The backend could not be reached (network, DNS, TLS, timeout).
    #[error("Generation transport error: {0}")]
    Transport(String),

    /// The backend answered with a failure.
    #[error("Generation backend error ({status}): {body}")]
    Backend { status: u16, body: String },
}

/// Executes a named tool with structured input, returning raw text.
#[async_trait]
pub trait ArtifactGenerator: Send + Sync {
    async fn generate(&self, tool: &str, input: &Value) -> Result<String, GeneratorError>;
}

// ---------------------------------------------------------------------------
// Scripted generator
// ---------------------------------------------------------------------------

/// One scripted backend response.
#[derive(Debug, Clone)]
enum Scripted {
    Text(String),
    Transport(String),
}

/// A deterministic in-process backend for tests and local development.
///
/// Responses queued with [`push_text`](Self::push_text) /
/// [`push_transport_error`](Self::push_transport_error) are consumed in
/// order; once the queue is empty the fallback set via
/// [`always`](Self::always) repeats forever. Every call is recorded for
/// assertion.
#[derive(Default)]
pub struct ScriptedGenerator {
    queue: Mutex<VecDeque<Scripted>>,
    fallback: Mutex<Option<Scripted>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one successful response.
    pub fn push_text(&self, text: impl Into<String>) {
        self.queue
            .lock()
            .unwrap()
            .push_back(Scripted::Text(text.into()));
    }

    /// Queue one transport failure.
    pub fn push_transport_error(&self, message: impl Into<String>) {
        self.queue
            .lock()
            .unwrap()
            .push_back(Scripted::Transport(message.into()));
    }

    /// Respond with `text` forever once the queue is drained.
    pub fn always(&self, text: impl Into<String>) {
        *self.fallback.lock().unwrap() = Some(Scripted::Text(text.into()));
    }

    /// Fail with a transport error forever once the queue is drained.
    pub fn always_transport_error(&self, message: impl Into<String>) {
        *self.fallback.lock().unwrap() = Some(Scripted::Transport(message.into()));
    }

    /// Every `(tool, input)` pair seen so far.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ArtifactGenerator for ScriptedGenerator {
    async fn generate(&self, tool: &str, input: &Value) -> Result<String, GeneratorError> {
        self.calls
            .lock()
            .unwrap()
            .push((tool.to_string(), input.clone()));

        let next = self
            .queue
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.fallback.lock().unwrap().clone());

        match next {
            Some(Scripted::Text(text)) => Ok(text),
            Some(Scripted::Transport(message)) => Err(GeneratorError::Transport(message)),
            None => Err(GeneratorError::Transport(
                "scripted generator has no response".to_string(),
            )),
        }
    }
}
