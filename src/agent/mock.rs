//! Mock agent backend for testing.
//!
//! Provides a configurable mock that returns predetermined responses
//! for session tests without invoking a real agent CLI.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{AgentBackend, AgentConfig, AgentError, AgentOutput};

/// A mock agent backend for testing.
///
/// Returns configurable responses and tracks invocations for test assertions.
#[derive(Debug, Clone)]
pub(crate) struct MockAgentBackend {
    /// Responses to return in order. Cycles if more invocations than responses.
    responses: Arc<Vec<MockResponse>>,
    /// Number of times `invoke` has been called.
    invocation_count: Arc<AtomicUsize>,
    /// Task and model of the most recent invocation.
    last_call: Arc<Mutex<Option<(String, String)>>>,
}

/// A single mock response configuration.
#[derive(Debug, Clone)]
pub(crate) enum MockResponse {
    /// Return a successful response with the given output.
    Success(String),
    /// Echo the task back, prefixed with "done: ".
    Echo,
    /// Fail as if the agent process exited with an error.
    Error(String),
    /// Fail as if the agent printed unparseable output.
    Malformed,
    /// Never return, like an agent stuck on a long task.
    Hang,
}

impl MockAgentBackend {
    /// Create a new mock backend that returns the given responses in order.
    ///
    /// If invoked more times than responses, it cycles back to the first.
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Arc::new(responses),
            invocation_count: Arc::new(AtomicUsize::new(0)),
            last_call: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a mock that always succeeds with the given output.
    pub fn always_succeed(output: &str) -> Self {
        Self::new(vec![MockResponse::Success(output.to_string())])
    }

    /// Create a mock that always fails with the given error.
    pub fn always_fail(error: &str) -> Self {
        Self::new(vec![MockResponse::Error(error.to_string())])
    }

    /// Get the number of times `invoke` was called.
    pub fn invocation_count(&self) -> usize {
        self.invocation_count.load(Ordering::SeqCst)
    }

    /// Task passed to the most recent invocation.
    pub fn last_task(&self) -> Option<String> {
        self.last_call
            .lock()
            .unwrap()
            .as_ref()
            .map(|(task, _)| task.clone())
    }

    /// Model used by the most recent invocation.
    pub fn last_model(&self) -> Option<String> {
        self.last_call
            .lock()
            .unwrap()
            .as_ref()
            .map(|(_, model)| model.clone())
    }
}

#[async_trait]
impl AgentBackend for MockAgentBackend {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn invoke(&self, config: &AgentConfig, task: &str) -> Result<AgentOutput, AgentError> {
        let count = self.invocation_count.fetch_add(1, Ordering::SeqCst);
        *self.last_call.lock().unwrap() = Some((task.to_string(), config.model().to_string()));
        let response = &self.responses[count % self.responses.len()];

        match response {
            MockResponse::Success(output) => Ok(AgentOutput::text(output.clone())),
            MockResponse::Echo => Ok(AgentOutput::text(format!("done: {task}"))),
            MockResponse::Error(msg) => Err(AgentError::Failed {
                code: Some(1),
                stderr: msg.clone(),
            }),
            MockResponse::Malformed => Err(AgentError::malformed("expected value at line 1")),
            MockResponse::Hang => std::future::pending().await,
        }
    }
}
