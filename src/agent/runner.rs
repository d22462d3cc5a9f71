use tracing::{debug, error};

use super::{AgentBackend, AgentConfig, AgentError};

/// Runs one task and returns the agent's text output.
///
/// Failures are logged and returned unchanged. No retries.
pub(crate) async fn run_task(
    backend: &dyn AgentBackend,
    config: &AgentConfig,
    task: &str,
) -> Result<String, AgentError> {
    debug!("Submitting task to {} ({})", backend.name(), config.model());

    match backend.invoke(config, task).await {
        Ok(result) => Ok(result.output),
        Err(e) => {
            error!("Agent execution error: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::build_agent_config;
    use crate::agent::mock::{MockAgentBackend, MockResponse};
    use crate::credential::Credential;

    fn config() -> AgentConfig {
        build_agent_config(Credential::new("a-key"), None, None)
    }

    #[tokio::test]
    async fn test_run_task_returns_output() {
        let backend = MockAgentBackend::always_succeed("hello world");
        let output = run_task(&backend, &config(), "say hi").await.unwrap();
        assert_eq!(output, "hello world");
        assert_eq!(backend.last_task().as_deref(), Some("say hi"));
    }

    #[tokio::test]
    async fn test_run_task_propagates_error_unchanged() {
        let backend = MockAgentBackend::new(vec![MockResponse::Malformed]);
        let err = run_task(&backend, &config(), "task").await.unwrap_err();
        assert!(matches!(err, AgentError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_run_task_does_not_retry() {
        let backend = MockAgentBackend::always_fail("network unreachable");
        let _ = run_task(&backend, &config(), "task").await;
        assert_eq!(backend.invocation_count(), 1);
    }
}
