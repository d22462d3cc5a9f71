//! Errors raised while invoking an agent backend.

/// Errors that can occur during an agent run.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AgentError {
    /// The agent process could not be started.
    #[error("Failed to start agent '{program}': {message}")]
    Spawn { program: String, message: String },

    /// Talking to the agent process failed mid-run.
    #[error("Agent I/O failed: {message}")]
    Io { message: String },

    /// The agent exited unsuccessfully.
    #[error("Agent failed with exit code {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    /// The agent's output could not be understood.
    #[error("Agent returned a malformed response: {message}")]
    MalformedResponse { message: String },

    /// The agent completed but reported an error result.
    #[error("Agent reported an error: {message}")]
    Reported { message: String },
}

impl AgentError {
    /// Creates a `Spawn` error.
    pub fn spawn(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Spawn {
            program: program.into(),
            message: message.into(),
        }
    }

    /// Creates an `Io` error.
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a `MalformedResponse` error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Creates a `Reported` error.
    pub fn reported(message: impl Into<String>) -> Self {
        Self::Reported {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_error() {
        let err = AgentError::spawn("claude", "No such file or directory");
        assert_eq!(
            err.to_string(),
            "Failed to start agent 'claude': No such file or directory"
        );
    }

    #[test]
    fn test_failed_error() {
        let err = AgentError::Failed {
            code: Some(2),
            stderr: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Agent failed with exit code Some(2): boom");
    }

    #[test]
    fn test_malformed_error() {
        let err = AgentError::malformed("expected value at line 1");
        assert!(err.to_string().contains("malformed response"));
    }
}
