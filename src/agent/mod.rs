//! Coding agent configuration and invocation.
//!
//! An [`AgentConfig`] bundles the credential, model, system prompt and tool
//! grants for one agent. An [`AgentBackend`] runs a task against such a
//! configuration; the real backend drives the Claude Code CLI:
//! `claude -p --output-format json --allowedTools ...`
//!
//! The agent process runs on the operator's machine, not inside the
//! sandbox, whichever sandbox provider is selected. Its shell and file
//! tools act on the host. The default system prompt's mention of a sandbox
//! describes the deployment, not an isolation guarantee.

mod claude;
mod error;
#[cfg(test)]
pub(crate) mod mock;
mod runner;

pub(crate) use claude::ClaudeCliBackend;
pub(crate) use error::AgentError;
pub(crate) use runner::run_task;

use async_trait::async_trait;

use crate::credential::Credential;

/// System prompt used when none is supplied.
pub(crate) const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant running in a secure E2B sandbox.";

/// Model used when none is supplied.
pub(crate) const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

/// Which tools the agent may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CapabilityGrants {
    /// Run shell commands.
    pub shell: bool,
    /// Read files.
    pub read_file: bool,
    /// Create files.
    pub write_file: bool,
    /// Edit existing files.
    pub edit_file: bool,
    /// Reach the network (fetch, search).
    pub network: bool,
}

impl CapabilityGrants {
    /// Grants for sandboxed work: full file and shell access, no outbound web.
    pub const SANDBOX: Self = Self {
        shell: true,
        read_file: true,
        write_file: true,
        edit_file: true,
        network: false,
    };
}

impl Default for CapabilityGrants {
    fn default() -> Self {
        Self::SANDBOX
    }
}

/// Immutable configuration for one agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AgentConfig {
    credential: Credential,
    model: String,
    system_prompt: String,
    grants: CapabilityGrants,
}

impl AgentConfig {
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn grants(&self) -> CapabilityGrants {
        self.grants
    }
}

/// Builds an agent configuration, filling in the default prompt and model.
///
/// Always attaches [`CapabilityGrants::SANDBOX`]. Never contacts a backend.
pub(crate) fn build_agent_config(
    credential: Credential,
    system_prompt: Option<&str>,
    model: Option<&str>,
) -> AgentConfig {
    AgentConfig {
        credential,
        model: model.unwrap_or(DEFAULT_MODEL).to_string(),
        system_prompt: system_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT).to_string(),
        grants: CapabilityGrants::SANDBOX,
    }
}

/// Result of one agent run.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AgentOutput {
    /// Final text produced by the agent.
    pub output: String,
    /// Reported cost of the run, if the backend exposes it.
    pub cost_usd: Option<f64>,
    /// Number of agent turns, if the backend exposes it.
    pub turns: Option<u32>,
}

impl AgentOutput {
    #[allow(dead_code)] // Used by mock backends
    pub fn text(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            cost_usd: None,
            turns: None,
        }
    }
}

/// Trait for agent backends.
#[async_trait]
pub(crate) trait AgentBackend: Send + Sync {
    /// Returns the backend name for display.
    fn name(&self) -> &'static str;

    /// Runs one task and returns the agent's output.
    async fn invoke(&self, config: &AgentConfig, task: &str) -> Result<AgentOutput, AgentError>;
}
