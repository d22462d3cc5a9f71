//! CLI command implementations.
//!
//! Each submodule implements one deployment pattern. Shared here: the
//! sandbox and agent arguments, and their resolution against the config
//! file and environment.
//!
//! In every command the Claude CLI runs on this machine. `ephemeral` and
//! `persistent` provision a sandbox and tie its lifetime to the run, but
//! the agent's tools are not confined to it.

pub mod ephemeral;
pub mod local;
pub mod persistent;

use anyhow::Result;
use clap::Args;
use std::time::Duration;
use tracing::debug;

use crate::config::{require_credential, AgentSettings, SandboxConfig, ANTHROPIC_API_KEY, E2B_API_KEY};
use crate::credential::Credential;
use crate::sandbox::{CreateRequest, DockerBackend, E2bBackend, SandboxBackend, SandboxProvider};

/// Sandbox selection arguments.
#[derive(Args, Debug, Clone, Default)]
pub struct SandboxArgs {
    /// Sandbox provider: e2b or docker (default: from config, else e2b)
    #[arg(long, env = "SANDBOX_PROVIDER")]
    pub provider: Option<String>,

    /// Sandbox template (E2B) or image (Docker)
    #[arg(long, env = "E2B_TEMPLATE")]
    pub template: Option<String>,

    /// Sandbox idle timeout in milliseconds
    #[arg(long = "timeout-ms", env = "E2B_TIMEOUT")]
    pub timeout_ms: Option<u64>,

    /// E2B API key
    #[arg(long = "e2b-api-key", env = "E2B_API_KEY", hide = true, hide_env_values = true)]
    pub e2b_api_key: Option<String>,
}

/// Agent arguments.
#[derive(Args, Debug, Clone, Default)]
pub struct AgentArgs {
    /// Model override (default: from config, else the built-in default)
    #[arg(long)]
    pub model: Option<String>,

    /// System prompt override
    #[arg(long = "system-prompt")]
    pub system_prompt: Option<String>,

    /// Anthropic API key
    #[arg(
        long = "anthropic-api-key",
        env = "ANTHROPIC_API_KEY",
        hide = true,
        hide_env_values = true
    )]
    pub anthropic_api_key: Option<String>,
}

/// Sandbox settings after merging flags, environment and config file.
#[derive(Debug, Clone)]
pub(crate) struct SandboxSettings {
    pub provider: SandboxProvider,
    pub template: String,
    pub timeout: Duration,
    pub api_url: String,
    pub credential: Option<Credential>,
}

impl SandboxSettings {
    pub fn create_request(&self) -> CreateRequest<'_> {
        CreateRequest {
            template: &self.template,
            timeout: self.timeout,
            credential: self.credential.as_ref(),
        }
    }

    /// Builds the backend for the selected provider.
    pub fn backend(&self) -> Box<dyn SandboxBackend> {
        match self.provider {
            SandboxProvider::E2b => Box::new(E2bBackend::new(&self.api_url)),
            SandboxProvider::Docker => Box::new(DockerBackend::new()),
        }
    }
}

/// Agent settings after merging flags, environment and config file.
#[derive(Debug, Clone)]
pub(crate) struct AgentChoice {
    pub credential: Credential,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
}

impl SandboxArgs {
    /// Resolves sandbox settings. Flags and environment win over the file.
    pub(crate) fn resolve(self, config: &SandboxConfig) -> Result<SandboxSettings> {
        let provider: SandboxProvider = self
            .provider
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(&config.provider)
            .parse()?;

        let credential = if provider.requires_credential() {
            Some(require_credential(self.e2b_api_key, E2B_API_KEY)?)
        } else {
            Credential::from_env_value(self.e2b_api_key)
        };

        let template = self
            .template
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| config.template.clone());
        let timeout = Duration::from_millis(self.timeout_ms.unwrap_or(config.timeout_ms));

        debug!(
            "Sandbox settings: provider={}, template={}, timeout={:?}",
            provider, template, timeout
        );

        Ok(SandboxSettings {
            provider,
            template,
            timeout,
            api_url: config.api_url.clone(),
            credential,
        })
    }
}

impl AgentArgs {
    /// Resolves agent settings. Flags win over the file.
    pub(crate) fn resolve(self, settings: &AgentSettings) -> Result<AgentChoice> {
        let credential = require_credential(self.anthropic_api_key, ANTHROPIC_API_KEY)?;

        Ok(AgentChoice {
            credential,
            model: self.model.or_else(|| settings.model.clone()),
            system_prompt: self
                .system_prompt
                .or_else(|| settings.system_prompt.clone()),
        })
    }
}
