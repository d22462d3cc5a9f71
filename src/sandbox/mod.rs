//! Remote execution backends for agent sandboxes.
//!
//! A backend provisions an isolated environment from a template and closes
//! it again. Two backends are available:
//! - E2B: hosted sandboxes through the E2B REST API
//! - Docker: local containers through the Docker Engine API
//!
//! The backend is selected via `[sandbox].provider` in sandbox-agent.toml.

mod docker;
mod e2b;
mod error;
#[cfg(test)]
pub(crate) mod mock;

pub(crate) use docker::DockerBackend;
pub(crate) use e2b::E2bBackend;
pub(crate) use error::SandboxError;

use async_trait::async_trait;
use std::time::Duration;

use crate::credential::Credential;

/// Parameters for provisioning a sandbox.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CreateRequest<'a> {
    /// Template (E2B) or image (Docker) selector.
    pub template: &'a str,
    /// Idle lifetime of the sandbox. Zero leaves it to the backend.
    pub timeout: Duration,
    /// Backend credential, if the backend needs one.
    pub credential: Option<&'a Credential>,
}

/// Opaque reference to a provisioned sandbox.
///
/// Holds whatever the backend needs to close the sandbox again; callers only
/// read the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SandboxHandle {
    id: String,
    template: String,
    credential: Option<Credential>,
}

impl SandboxHandle {
    pub fn new(
        id: impl Into<String>,
        template: impl Into<String>,
        credential: Option<Credential>,
    ) -> Self {
        Self {
            id: id.into(),
            template: template.into(),
            credential,
        }
    }

    /// Backend-assigned sandbox id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Template the sandbox was created from.
    pub fn template(&self) -> &str {
        &self.template
    }

    pub(crate) fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }
}

/// Idle lifetime in whole seconds, rounded up so that only a zero timeout
/// means "no limit".
pub(crate) fn timeout_secs(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis().div_ceil(1000)).unwrap_or(u64::MAX)
}

/// Trait for remote execution backends.
#[async_trait]
pub(crate) trait SandboxBackend: Send + Sync {
    /// Returns the backend name for display.
    fn name(&self) -> &'static str;

    /// Provisions a new sandbox.
    async fn create(&self, request: &CreateRequest<'_>) -> Result<SandboxHandle, SandboxError>;

    /// Closes a sandbox and releases its resources.
    async fn close(&self, handle: &SandboxHandle) -> Result<(), SandboxError>;
}

/// Supported sandbox providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum SandboxProvider {
    /// Hosted E2B sandboxes.
    #[default]
    E2b,
    /// Local Docker containers.
    Docker,
}

impl SandboxProvider {
    /// Returns true if the provider needs an API key to create sandboxes.
    pub fn requires_credential(self) -> bool {
        matches!(self, Self::E2b)
    }
}

impl std::fmt::Display for SandboxProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::E2b => write!(f, "e2b"),
            Self::Docker => write!(f, "docker"),
        }
    }
}

impl std::str::FromStr for SandboxProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "e2b" => Ok(Self::E2b),
            "docker" => Ok(Self::Docker),
            _ => anyhow::bail!("Unknown sandbox provider: '{s}'. Supported: e2b, docker"),
        }
    }
}
