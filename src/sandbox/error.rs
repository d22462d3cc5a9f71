//! Domain-specific error types for sandbox operations.
//!
//! Typed errors enable callers to match on specific failure modes
//! rather than parsing error message strings.

/// Errors that can occur while creating or closing a sandbox.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SandboxError {
    /// The backend rejected or did not receive a credential.
    #[error("Sandbox backend rejected the credential: {message}")]
    Unauthorized { message: String },

    /// The requested template (or image) does not exist.
    #[error("Sandbox template not found: {template}")]
    TemplateNotFound { template: String },

    /// The sandbox no longer exists on the backend.
    #[error("Sandbox not found: {id}")]
    NotFound { id: String },

    /// The backend answered with an unexpected status.
    #[error("Sandbox API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The request never produced a usable response.
    #[error("Sandbox API request failed: {message}")]
    Transport { message: String },

    /// Docker daemon is not running or not accessible.
    #[error("Docker is not available: {message}")]
    DockerUnavailable { message: String },

    /// Container operation failed (create, start, remove).
    #[error("Container operation failed: {message}")]
    ContainerFailed { message: String },
}

impl SandboxError {
    /// Creates an `Unauthorized` error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a `TemplateNotFound` error.
    pub fn template_not_found(template: impl Into<String>) -> Self {
        Self::TemplateNotFound {
            template: template.into(),
        }
    }

    /// Creates a `NotFound` error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Creates an `Api` error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Creates a `Transport` error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a `DockerUnavailable` error.
    pub fn docker_unavailable(message: impl Into<String>) -> Self {
        Self::DockerUnavailable {
            message: message.into(),
        }
    }

    /// Creates a `ContainerFailed` error.
    pub fn container_failed(message: impl Into<String>) -> Self {
        Self::ContainerFailed {
            message: message.into(),
        }
    }

    /// Returns true if the backend rejected the credential.
    #[allow(dead_code)] // Public API for callers
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Returns true if the template or image does not exist.
    #[allow(dead_code)] // Public API for callers
    pub fn is_template_not_found(&self) -> bool {
        matches!(self, Self::TemplateNotFound { .. })
    }

    /// Returns true if the sandbox is already gone.
    #[allow(dead_code)] // Public API for callers
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
