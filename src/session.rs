//! Persistent sandbox session.
//!
//! A [`SessionManager`] owns one remote sandbox paired with one agent
//! configuration and moves through three phases:
//!
//! ```text
//! Uninitialized --initialize--> Ready --shutdown--> Closed
//!       \____________________shutdown____________/
//! ```
//!
//! Nothing leaves `Closed`. The handle and agent configuration only exist
//! inside the `Ready` phase.
//!
//! `health_check` looks at local state only. It does not ask the backend
//! whether the sandbox is still alive, so a sandbox that expired remotely
//! still reports healthy until `shutdown`.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::agent::{build_agent_config, run_task, AgentBackend, AgentConfig, AgentError};
use crate::credential::Credential;
use crate::progress::{ProgressReporter, SessionEvent};
use crate::sandbox::{CreateRequest, SandboxBackend, SandboxError, SandboxHandle};

/// Default idle lifetime requested for a sandbox.
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_millis(300_000);

/// Errors returned by [`SessionManager`] operations.
#[derive(Debug, thiserror::Error)]
pub(crate) enum SessionError {
    /// `execute` was called outside the `Ready` phase.
    #[error("Sandbox not initialized. Call initialize() first.")]
    NotInitialized,

    /// `initialize` was called while a session is already live.
    #[error("Sandbox session {session_id} is already initialized; call shutdown() first")]
    AlreadyInitialized { session_id: String },

    /// `initialize` was called after `shutdown`.
    #[error("Sandbox session has been shut down and cannot be reused")]
    Closed,

    /// The sandbox backend could not create a session.
    #[error("Failed to provision sandbox")]
    Provisioning(#[source] SandboxError),

    /// The agent run failed.
    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl SessionError {
    /// Returns true if the session was not ready.
    #[allow(dead_code)] // Public API for callers
    pub fn is_not_initialized(&self) -> bool {
        matches!(self, Self::NotInitialized)
    }
}

/// Observable lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    Uninitialized,
    Ready,
    Closed,
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Ready => write!(f, "ready"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

struct ReadySession {
    handle: SandboxHandle,
    agent: Arc<AgentConfig>,
}

enum SessionPhase {
    Uninitialized,
    Ready(ReadySession),
    Closed,
}

impl SessionPhase {
    fn lifecycle(&self) -> Lifecycle {
        match self {
            Self::Uninitialized => Lifecycle::Uninitialized,
            Self::Ready(_) => Lifecycle::Ready,
            Self::Closed => Lifecycle::Closed,
        }
    }
}

/// Owns a long-lived sandbox and runs tasks through an agent bound to it.
///
/// All operations take `&self`. Phase transitions are serialized by an
/// internal lock; agent runs happen outside it.
pub(crate) struct SessionManager {
    sandbox: Box<dyn SandboxBackend>,
    agent: Box<dyn AgentBackend>,
    reporter: Box<dyn ProgressReporter>,
    timeout: Duration,
    phase: Mutex<SessionPhase>,
}

impl SessionManager {
    pub fn new(
        sandbox: Box<dyn SandboxBackend>,
        agent: Box<dyn AgentBackend>,
        reporter: Box<dyn ProgressReporter>,
    ) -> Self {
        Self {
            sandbox,
            agent,
            reporter,
            timeout: DEFAULT_TIMEOUT,
            phase: Mutex::new(SessionPhase::Uninitialized),
        }
    }

    /// Sets the idle lifetime passed to the backend on `initialize`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Provisions the sandbox and builds the agent configuration.
    ///
    /// Returns the backend's session id. Fails without side effects if the
    /// session is already ready or closed.
    pub async fn initialize(
        &self,
        remote_credential: Option<&Credential>,
        agent_credential: Credential,
        template: &str,
        system_prompt: Option<&str>,
        model: Option<&str>,
    ) -> Result<String, SessionError> {
        let mut phase = self.phase.lock().await;
        match &*phase {
            SessionPhase::Uninitialized => {}
            SessionPhase::Ready(ready) => {
                return Err(SessionError::AlreadyInitialized {
                    session_id: ready.handle.id().to_string(),
                });
            }
            SessionPhase::Closed => return Err(SessionError::Closed),
        }

        self.reporter.report(&SessionEvent::Provisioning {
            backend: self.sandbox.name().to_string(),
            template: template.to_string(),
        });

        let request = CreateRequest {
            template,
            timeout: self.timeout,
            credential: remote_credential,
        };
        let handle = self.sandbox.create(&request).await.map_err(|e| {
            warn!("Sandbox provisioning failed: {}", e);
            SessionError::Provisioning(e)
        })?;

        let session_id = handle.id().to_string();
        info!("Persistent sandbox created: {}", session_id);
        self.reporter.report(&SessionEvent::Provisioned {
            session_id: session_id.clone(),
        });

        let agent = build_agent_config(agent_credential, system_prompt, model);
        self.reporter.report(&SessionEvent::AgentReady {
            model: agent.model().to_string(),
        });

        *phase = SessionPhase::Ready(ReadySession {
            handle,
            agent: Arc::new(agent),
        });

        Ok(session_id)
    }

    /// Runs one task through the agent.
    pub async fn execute(&self, task: &str) -> Result<String, SessionError> {
        let agent = {
            let phase = self.phase.lock().await;
            match &*phase {
                SessionPhase::Ready(ready) => Arc::clone(&ready.agent),
                _ => return Err(SessionError::NotInitialized),
            }
        };

        self.reporter.report(&SessionEvent::TaskStarted {
            task: task.to_string(),
        });
        let started = Utc::now();

        let result = run_task(self.agent.as_ref(), &agent, task).await;

        self.reporter.report(&SessionEvent::TaskFinished {
            elapsed: Utc::now().signed_duration_since(started),
            succeeded: result.is_ok(),
        });

        result.map_err(SessionError::from)
    }

    /// Returns true while the session is ready.
    ///
    /// Local state only; no round-trip to the backend.
    pub async fn health_check(&self) -> bool {
        matches!(*self.phase.lock().await, SessionPhase::Ready(_))
    }

    /// Closes the sandbox and releases local state.
    ///
    /// Always ends in `Closed`. A backend close failure is logged and
    /// reported but not returned. Calling it again is a no-op.
    pub async fn shutdown(&self) {
        let mut phase = self.phase.lock().await;
        let SessionPhase::Ready(ready) = std::mem::replace(&mut *phase, SessionPhase::Closed)
        else {
            debug!("Shutdown with no live sandbox");
            return;
        };

        let session_id = ready.handle.id().to_string();
        debug!(
            "Closing {} sandbox {} (template {})",
            self.sandbox.name(),
            session_id,
            ready.handle.template()
        );
        self.reporter.report(&SessionEvent::ShuttingDown {
            session_id: session_id.clone(),
        });

        match self.sandbox.close(&ready.handle).await {
            Ok(()) => {
                info!("Sandbox closed: {}", session_id);
                self.reporter.report(&SessionEvent::Closed { session_id });
            }
            Err(e) => {
                warn!("Failed to close sandbox {}: {}", session_id, e);
                self.reporter.report(&SessionEvent::CloseFailed {
                    session_id,
                    error: e.to_string(),
                });
            }
        }
    }

    /// Current lifecycle phase.
    pub async fn phase(&self) -> Lifecycle {
        self.phase.lock().await.lifecycle()
    }

    /// Session id of the live sandbox, if any.
    pub async fn session_id(&self) -> Option<String> {
        match &*self.phase.lock().await {
            SessionPhase::Ready(ready) => Some(ready.handle.id().to_string()),
            _ => None,
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let SessionPhase::Ready(ready) = self.phase.get_mut() {
            warn!(
                "Session dropped without shutdown; sandbox {} stays up until its idle timeout",
                ready.handle.id()
            );
        }
    }
}
