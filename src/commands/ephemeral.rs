//! One-shot deployment: create a sandbox, run a task, always close it.

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use tracing::warn;

use super::{AgentArgs, SandboxArgs};
use crate::agent::{build_agent_config, run_task, AgentBackend, AgentConfig, ClaudeCliBackend};
use crate::config::Config;
use crate::interrupt::{Interrupt, Interrupted};
use crate::progress::{format_result, ConsoleReporter, ProgressReporter, SessionEvent};
use crate::sandbox::{CreateRequest, SandboxBackend};

/// Task used when none is given on the command line.
pub(crate) const DEFAULT_TASK: &str = "Write a simple Python hello world script";

pub async fn run(
    task: Option<String>,
    sandbox_args: SandboxArgs,
    agent_args: AgentArgs,
    config: &Config,
) -> Result<()> {
    let sandbox_settings = sandbox_args.resolve(&config.sandbox)?;
    let choice = agent_args.resolve(&config.agent)?;
    let agent_backend = ClaudeCliBackend::from_settings(&config.agent)?;

    let agent = build_agent_config(
        choice.credential,
        choice.system_prompt.as_deref(),
        choice.model.as_deref(),
    );
    let task = task.unwrap_or_else(|| DEFAULT_TASK.to_string());
    let sandbox = sandbox_settings.backend();
    let mut interrupt = Interrupt::listen();

    match deploy_ephemeral(
        sandbox.as_ref(),
        &agent_backend,
        &ConsoleReporter,
        &sandbox_settings.create_request(),
        &agent,
        &task,
        &mut interrupt,
    )
    .await
    {
        Ok(result) => {
            println!("{}", format_result("Agent Response", &result));
            println!("\n{} Deployment completed successfully", "✓".green());
            Ok(())
        }
        Err(e) => {
            println!("\n{} Deployment failed", "✗".red());
            Err(e)
        }
    }
}

/// Creates a sandbox, runs `task`, and closes the sandbox on every path.
///
/// A close failure is reported but does not override the task's outcome.
/// An interrupt cancels the task, not the create or close calls.
pub(crate) async fn deploy_ephemeral(
    sandbox: &dyn SandboxBackend,
    agent_backend: &dyn AgentBackend,
    reporter: &dyn ProgressReporter,
    request: &CreateRequest<'_>,
    agent: &AgentConfig,
    task: &str,
    interrupt: &mut Interrupt,
) -> Result<String> {
    reporter.report(&SessionEvent::Provisioning {
        backend: sandbox.name().to_string(),
        template: request.template.to_string(),
    });

    let handle = sandbox
        .create(request)
        .await
        .context("Failed to create ephemeral sandbox")?;
    let session_id = handle.id().to_string();
    reporter.report(&SessionEvent::Provisioned {
        session_id: session_id.clone(),
    });
    reporter.report(&SessionEvent::AgentReady {
        model: agent.model().to_string(),
    });

    reporter.report(&SessionEvent::TaskStarted {
        task: task.to_string(),
    });
    let started = Utc::now();
    let result = tokio::select! {
        result = run_task(agent_backend, agent, task) => result.context("Agent task failed"),
        () = interrupt.recv() => {
            warn!("Interrupted; closing ephemeral sandbox {}", session_id);
            Err(Interrupted.into())
        }
    };
    reporter.report(&SessionEvent::TaskFinished {
        elapsed: Utc::now().signed_duration_since(started),
        succeeded: result.is_ok(),
    });

    reporter.report(&SessionEvent::ShuttingDown {
        session_id: session_id.clone(),
    });
    match sandbox.close(&handle).await {
        Ok(()) => reporter.report(&SessionEvent::Closed { session_id }),
        Err(e) => {
            warn!("Failed to close ephemeral sandbox {}: {}", session_id, e);
            reporter.report(&SessionEvent::CloseFailed {
                session_id,
                error: e.to_string(),
            });
        }
    }

    result
}
