//! Long-lived deployment: one sandbox, several tasks, then shutdown.

use anyhow::Result;
use colored::Colorize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{AgentArgs, AgentChoice, SandboxArgs};
use crate::agent::ClaudeCliBackend;
use crate::config::Config;
use crate::credential::Credential;
use crate::interrupt::{Interrupt, Interrupted};
use crate::progress::{format_result, ConsoleReporter};
use crate::session::SessionManager;

/// Tasks run when none is given on the command line.
pub(crate) const SAMPLE_TASKS: [&str; 3] = [
    "Create a simple web server",
    "Write tests for the web server",
    "Add error handling to the server",
];

/// What a persistent run should do once the session is up.
#[derive(Debug, Clone)]
pub(crate) struct PersistentPlan {
    pub remote_credential: Option<Credential>,
    pub agent: AgentChoice,
    pub template: String,
    pub tasks: Vec<String>,
    pub pause: Duration,
}

pub async fn run(
    task: Option<String>,
    pause_ms: u64,
    sandbox_args: SandboxArgs,
    agent_args: AgentArgs,
    config: &Config,
) -> Result<()> {
    let sandbox_settings = sandbox_args.resolve(&config.sandbox)?;
    let agent = agent_args.resolve(&config.agent)?;
    let agent_backend = ClaudeCliBackend::from_settings(&config.agent)?;

    let manager = SessionManager::new(
        sandbox_settings.backend(),
        Box::new(agent_backend),
        Box::new(ConsoleReporter),
    )
    .with_timeout(sandbox_settings.timeout);

    let plan = PersistentPlan {
        remote_credential: sandbox_settings.credential,
        agent,
        template: sandbox_settings.template,
        tasks: task.map_or_else(
            || SAMPLE_TASKS.iter().map(ToString::to_string).collect(),
            |t| vec![t],
        ),
        pause: Duration::from_millis(pause_ms),
    };

    let mut interrupt = Interrupt::listen();
    let outcome = run_persistent(&manager, plan, &mut interrupt).await;
    debug!("Session ended in phase {}", manager.phase().await);

    match outcome {
        Ok(_) => {
            println!("\n{} Persistent sandbox session completed", "✓".green());
            Ok(())
        }
        Err(e) => {
            println!("\n{} Persistent sandbox failed", "✗".red());
            Err(e)
        }
    }
}

/// Drives a session through the plan and always shuts it down afterwards,
/// including when `interrupt` fires mid-task.
pub(crate) async fn run_persistent(
    manager: &SessionManager,
    plan: PersistentPlan,
    interrupt: &mut Interrupt,
) -> Result<Vec<String>> {
    let outcome = drive(manager, plan, interrupt).await;
    manager.shutdown().await;
    outcome
}

/// Provisioning is not raced: dropping a half-finished create could leave
/// a sandbox nobody knows about. An interrupt during it takes effect at the
/// first task.
async fn drive(
    manager: &SessionManager,
    plan: PersistentPlan,
    interrupt: &mut Interrupt,
) -> Result<Vec<String>> {
    let PersistentPlan {
        remote_credential,
        agent,
        template,
        tasks,
        pause,
    } = plan;

    let session_id = manager
        .initialize(
            remote_credential.as_ref(),
            agent.credential,
            &template,
            agent.system_prompt.as_deref(),
            agent.model.as_deref(),
        )
        .await?;

    println!("\n{} Persistent sandbox running: {}", "●".green(), session_id.cyan());
    println!("  Ready to accept tasks...");

    let mut results = Vec::with_capacity(tasks.len());
    for (i, task) in tasks.iter().enumerate() {
        let result = tokio::select! {
            result = manager.execute(task) => result?,
            () = interrupt.recv() => {
                warn!("Interrupted during task {}", i + 1);
                return Err(Interrupted.into());
            }
        };
        println!("{}", format_result("Result", &result));
        results.push(result);

        if i + 1 < tasks.len() && !pause.is_zero() {
            tokio::select! {
                () = tokio::time::sleep(pause) => {}
                () = interrupt.recv() => return Err(Interrupted.into()),
            }
        }
    }

    let healthy = manager.health_check().await;
    let status = if healthy {
        "OK".green().bold()
    } else {
        "ERROR".red().bold()
    };
    let id = manager.session_id().await.unwrap_or_default();
    println!("\nSandbox {} health: {status}", id.cyan());

    Ok(results)
}
