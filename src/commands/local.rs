//! Run one task through the agent on this machine, without a sandbox.

use anyhow::Result;
use colored::Colorize;

use super::AgentArgs;
use crate::agent::{build_agent_config, run_task, ClaudeCliBackend};
use crate::config::Config;
use crate::progress::format_result;

/// Task used when none is given on the command line.
pub(crate) const DEFAULT_TASK: &str = "Hello! Can you help me understand how you work?";

pub async fn run(task: Option<String>, agent_args: AgentArgs, config: &Config) -> Result<()> {
    let choice = agent_args.resolve(&config.agent)?;
    let backend = ClaudeCliBackend::from_settings(&config.agent)?;

    println!("{} Initializing Claude Agent...", "→".blue());
    let agent = build_agent_config(
        choice.credential,
        choice.system_prompt.as_deref(),
        choice.model.as_deref(),
    );

    let task = task.unwrap_or_else(|| DEFAULT_TASK.to_string());
    println!("\n{} {}\n", "Task:".bold(), task);

    let response = run_task(&backend, &agent, &task).await?;
    println!("{}", format_result("Agent response", &response));

    Ok(())
}
