use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod agent;
mod commands;
mod config;
mod credential;
mod interrupt;
mod progress;
mod sandbox;
mod session;

use commands::{AgentArgs, SandboxArgs};
use config::Config;

#[derive(Parser)]
#[command(name = "sandbox-agent")]
#[command(
    author,
    version,
    about = "Run AI coding agent tasks inside ephemeral or persistent sandboxes"
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ./sandbox-agent.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one task through the agent locally, without a sandbox
    Local {
        /// Task for the agent
        task: Option<String>,

        #[command(flatten)]
        agent: AgentArgs,
    },

    /// Create a sandbox, run one task, then close the sandbox
    Ephemeral {
        /// Task for the agent
        task: Option<String>,

        #[command(flatten)]
        sandbox: SandboxArgs,

        #[command(flatten)]
        agent: AgentArgs,
    },

    /// Keep one sandbox alive and run tasks through it sequentially
    Persistent {
        /// Task for the agent (default: a series of sample tasks)
        task: Option<String>,

        /// Pause between tasks in milliseconds
        #[arg(long, default_value = "1000")]
        pause_ms: u64,

        #[command(flatten)]
        sandbox: SandboxArgs,

        #[command(flatten)]
        agent: AgentArgs,
    },
}

fn main() -> Result<()> {
    // Load .env before the runtime spawns threads and before clap reads the environment
    let dotenv = dotenvy::dotenv();
    run(dotenv)
}

#[tokio::main]
async fn run(dotenv: Result<PathBuf, dotenvy::Error>) -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("sandbox_agent=debug")
    } else {
        EnvFilter::new("sandbox_agent=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match dotenv {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Failed to load .env: {}", e),
    }

    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let config = Config::load(cli.config.as_deref(), &cwd)?;

    match cli.command {
        Commands::Local { task, agent } => {
            commands::local::run(task, agent, &config).await?;
        }
        Commands::Ephemeral {
            task,
            sandbox,
            agent,
        } => {
            commands::ephemeral::run(task, sandbox, agent, &config).await?;
        }
        Commands::Persistent {
            task,
            pause_ms,
            sandbox,
            agent,
        } => {
            commands::persistent::run(task, pause_ms, sandbox, agent, &config).await?;
        }
    }

    Ok(())
}
