//! Operator-visible progress for sandbox sessions.
//!
//! Session code emits [`SessionEvent`]s to a [`ProgressReporter`]. The
//! console reporter prints one coloured line per event; formatting is kept
//! in pure functions that return strings.

use chrono::Duration;
use colored::Colorize;
use std::fmt::Write;

/// Something the operator should see happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionEvent {
    /// A sandbox is being created.
    Provisioning { backend: String, template: String },
    /// The sandbox exists.
    Provisioned { session_id: String },
    /// The agent configuration is ready.
    AgentReady { model: String },
    /// A task was handed to the agent.
    TaskStarted { task: String },
    /// The agent returned, successfully or not.
    TaskFinished { elapsed: Duration, succeeded: bool },
    /// The sandbox is being closed.
    ShuttingDown { session_id: String },
    /// The sandbox was closed.
    Closed { session_id: String },
    /// Closing the sandbox failed; local state was released anyway.
    CloseFailed { session_id: String, error: String },
}

/// Receives progress events.
pub(crate) trait ProgressReporter: Send + Sync {
    fn report(&self, event: &SessionEvent);
}

/// Prints events to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn report(&self, event: &SessionEvent) {
        println!("{}", format_event(event));
    }
}

/// Formats a single event line.
pub(crate) fn format_event(event: &SessionEvent) -> String {
    match event {
        SessionEvent::Provisioning { backend, template } => format!(
            "{} Creating {} sandbox from {}...",
            "→".blue(),
            backend,
            template.cyan()
        ),
        SessionEvent::Provisioned { session_id } => {
            format!("{} Sandbox created: {}", "✓".green(), session_id.cyan())
        }
        SessionEvent::AgentReady { model } => {
            format!("{} Agent initialized ({})", "✓".green(), model.cyan())
        }
        SessionEvent::TaskStarted { task } => {
            format!("\n{} Executing task: {}", "▶".yellow(), task.bold())
        }
        SessionEvent::TaskFinished { elapsed, succeeded } => {
            let took = format_duration(elapsed);
            if *succeeded {
                format!("{} Task finished in {}", "✓".green(), took)
            } else {
                format!("{} Task failed after {}", "✗".red(), took)
            }
        }
        SessionEvent::ShuttingDown { session_id } => {
            format!("{} Shutting down sandbox {}...", "→".blue(), session_id.cyan())
        }
        SessionEvent::Closed { session_id } => {
            format!("{} Sandbox closed: {}", "✓".green(), session_id.cyan())
        }
        SessionEvent::CloseFailed { session_id, error } => format!(
            "{} Failed to close sandbox {}: {}",
            "⚠".yellow(),
            session_id.cyan(),
            error
        ),
    }
}

/// Formats a duration for display (e.g., "2h 5m 30s").
pub(crate) fn format_duration(duration: &Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Formats an agent result block.
pub(crate) fn format_result(title: &str, result: &str) -> String {
    let mut out = String::new();

    writeln!(&mut out, "\n{}", format!("=== {title} ===").yellow().bold()).unwrap();
    writeln!(&mut out, "{result}").unwrap();
    write!(&mut out, "{}", "=".repeat(title.len() + 8).dimmed()).unwrap();

    out
}

/// Collects events for assertions.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub(crate) struct RecordingReporter {
    events: std::sync::Arc<std::sync::Mutex<Vec<SessionEvent>>>,
}

#[cfg(test)]
impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl ProgressReporter for RecordingReporter {
    fn report(&self, event: &SessionEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
