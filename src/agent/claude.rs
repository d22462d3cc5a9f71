//! Claude Code agent backend
//!
//! Invokes the Claude CLI in print mode with a JSON result envelope:
//! ```bash
//! claude -p --output-format json --model <model> --system-prompt <prompt> \
//!     --allowedTools Bash,Read,... --disallowedTools WebFetch,WebSearch
//! ```
//!
//! The task is piped via stdin and the API key is passed as
//! `ANTHROPIC_API_KEY` in the child environment.
//!
//! See: https://docs.anthropic.com/en/docs/claude-code

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::{AgentBackend, AgentConfig, AgentError, AgentOutput, CapabilityGrants};
use crate::config::{AgentSettings, ANTHROPIC_API_KEY};

/// Final message printed by `claude -p --output-format json`.
#[derive(Debug, Deserialize)]
struct ResultEnvelope {
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    is_error: bool,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    total_cost_usd: Option<f64>,
    #[serde(default)]
    num_turns: Option<u32>,
}

/// Claude Code CLI agent backend
pub struct ClaudeCliBackend {
    path: String,
    extra_args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl ClaudeCliBackend {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            extra_args: Vec::new(),
            working_dir: None,
        }
    }

    /// Builds the backend from the `[agent]` config section.
    pub fn from_settings(settings: &AgentSettings) -> Result<Self> {
        let mut backend = Self::new(settings.path.clone());
        backend.extra_args = settings.parsed_extra_args()?;
        backend.working_dir = settings.working_dir.clone();
        Ok(backend)
    }
}

#[async_trait]
impl AgentBackend for ClaudeCliBackend {
    fn name(&self) -> &'static str {
        "Claude"
    }

    async fn invoke(&self, config: &AgentConfig, task: &str) -> Result<AgentOutput, AgentError> {
        info!("Running Claude agent: {}", self.path);

        let args = build_args(config, &self.extra_args);
        debug!("Claude args: {:?}", args);

        let mut command = tokio::process::Command::new(&self.path);
        command
            .args(&args)
            .env(ANTHROPIC_API_KEY, config.credential().expose())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = self.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| {
            AgentError::spawn(
                &self.path,
                format!(
                    "{e}. Install Claude Code with `npm install -g @anthropic-ai/claude-code` \
                     or set [agent].path in sandbox-agent.toml"
                ),
            )
        })?;

        // Claude reads the task from stdin
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(task.as_bytes())
                .await
                .map_err(|e| AgentError::io(e.to_string()))?;
            stdin
                .flush()
                .await
                .map_err(|e| AgentError::io(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| AgentError::io(e.to_string()))?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            // A failed run may still print an error envelope
            if let Err(e @ AgentError::Reported { .. }) = parse_output(&stdout) {
                return Err(e);
            }

            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("Agent stderr: {}", stderr);
            return Err(AgentError::Failed {
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        let result = parse_output(&stdout)?;
        info!("Claude agent completed successfully");
        debug!(
            "Output length: {} bytes, turns: {:?}, cost: {:?}",
            result.output.len(),
            result.turns,
            result.cost_usd
        );

        Ok(result)
    }
}

/// Builds CLI arguments for one run.
fn build_args(config: &AgentConfig, extra_args: &[String]) -> Vec<String> {
    let (allowed, denied) = tool_lists(config.grants());

    let mut args = vec![
        "-p".to_string(),
        "--output-format".to_string(),
        "json".to_string(),
        "--model".to_string(),
        config.model().to_string(),
        "--system-prompt".to_string(),
        config.system_prompt().to_string(),
    ];

    if !allowed.is_empty() {
        args.push("--allowedTools".to_string());
        args.push(allowed.join(","));
    }
    if !denied.is_empty() {
        args.push("--disallowedTools".to_string());
        args.push(denied.join(","));
    }

    args.extend(extra_args.iter().cloned());
    args
}

/// Maps capability grants to Claude Code tool names: (allowed, denied).
fn tool_lists(grants: CapabilityGrants) -> (Vec<&'static str>, Vec<&'static str>) {
    let groups: [(bool, &[&'static str]); 5] = [
        (grants.shell, &["Bash"]),
        (grants.read_file, &["Read", "Glob", "Grep"]),
        (grants.write_file, &["Write"]),
        (grants.edit_file, &["Edit", "MultiEdit"]),
        (grants.network, &["WebFetch", "WebSearch"]),
    ];

    let mut allowed = Vec::new();
    let mut denied = Vec::new();
    for (granted, tools) in groups {
        if granted {
            allowed.extend_from_slice(tools);
        } else {
            denied.extend_from_slice(tools);
        }
    }
    (allowed, denied)
}

/// Extracts the result text from CLI stdout.
///
/// Accepts a single result object, or the message array printed with
/// `--verbose`, in which case the last `"type": "result"` entry wins.
fn parse_output(stdout: &str) -> Result<AgentOutput, AgentError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(AgentError::malformed("empty output"));
    }

    let value: serde_json::Value =
        serde_json::from_str(trimmed).map_err(|e| AgentError::malformed(e.to_string()))?;

    let value = match value {
        serde_json::Value::Array(messages) => messages
            .into_iter()
            .rev()
            .find(|m| m.get("type").and_then(|t| t.as_str()) == Some("result"))
            .ok_or_else(|| AgentError::malformed("no result message in output"))?,
        other => other,
    };

    let envelope: ResultEnvelope =
        serde_json::from_value(value).map_err(|e| AgentError::malformed(e.to_string()))?;

    if envelope.is_error {
        let message = envelope
            .result
            .filter(|r| !r.is_empty())
            .or(envelope.subtype)
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(AgentError::reported(message));
    }

    let output = envelope
        .result
        .ok_or_else(|| AgentError::malformed("missing `result` field"))?;

    Ok(AgentOutput {
        output,
        cost_usd: envelope.total_cost_usd,
        turns: envelope.num_turns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::build_agent_config;
    use crate::credential::Credential;

    #[test]
    fn test_claude_backend_name() {
        let backend = ClaudeCliBackend::new("claude");
        assert_eq!(backend.name(), "Claude");
    }

    #[test]
    fn test_from_settings_parses_extra_args() {
        let settings = AgentSettings {
            path: "/opt/claude".to_string(),
            extra_args: Some("--max-turns 5".to_string()),
            ..Default::default()
        };
        let backend = ClaudeCliBackend::from_settings(&settings).unwrap();
        assert_eq!(backend.path, "/opt/claude");
        assert_eq!(backend.extra_args, vec!["--max-turns", "5"]);
    }

    #[test]
    fn test_build_args_maps_grants() {
        let config = build_agent_config(Credential::new("k"), Some("Be brief."), Some("m-1"));
        let args = build_args(&config, &["--verbose".to_string()]);

        assert_eq!(&args[..3], ["-p", "--output-format", "json"]);
        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("--model") + 1], "m-1");
        assert_eq!(args[pos("--system-prompt") + 1], "Be brief.");
        assert_eq!(
            args[pos("--allowedTools") + 1],
            "Bash,Read,Glob,Grep,Write,Edit,MultiEdit"
        );
        assert_eq!(args[pos("--disallowedTools") + 1], "WebFetch,WebSearch");
        assert_eq!(args.last().unwrap(), "--verbose");
        // The key never appears on the command line
        assert!(!args.iter().any(|a| a == "k"));
    }

    #[test]
    fn test_tool_lists_with_network() {
        let grants = CapabilityGrants {
            network: true,
            ..CapabilityGrants::SANDBOX
        };
        let (allowed, denied) = tool_lists(grants);
        assert!(allowed.contains(&"WebFetch"));
        assert!(denied.is_empty());
    }

    #[test]
    fn test_parse_output_success() {
        let stdout = r#"{"type":"result","subtype":"success","is_error":false,"result":"Created hello.py","num_turns":3,"total_cost_usd":0.012}"#;
        let output = parse_output(stdout).unwrap();
        assert_eq!(output.output, "Created hello.py");
        assert_eq!(output.turns, Some(3));
        assert_eq!(output.cost_usd, Some(0.012));
    }

    #[test]
    fn test_parse_output_verbose_array() {
        let stdout = r#"[
            {"type":"system","subtype":"init"},
            {"type":"assistant","message":{}},
            {"type":"result","subtype":"success","is_error":false,"result":"done"}
        ]"#;
        assert_eq!(parse_output(stdout).unwrap().output, "done");
    }

    #[test]
    fn test_parse_output_reported_error() {
        let stdout = r#"{"type":"result","subtype":"error_max_turns","is_error":true}"#;
        let err = parse_output(stdout).unwrap_err();
        assert!(matches!(err, AgentError::Reported { .. }));
        assert!(err.to_string().contains("error_max_turns"));
    }

    #[test]
    fn test_parse_output_malformed() {
        assert!(matches!(
            parse_output("not json").unwrap_err(),
            AgentError::MalformedResponse { .. }
        ));
        assert!(matches!(
            parse_output("").unwrap_err(),
            AgentError::MalformedResponse { .. }
        ));
        assert!(matches!(
            parse_output(r#"{"type":"result","is_error":false}"#).unwrap_err(),
            AgentError::MalformedResponse { .. }
        ));
    }

    #[tokio::test]
    async fn test_invoke_missing_binary_is_spawn_error() {
        let backend = ClaudeCliBackend::new("/nonexistent/claude-binary");
        let config = build_agent_config(Credential::new("k"), None, None);
        let err = backend.invoke(&config, "hi").await.unwrap_err();
        assert!(matches!(err, AgentError::Spawn { .. }));
    }
}
