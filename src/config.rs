use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::credential::Credential;

const CONFIG_FILE: &str = "sandbox-agent.toml";
const USER_CONFIG_DIR: &str = "sandbox-agent";
const USER_CONFIG_FILE: &str = "config.toml";

/// Environment variable holding the E2B API key.
pub(crate) const E2B_API_KEY: &str = "E2B_API_KEY";
/// Environment variable holding the Anthropic API key.
pub(crate) const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";

/// Startup configuration errors that are fatal for the entry points.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    /// A required credential was not supplied.
    #[error("{name} environment variable is required and must not be empty")]
    MissingCredential { name: &'static str },
}

impl ConfigError {
    /// Returns true if this is a missing credential error.
    #[allow(dead_code)] // Public API for callers
    pub fn is_missing_credential(&self) -> bool {
        matches!(self, Self::MissingCredential { .. })
    }
}

/// Resolves a credential from its environment value, failing if it is absent.
pub(crate) fn require_credential(
    value: Option<String>,
    name: &'static str,
) -> Result<Credential, ConfigError> {
    Credential::from_env_value(value).ok_or(ConfigError::MissingCredential { name })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub agent: AgentSettings,
}

/// Remote sandbox configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Which sandbox backend to use: "e2b" or "docker"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Template (E2B) or image (Docker) the sandbox is created from
    #[serde(default = "default_template")]
    pub template: String,

    /// Sandbox idle lifetime in milliseconds (0 = backend default)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Base URL of the E2B API
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            template: default_template(),
            timeout_ms: default_timeout_ms(),
            api_url: default_api_url(),
        }
    }
}

/// Claude Code CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Path to the Claude CLI
    /// - Default: "claude"
    /// - Custom: "/path/to/claude"
    #[serde(default = "default_claude_path")]
    pub path: String,

    /// Model to use (optional, falls back to the built-in default)
    #[serde(default)]
    pub model: Option<String>,

    /// Custom system prompt (optional)
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Extra CLI arguments appended verbatim, shell-quoted
    /// - Example: "--verbose --max-turns 20"
    #[serde(default)]
    pub extra_args: Option<String>,

    /// Working directory for the agent process (defaults to the current directory)
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            path: default_claude_path(),
            model: None,
            system_prompt: None,
            extra_args: None,
            working_dir: None,
        }
    }
}

impl AgentSettings {
    /// Splits `extra_args` into individual arguments.
    pub fn parsed_extra_args(&self) -> Result<Vec<String>> {
        match self.extra_args.as_deref() {
            Some(args) => shell_words::split(args)
                .with_context(|| format!("Failed to parse agent.extra_args: {args}")),
            None => Ok(Vec::new()),
        }
    }
}

// Default value functions
fn default_provider() -> String {
    "e2b".to_string()
}

fn default_template() -> String {
    "anthropic-claude-code".to_string()
}

fn default_timeout_ms() -> u64 {
    300_000
}

fn default_api_url() -> String {
    "https://api.e2b.dev".to_string()
}

fn default_claude_path() -> String {
    "claude".to_string()
}

impl Config {
    /// Load configuration, using defaults if no file is found.
    ///
    /// An explicit path must exist. Otherwise `sandbox-agent.toml` in the
    /// project directory is tried, then the user config directory.
    pub fn load(explicit: Option<&Path>, project_dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_file(path);
        }

        let project_config = project_dir.join(CONFIG_FILE);
        if project_config.exists() {
            return Self::load_file(&project_config);
        }

        if let Some(user_config) = user_config_path() {
            if user_config.exists() {
                return Self::load_file(&user_config);
            }
        }

        Ok(Self::default())
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(USER_CONFIG_DIR).join(USER_CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sandbox.provider, "e2b");
        assert_eq!(config.sandbox.template, "anthropic-claude-code");
        assert_eq!(config.sandbox.timeout_ms, 300_000);
        assert_eq!(config.agent.path, "claude");
        assert!(config.agent.model.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[sandbox]
provider = "docker"
template = "python:3.12-slim"
timeout_ms = 60000

[agent]
path = "/usr/local/bin/claude"
model = "claude-opus-4-1"
extra_args = "--verbose --max-turns 20"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.sandbox.provider, "docker");
        assert_eq!(config.sandbox.template, "python:3.12-slim");
        assert_eq!(config.sandbox.timeout_ms, 60_000);
        assert_eq!(config.sandbox.api_url, "https://api.e2b.dev");
        assert_eq!(config.agent.path, "/usr/local/bin/claude");
        assert_eq!(config.agent.model.as_deref(), Some("claude-opus-4-1"));
        assert_eq!(
            config.agent.parsed_extra_args().unwrap(),
            vec!["--verbose", "--max-turns", "20"]
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.sandbox.provider, "e2b");
        assert!(config.agent.parsed_extra_args().unwrap().is_empty());
    }

    #[test]
    fn test_extra_args_unbalanced_quote_fails() {
        let settings = AgentSettings {
            extra_args: Some("--append \"unterminated".to_string()),
            ..Default::default()
        };
        assert!(settings.parsed_extra_args().is_err());
    }

    #[test]
    fn test_load_project_config() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "[sandbox]\ntemplate = \"custom-template\"\n",
        )
        .unwrap();

        let config = Config::load(None, dir.path()).unwrap();
        assert_eq!(config.sandbox.template, "custom-template");
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Config::load(Some(&missing), dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_load_invalid_toml_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[sandbox\n").unwrap();
        let err = Config::load(Some(&path), dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_require_credential() {
        let credential = require_credential(Some("abc".to_string()), E2B_API_KEY).unwrap();
        assert_eq!(credential.expose(), "abc");

        let err = require_credential(None, ANTHROPIC_API_KEY).unwrap_err();
        assert!(err.is_missing_credential());
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));

        let err = require_credential(Some("  ".to_string()), E2B_API_KEY).unwrap_err();
        assert!(err.to_string().contains("E2B_API_KEY"));
    }
}
