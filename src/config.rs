use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;

#[derive(Parser)]
#[command(name = "codelens", version = "1.0", about, long_about = None)]
pub struct CliArgs {
    /// Path to the configuration file
    #[arg(long = "config", short = 'c')]
    pub config_path: Option<String>,

    /// API key for the assistant service, overrides the configuration file
    #[arg(long = "api-key", env = "CODELENS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

impl CliArgs {
    /// Load the configuration from the specified file, or the defaults if none is given
    pub fn to_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config_path {
            Some(path) => {
                let file = std::fs::File::open(path)
                    .with_context(|| format!("Failed to open configuration file {path}"))?;
                let reader = std::io::BufReader::new(file);
                serde_json::from_reader(reader)
                    .with_context(|| format!("Failed to parse configuration file {path}"))?
            }
            None => Config::default(),
        };

        if self.api_key.is_some() {
            config.assistant.api_key = self.api_key.clone();
        }

        Ok(config)
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub execution: ExecutionConfig,
    pub assistant: AssistantConfig,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ServerConfig {
    pub bind_address: Option<String>,
    pub bind_port: Option<u16>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Wall-clock ceiling for the run phase
    pub run_timeout: MilliSecond,
    /// Wall-clock ceiling for the build phase
    pub build_timeout: MilliSecond,
    /// Cap on each captured stream, in bytes
    pub max_output_bytes: usize,
    /// Directory under which per-request workspaces are created
    pub workspace_root: Option<PathBuf>,
    pub toolchains: ToolchainConfig,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            run_timeout: MilliSecond(5_000),
            build_timeout: MilliSecond(30_000),
            max_output_bytes: 1 << 20,
            workspace_root: None,
            toolchains: ToolchainConfig::default(),
        }
    }
}

impl ExecutionConfig {
    /// Resolves the workspace root, preferring the configured one,
    /// then the per-user cache directory, then the system temp dir.
    pub fn resolve_workspace_root(&self) -> PathBuf {
        use directories::ProjectDirs;

        if let Some(root) = &self.workspace_root {
            return root.clone();
        }

        match ProjectDirs::from("", "", "codelens") {
            Some(proj_dirs) => proj_dirs.cache_dir().join("workspaces"),
            None => std::env::temp_dir().join("codelens"),
        }
    }
}

/// Executable names or absolute paths of the external toolchains
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ToolchainConfig {
    pub python: String,
    pub c: String,
    pub cpp: String,
    pub javac: String,
    pub java: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            c: "gcc".to_string(),
            cpp: "g++".to_string(),
            javac: "javac".to_string(),
            java: "java".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AssistantConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub model: String,
    pub request_timeout: MilliSecond,
    /// Tighter ceiling for question generation, which delays `/debug` responses
    pub questions_timeout: MilliSecond,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.mistral.ai/v1".to_string(),
            api_key: None,
            model: "mistral-medium".to_string(),
            request_timeout: MilliSecond(30_000),
            questions_timeout: MilliSecond(10_000),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MilliSecond(pub u64);

impl From<MilliSecond> for Duration {
    fn from(value: MilliSecond) -> Self {
        Duration::from_millis(value.0)
    }
}
