//! Configuration management for the swarm
//!
//! Settings live in `.swarm/config.toml` under the working directory. Every
//! section is optional; missing keys fall back to the defaults below, and
//! command-line flags override whatever the file says.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Result, SwarmError};

/// Directory (relative to the repo root) holding swarm configuration
pub const CONFIG_DIR: &str = ".swarm";

/// Top-level swarm configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// Hosted model settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Rate-limit retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Test-and-iterate loop defaults
    #[serde(default)]
    pub loop_defaults: LoopDefaults,

    /// Input, sandbox and log locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// External test runner invocation
    #[serde(default)]
    pub test_runner: TestRunnerConfig,

    /// Code-block extraction
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

/// Model endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier sent to the endpoint
    #[serde(default = "default_model")]
    pub name: String,

    /// Environment variable containing the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Environment variable that may override the base URL
    #[serde(default = "default_base_url_env")]
    pub base_url_env: String,

    /// Base URL used when `base_url_env` is unset
    #[serde(default = "default_base_url")]
    pub default_base_url: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Optional cap on response tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Retry configuration for rate-limited model calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff unit in milliseconds; attempt `n` waits `unit * 2^n`
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,
}

/// Default loop parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopDefaults {
    /// Maximum pipeline + test iterations
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

/// Filesystem layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the output tree for fixed files and generated tests
    #[serde(default = "default_sandbox_dir")]
    pub sandbox_dir: PathBuf,

    /// Subdirectory of the sandbox receiving generated tests
    #[serde(default = "default_tests_subdir")]
    pub tests_subdir: String,

    /// Append-only interaction log (JSON lines)
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Extension (without the dot) of files picked up by the scan
    #[serde(default = "default_source_extension")]
    pub source_extension: String,
}

/// External test runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRunnerConfig {
    #[serde(default = "default_runner_program")]
    pub program: String,

    /// Arguments placed before the target directory
    #[serde(default = "default_runner_args")]
    pub args: Vec<String>,

    /// Module search path variable the target directory is prepended to
    #[serde(default = "default_path_env")]
    pub path_env: String,
}

/// Code-block extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Language tag expected on the opening fence
    #[serde(default = "default_fence_language")]
    pub fence_language: String,
}

// Default value providers
fn default_model() -> String {
    "mistral-small-latest".to_string()
}

fn default_api_key_env() -> String {
    "MISTRAL_API_KEY".to_string()
}

fn default_base_url_env() -> String {
    "MISTRAL_API_BASE".to_string()
}

fn default_base_url() -> String {
    "https://api.mistral.ai/v1".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_unit_ms() -> u64 {
    1000
}

fn default_max_iterations() -> usize {
    10
}

fn default_sandbox_dir() -> PathBuf {
    PathBuf::from("sandbox")
}

fn default_tests_subdir() -> String {
    "tests".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("logs/experiment_data.jsonl")
}

fn default_source_extension() -> String {
    "py".to_string()
}

fn default_runner_program() -> String {
    "python".to_string()
}

fn default_runner_args() -> Vec<String> {
    vec!["-m".to_string(), "pytest".to_string(), "-q".to_string()]
}

fn default_path_env() -> String {
    "PYTHONPATH".to_string()
}

fn default_fence_language() -> String {
    "python".to_string()
}

impl SwarmConfig {
    /// Path of the config file under `root`
    pub fn config_path(root: &Path) -> PathBuf {
        root.join(CONFIG_DIR).join("config.toml")
    }

    /// Load configuration from `.swarm/config.toml` or use defaults
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = Self::config_path(root);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)
                .map_err(|e| SwarmError::Config(format!("Failed to parse config file: {}", e)))
        } else {
            Ok(Self::default())
        }
    }

    /// Write default configuration to `.swarm/config.toml`
    pub fn write_default(root: &Path) -> Result<PathBuf> {
        let config_dir = root.join(CONFIG_DIR);
        std::fs::create_dir_all(&config_dir)?;

        let config_path = Self::config_path(root);
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| SwarmError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(config_path)
    }
}

impl RetryConfig {
    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            retry: RetryConfig::default(),
            loop_defaults: LoopDefaults::default(),
            paths: PathsConfig::default(),
            test_runner: TestRunnerConfig::default(),
            extraction: ExtractionConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            api_key_env: default_api_key_env(),
            base_url_env: default_base_url_env(),
            default_base_url: default_base_url(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_unit_ms: default_backoff_unit_ms(),
        }
    }
}

impl Default for LoopDefaults {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            sandbox_dir: default_sandbox_dir(),
            tests_subdir: default_tests_subdir(),
            log_file: default_log_file(),
            source_extension: default_source_extension(),
        }
    }
}

impl Default for TestRunnerConfig {
    fn default() -> Self {
        Self {
            program: default_runner_program(),
            args: default_runner_args(),
            path_env: default_path_env(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            fence_language: default_fence_language(),
        }
    }
}
