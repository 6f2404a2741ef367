use anyhow::{Context, Result};
use dirs::{config_dir, data_dir};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::prompt::RetryPolicy;

/// Main configuration structure for mailminer
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Base directory holding the credential file and scratch clones
    #[serde(default = "default_base_directory")]
    pub base_directory: String,

    /// Credential file name, relative to the base directory
    #[serde(default = "default_credentials_file")]
    pub credentials_file: String,

    /// Scratch clone directory, relative to the base directory
    #[serde(default = "default_scratch_directory")]
    pub scratch_directory: String,

    /// GitHub API settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Git executable settings
    #[serde(default)]
    pub git: GitConfig,

    /// Interactive prompt limits
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Polling loop settings
    #[serde(default)]
    pub poll: PollConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// GitHub configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GitHubConfig {
    /// REST API root
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Page shown to users who need a new token
    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Page size for repository listing
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

/// Git configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GitConfig {
    /// Git executable
    #[serde(default = "default_git_binary")]
    pub binary: String,

    /// Timeout for a single git invocation in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

/// Prompt retry limits. `None` keeps asking forever.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct PromptConfig {
    pub max_token_attempts: Option<usize>,
    pub max_user_attempts: Option<usize>,
}

/// Polling configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PollConfig {
    /// Pause between iterations
    #[serde(default = "default_interval")]
    pub interval: String, // "0s", "30s", "5m"
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_base_directory() -> String {
    match data_dir() {
        Some(dir) => dir.join("mailminer").to_string_lossy().into_owned(),
        None => "data".to_string(),
    }
}
fn default_credentials_file() -> String {
    "data.json".to_string()
}
fn default_scratch_directory() -> String {
    "clones".to_string()
}
fn default_api_url() -> String {
    "https://api.github.com".to_string()
}
fn default_token_url() -> String {
    "https://github.com/settings/tokens/new".to_string()
}
fn default_per_page() -> u32 {
    100
}
fn default_git_binary() -> String {
    "git".to_string()
}
fn default_timeout() -> u64 {
    300
}
fn default_interval() -> String {
    "0s".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token_url: default_token_url(),
            per_page: default_per_page(),
        }
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            binary: default_git_binary(),
            timeout: default_timeout(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from the default location or create a default config
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            let mut config = Self::default();

            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
            }

            config.save(&config_path)?;
            config.expand_paths()?;

            tracing::info!("Created default configuration at: {:?}", config_path);
            Ok(config)
        }
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.expand_paths()?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("mailminer").join("config.yml"))
    }

    /// Expand environment variables in configuration paths
    pub fn expand_paths(&mut self) -> Result<()> {
        self.base_directory = shellexpand::full(&self.base_directory)
            .context("Failed to expand base_directory path")?
            .into_owned();

        Ok(())
    }

    /// Base directory as a path
    pub fn base_dir(&self) -> PathBuf {
        PathBuf::from(&self.base_directory)
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.base_dir().join(&self.credentials_file)
    }

    pub fn scratch_root(&self) -> PathBuf {
        self.base_dir().join(&self.scratch_directory)
    }

    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git.timeout)
    }

    pub fn poll_interval(&self) -> Result<Duration> {
        parse_duration(&self.poll.interval)
            .with_context(|| format!("Invalid poll interval: {}", self.poll.interval))
    }

    pub fn token_policy(&self) -> RetryPolicy {
        RetryPolicy::from_limit(self.prompt.max_token_attempts)
    }

    pub fn user_policy(&self) -> RetryPolicy {
        RetryPolicy::from_limit(self.prompt.max_user_attempts)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_directory: default_base_directory(),
            credentials_file: default_credentials_file(),
            scratch_directory: default_scratch_directory(),
            github: GitHubConfig::default(),
            git: GitConfig::default(),
            prompt: PromptConfig::default(),
            poll: PollConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Parse duration strings like "30s", "5m", "1h", "2d" or raw seconds
pub fn parse_duration(duration_str: &str) -> Result<Duration> {
    let duration_str = duration_str.trim().to_lowercase();

    let secs = if let Some(value) = duration_str.strip_suffix('s') {
        value.parse::<u64>().context("Invalid seconds value")?
    } else if let Some(value) = duration_str.strip_suffix('m') {
        value.parse::<u64>().map(|v| v * 60).context("Invalid minutes value")?
    } else if let Some(value) = duration_str.strip_suffix('h') {
        value.parse::<u64>().map(|v| v * 3600).context("Invalid hours value")?
    } else if let Some(value) = duration_str.strip_suffix('d') {
        value.parse::<u64>().map(|v| v * 86400).context("Invalid days value")?
    } else {
        duration_str
            .parse::<u64>()
            .context("Invalid duration format. Use format like '30s', '5m', '1h'")?
    };

    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_default_values() {
        let config = Config::default();

        assert_eq!(config.credentials_file, "data.json");
        assert_eq!(config.scratch_directory, "clones");
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.github.per_page, 100);
        assert_eq!(config.git.binary, "git");
        assert_eq!(config.git.timeout, 300);
        assert_eq!(config.poll.interval, "0s");
        assert!(config.prompt.max_token_attempts.is_none());
        assert!(config.base_directory.ends_with("mailminer") || config.base_directory == "data");
    }

    #[test]
    fn test_derived_paths() {
        let mut config = Config::default();
        config.base_directory = "/var/lib/mm".to_string();

        assert_eq!(config.credentials_path(), PathBuf::from("/var/lib/mm/data.json"));
        assert_eq!(config.scratch_root(), PathBuf::from("/var/lib/mm/clones"));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("0s").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("45s").unwrap().as_secs(), 45);
        assert_eq!(parse_duration("5m").unwrap().as_secs(), 300);
        assert_eq!(parse_duration("2h").unwrap().as_secs(), 7200);
        assert_eq!(parse_duration("1d").unwrap().as_secs(), 86400);
        assert_eq!(parse_duration(" 90 ").unwrap().as_secs(), 90);
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("xm").is_err());
    }

    #[test]
    fn test_policies_follow_prompt_limits() {
        let mut config = Config::default();
        assert!(config.token_policy().allows(1_000_000));

        config.prompt.max_user_attempts = Some(2);
        assert!(config.user_policy().allows(2));
        assert!(!config.user_policy().allows(3));
    }

    #[test]
    #[serial]
    fn test_expand_paths() {
        env::set_var("TEST_MAILMINER_HOME", "/test/home");

        let mut config = Config::default();
        config.base_directory = "${TEST_MAILMINER_HOME}/mailminer".to_string();

        config.expand_paths().expect("Failed to expand paths");

        assert_eq!(config.base_directory, "/test/home/mailminer");

        env::remove_var("TEST_MAILMINER_HOME");
    }

    #[test]
    fn test_config_load_nonexistent_file() {
        let result = Config::load(Path::new("/nonexistent/path/config.yml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config.yml");

        let mut config = Config::default();
        config.base_directory = "/custom/path".to_string();
        config.git.timeout = 60;
        config.prompt.max_token_attempts = Some(3);

        config.save(&config_path).expect("Failed to save config");
        let loaded = Config::load(&config_path).expect("Failed to load config");

        assert_eq!(loaded.base_directory, "/custom/path");
        assert_eq!(loaded.git.timeout, 60);
        assert_eq!(loaded.prompt.max_token_attempts, Some(3));
    }

    #[test]
    fn test_yaml_parsing_partial() {
        let yaml_content = r#"
base_directory: "/srv/mailminer"
github:
  api_url: "http://localhost:9999"
git:
  timeout: 10
prompt:
  max_user_attempts: 5
poll:
  interval: "10m"
"#;

        let config: Config = serde_yaml::from_str(yaml_content).expect("Failed to parse YAML");

        assert_eq!(config.base_directory, "/srv/mailminer");
        assert_eq!(config.github.api_url, "http://localhost:9999");
        assert_eq!(config.github.per_page, 100);
        assert_eq!(config.git.binary, "git");
        assert_eq!(config.git.timeout, 10);
        assert_eq!(config.prompt.max_user_attempts, Some(5));
        assert_eq!(config.poll_interval().unwrap().as_secs(), 600);
        assert_eq!(config.credentials_file, "data.json");
    }

    #[test]
    fn test_invalid_yaml_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yml");
        std::fs::write(&config_path, "github: [unclosed").unwrap();

        let err = Config::load(&config_path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
