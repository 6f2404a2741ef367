/// Common test utilities and helpers for mailminer tests

use async_trait::async_trait;
use mailminer::{Config, GitOutput, GitRunner, MiningError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

/// Isolated data directory plus a config pointing at it
pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn base_dir(&self) -> PathBuf {
        self.temp_dir.path().join("data")
    }

    pub fn config(&self, api_url: &str) -> Config {
        let mut config = Config::default();
        config.base_directory = self.base_dir().to_string_lossy().into_owned();
        config.github.api_url = api_url.to_string();
        config
    }

    /// Write a YAML config for CLI runs and return its path
    pub fn write_config(&self, extra: &str) -> PathBuf {
        let config_path = self.temp_dir.path().join("config.yml");
        let content = format!(
            "base_directory: \"{}\"\n{}",
            self.base_dir().display(),
            extra
        );
        std::fs::write(&config_path, content).expect("Failed to write test config");
        config_path
    }
}

/// Repository entry as the listing endpoint returns it
#[derive(Debug, Clone)]
pub struct MockRepository {
    pub name: String,
    pub clone_url: String,
    pub is_fork: bool,
    pub is_private: bool,
}

impl MockRepository {
    pub fn new(name: &str, owner: &str) -> Self {
        Self {
            name: name.to_string(),
            clone_url: format!("https://example.com/{}/{}.git", owner, name),
            is_fork: false,
            is_private: false,
        }
    }

    pub fn as_fork(mut self) -> Self {
        self.is_fork = true;
        self
    }

    pub fn as_private(mut self) -> Self {
        self.is_private = true;
        self
    }

    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "clone_url": self.clone_url,
            "private": self.is_private,
            "fork": self.is_fork,
        })
    }
}

pub fn repositories_json(repositories: &[MockRepository]) -> Value {
    Value::Array(repositories.iter().map(MockRepository::to_json).collect())
}

/// One recorded clone call
#[derive(Debug, Clone)]
pub struct CloneCall {
    pub url: String,
    pub dest: PathBuf,
    pub dest_existed: bool,
}

/// In-memory git: clones create the destination, shortlog answers per URL
#[derive(Default)]
pub struct FakeGit {
    shortlogs: HashMap<String, String>,
    clones: Mutex<Vec<CloneCall>>,
    checked_out: Mutex<HashMap<PathBuf, String>>,
}

impl FakeGit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shortlog(mut self, url: &str, output: &str) -> Self {
        self.shortlogs.insert(url.to_string(), output.to_string());
        self
    }

    pub fn clones(&self) -> Vec<CloneCall> {
        self.clones.lock().unwrap().clone()
    }
}

#[async_trait]
impl GitRunner for FakeGit {
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<GitOutput, MiningError> {
        self.clones.lock().unwrap().push(CloneCall {
            url: url.to_string(),
            dest: dest.to_path_buf(),
            dest_existed: dest.exists(),
        });

        if !self.shortlogs.contains_key(url) {
            return Ok(GitOutput::failed(128, "fatal: repository not found"));
        }

        std::fs::create_dir_all(dest.join(".git"))?;
        self.checked_out
            .lock()
            .unwrap()
            .insert(dest.to_path_buf(), url.to_string());
        Ok(GitOutput::ok(""))
    }

    async fn shortlog(&self, repo: &Path) -> Result<GitOutput, MiningError> {
        let url = self.checked_out.lock().unwrap().remove(repo);
        match url.and_then(|url| self.shortlogs.get(&url)) {
            Some(output) => Ok(GitOutput::ok(output.clone())),
            None => Ok(GitOutput::failed(128, "fatal: not a git repository")),
        }
    }
}

pub fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Assertion helpers for test validation
pub fn assert_contains_all(text: &str, expected: &[&str]) {
    for item in expected {
        assert!(
            text.contains(item),
            "Expected text to contain '{}', but it didn't. Text: {}",
            item,
            text
        );
    }
}
