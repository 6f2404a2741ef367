use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command as AsyncCommand;
use tracing::debug;

use crate::config::Config;
use crate::error::MiningError;

/// Captured result of one git invocation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GitOutput {
    pub success: bool,
    /// Human-readable exit status, e.g. `exit status: 128`
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    /// Successful run with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            status: "exit status: 0".to_string(),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            status: format!("exit status: {}", code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// The two git operations mining needs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GitRunner: Send + Sync {
    /// `git clone <url> <dest>`
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<GitOutput, MiningError>;

    /// `git -C <repo> shortlog HEAD --summary --numbered --email`
    async fn shortlog(&self, repo: &Path) -> Result<GitOutput, MiningError>;
}

/// Runs the git executable found on the system
#[derive(Debug, Clone)]
pub struct SystemGit {
    binary: String,
    timeout: Duration,
}

impl SystemGit {
    pub fn new(config: &Config) -> Self {
        Self {
            binary: config.git.binary.clone(),
            timeout: config.git_timeout(),
        }
    }

    async fn run(&self, label: &str, args: &[&OsStr]) -> Result<GitOutput, MiningError> {
        debug!("Running {} {:?}", self.binary, args);

        let child = AsyncCommand::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(output) => output?,
            Err(_) => {
                return Err(MiningError::TimedOut {
                    command: label.to_string(),
                    seconds: self.timeout.as_secs(),
                })
            }
        };

        Ok(GitOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[async_trait]
impl GitRunner for SystemGit {
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<GitOutput, MiningError> {
        self.run(
            "clone",
            &[OsStr::new("clone"), OsStr::new(url), dest.as_os_str()],
        )
        .await
    }

    async fn shortlog(&self, repo: &Path) -> Result<GitOutput, MiningError> {
        self.run(
            "shortlog",
            &[
                OsStr::new("-C"),
                repo.as_os_str(),
                OsStr::new("shortlog"),
                OsStr::new("HEAD"),
                OsStr::new("--summary"),
                OsStr::new("--numbered"),
                OsStr::new("--email"),
            ],
        )
        .await
    }
}
