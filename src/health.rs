//! Preflight checks for the `doctor` command
//!
//! Verifies that git can be run, that the data directory is usable and that
//! the stored token is still accepted.

use std::path::Path;

use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::github::GitHubClient;

/// Result of all preflight checks
#[derive(Debug, Clone)]
pub struct HealthCheck {
    pub git: CheckResult,
    pub data_dir: CheckResult,
    /// Token validity; missing token is only a warning since `run` will prompt
    pub token: CheckResult,
}

/// Result of an individual check
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
    pub is_warning: bool,
}

impl CheckResult {
    fn ok_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: Some(details.into()),
            is_warning: false,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
            details: None,
            is_warning: false,
        }
    }

    fn error_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
            details: Some(details.into()),
            is_warning: false,
        }
    }

    fn warning_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: Some(details.into()),
            is_warning: true,
        }
    }
}

impl HealthCheck {
    pub async fn run(config: &Config) -> Self {
        Self {
            git: Self::check_git(&config.git.binary),
            data_dir: Self::check_data_dir(&config.base_dir()),
            token: Self::check_token(config).await,
        }
    }

    /// Warnings do not count as failures
    pub fn all_passed(&self) -> bool {
        self.all_checks().iter().all(|(_, r)| r.passed)
    }

    pub fn errors(&self) -> Vec<&CheckResult> {
        self.all_checks()
            .into_iter()
            .map(|(_, r)| r)
            .filter(|r| !r.passed)
            .collect()
    }

    pub fn warnings(&self) -> Vec<&CheckResult> {
        self.all_checks()
            .into_iter()
            .map(|(_, r)| r)
            .filter(|r| r.is_warning)
            .collect()
    }

    pub fn all_checks(&self) -> [(&'static str, &CheckResult); 3] {
        [
            ("Git Installation", &self.git),
            ("Data Directory", &self.data_dir),
            ("GitHub Token", &self.token),
        ]
    }

    fn check_git(binary: &str) -> CheckResult {
        match std::process::Command::new(binary).arg("--version").output() {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout);
                CheckResult::ok_with_details("Git installed", version.trim().to_string())
            }
            Ok(_) => CheckResult::error(format!("`{} --version` failed", binary)),
            Err(_) => CheckResult::error_with_details(
                format!("{} not found in PATH", binary),
                "Install git: https://git-scm.com/downloads",
            ),
        }
    }

    /// The directory is created on first run, so only an unwritable one fails
    fn check_data_dir(path: &Path) -> CheckResult {
        if !path.exists() {
            return CheckResult::warning_with_details(
                "Data directory does not exist yet",
                format!("{} will be created on first run", path.display()),
            );
        }
        if !path.is_dir() {
            return CheckResult::error_with_details(
                "Data directory path is not a directory",
                path.display().to_string(),
            );
        }

        let probe = path.join(".mailminer-write-test");
        match std::fs::write(&probe, b"") {
            Ok(()) => {
                let _ = std::fs::remove_file(&probe);
                CheckResult::ok_with_details("Data directory writable", path.display().to_string())
            }
            Err(e) => CheckResult::error_with_details(
                "Data directory is not writable",
                format!("{}: {}", path.display(), e),
            ),
        }
    }

    async fn check_token(config: &Config) -> CheckResult {
        let store = CredentialStore::new(config);
        if !store.path().exists() {
            return CheckResult::warning_with_details(
                "No credential file",
                "A token will be requested on the next run",
            );
        }

        let credentials = match store.load() {
            Ok(credentials) => credentials,
            Err(e) => {
                return CheckResult::error_with_details(
                    "Credential file unreadable",
                    format!("{:#}", e),
                )
            }
        };

        let Some(token) = credentials.token() else {
            return CheckResult::warning_with_details(
                "No stored token",
                "A token will be requested on the next run",
            );
        };

        let client = match GitHubClient::new(config) {
            Ok(client) => client,
            Err(e) => return CheckResult::error_with_details("HTTP client setup failed", e.to_string()),
        };

        let check = client.check_token(Some(token)).await;
        if check.valid {
            CheckResult::ok_with_details("Stored token accepted", format!("Status: {}", check.status))
        } else {
            CheckResult::error_with_details(
                "Stored token rejected",
                format!("Response code: {}\nRun: mailminer auth logout", check.status),
            )
        }
    }
}
