//! Per-repository history mining.
//!
//! Each repository is cloned into `<base>/<scratch>/<name>`, summarized with
//! `git shortlog`, and removed again. The scratch directory is shared between
//! repositories of the same name, so it is cleared before every clone.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::config::Config;
use crate::error::MiningError;
use crate::git::GitRunner;

/// Clones repositories into scratch space and extracts author identities
#[derive(Clone)]
pub struct HistoryMiner {
    git: Arc<dyn GitRunner>,
    scratch_root: PathBuf,
}

impl HistoryMiner {
    pub fn new(config: &Config, git: Arc<dyn GitRunner>) -> Self {
        Self {
            git,
            scratch_root: config.scratch_root(),
        }
    }

    /// Scratch location for a repository name
    pub fn scratch_path(&self, name: &str) -> Result<PathBuf, MiningError> {
        let usable = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains('/')
            && !name.contains('\\');
        if !usable {
            return Err(MiningError::InvalidName(name.to_string()));
        }
        Ok(self.scratch_root.join(name))
    }

    /// Raw identity lines for one repository, possibly with blanks and
    /// duplicates. The scratch clone is gone when this returns.
    pub async fn mine(&self, url: &str, name: &str) -> Result<Vec<String>, MiningError> {
        let path = self.scratch_path(name)?;

        remove_scratch(&path).await;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        debug!("Cloning {} into {}", url, path.display());
        let result = self.clone_and_summarize(url, &path).await;

        remove_scratch(&path).await;
        result
    }

    async fn clone_and_summarize(&self, url: &str, path: &Path) -> Result<Vec<String>, MiningError> {
        let cloned = self.git.clone_repo(url, path).await?;
        if !cloned.success {
            return Err(MiningError::CloneFailed {
                path: path.to_path_buf(),
                status: cloned.status,
                stderr: cloned.stderr.trim().to_string(),
            });
        }

        let summary = self.git.shortlog(path).await?;
        if !summary.success {
            return Err(MiningError::SummaryFailed {
                path: path.to_path_buf(),
                status: summary.status,
                stderr: summary.stderr.trim().to_string(),
            });
        }

        Ok(parse_shortlog(&summary.stdout))
    }
}

async fn remove_scratch(path: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(path).await {
        debug!("Scratch cleanup of {} skipped: {}", path.display(), e);
    }
}

fn count_prefix() -> &'static Regex {
    static COUNT_PREFIX: OnceLock<Regex> = OnceLock::new();
    COUNT_PREFIX.get_or_init(|| Regex::new(r"^ *\d+ *").expect("static regex"))
}

/// Parse one `git shortlog --summary --numbered --email` line
pub fn parse_shortlog_line(line: &str) -> String {
    let line = count_prefix().replace(line, "");
    let line = line.strip_prefix("\\t").unwrap_or(&line);
    line.trim().to_string()
}

/// Parse shortlog output into one entry per line, blanks included
pub fn parse_shortlog(output: &str) -> Vec<String> {
    output.split('\n').map(parse_shortlog_line).collect()
}
