//! Harvest Engine - one pass of the mining pipeline
//!
//! Lists an account's repositories, keeps the public non-forks, mines each
//! one in turn and merges the results into a sorted, deduplicated list.

use anyhow::{Context, Result};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::github::{GitHubClient, Repository, User};
use crate::miner::HistoryMiner;

/// Outcome of mining a single repository
#[derive(Debug)]
pub enum RepoOutcome {
    Mined { name: String, found: usize },
    Failed { name: String, error: String },
}

/// Results from one harvest pass
#[derive(Debug)]
pub struct HarvestSummary {
    pub login: String,
    pub profile_email: Option<String>,
    pub total_repositories: usize,
    pub mined_repositories: usize,
    pub outcomes: Vec<RepoOutcome>,
    pub emails: Vec<String>,
    pub duration: Duration,
}

impl HarvestSummary {
    pub fn failed_repositories(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RepoOutcome::Failed { .. }))
            .count()
    }
}

/// Runs the list, mine, merge pipeline for one account
#[derive(Clone)]
pub struct HarvestEngine {
    github: GitHubClient,
    miner: HistoryMiner,
}

impl HarvestEngine {
    pub fn new(github: GitHubClient, miner: HistoryMiner) -> Self {
        Self { github, miner }
    }

    pub fn github(&self) -> &GitHubClient {
        &self.github
    }

    /// Mine every public, non-forked repository of `user`
    pub async fn harvest(&self, user: &User) -> Result<HarvestSummary> {
        let start_time = Instant::now();

        match &user.email {
            Some(email) => println!("User has a mail in their account `{}`", email),
            None => println!("User has no mail in their account"),
        }

        let repositories = self
            .github
            .get_repos(&user.login)
            .await
            .with_context(|| format!("Failed to list repositories of {}", user.login))?;
        let total_repositories = repositories.len();

        let mineable = filter_mineable(repositories);
        println!(
            "Found {} public repositories not forked",
            mineable.len()
        );

        let mut outcomes = Vec::with_capacity(mineable.len());
        let mut raw = Vec::new();

        for repo in &mineable {
            println!("Cloning {} ...", repo.name);
            match self.miner.mine(&repo.clone_url, &repo.name).await {
                Ok(lines) => {
                    outcomes.push(RepoOutcome::Mined {
                        name: repo.name.clone(),
                        found: lines.iter().filter(|l| !l.is_empty()).count(),
                    });
                    raw.extend(lines);
                }
                Err(e) => {
                    warn!("Skipping {}: {}", repo.name, e);
                    outcomes.push(RepoOutcome::Failed {
                        name: repo.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let emails = merge_emails(raw);
        let duration = start_time.elapsed();

        info!(
            "Harvest of {} finished in {:.2}s: {} repositories, {} identities",
            user.login,
            duration.as_secs_f64(),
            mineable.len(),
            emails.len()
        );

        Ok(HarvestSummary {
            login: user.login.clone(),
            profile_email: user.email.clone(),
            total_repositories,
            mined_repositories: mineable.len(),
            outcomes,
            emails,
            duration,
        })
    }
}

/// Keep only repositories that are neither private nor forks
pub fn filter_mineable(repositories: Vec<Repository>) -> Vec<Repository> {
    repositories
        .into_iter()
        .filter(|repo| !repo.private && !repo.fork)
        .collect()
}

/// Deduplicate, drop blank entries and sort in dictionary order
pub fn merge_emails<I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut merged: Vec<String> = raw
        .into_iter()
        .filter(|entry| !entry.trim().is_empty())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    merged.sort_by(|a, b| dictionary_cmp(a, b));
    merged
}

/// Case-insensitive ordering; on a tie lowercase sorts before uppercase.
/// Only identical strings compare equal.
pub fn dictionary_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}
