//! Polling loop - repeats the harvest pipeline until told to stop
//!
//! Each iteration resolves the target account, runs one harvest pass and
//! prints the merged identities. Iterations are separated by the configured
//! interval, and a shutdown request ends the loop between steps.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::auth::UserResolver;
use crate::config::Config;
use crate::error::PromptError;
use crate::github::User;
use crate::harvest::{HarvestEngine, HarvestSummary};
use crate::prompt::{Prompter, RetryPolicy};
use crate::shutdown::Shutdown;

/// Which account each iteration mines
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Ask for a username every iteration
    Prompt,
    /// Always mine this login
    Fixed(String),
}

/// Loop options
#[derive(Debug, Clone)]
pub struct PollOptions {
    pub interval: Duration,
    pub once: bool,
    pub target: Target,
    pub user_policy: RetryPolicy,
}

impl PollOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            interval: config.poll_interval()?,
            once: false,
            target: Target::Prompt,
            user_policy: config.user_policy(),
        })
    }
}

/// Counters kept across iterations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollStats {
    pub iterations: u64,
    pub successful: u64,
    pub failed: u64,
}

pub struct Poller {
    engine: HarvestEngine,
    prompter: Box<dyn Prompter>,
    options: PollOptions,
    shutdown: Shutdown,
}

impl Poller {
    pub fn new(
        engine: HarvestEngine,
        prompter: Box<dyn Prompter>,
        options: PollOptions,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            engine,
            prompter,
            options,
            shutdown,
        }
    }

    /// Run until shutdown, `once` completion, or a user resolution error
    pub async fn run(&mut self) -> Result<PollStats> {
        let mut receiver = self.shutdown.subscribe();
        let mut stats = PollStats::default();

        info!("Polling loop started with interval: {:?}", self.options.interval);

        loop {
            if self.shutdown.is_requested() {
                break;
            }

            let resolved = self.next_user().await;
            if resolved.as_ref().is_err_and(is_interrupted) {
                debug!("Prompt interrupted, treating as shutdown");
                self.shutdown.request();
            }
            if self.shutdown.is_requested() {
                break;
            }

            stats.iterations += 1;
            match resolved {
                Ok(user) => match self.engine.harvest(&user).await {
                    Ok(summary) => {
                        print_summary(&summary);
                        stats.successful += 1;
                    }
                    Err(e) => {
                        error!("Harvest failed: {:?}", e);
                        stats.failed += 1;
                    }
                },
                // A prompt that cannot be answered ends the loop
                Err(e) if self.options.target == Target::Prompt => return Err(e),
                Err(e) => {
                    error!("User lookup failed: {:#}", e);
                    stats.failed += 1;
                }
            }

            if self.options.once {
                break;
            }
            println!("Searching for more mails ...");

            tokio::select! {
                _ = self.shutdown.wait(&mut receiver) => {
                    debug!("Shutdown received while waiting for next iteration");
                    break;
                }
                _ = tokio::time::sleep(self.options.interval) => {}
            }
        }

        info!(
            "Polling loop exiting after {} iterations ({} successful, {} failed)",
            stats.iterations, stats.successful, stats.failed
        );
        Ok(stats)
    }

    async fn next_user(&mut self) -> Result<User> {
        let resolver = UserResolver::new(self.engine.github(), self.options.user_policy);

        match &self.options.target {
            Target::Prompt => resolver
                .resolve(self.prompter.as_mut())
                .await
                .context("Could not resolve a GitHub user"),
            Target::Fixed(login) => resolver.lookup(login).await,
        }
    }
}

fn is_interrupted(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<PromptError>(), Some(PromptError::Interrupted))
}

/// Print the merged identities, one per line
pub fn print_summary(summary: &HarvestSummary) {
    println!(
        "{} unique identities across {} repositories of {}:",
        summary.emails.len(),
        summary.mined_repositories,
        summary.login
    );
    for email in &summary.emails {
        println!("  {}", email);
    }
}
