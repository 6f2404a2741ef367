//! mailminer - collect commit author identities from a GitHub account
//!
//! Given a login, mailminer lists the account's public, non-forked
//! repositories, clones each one into scratch space, summarizes its history
//! with `git shortlog` and prints the merged, sorted set of author emails.
//!
//! ## Modules
//!
//! - [`config`]: YAML configuration with XDG defaults
//! - [`credentials`]: the on-disk token document
//! - [`auth`]: token validation and user resolution loops
//! - [`github`]: REST API client
//! - [`git`] / [`miner`]: running git and parsing its output
//! - [`harvest`]: one list, mine, merge pass
//! - [`poller`]: the repeating loop around it

pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod git;
pub mod github;
pub mod harvest;
pub mod health;
pub mod miner;
pub mod poller;
pub mod prompt;
pub mod shutdown;

pub use auth::{TokenValidator, UserResolver};
pub use config::Config;
pub use credentials::{CredentialStore, Credentials};
pub use error::{ApiError, MiningError, PromptError};
pub use git::{GitOutput, GitRunner, SystemGit};
pub use github::{GitHubClient, Repository, User};
pub use harvest::{HarvestEngine, HarvestSummary, RepoOutcome};
pub use health::HealthCheck;
pub use miner::HistoryMiner;
pub use poller::{PollOptions, PollStats, Poller, Target};
pub use prompt::{DialoguerPrompter, Prompter, RetryPolicy, ScriptedPrompter};
pub use shutdown::Shutdown;
