//! Interactive credential and account resolution.
//!
//! Both loops keep asking until the API accepts the answer or the retry
//! policy runs out. Rejections are printed and never fatal on their own.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::github::{GitHubClient, User};
use crate::prompt::{Prompter, RetryPolicy};

/// Finds a token the API accepts
pub struct TokenValidator<'a> {
    client: &'a GitHubClient,
    token_url: String,
    policy: RetryPolicy,
}

impl<'a> TokenValidator<'a> {
    pub fn new(client: &'a GitHubClient, config: &Config) -> Self {
        Self {
            client,
            token_url: config.github.token_url.clone(),
            policy: config.token_policy(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Return the first accepted token.
    ///
    /// `known` tokens (stored, then environment) are tried silently in
    /// order; after that the user is prompted.
    pub async fn validate<I>(&self, prompter: &mut dyn Prompter, known: I) -> Result<String>
    where
        I: IntoIterator<Item = Option<String>>,
    {
        for candidate in known.into_iter().flatten() {
            let check = self.client.check_token(Some(&candidate)).await;
            if check.valid {
                info!("Using previously configured token");
                return Ok(candidate.trim().to_string());
            }
            warn!("Configured token was rejected (status {})", check.status);
        }

        let mut attempt = 1;
        loop {
            if !self.policy.allows(attempt) {
                return Err(self.policy.exhausted("token entry").into());
            }

            println!("Go to {} to generate a token", self.token_url);
            let entered = prompter.secret("Please insert your token")?;
            let check = self.client.check_token(Some(&entered)).await;

            if check.valid {
                return Ok(entered.trim().to_string());
            }

            println!(
                "It seems like your token is not valid, response code: {}",
                check.status
            );
            attempt += 1;
        }
    }

    /// Startup step: validate the stored token (then `fallback`, then the
    /// prompt) and write the accepted token back when it differs.
    pub async fn establish(
        &self,
        prompter: &mut dyn Prompter,
        store: &CredentialStore,
        fallback: Option<String>,
    ) -> Result<String> {
        let mut credentials = store.load()?;
        let stored = credentials.token().map(str::to_string);

        let token = self.validate(prompter, [stored, fallback]).await?;

        if credentials.token() != Some(token.as_str()) {
            credentials.token = Some(token.clone());
            store.save(&credentials)?;
            info!("Token saved to {}", store.path().display());
        }
        Ok(token)
    }
}

/// Confirms that a GitHub account exists
pub struct UserResolver<'a> {
    client: &'a GitHubClient,
    policy: RetryPolicy,
}

impl<'a> UserResolver<'a> {
    /// `policy` usually comes from `Config::user_policy`
    pub fn new(client: &'a GitHubClient, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Prompt until the API knows the entered login
    pub async fn resolve(&self, prompter: &mut dyn Prompter) -> Result<User> {
        let mut attempt = 1;
        loop {
            if !self.policy.allows(attempt) {
                return Err(self.policy.exhausted("username entry").into());
            }

            let login = prompter.input("Please enter the username of the github user")?;
            match self.try_lookup(login.trim()).await {
                Ok(user) => return Ok(user),
                Err(status) => println!(
                    "It seems like this user doesn't exist, response code: {}",
                    status
                ),
            }
            attempt += 1;
        }
    }

    /// Single lookup without prompting
    pub async fn lookup(&self, login: &str) -> Result<User> {
        self.try_lookup(login.trim()).await.map_err(|status| {
            anyhow::anyhow!("GitHub user {:?} not found, response code: {}", login, status)
        })
    }

    async fn try_lookup(&self, login: &str) -> Result<User, u16> {
        if !is_plausible_login(login) {
            debug!("Skipping lookup of malformed login {:?}", login);
            return Err(0);
        }

        self.client.get_user(login).await.map_err(|e| {
            debug!("User lookup failed: {}", e);
            e.status()
        })
    }
}

/// GitHub logins are ASCII alphanumerics, dashes and underscores
fn is_plausible_login(login: &str) -> bool {
    !login.is_empty()
        && login
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
