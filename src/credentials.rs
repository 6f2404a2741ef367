//! On-disk credential document.
//!
//! A single JSON object at `<base>/data.json`. It starts life as `{}` and
//! gains a `token` once one has been validated.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::Config;

/// Persisted credentials. Unknown fields survive a load/save cycle.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Credentials {
    /// Stored token, ignoring blank values
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Reads and writes the credential document
#[derive(Debug, Clone)]
pub struct CredentialStore {
    base_dir: PathBuf,
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(config: &Config) -> Self {
        Self {
            base_dir: config.base_dir(),
            path: config.credentials_path(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, creating the base directory and an empty `{}` file
    /// on first run. Malformed JSON is returned as an error.
    pub fn load(&self) -> Result<Credentials> {
        if !self.base_dir.exists() {
            std::fs::create_dir_all(&self.base_dir).with_context(|| {
                format!("Failed to create data directory: {:?}", self.base_dir)
            })?;
            info!("Created data directory: {}", self.base_dir.display());
        }

        if !self.path.exists() {
            std::fs::write(&self.path, "{}")
                .with_context(|| format!("Failed to create credential file: {:?}", self.path))?;
            debug!("Initialized empty credential file: {}", self.path.display());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read credential file: {:?}", self.path))?;

        let credentials: Credentials = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse credential file: {:?}", self.path))?;

        Ok(credentials)
    }

    /// Overwrite the document in full
    pub fn save(&self, credentials: &Credentials) -> Result<()> {
        let content =
            serde_json::to_string(credentials).context("Failed to serialize credentials")?;

        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write credential file: {:?}", self.path))?;

        debug!("Saved credentials to {}", self.path.display());
        Ok(())
    }

    /// Drop the stored token, keeping everything else
    pub fn clear_token(&self) -> Result<bool> {
        let mut credentials = self.load()?;
        let had_token = credentials.token.take().is_some();
        self.save(&credentials)?;
        Ok(had_token)
    }
}
