use dialoguer::{theme::ColorfulTheme, Input, Password};
use std::collections::VecDeque;
use std::io::ErrorKind;
use tokio::runtime::{Handle, RuntimeFlavor};

use crate::error::PromptError;

/// Source of interactive answers.
///
/// Production code reads from the terminal; tests feed a fixed script so the
/// retry loops terminate.
pub trait Prompter: Send {
    /// Ask for a visible line of text.
    fn input(&mut self, prompt: &str) -> Result<String, PromptError>;

    /// Ask for a secret; input is not echoed.
    fn secret(&mut self, prompt: &str) -> Result<String, PromptError>;
}

/// Terminal prompter backed by `dialoguer`.
///
/// Reads block, so on a multi-threaded runtime they run through
/// `block_in_place` and other tasks (the Ctrl+C listener) keep running.
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn input(&mut self, prompt: &str) -> Result<String, PromptError> {
        let theme = ColorfulTheme::default();
        blocking(|| {
            Input::<String>::with_theme(&theme)
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
        })
        .map_err(prompt_error)
    }

    fn secret(&mut self, prompt: &str) -> Result<String, PromptError> {
        let theme = ColorfulTheme::default();
        blocking(|| {
            Password::with_theme(&theme)
                .with_prompt(prompt)
                .allow_empty_password(true)
                .interact()
        })
        .map_err(prompt_error)
    }
}

fn blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// An interrupted read (Ctrl+C at the prompt) is not an input failure
fn prompt_error(err: dialoguer::Error) -> PromptError {
    match err {
        dialoguer::Error::IO(io) if io.kind() == ErrorKind::Interrupted => PromptError::Interrupted,
        other => PromptError::Input(other.to_string()),
    }
}

/// Replays a fixed list of answers, then fails.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    /// Prompts shown so far, in order
    pub fn asked(&self) -> &[String] {
        &self.asked
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next(&mut self, prompt: &str) -> Result<String, PromptError> {
        self.asked.push(prompt.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| PromptError::Input("no scripted answer left".to_string()))
    }
}

impl Prompter for ScriptedPrompter {
    fn input(&mut self, prompt: &str) -> Result<String, PromptError> {
        self.next(prompt)
    }

    fn secret(&mut self, prompt: &str) -> Result<String, PromptError> {
        self.next(prompt)
    }
}

/// How many times a prompt loop may ask before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    max_attempts: Option<usize>,
}

impl RetryPolicy {
    /// Ask forever
    pub fn unbounded() -> Self {
        Self { max_attempts: None }
    }

    pub fn bounded(max_attempts: usize) -> Self {
        Self {
            max_attempts: Some(max_attempts),
        }
    }

    pub fn from_limit(limit: Option<usize>) -> Self {
        Self {
            max_attempts: limit,
        }
    }

    pub fn max_attempts(&self) -> Option<usize> {
        self.max_attempts
    }

    /// Whether the 1-based `attempt` may run
    pub fn allows(&self, attempt: usize) -> bool {
        match self.max_attempts {
            Some(max) => attempt <= max,
            None => true,
        }
    }

    pub(crate) fn exhausted(&self, what: &str) -> PromptError {
        PromptError::AttemptsExhausted {
            what: what.to_string(),
            attempts: self.max_attempts.unwrap_or(0),
        }
    }
}
