use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mailminer::config::parse_duration;
use mailminer::harvest::merge_emails;
use mailminer::health::CheckResult;
use mailminer::{
    Config, CredentialStore, DialoguerPrompter, GitHubClient, HarvestEngine, HealthCheck,
    HistoryMiner, PollOptions, Poller, Shutdown, SystemGit, Target, TokenValidator,
};

#[derive(Parser)]
#[command(name = "mailminer")]
#[command(about = "Collect commit author emails from a GitHub account's public repositories")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path (defaults to XDG config location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory holding data.json and scratch clones
    #[arg(long, global = true)]
    data_dir: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the token, then mine accounts in a loop (default)
    Run {
        /// Mine this login every iteration instead of prompting
        #[arg(short, long)]
        user: Option<String>,

        /// Stop after a single iteration
        #[arg(long)]
        once: bool,

        /// Pause between iterations, e.g. "30s", "5m"
        #[arg(long)]
        interval: Option<String>,
    },

    /// Manage the stored token
    Auth {
        #[command(subcommand)]
        auth_command: AuthCommands,
    },

    /// Mine a single repository URL without touching the GitHub API
    Mine {
        /// Clone URL
        url: String,

        /// Scratch directory name (defaults to the last URL segment)
        #[arg(long)]
        name: Option<String>,
    },

    /// System health check and diagnostics
    Doctor,
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Check the stored token without prompting
    Status,

    /// Remove the stored token
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config)?;
    if let Some(data_dir) = cli.data_dir {
        config.base_directory = shellexpand::full(&data_dir)
            .context("Failed to expand --data-dir")?
            .into_owned();
    }

    init_logging(&config.logging.level, cli.verbose)?;
    info!("Starting mailminer v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        None => cmd_run(config, None, false, None).await,
        Some(Commands::Run {
            user,
            once,
            interval,
        }) => cmd_run(config, user, once, interval).await,
        Some(Commands::Auth { auth_command }) => cmd_auth(auth_command, &config).await,
        Some(Commands::Mine { url, name }) => cmd_mine(&url, name, &config).await,
        Some(Commands::Doctor) => cmd_doctor(&config).await,
    }
}

/// Logs go to stderr; stdout carries prompts and results.
/// Precedence: RUST_LOG, then --verbose, then the configured level.
fn init_logging(level: &str, verbose: bool) -> Result<()> {
    let fallback = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .with_context(|| format!("Invalid log level: {}", fallback))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load(&path),
        None => Config::load_or_default(),
    }
}

/// Validate credentials once, then hand over to the polling loop
async fn cmd_run(
    mut config: Config,
    user: Option<String>,
    once: bool,
    interval: Option<String>,
) -> Result<()> {
    if let Some(interval) = interval {
        parse_duration(&interval).with_context(|| format!("Invalid --interval: {}", interval))?;
        config.poll.interval = interval;
    }

    let store = CredentialStore::new(&config);
    let client = GitHubClient::new(&config)?;
    let mut prompter = DialoguerPrompter;

    let token = TokenValidator::new(&client, &config)
        .establish(&mut prompter, &store, std::env::var("GITHUB_TOKEN").ok())
        .await?;

    let github = client.with_token(token);
    let miner = HistoryMiner::new(&config, Arc::new(SystemGit::new(&config)));
    let engine = HarvestEngine::new(github, miner);

    let mut options = PollOptions::from_config(&config)?;
    options.once = once;
    options.target = match user {
        Some(login) => Target::Fixed(login),
        None => Target::Prompt,
    };

    let shutdown = Shutdown::new();
    shutdown.install_ctrl_c_handler();

    let stats = Poller::new(engine, Box::new(prompter), options, shutdown)
        .run()
        .await?;

    if stats.failed > 0 {
        warn!("{} of {} iterations failed", stats.failed, stats.iterations);
    }
    Ok(())
}

async fn cmd_auth(auth_command: AuthCommands, config: &Config) -> Result<()> {
    let store = CredentialStore::new(config);

    match auth_command {
        AuthCommands::Status => {
            let credentials = store.load()?;
            let Some(token) = credentials.token() else {
                println!("❌ No token stored in {}", store.path().display());
                return Ok(());
            };

            let check = GitHubClient::new(config)?.check_token(Some(token)).await;
            if check.valid {
                println!("✅ Stored token accepted");
            } else {
                println!("❌ Stored token rejected, response code: {}", check.status);
            }
        }
        AuthCommands::Logout => {
            if store.clear_token()? {
                println!("✅ Token removed from {}", store.path().display());
            } else {
                println!("No token was stored");
            }
        }
    }

    Ok(())
}

async fn cmd_mine(url: &str, name: Option<String>, config: &Config) -> Result<()> {
    let name = match name {
        Some(name) => name,
        None => repo_name_from_url(url)
            .with_context(|| format!("Cannot derive a repository name from {}", url))?,
    };

    std::fs::create_dir_all(config.base_dir())
        .with_context(|| format!("Failed to create data directory: {:?}", config.base_dir()))?;

    let miner = HistoryMiner::new(config, Arc::new(SystemGit::new(config)));
    println!("Cloning {} ...", name);
    let lines = miner.mine(url, &name).await?;

    for email in merge_emails(lines) {
        println!("{}", email);
    }
    Ok(())
}

/// Last path segment without a trailing `.git`
fn repo_name_from_url(url: &str) -> Option<String> {
    let segment = url
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()?
        .trim_end_matches(".git");
    (!segment.is_empty()).then(|| segment.to_string())
}

async fn cmd_doctor(config: &Config) -> Result<()> {
    let health = HealthCheck::run(config).await;
    print_health_report(&health);

    if !health.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_health_report(health: &HealthCheck) {
    fn print_check(name: &str, result: &CheckResult) {
        println!("{}:", name);
        let icon = if result.passed {
            if result.is_warning { "⚠️ " } else { "✅" }
        } else {
            "❌"
        };
        println!("  {} {}", icon, result.message);
        if let Some(details) = &result.details {
            for line in details.lines() {
                println!("     {}", line);
            }
        }
    }

    println!("🔍 mailminer System Diagnostics");
    println!();

    for (name, result) in health.all_checks() {
        print_check(name, result);
        println!();
    }

    if health.all_passed() {
        println!("✅ All checks passed");
    } else {
        println!("❌ Some checks failed");
    }
}
