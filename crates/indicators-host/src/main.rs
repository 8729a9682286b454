mod commands;
mod config;
mod gateway;
mod keyring_backend;
mod scheduler;
mod transport;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicators::{CredentialStore, DownloadOptions, SyncContext, SyncOrchestrator};
use indicators_github::{GitHubRepoClient, HttpVersionSource};
use indicators_store::{IndicatorStore, resolve_directory};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::gateway::Gateway;
use crate::keyring_backend::KeyringBackend;

#[derive(Parser)]
#[command(name = "indicator-host")]
#[command(about = "Keep a local mirror of indicator definitions in sync with GitHub")]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve UI requests over stdin/stdout and sync on a schedule
    Serve {
        /// Do not run the periodic version check
        #[arg(long)]
        no_auto_sync: bool,
    },
    /// Download indicators from a repository now
    Sync {
        /// Repository owner (defaults to config)
        #[arg(long)]
        owner: Option<String>,
        /// Repository name (defaults to config)
        #[arg(long)]
        repo: Option<String>,
        /// Branch (defaults to config)
        #[arg(long)]
        branch: Option<String>,
        /// Record this version after the download
        #[arg(long)]
        version: Option<String>,
    },
    /// Check the remote version and sync if it changed
    Check,
    /// Show installed and remote versions
    Status,
    /// List installed indicator files
    List,
    /// Print an installed indicator file
    Show {
        /// Path relative to the store, e.g. indicators/rsi.json
        path: String,
        /// Print the file as stored
        #[arg(long)]
        raw: bool,
    },
    /// Manage the GitHub token in the system credential store
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Save a token (read from stdin when omitted)
    Set { token: Option<String> },
    /// Print the stored token, masked unless --reveal is given
    Get {
        #[arg(long)]
        reveal: bool,
    },
    /// Remove the stored token
    Delete,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "indicator_host=debug,indicators=debug,indicators_github=debug,indicators_store=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // stdout carries the UI protocol in serve mode.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_store(app_config: &AppConfig) -> Result<IndicatorStore> {
    let dir = match &app_config.store_dir {
        Some(dir) => dir.clone(),
        None => resolve_directory().context("could not find a writable indicator directory")?,
    };
    tracing::debug!(dir = %dir.display(), "using indicator store");
    Ok(IndicatorStore::open(dir))
}

fn build_credentials() -> CredentialStore {
    CredentialStore::new(Arc::new(KeyringBackend::new()))
}

fn build_orchestrator(
    app_config: &AppConfig,
    credentials: CredentialStore,
) -> Result<Arc<SyncOrchestrator>> {
    let store = build_store(app_config)?;

    Ok(Arc::new(SyncOrchestrator::new(SyncContext {
        remote: Arc::new(GitHubRepoClient::new(app_config.api_base_url.clone())),
        versions: Arc::new(HttpVersionSource::new()),
        storage: Arc::new(store),
        credentials,
        settings: app_config.sync_settings(),
    })))
}

async fn serve(app_config: &AppConfig, no_auto_sync: bool) -> Result<()> {
    let credentials = build_credentials();
    let orchestrator = build_orchestrator(app_config, credentials.clone())?;
    let gateway = Arc::new(Gateway::new(Arc::clone(&orchestrator), credentials));

    let schedule = (app_config.auto_sync && !no_auto_sync)
        .then(|| scheduler::spawn(Arc::clone(&orchestrator), app_config.poll_interval()));

    tracing::info!(
        dir = %orchestrator.directory().display(),
        auto_sync = schedule.is_some(),
        "indicator host ready"
    );

    let reader = BufReader::new(tokio::io::stdin());
    let result = tokio::select! {
        result = transport::serve(gateway, reader, tokio::io::stdout()) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, shutting down");
            Ok(())
        }
    };

    if let Some(schedule) = schedule {
        schedule.abort();
    }

    result
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let app_config = config::load_config(cli.config.as_deref());

    match cli.command.unwrap_or(Command::Serve {
        no_auto_sync: false,
    }) {
        Command::Serve { no_auto_sync } => serve(&app_config, no_auto_sync).await,
        Command::Sync {
            owner,
            repo,
            branch,
            version,
        } => {
            let orchestrator = build_orchestrator(&app_config, build_credentials())?;
            let options = DownloadOptions {
                owner: Some(owner.unwrap_or_else(|| app_config.owner.clone())),
                repo: Some(repo.unwrap_or_else(|| app_config.repo.clone())),
                branch: Some(branch.unwrap_or_else(|| app_config.branch.clone())),
                token: None,
                version,
            };
            commands::sync::run(&orchestrator, options).await
        }
        Command::Check => {
            let orchestrator = build_orchestrator(&app_config, build_credentials())?;
            commands::check::run(&orchestrator).await
        }
        Command::Status => {
            let orchestrator = build_orchestrator(&app_config, build_credentials())?;
            commands::status::run(&orchestrator).await
        }
        Command::List => {
            let store = build_store(&app_config)?;
            commands::list::run(&store)
        }
        Command::Show { path, raw } => {
            let store = build_store(&app_config)?;
            commands::show::run(&store, &path, raw)
        }
        Command::Token { action } => {
            let credentials = build_credentials();
            match action {
                TokenAction::Set { token } => commands::token::set(&credentials, token),
                TokenAction::Get { reveal } => commands::token::get(&credentials, reveal),
                TokenAction::Delete => commands::token::delete(&credentials),
            }
        }
    }
}
