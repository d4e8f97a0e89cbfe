use crate::client::{ClientError, RulesClient, PENDING_COUNTERS};
use crate::config::parse::load_config;
use crate::config::Config;
use crate::notify::TracingNotifier;
use crate::poller::{ConvergencePoller, ConvergenceRequest, PollOutcome, PollPhase};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] crate::config::parse::ConfigError),

    #[error("client error: {0}")]
    Client(#[from] ClientError),

    #[error("poll policy error: {0}")]
    Policy(#[from] crate::poller::PollError),

    #[error("{0}")]
    Failed(crate::poller::PollFailure),

    #[error("cancelled")]
    Cancelled,

    #[error("poll session ended in non-terminal phase '{0}'")]
    Unfinished(&'static str),
}

/// Command-line overrides for the poll section of the config
#[derive(Debug, Clone, Copy, Default)]
pub struct PollOverrides {
    pub max_attempts: Option<u32>,
    pub interval: Option<Duration>,
}

pub async fn install(
    config_path: Option<PathBuf>,
    overrides: PollOverrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load(config_path)?;
    run_install(config, overrides).await.map_err(|e| e.into())
}

pub async fn status(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load(config_path)?;
    run_status(&config).await.map_err(|e| e.into())
}

fn load(config_path: Option<PathBuf>) -> Result<Config, Box<dyn std::error::Error>> {
    let config_path = match config_path {
        Some(path) => path,
        None => {
            eprintln!("Error: config not found");
            eprintln!("Searched locations:");
            eprintln!("  ~/.config/converge/config.yml");
            eprintln!("  /etc/converge/config.yml");
            eprintln!("\nUse --config <path> to specify a config file, or run 'converge config init' to generate one.");
            std::process::exit(1);
        }
    };

    Ok(load_from(&config_path)?)
}

fn load_from(config_path: &Path) -> Result<Config, RunError> {
    info!(config_path = %config_path.display(), "Loading configuration");
    Ok(load_config(config_path)?)
}

async fn run_install(mut config: Config, overrides: PollOverrides) -> Result<(), RunError> {
    if let Some(max_attempts) = overrides.max_attempts {
        config.poll.max_attempts = max_attempts;
    }
    if let Some(interval) = overrides.interval {
        config.poll.interval = interval;
    }

    let policy = config.poll.policy()?;
    let client = Arc::new(RulesClient::new(&config.api)?);

    info!(url = %client.base_url(), "Installing pre-packaged rules and timelines");

    let poller = ConvergencePoller::new(policy).with_notifier(Arc::new(TracingNotifier));
    let session = poller.start(client, ConvergenceRequest::counters_zero(PENDING_COUNTERS));

    let outcome = tokio::select! {
        outcome = session.wait() => outcome,
        _ = signal::ctrl_c() => {
            info!("Interrupt received, cancelling");
            session.cancel();
            session.wait().await
        }
    };

    report(&outcome)
}

fn report(outcome: &PollOutcome) -> Result<(), RunError> {
    if let Some(snapshot) = &outcome.last_snapshot {
        println!("Status after {} checks:", outcome.attempts);
        for (name, value) in snapshot.counters() {
            match value {
                Some(v) => println!("  {:<24} {}", name, v),
                None => println!("  {:<24} unknown", name),
            }
        }
    }

    match &outcome.phase {
        PollPhase::Converged => {
            println!("Pre-packaged rules and timelines are installed and up to date.");
            Ok(())
        }
        PollPhase::Exhausted => {
            warn!(attempts = outcome.attempts, "Install not confirmed before attempt budget ran out");
            println!("Install request accepted, but the server had not finished when polling stopped.");
            Ok(())
        }
        PollPhase::Failed(failure) => Err(RunError::Failed(failure.clone())),
        PollPhase::Cancelled => Err(RunError::Cancelled),
        phase @ (PollPhase::Idle | PollPhase::Triggering | PollPhase::Polling) => {
            error!(phase = phase.name(), "Poll session returned before reaching a terminal phase");
            Err(RunError::Unfinished(phase.name()))
        }
    }
}

async fn run_status(config: &Config) -> Result<(), RunError> {
    let client = RulesClient::new(&config.api)?;
    let status = client.get_status(&CancellationToken::new()).await?;

    println!("Pre-packaged content: {}", status.classify());
    for (name, value) in status.to_snapshot().counters() {
        match value {
            Some(v) => println!("  {:<24} {}", name, v),
            None => println!("  {:<24} unknown", name),
        }
    }

    Ok(())
}
