use clap::{Parser, Subcommand};
use converge::cli::run::PollOverrides;
use converge::config::resolve_config_path;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "converge")]
#[command(about = "Install pre-packaged rules and wait for the install to converge", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Trigger the install and poll status until nothing is pending
    Install {
        /// Override poll.max_attempts
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Override poll.interval (e.g. 300ms, 2s)
        #[arg(long, value_parser = humantime::parse_duration)]
        interval: Option<Duration>,
    },
    /// Query install status once
    Status,
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Init {
        #[arg(long)]
        stdout: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "converge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config.as_deref());

    match cli.command {
        Some(Commands::Install {
            max_attempts,
            interval,
        }) => {
            let overrides = PollOverrides {
                max_attempts,
                interval,
            };
            converge::cli::run::install(config_path, overrides).await?;
        }
        None => {
            // Default behavior is to install
            converge::cli::run::install(config_path, PollOverrides::default()).await?;
        }
        Some(Commands::Status) => {
            converge::cli::run::status(config_path).await?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { stdout } => {
                converge::cli::config::init(stdout)?;
            }
        },
    }

    Ok(())
}
