//! Ecogaspi CLI - marketplace back-office client

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use ecogaspi_core::AppProfile;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Level, error, info};

#[derive(Parser)]
#[command(name = "ecogaspi")]
#[command(about = "Ecogaspi marketplace client")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Data directory for the stored session, configuration and logs
    #[arg(short = 'd', long, global = true, env = "ECOGASPI_STATE_DIR")]
    data_dir: Option<PathBuf>,

    /// Configuration file (defaults to <data_dir>/config.json when present)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Front end to act as
    #[arg(short = 'p', long, global = true)]
    profile: Option<ProfileArg>,

    /// Timeout for one command in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true, default_value = "60")]
    timeout: u64,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = config::load_settings(
        cli.config.as_deref(),
        cli.data_dir.clone(),
        cli.profile.map(Into::into),
    )?;
    logging::init_logging(cli.log_level.into(), &settings.data_dir(), cli.no_file_log)?;

    info!(profile = ?settings.session.profile, api = %settings.full_api_url(), "Starting Ecogaspi CLI");

    // Interactive sessions end on idle timeout, not on the command timeout
    let timeout = if cli.timeout == 0 || cli.command.is_long_running() {
        None
    } else {
        Some(Duration::from_secs(cli.timeout))
    };

    let outcome = match timeout {
        None => cli.command.execute(settings).await,
        Some(duration) => {
            let Ok(result) = tokio::time::timeout(duration, cli.command.execute(settings)).await
            else {
                error!("Command timed out after {} seconds", cli.timeout);
                std::process::exit(1);
            };
            result
        }
    };

    match outcome {
        Ok(()) => {
            info!("Command completed successfully");
        }
        Err(e) => {
            error!("Command failed: {e:#}");
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }

    Ok(())
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProfileArg {
    Admin,
    Storefront,
}

impl From<ProfileArg> for AppProfile {
    fn from(profile: ProfileArg) -> Self {
        match profile {
            ProfileArg::Admin => Self::Admin,
            ProfileArg::Storefront => Self::Storefront,
        }
    }
}
