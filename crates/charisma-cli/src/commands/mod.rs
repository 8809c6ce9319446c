//! CLI command definitions and dispatch.

pub mod drain;
pub mod migrate;
pub mod notify;
pub mod serve;
pub mod stats;
pub mod token;

use clap::{Parser, Subcommand};

use charisma_api::AppState;
use charisma_cache::CacheBackends;
use charisma_core::config::AppConfig;
use charisma_core::error::AppError;
use charisma_database::Stores;

use crate::output::OutputFormat;

/// Charisma: job queue and notification service operations
#[derive(Debug, Parser)]
#[command(name = "charisma", version, about, long_about = None)]
pub struct Cli {
    /// Directory holding default.toml and per-environment overlays
    #[arg(short, long, default_value = "config")]
    pub config_dir: String,

    /// Environment overlay to apply
    #[arg(short, long, env = "CHARISMA_ENV", default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve(serve::ServeArgs),
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Run one drain pass, as the cron entry would
    Drain,
    /// Show queue and job statistics
    Stats,
    /// Send and list notifications
    Notify(notify::NotifyArgs),
    /// Issue a session token for local testing
    Token(token::TokenArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = AppConfig::load_from(&self.config_dir, &self.env)?;
        match &self.command {
            Commands::Serve(args) => serve::execute(args, config).await,
            Commands::Migrate(args) => migrate::execute(args, &config).await,
            Commands::Drain => drain::execute(config, self.format).await,
            Commands::Stats => stats::execute(config, self.format).await,
            Commands::Notify(args) => notify::execute(args, config, self.format).await,
            Commands::Token(args) => token::execute(args, &config),
        }
    }
}

/// Helper: connect every backend and wire the services.
pub async fn connect(config: AppConfig) -> Result<AppState, AppError> {
    let stores = Stores::from_config(&config.database).await?;
    let backends = CacheBackends::from_config(&config.cache, &config.realtime).await?;
    Ok(AppState::new(config, stores, backends))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_notify_broadcast() {
        let cli = Cli::try_parse_from([
            "charisma",
            "--format",
            "json",
            "notify",
            "send",
            "--title",
            "Maintenance",
            "--message",
            "Tonight",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Notify(_)));
    }
}
