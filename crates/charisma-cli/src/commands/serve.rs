//! Start the HTTP server.

use clap::Args;

use charisma_core::config::AppConfig;
use charisma_core::error::AppError;

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Override the server port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Override the server host
    #[arg(long)]
    pub host: Option<String>,

    /// Drain on `cron.schedule` inside this process
    #[arg(long)]
    pub in_process_cron: bool,
}

/// Execute the serve command
pub async fn execute(args: &ServeArgs, mut config: AppConfig) -> Result<(), AppError> {
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }
    if args.in_process_cron {
        config.cron.in_process = true;
    }

    println!("Starting Charisma server...");
    println!("  Host: {}", config.server.host);
    println!("  Port: {}", config.server.port);
    println!("  Database: {}", config.database.provider);
    println!("  Cache: {}", config.cache.provider);

    charisma_api::run_server(config).await
}
