//! CharismaAI job and notification service.
//!
//! Entry point: loads configuration, initializes logging, and runs the
//! HTTP server (cron drain entry, notifications, event stream).

use tracing_subscriber::{EnvFilter, fmt};

use charisma_core::config::AppConfig;
use charisma_core::error::AppError;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!("Starting charisma-server v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = charisma_api::run_server(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load `config/default.toml`, the `CHARISMA_ENV` overlay, and
/// `CHARISMA__*` variables.
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("CHARISMA_ENV").unwrap_or_else(|_| "development".to_string());
    let dir = std::env::var("CHARISMA_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    AppConfig::load_from(&dir, &env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}
