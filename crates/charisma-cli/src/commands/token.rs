//! Session token issuance for local testing of the stream endpoint.

use clap::Args;

use charisma_auth::JwtEncoder;
use charisma_core::config::AppConfig;
use charisma_core::error::AppError;
use charisma_core::types::id::UserId;
use charisma_entity::user::UserRole;

/// Arguments for the token command
#[derive(Debug, Args)]
pub struct TokenArgs {
    /// Subject user ID (random when omitted)
    #[arg(short, long)]
    pub user: Option<UserId>,
    /// Issue an admin token
    #[arg(long)]
    pub admin: bool,
    /// Lifetime in hours
    #[arg(long, default_value = "1")]
    pub hours: i64,
}

/// Execute the token command
pub fn execute(args: &TokenArgs, config: &AppConfig) -> Result<(), AppError> {
    let user_id = args.user.unwrap_or_default();
    let role = if args.admin { UserRole::Admin } else { UserRole::User };
    let token = JwtEncoder::new(&config.auth).issue(
        user_id,
        role,
        chrono::Duration::hours(args.hours.max(1)),
    )?;

    eprintln!("user_id: {user_id}  role: {role}");
    println!("{token}");
    Ok(())
}
