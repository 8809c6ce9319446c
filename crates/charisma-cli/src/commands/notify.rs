//! Notification commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use charisma_core::config::AppConfig;
use charisma_core::error::AppError;
use charisma_core::types::id::UserId;
use charisma_entity::notification::{CreateNotification, Notification, NotificationKind};

use crate::output::{self, OutputFormat};

/// Arguments for notification commands
#[derive(Debug, Args)]
pub struct NotifyArgs {
    #[command(subcommand)]
    pub command: NotifyCommand,
}

/// Notification subcommands
#[derive(Debug, Subcommand)]
pub enum NotifyCommand {
    /// Send to one user, or to everyone when --user is omitted
    Send {
        /// Recipient user ID
        #[arg(short, long)]
        user: Option<UserId>,
        /// Kind: info, success, warning, error, system_announcement, ...
        #[arg(short, long, default_value = "info", value_parser = parse_kind)]
        kind: NotificationKind,
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        message: String,
        /// Publish live only, without storing
        #[arg(long)]
        transient: bool,
    },
    /// List a user's notifications
    List {
        #[arg(short, long)]
        user: UserId,
        #[arg(short, long, default_value = "20")]
        limit: usize,
        #[arg(long)]
        unread_only: bool,
    },
}

fn parse_kind(value: &str) -> Result<NotificationKind, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| format!("unknown notification kind '{value}'"))
}

#[derive(Debug, Serialize, Tabled)]
struct NotificationRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Read")]
    read: bool,
    #[tabled(rename = "Created")]
    created_at: String,
}

impl From<&Notification> for NotificationRow {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id.to_string(),
            kind: n.kind.to_string(),
            title: n.title.clone(),
            read: n.is_read,
            created_at: n.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Execute notification commands
pub async fn execute(
    args: &NotifyArgs,
    config: AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let state = super::connect(config).await?;

    match &args.command {
        NotifyCommand::Send {
            user,
            kind,
            title,
            message,
            transient,
        } => {
            let request = match user {
                Some(user_id) => CreateNotification::to_user(*user_id, *kind, title, message),
                None => CreateNotification::broadcast(*kind, title, message),
            };
            let request = if *transient { request.transient() } else { request };

            let result = state.notifications.send(request).await?;
            match format {
                OutputFormat::Json => output::print_json(&result),
                OutputFormat::Table if result.success => {
                    output::print_success(&format!(
                        "Notification sent to {} live subscriber(s)",
                        result.delivered
                    ));
                    if let Some(id) = result.notification_id {
                        output::print_kv("ID", id);
                    }
                }
                OutputFormat::Table => output::print_warning(&format!(
                    "Notification not fully delivered: {}",
                    result.error.as_deref().unwrap_or("unknown error")
                )),
            }
        }
        NotifyCommand::List {
            user,
            limit,
            unread_only,
        } => {
            let list = state
                .notifications
                .get_user_notifications(*user, *limit, *unread_only)
                .await?;
            match format {
                OutputFormat::Json => output::print_json(&list),
                OutputFormat::Table => {
                    let rows: Vec<NotificationRow> =
                        list.notifications.iter().map(NotificationRow::from).collect();
                    output::print_list(&rows, format);
                    output::print_kv("Unread", list.unread_count);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind("info").unwrap(), NotificationKind::Info);
        assert_eq!(
            parse_kind("system_announcement").unwrap(),
            NotificationKind::SystemAnnouncement
        );
        assert!(parse_kind("loud").is_err());
    }
}
