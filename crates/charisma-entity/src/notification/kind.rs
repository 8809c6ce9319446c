//! Notification kind enumeration.

use serde::{Deserialize, Serialize};

/// Kind of a notification, used by clients for styling and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
    /// An analysis finished and its result is available.
    AnalysisComplete,
    /// A job exhausted its retries.
    JobFailed,
    /// Operator message to every user.
    SystemAnnouncement,
}

impl NotificationKind {
    /// Return the kind as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::AnalysisComplete => "analysis_complete",
            Self::JobFailed => "job_failed",
            Self::SystemAnnouncement => "system_announcement",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
