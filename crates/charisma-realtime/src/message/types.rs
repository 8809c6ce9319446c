//! Events delivered to stream clients.
//!
//! Every event serializes to a JSON object tagged with `type`, which is
//! also used as the SSE `event:` name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use charisma_core::types::id::{JobId, NotificationId, UserId};
use charisma_entity::job::{Job, JobStatus, JobType};
use charisma_entity::notification::{Notification, NotificationKind};

/// An event pushed to a stream client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// First event of every session.
    Connected {
        session_id: Uuid,
        user_id: UserId,
        timestamp: DateTime<Utc>,
    },
    /// Periodic keepalive.
    Heartbeat { timestamp: DateTime<Utc> },
    /// A notification addressed to the subscriber.
    Notification(NotificationEvent),
    /// A job changed status.
    JobUpdate(JobUpdateEvent),
    /// An analysis job finished with a result.
    AnalysisComplete(AnalysisCompleteEvent),
    /// A broadcast notification.
    SystemAnnouncement(NotificationEvent),
}

impl StreamEvent {
    /// Build a `connected` event stamped now.
    pub fn connected(session_id: Uuid, user_id: UserId) -> Self {
        Self::Connected {
            session_id,
            user_id,
            timestamp: Utc::now(),
        }
    }

    /// Build a `heartbeat` event stamped now.
    pub fn heartbeat() -> Self {
        Self::Heartbeat {
            timestamp: Utc::now(),
        }
    }

    /// The `type` tag of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Heartbeat { .. } => "heartbeat",
            Self::Notification(_) => "notification",
            Self::JobUpdate(_) => "job_update",
            Self::AnalysisComplete(_) => "analysis_complete",
            Self::SystemAnnouncement(_) => "system_announcement",
        }
    }

    /// Whether this is a keepalive.
    pub fn is_heartbeat(&self) -> bool {
        matches!(self, Self::Heartbeat { .. })
    }
}

/// Notification content as delivered live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Persisted row id; absent for live-only notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NotificationId>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl NotificationEvent {
    /// Describe `notification`; `persisted` controls whether the id is exposed.
    pub fn from_notification(notification: &Notification, persisted: bool) -> Self {
        Self {
            id: persisted.then_some(notification.id),
            kind: notification.kind,
            title: notification.title.clone(),
            message: notification.message.clone(),
            metadata: notification.metadata.clone(),
            timestamp: notification.created_at,
        }
    }
}

/// Job status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobUpdateEvent {
    pub job_id: JobId,
    pub user_id: UserId,
    pub job_type: JobType,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub retry_count: i32,
    pub timestamp: DateTime<Utc>,
}

impl From<&Job> for JobUpdateEvent {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id,
            user_id: job.user_id,
            job_type: job.job_type,
            status: job.status,
            error: job.error.clone(),
            retry_count: job.retry_count,
            timestamp: job.updated_at,
        }
    }
}

/// Finished analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisCompleteEvent {
    pub job_id: JobId,
    pub user_id: UserId,
    pub job_type: JobType,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl From<&Job> for AnalysisCompleteEvent {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id,
            user_id: job.user_id,
            job_type: job.job_type,
            result: job.result.clone(),
            timestamp: job.completed_at.unwrap_or(job.updated_at),
        }
    }
}
