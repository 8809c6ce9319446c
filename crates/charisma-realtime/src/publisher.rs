//! Publishes stream events on the pub/sub bus.

use std::sync::Arc;

use tracing::debug;

use charisma_cache::keys;
use charisma_cache::pubsub::PubSub;
use charisma_core::result::AppResult;
use charisma_entity::job::Job;
use charisma_entity::notification::Notification;

use crate::message::{
    AnalysisCompleteEvent, ChannelEnvelope, JobUpdateEvent, NotificationEvent, StreamEvent,
};

/// Thin typed layer over [`PubSub`].
#[derive(Debug, Clone)]
pub struct EventPublisher {
    pubsub: Arc<dyn PubSub>,
}

impl EventPublisher {
    pub fn new(pubsub: Arc<dyn PubSub>) -> Self {
        Self { pubsub }
    }

    /// The underlying bus.
    pub fn pubsub(&self) -> &Arc<dyn PubSub> {
        &self.pubsub
    }

    /// Publish an envelope, returning the number of receiving subscribers.
    pub async fn publish(&self, channel: &str, envelope: &ChannelEnvelope) -> AppResult<usize> {
        let payload = envelope.encode()?;
        let delivered = self.pubsub.publish(channel, payload).await?;
        debug!(channel, event = envelope.event.name(), delivered, "Published stream event");
        Ok(delivered)
    }

    /// Tell the job owner its job changed status.
    pub async fn job_update(&self, job: &Job) -> AppResult<usize> {
        let envelope =
            ChannelEnvelope::targeted(job.user_id, StreamEvent::JobUpdate(JobUpdateEvent::from(job)));
        self.publish(keys::JOB_UPDATES_CHANNEL, &envelope).await
    }

    /// Tell the job owner its analysis is ready.
    pub async fn analysis_complete(&self, job: &Job) -> AppResult<usize> {
        let envelope = ChannelEnvelope::targeted(
            job.user_id,
            StreamEvent::AnalysisComplete(AnalysisCompleteEvent::from(job)),
        );
        self.publish(keys::ANALYSIS_COMPLETE_CHANNEL, &envelope).await
    }

    /// Route a notification to its owner's channel, or to the announcement
    /// channel for broadcasts.
    pub async fn notification(&self, notification: &Notification, persisted: bool) -> AppResult<usize> {
        let content = NotificationEvent::from_notification(notification, persisted);
        match notification.user_id {
            Some(user_id) => {
                let envelope =
                    ChannelEnvelope::targeted(user_id, StreamEvent::Notification(content));
                self.publish(&keys::user_notifications_channel(user_id), &envelope)
                    .await
            }
            None => {
                let envelope = ChannelEnvelope::untargeted(StreamEvent::SystemAnnouncement(content));
                self.publish(keys::SYSTEM_ANNOUNCEMENTS_CHANNEL, &envelope)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charisma_cache::memory::MemoryPubSub;
    use charisma_core::types::id::UserId;
    use charisma_entity::job::{AnalysisPayload, AnalysisProvider, CreateJob, JobType};
    use charisma_entity::notification::{CreateNotification, NotificationKind};
    use chrono::Utc;
    use futures::StreamExt;

    fn job_for(user_id: UserId) -> Job {
        CreateJob {
            user_id,
            job_type: JobType::ConversationAnalysis,
            payload: AnalysisPayload {
                file_content: Some("hello".into()),
                file_name: Some("chat.txt".into()),
                template_id: None,
                model: None,
                provider: AnalysisProvider::Openai,
            },
            max_retries: 3,
        }
        .into_job(Utc::now())
        .unwrap()
    }

    #[tokio::test]
    async fn test_job_update_targets_owner() {
        let bus = Arc::new(MemoryPubSub::new(8));
        let publisher = EventPublisher::new(bus.clone());
        let mut sub = bus
            .subscribe(&[keys::JOB_UPDATES_CHANNEL.to_string()])
            .await
            .unwrap();

        let owner = UserId::new();
        let job = job_for(owner);
        assert_eq!(publisher.job_update(&job).await.unwrap(), 1);

        let message = sub.next().await.unwrap();
        let envelope = ChannelEnvelope::decode(&message.payload).unwrap();
        assert_eq!(envelope.user_id, Some(owner));
        assert_eq!(envelope.event.name(), "job_update");
    }

    #[tokio::test]
    async fn test_broadcast_goes_to_announcements() {
        let bus = Arc::new(MemoryPubSub::new(8));
        let publisher = EventPublisher::new(bus.clone());
        let mut sub = bus
            .subscribe(&[keys::SYSTEM_ANNOUNCEMENTS_CHANNEL.to_string()])
            .await
            .unwrap();

        let notification =
            CreateNotification::broadcast(NotificationKind::SystemAnnouncement, "Hi", "All")
                .into_notification(Utc::now());
        assert_eq!(publisher.notification(&notification, true).await.unwrap(), 1);

        let envelope = ChannelEnvelope::decode(&sub.next().await.unwrap().payload).unwrap();
        assert!(envelope.user_id.is_none());
        match envelope.event {
            StreamEvent::SystemAnnouncement(event) => assert_eq!(event.id, Some(notification.id)),
            other => panic!("unexpected event {other:?}"),
        }
    }
}
