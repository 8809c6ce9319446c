//! Bus framing for stream events.

use serde::{Deserialize, Serialize};

use charisma_core::types::id::UserId;

use super::types::StreamEvent;

/// What publishers put on a pub/sub channel.
///
/// `user_id` targets one subscriber; `None` reaches every subscriber of
/// the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub event: StreamEvent,
}

impl ChannelEnvelope {
    /// Envelope for one user.
    pub fn targeted(user_id: UserId, event: StreamEvent) -> Self {
        Self {
            user_id: Some(user_id),
            event,
        }
    }

    /// Envelope for every subscriber.
    pub fn untargeted(event: StreamEvent) -> Self {
        Self {
            user_id: None,
            event,
        }
    }

    /// Whether a session owned by `user_id` should relay this.
    pub fn is_for(&self, user_id: UserId) -> bool {
        self.user_id.is_none_or(|target| target == user_id)
    }

    /// Encode for the bus.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a bus payload.
    pub fn decode(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}
