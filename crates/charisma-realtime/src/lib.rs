//! # charisma-realtime
//!
//! Live delivery for CharismaAI:
//!
//! - [`notification::NotificationFanout`] persists notifications and
//!   publishes them to the user's channel or the announcement channel
//! - [`publisher::EventPublisher`] puts job updates and finished analyses
//!   on the pub/sub bus
//! - [`connection::StreamHub`] opens per-client stream sessions that relay
//!   bus messages and emit heartbeats until the client goes away

pub mod channel;
pub mod connection;
pub mod message;
pub mod notification;
pub mod publisher;

pub use connection::{SessionState, StreamHub, StreamRegistry, StreamSession};
pub use message::{ChannelEnvelope, StreamEvent};
pub use notification::{DeliveryResult, NotificationFanout, NotificationList};
pub use publisher::EventPublisher;
