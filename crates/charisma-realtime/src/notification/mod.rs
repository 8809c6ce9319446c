//! Notification fan-out and the cached unread counter.

pub mod fanout;
pub mod unread;

pub use fanout::{DeliveryResult, NotificationFanout, NotificationList};
pub use unread::UnreadCounter;
