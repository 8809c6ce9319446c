//! Notification domain entities.

pub mod kind;
pub mod model;
pub mod recipient;

pub use kind::NotificationKind;
pub use model::{CreateNotification, Notification};
pub use recipient::Recipient;
