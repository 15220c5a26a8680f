//! Notification delivery: the subscriber set and the single delivery context.

pub mod sink;
pub mod subscribers;

pub use sink::{AppListUpdate, DeliveryContext, NotificationSink, UpdateCause, notification_channel};
pub use subscribers::{Listener, SubscriberSet, listener};
