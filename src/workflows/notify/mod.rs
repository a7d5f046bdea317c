//! Notification dispatch and materialization.
//!
//! The producer half ([`NotificationDispatcher`]) publishes typed events to
//! the topic channel and expands role broadcasts into per-user publishes.
//! The consumer half ([`NotificationConsumer`]) runs on the other side of
//! the channel and materializes inbox/direct messages for recipients.

pub mod channel;
pub mod consumer;
pub mod dispatcher;
pub mod domain;
pub mod router;
pub mod store;

pub use channel::{ChannelError, MessageChannel};
pub use consumer::{ConsumeError, NotificationConsumer};
pub use dispatcher::NotificationDispatcher;
pub use domain::{
    DirectMessage, InboxMessage, NotifyEvent, NotifyTask, TaskStatus, EVENT_DIRECT, EVENT_LIKES,
    EVENT_SYSTEM,
};
pub use router::{notification_router, NotifyRouterState};
pub use store::{
    NewDirectMessage, NewInboxMessage, NewNotifyTask, NotificationStore, StoreError,
};
