use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::workflows::ids::{MessageId, TaskId, UserId};

/// Routing key for system notifications.
pub const EVENT_SYSTEM: &str = "notify.system";
/// Routing key for direct (user-to-user) messages.
pub const EVENT_DIRECT: &str = "notify.direct";
/// Routing key for like notifications.
pub const EVENT_LIKES: &str = "notify.likes";

/// Marker the consumer guarantees in a like notification's title so inbox
/// queries can split likes from generic system messages by title content.
pub const LIKE_TITLE_MARKER: &str = "like";

pub fn is_like_title(title: &str) -> bool {
    title.to_lowercase().contains(LIKE_TITLE_MARKER)
}

/// A typed notification event. The wire form is
/// `{"eventType": <routing key>, "payload": {...}}` with the routing key
/// doubling as the topic the message is published under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyEvent {
    System {
        user_id: UserId,
        title: String,
        body: String,
        template_code: Option<String>,
    },
    Direct {
        from_user_id: UserId,
        to_user_id: UserId,
        content: String,
    },
    Likes {
        user_id: UserId,
        title: String,
        body: String,
    },
}

impl NotifyEvent {
    pub const fn routing_key(&self) -> &'static str {
        match self {
            NotifyEvent::System { .. } => EVENT_SYSTEM,
            NotifyEvent::Direct { .. } => EVENT_DIRECT,
            NotifyEvent::Likes { .. } => EVENT_LIKES,
        }
    }

    /// Serialize to the wire envelope consumed by the notification service.
    pub fn envelope(&self) -> Value {
        let payload = match self {
            NotifyEvent::System {
                user_id,
                title,
                body,
                template_code,
            } => {
                let mut payload = json!({
                    "userId": user_id,
                    "title": title,
                    "body": body,
                });
                if let Some(code) = template_code {
                    payload["templateCode"] = json!(code);
                }
                payload
            }
            NotifyEvent::Direct {
                from_user_id,
                to_user_id,
                content,
            } => json!({
                "fromUserId": from_user_id,
                "toUserId": to_user_id,
                "content": content,
            }),
            NotifyEvent::Likes {
                user_id,
                title,
                body,
            } => json!({
                "userId": user_id,
                "title": title,
                "body": body,
            }),
        };

        json!({
            "eventType": self.routing_key(),
            "payload": payload,
        })
    }
}

/// Delivery state of an outbound notification task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Sent,
}

/// A unit of outbound notification work, created by the consumer side of
/// the message channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyTask {
    pub id: TaskId,
    pub user_id: UserId,
    pub channel: String,
    pub template_code: Option<String>,
    /// Serialized event payload, kept opaque for template rendering.
    pub payload: String,
    pub status: TaskStatus,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
}

/// Durable, user-visible record of a system notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxMessage {
    pub id: MessageId,
    pub to_user_id: UserId,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// A persisted user-to-user message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessage {
    pub id: MessageId,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
