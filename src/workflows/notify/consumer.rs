use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::domain::{is_like_title, EVENT_DIRECT, EVENT_LIKES, EVENT_SYSTEM};
use super::store::{NewDirectMessage, NewInboxMessage, NewNotifyTask, NotificationStore, StoreError};
use crate::workflows::ids::UserId;

/// Consumer side of the notification channel: materializes inbox and direct
/// messages from raw `notify.*` events.
///
/// Event envelopes are handled defensively. A missing payload or user id is
/// an explicit error for the pump to log; an unrecognized `eventType` falls
/// back to system-notification handling.
pub struct NotificationConsumer {
    store: Arc<dyn NotificationStore>,
}

impl NotificationConsumer {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    pub fn handle(&self, raw: &str) -> Result<(), ConsumeError> {
        let envelope: Value = serde_json::from_str(raw)?;
        let event_type = envelope
            .get("eventType")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let payload = envelope
            .get("payload")
            .and_then(Value::as_object)
            .ok_or(ConsumeError::MissingPayload)?;

        match event_type {
            EVENT_DIRECT => self.handle_direct(payload),
            EVENT_LIKES => self.handle_likes(payload),
            EVENT_SYSTEM => self.handle_system(payload),
            other => {
                if !other.is_empty() {
                    warn!(event_type = other, "unknown event type, treating as system notice");
                }
                self.handle_system(payload)
            }
        }
    }

    fn handle_system(&self, payload: &Map<String, Value>) -> Result<(), ConsumeError> {
        let user_id = require_user(payload, "userId")?;
        let channel = payload
            .get("channel")
            .and_then(Value::as_str)
            .unwrap_or("SYSTEM");
        let template_code = payload
            .get("templateCode")
            .and_then(Value::as_str)
            .map(str::to_string);

        let task = self.store.insert_task(NewNotifyTask {
            user_id,
            channel: channel.to_string(),
            template_code,
            payload: Value::Object(payload.clone()).to_string(),
            created_at: Utc::now(),
        })?;

        let title = payload
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("System notice");
        let body = payload.get("body").and_then(Value::as_str).unwrap_or("");
        self.store.insert_inbox(NewInboxMessage {
            to_user_id: user_id,
            title: title.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        })?;

        self.store.mark_task_sent(task.id)?;
        debug!(%user_id, task_id = %task.id, "system notification materialized");
        Ok(())
    }

    fn handle_direct(&self, payload: &Map<String, Value>) -> Result<(), ConsumeError> {
        let to_user_id = require_user(payload, "toUserId")?;
        let from_user_id = payload
            .get("fromUserId")
            .and_then(Value::as_i64)
            .map(UserId)
            .ok_or(ConsumeError::IncompleteDirect)?;
        let content = payload
            .get("content")
            .and_then(Value::as_str)
            .ok_or(ConsumeError::IncompleteDirect)?;

        self.store.insert_direct(NewDirectMessage {
            from_user_id,
            to_user_id,
            content: content.to_string(),
            created_at: Utc::now(),
        })?;
        debug!(%from_user_id, %to_user_id, "direct message materialized");
        Ok(())
    }

    fn handle_likes(&self, payload: &Map<String, Value>) -> Result<(), ConsumeError> {
        let user_id = require_user(payload, "userId")?;
        let title = payload
            .get("title")
            .and_then(Value::as_str)
            .filter(|title| !title.is_empty())
            .unwrap_or("New like");
        let body = payload
            .get("body")
            .and_then(Value::as_str)
            .unwrap_or("Someone liked your post");

        if !is_like_title(title) {
            warn!(%user_id, title, "like notification title lacks the like marker");
        }

        self.store.insert_inbox(NewInboxMessage {
            to_user_id: user_id,
            title: title.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        })?;
        debug!(%user_id, "like notification materialized");
        Ok(())
    }
}

fn require_user(payload: &Map<String, Value>, key: &str) -> Result<UserId, ConsumeError> {
    payload
        .get(key)
        .and_then(Value::as_i64)
        .map(UserId)
        .ok_or(ConsumeError::MissingUser)
}

#[derive(Debug, thiserror::Error)]
pub enum ConsumeError {
    #[error("event is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("event envelope has no payload")]
    MissingPayload,
    #[error("event payload has no recipient user id")]
    MissingUser,
    #[error("direct message payload is incomplete")]
    IncompleteDirect,
    #[error(transparent)]
    Store(#[from] StoreError),
}
