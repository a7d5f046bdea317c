use chrono::{DateTime, Utc};

use super::domain::{DirectMessage, InboxMessage, NotifyTask};
use crate::workflows::ids::{MessageId, TaskId, UserId};

/// New notification task captured by the consumer before dispatch.
#[derive(Debug, Clone)]
pub struct NewNotifyTask {
    pub user_id: UserId,
    pub channel: String,
    pub template_code: Option<String>,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewInboxMessage {
    pub to_user_id: UserId,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDirectMessage {
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Storage abstraction for the notification domain's three record kinds.
pub trait NotificationStore: Send + Sync {
    fn insert_task(&self, task: NewNotifyTask) -> Result<NotifyTask, StoreError>;
    fn mark_task_sent(&self, id: TaskId) -> Result<(), StoreError>;
    fn insert_inbox(&self, message: NewInboxMessage) -> Result<InboxMessage, StoreError>;
    fn insert_direct(&self, message: NewDirectMessage) -> Result<DirectMessage, StoreError>;
    fn inbox_for_user(&self, user: UserId) -> Result<Vec<InboxMessage>, StoreError>;
    fn direct_for_user(&self, user: UserId) -> Result<Vec<DirectMessage>, StoreError>;
    /// Mark a single inbox message read; NotFound when the id is unknown.
    fn mark_read(&self, id: MessageId) -> Result<(), StoreError>;
    fn mark_all_read(&self, user: UserId) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
