//! Transport seam for the durable topic channel (a RabbitMQ-style topic
//! exchange in production). Broker wiring lives outside this crate; the
//! workflows only ever see this trait.

/// Durable topic pub/sub transport. Messages are routed by key under the
/// `notify.` prefix; delivery is at-least-once and fire-and-forget from the
/// publisher's point of view.
pub trait MessageChannel: Send + Sync {
    fn publish(&self, routing_key: &str, payload: &str) -> Result<(), ChannelError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("message channel unavailable: {0}")]
    Unavailable(String),
    #[error("message rejected by broker: {0}")]
    Rejected(String),
}
