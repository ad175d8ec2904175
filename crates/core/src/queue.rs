use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One typed message attribute. The consumer filters and routes on these
/// without deserializing the body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    String(String),
    Number(i64),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            Self::Number(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::String(_) => None,
        }
    }
}

pub type MessageAttributes = BTreeMap<String, AttributeValue>;

/// A reservation request as it travels the queue. `group_id` is the
/// conversation's correlation id: ordering is strict within one group and
/// unspecified across groups. `dedupe_id` is freshly generated per send, so
/// logically identical requests from distinct turns are never collapsed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub group_id: String,
    pub dedupe_id: String,
    /// Free-text summary; not machine-parsed by the consumer.
    pub body: String,
    pub attributes: MessageAttributes,
}

/// Claim handle for one received message. Acknowledging with a stale claim
/// token is rejected, which keeps a redelivered message from being acked by
/// the worker that lost it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub message_id: String,
    pub claim_token: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueuedDelivery {
    pub receipt: DeliveryReceipt,
    pub message: QueueMessage,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue unavailable: {0}")]
    Unavailable(String),
    #[error("queued message could not be decoded: {0}")]
    Decode(String),
    #[error("unknown or stale delivery receipt for message {0}")]
    StaleReceipt(String),
}

/// The work-queue boundary between the dialog engine (producer) and the
/// suggestion worker (consumer). Implementations guarantee FIFO delivery
/// within a `group_id` and at-least-once redelivery of unacknowledged
/// messages; nothing more.
#[async_trait]
pub trait FulfillmentQueue: Send + Sync {
    async fn send(&self, message: QueueMessage) -> Result<(), QueueError>;

    /// Claim up to `max_messages` visible messages. Only the head of each
    /// group is ever visible, so a slow consumer cannot reorder one
    /// conversation's requests.
    async fn receive(&self, max_messages: usize) -> Result<Vec<QueuedDelivery>, QueueError>;

    async fn acknowledge(&self, receipt: &DeliveryReceipt) -> Result<(), QueueError>;
}
