use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use concierge_core::queue::{FulfillmentQueue, QueueError};
use concierge_core::ReservationRequest;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("fulfillment queue unavailable: {0}")]
    QueueUnavailable(#[from] QueueError),
}

/// Serializes a completed reservation request onto the work queue. Emission
/// is not retried here: if the queue is unreachable the error propagates and
/// the dialog turn fails loudly, so the diner is never told a request was
/// queued when it was not. Redelivery is the queue's job, not this one's.
#[derive(Clone)]
pub struct RequestEmitter {
    queue: Arc<dyn FulfillmentQueue>,
}

impl RequestEmitter {
    pub fn new(queue: Arc<dyn FulfillmentQueue>) -> Self {
        Self { queue }
    }

    pub async fn emit(&self, request: &ReservationRequest) -> Result<(), EmitError> {
        let message = request.to_queue_message();
        self.queue.send(message).await?;

        info!(
            event_name = "fulfillment.request_emitted",
            correlation_id = %request.group_id,
            dedupe_id = %request.dedupe_id,
            cuisine = %request.cuisine,
            location = %request.location,
            "reservation request queued for fulfillment"
        );
        Ok(())
    }
}
