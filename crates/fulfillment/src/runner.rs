use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use concierge_core::queue::{FulfillmentQueue, QueueError};

use crate::worker::{SuggestionWorker, WorkerError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub batch_size: usize,
    pub idle_backoff_ms: u64,
    pub max_idle_backoff_ms: u64,
    pub max_receive_retries: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            batch_size: 10,
            idle_backoff_ms: 250,
            max_idle_backoff_ms: 5_000,
            max_receive_retries: 5,
        }
    }
}

impl PollPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms =
            self.idle_backoff_ms.saturating_mul(multiplier).min(self.max_idle_backoff_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Polls the fulfillment queue and feeds deliveries through the suggestion
/// worker. Acknowledgement policy: processed or malformed messages are
/// acked; delivery failures leave the claim to expire so the queue
/// redelivers (at-least-once, duplicate emails accepted).
pub struct WorkerRunner {
    queue: Arc<dyn FulfillmentQueue>,
    worker: Arc<SuggestionWorker>,
    policy: PollPolicy,
}

impl WorkerRunner {
    pub fn new(
        queue: Arc<dyn FulfillmentQueue>,
        worker: Arc<SuggestionWorker>,
        policy: PollPolicy,
    ) -> Self {
        Self { queue, worker, policy }
    }

    /// Run until the queue transport fails more than `max_receive_retries`
    /// times in a row. Transient emptiness backs off exponentially; any
    /// successful poll resets both counters.
    pub async fn run(&self) -> Result<(), QueueError> {
        let mut idle_polls: u32 = 0;
        let mut receive_failures: u32 = 0;

        loop {
            match self.poll_once().await {
                Ok(0) => {
                    idle_polls = idle_polls.saturating_add(1);
                    receive_failures = 0;
                    let delay = self.policy.backoff(idle_polls.saturating_sub(1));
                    debug!(idle_polls, delay_ms = delay.as_millis() as u64, "queue idle");
                    tokio::time::sleep(delay).await;
                }
                Ok(processed) => {
                    idle_polls = 0;
                    receive_failures = 0;
                    debug!(processed, "processed fulfillment deliveries");
                }
                Err(error) => {
                    receive_failures += 1;
                    warn!(
                        attempt = receive_failures,
                        max_retries = self.policy.max_receive_retries,
                        error = %error,
                        "fulfillment queue receive failed"
                    );
                    if receive_failures > self.policy.max_receive_retries {
                        warn!(
                            max_retries = self.policy.max_receive_retries,
                            "queue retries exhausted; stopping worker runner"
                        );
                        return Err(error);
                    }
                    tokio::time::sleep(self.policy.backoff(receive_failures - 1)).await;
                }
            }
        }
    }

    /// Process everything currently visible, once. Used by tests and the
    /// operator CLI; returns the number of deliveries handled.
    pub async fn drain(&self) -> Result<usize, QueueError> {
        let mut total = 0;
        loop {
            let processed = self.poll_once().await?;
            if processed == 0 {
                return Ok(total);
            }
            total += processed;
        }
    }

    async fn poll_once(&self) -> Result<usize, QueueError> {
        let deliveries = self.queue.receive(self.policy.batch_size).await?;
        let count = deliveries.len();

        for delivery in deliveries {
            let group_id = delivery.message.group_id.clone();
            match self.worker.process(&delivery.message).await {
                Ok(outcome) => {
                    info!(
                        event_name = "worker.delivery_processed",
                        correlation_id = %group_id,
                        outcome = ?outcome,
                        "fulfillment delivery processed"
                    );
                    if let Err(error) = self.queue.acknowledge(&delivery.receipt).await {
                        // The message will redeliver and a duplicate email
                        // may go out; accepted at-least-once behavior.
                        warn!(
                            event_name = "worker.ack_failed",
                            correlation_id = %group_id,
                            error = %error,
                            "failed to acknowledge processed delivery"
                        );
                    }
                }
                Err(WorkerError::Malformed(error)) => {
                    warn!(
                        event_name = "worker.delivery_dropped",
                        correlation_id = %group_id,
                        error = %error,
                        "dropping undecodable fulfillment message"
                    );
                    if let Err(error) = self.queue.acknowledge(&delivery.receipt).await {
                        warn!(
                            event_name = "worker.ack_failed",
                            correlation_id = %group_id,
                            error = %error,
                            "failed to drop undecodable message"
                        );
                    }
                }
                Err(WorkerError::Delivery(error)) => {
                    warn!(
                        event_name = "worker.delivery_deferred",
                        correlation_id = %group_id,
                        error = %error,
                        "email delivery failed; leaving message for redelivery"
                    );
                }
            }
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use concierge_core::queue::{AttributeValue, FulfillmentQueue, QueueMessage};
    use concierge_core::{ReservationRequest, SlotName, SlotSet, SlotValue};
    use concierge_db::repositories::{InMemoryFulfillmentQueue, InMemoryRestaurantRepository};

    use crate::notify::{InMemoryEmailTransport, Notifier};
    use crate::search::InMemorySearchIndex;
    use crate::worker::SuggestionWorker;

    use super::{PollPolicy, WorkerRunner};

    fn queued_request(cuisine: &str, group_id: &str) -> QueueMessage {
        let mut slots = SlotSet::default();
        slots.set(SlotName::Location, Some(SlotValue::verbatim("new york")));
        slots.set(SlotName::Cuisine, Some(SlotValue::verbatim(cuisine)));
        slots.set(SlotName::Date, Some(SlotValue::verbatim("2024-03-16")));
        slots.set(SlotName::Time, Some(SlotValue::verbatim("19:00")));
        slots.set(SlotName::Count, Some(SlotValue::verbatim("2")));
        slots.set(SlotName::Phone, Some(SlotValue::verbatim("+12125550123")));
        slots.set(SlotName::Email, Some(SlotValue::verbatim("diner@example.com")));
        ReservationRequest::from_slots(&slots, group_id)
            .expect("request builds")
            .to_queue_message()
    }

    fn runner(
        queue: Arc<InMemoryFulfillmentQueue>,
        transport: Arc<InMemoryEmailTransport>,
    ) -> WorkerRunner {
        let worker = Arc::new(SuggestionWorker::new(
            Arc::new(InMemorySearchIndex::default()),
            Arc::new(InMemoryRestaurantRepository::default()),
            Notifier::new(transport, "Your suggestion"),
        ));
        WorkerRunner::new(queue, worker, PollPolicy::default())
    }

    #[tokio::test]
    async fn drain_processes_and_acknowledges_every_visible_message() {
        let queue = Arc::new(InMemoryFulfillmentQueue::default());
        queue.send(queued_request("thai", "conv-1")).await.expect("send");
        queue.send(queued_request("indian", "conv-2")).await.expect("send");

        let transport = Arc::new(InMemoryEmailTransport::default());
        let processed = runner(queue.clone(), transport.clone()).drain().await.expect("drain");

        assert_eq!(processed, 2);
        assert_eq!(queue.depth().await, 0);
        assert_eq!(transport.sent().await.len(), 2);
    }

    #[tokio::test]
    async fn delivery_failures_leave_the_message_queued() {
        let queue = Arc::new(InMemoryFulfillmentQueue::new(Duration::from_secs(60)));
        queue.send(queued_request("thai", "conv-1")).await.expect("send");

        let transport = Arc::new(InMemoryEmailTransport::rejecting());
        let processed = runner(queue.clone(), transport).drain().await.expect("drain");

        // The delivery was attempted but not acknowledged.
        assert_eq!(processed, 1);
        assert_eq!(queue.depth().await, 1);
    }

    #[tokio::test]
    async fn malformed_messages_are_dropped_without_email() {
        let queue = Arc::new(InMemoryFulfillmentQueue::default());
        let mut message = queued_request("thai", "conv-1");
        message.attributes.insert("count".to_string(), AttributeValue::String("NaN".to_string()));
        queue.send(message).await.expect("send");

        let transport = Arc::new(InMemoryEmailTransport::default());
        let processed = runner(queue.clone(), transport.clone()).drain().await.expect("drain");

        assert_eq!(processed, 1);
        assert_eq!(queue.depth().await, 0, "poison message should be dropped");
        assert!(transport.sent().await.is_empty());
    }
}
