use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use concierge_core::domain::reservation::MessageDecodeError;
use concierge_core::queue::QueueMessage;
use concierge_core::ReservationRequest;
use concierge_db::repositories::RestaurantRepository;

use crate::notify::{DeliveryError, MessageId, Notifier};
use crate::search::SearchIndex;

#[derive(Debug, Error)]
pub enum WorkerError {
    /// The queued message cannot be turned back into a request. The runner
    /// drops such messages after logging; redelivering them would loop
    /// forever.
    #[error("queued message is malformed: {0}")]
    Malformed(#[from] MessageDecodeError),
    /// The email transport rejected the send. The delivery stays
    /// unacknowledged so the queue redelivers it.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessOutcome {
    Suggested(MessageId),
    Apologized(MessageId),
}

/// Consumes queued reservation requests: query the index by cuisine,
/// resolve the top hit against the restaurant store, notify the diner.
/// Every degraded path (no hits, unreachable index, store miss) lands on
/// the apology notification rather than an error; only delivery failures
/// and undecodable messages surface to the runner.
pub struct SuggestionWorker {
    search: Arc<dyn SearchIndex>,
    restaurants: Arc<dyn RestaurantRepository>,
    notifier: Notifier,
}

impl SuggestionWorker {
    pub fn new(
        search: Arc<dyn SearchIndex>,
        restaurants: Arc<dyn RestaurantRepository>,
        notifier: Notifier,
    ) -> Self {
        Self { search, restaurants, notifier }
    }

    pub async fn process(&self, message: &QueueMessage) -> Result<ProcessOutcome, WorkerError> {
        let request = ReservationRequest::from_message(message)?;

        let hits = match self.search.search_by_cuisine(&request.cuisine).await {
            Ok(hits) => hits,
            Err(error) => {
                warn!(
                    event_name = "worker.search_degraded",
                    correlation_id = %request.group_id,
                    cuisine = %request.cuisine,
                    error = %error,
                    "search index unavailable; falling back to apology"
                );
                return self.apologize(&request).await;
            }
        };

        let Some(top_id) = hits.top_id.filter(|_| hits.total > 0) else {
            info!(
                event_name = "worker.no_hits",
                correlation_id = %request.group_id,
                cuisine = %request.cuisine,
                "no indexed restaurants match the requested cuisine"
            );
            return self.apologize(&request).await;
        };

        let restaurant = match self.restaurants.find_by_id(&top_id).await {
            Ok(Some(restaurant)) => restaurant,
            Ok(None) => {
                warn!(
                    event_name = "worker.lookup_miss",
                    correlation_id = %request.group_id,
                    restaurant_id = %top_id,
                    "top hit is not present in the restaurant store"
                );
                return self.apologize(&request).await;
            }
            Err(error) => {
                warn!(
                    event_name = "worker.store_degraded",
                    correlation_id = %request.group_id,
                    restaurant_id = %top_id,
                    error = %error,
                    "restaurant store unavailable; falling back to apology"
                );
                return self.apologize(&request).await;
            }
        };

        let message_id = self.notifier.send_suggestion(&restaurant, &request).await?;
        Ok(ProcessOutcome::Suggested(message_id))
    }

    async fn apologize(&self, request: &ReservationRequest) -> Result<ProcessOutcome, WorkerError> {
        let message_id = self.notifier.send_apology(request).await?;
        Ok(ProcessOutcome::Apologized(message_id))
    }
}
