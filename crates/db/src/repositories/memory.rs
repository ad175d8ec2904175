use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use concierge_core::domain::restaurant::{Restaurant, RestaurantId};
use concierge_core::queue::{
    DeliveryReceipt, FulfillmentQueue, QueueError, QueueMessage, QueuedDelivery,
};

use super::{RepositoryError, RestaurantRepository};

#[derive(Default)]
pub struct InMemoryRestaurantRepository {
    restaurants: RwLock<HashMap<String, Restaurant>>,
}

#[async_trait::async_trait]
impl RestaurantRepository for InMemoryRestaurantRepository {
    async fn find_by_id(&self, id: &RestaurantId) -> Result<Option<Restaurant>, RepositoryError> {
        let restaurants = self.restaurants.read().await;
        Ok(restaurants.get(&id.0).cloned())
    }

    async fn save(&self, restaurant: Restaurant) -> Result<(), RepositoryError> {
        let mut restaurants = self.restaurants.write().await;
        restaurants.insert(restaurant.id.0.clone(), restaurant);
        Ok(())
    }

    async fn delete(&self, id: &RestaurantId) -> Result<(), RepositoryError> {
        let mut restaurants = self.restaurants.write().await;
        restaurants.remove(&id.0);
        Ok(())
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let restaurants = self.restaurants.read().await;
        Ok(restaurants.len() as i64)
    }
}

struct StoredMessage {
    id: String,
    seq: u64,
    claim: Option<Claim>,
    message: QueueMessage,
}

struct Claim {
    token: String,
    claimed_at: Instant,
}

#[derive(Default)]
struct QueueState {
    next_seq: u64,
    items: Vec<StoredMessage>,
}

/// In-process fulfillment queue with the same delivery semantics as the
/// sqlite implementation: group-head visibility, claim expiry redelivery,
/// no dedupe across distinct dedupe ids.
pub struct InMemoryFulfillmentQueue {
    visibility_timeout: Duration,
    state: Mutex<QueueState>,
}

impl Default for InMemoryFulfillmentQueue {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl InMemoryFulfillmentQueue {
    pub fn new(visibility_timeout: Duration) -> Self {
        Self { visibility_timeout, state: Mutex::new(QueueState::default()) }
    }

    pub async fn depth(&self) -> usize {
        self.state.lock().await.items.len()
    }
}

#[async_trait::async_trait]
impl FulfillmentQueue for InMemoryFulfillmentQueue {
    async fn send(&self, message: QueueMessage) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        state.next_seq += 1;
        let seq = state.next_seq;
        state.items.push(StoredMessage {
            id: Uuid::new_v4().to_string(),
            seq,
            claim: None,
            message,
        });
        Ok(())
    }

    async fn receive(&self, max_messages: usize) -> Result<Vec<QueuedDelivery>, QueueError> {
        let mut state = self.state.lock().await;

        for item in &mut state.items {
            if item
                .claim
                .as_ref()
                .is_some_and(|claim| claim.claimed_at.elapsed() >= self.visibility_timeout)
            {
                item.claim = None;
            }
        }

        state.items.sort_by_key(|item| item.seq);

        let mut blocked_groups = Vec::new();
        let mut deliveries = Vec::new();
        for item in &mut state.items {
            if deliveries.len() == max_messages {
                break;
            }
            if blocked_groups.contains(&item.message.group_id) {
                continue;
            }
            // First unfinished message seen for a group is its head; it
            // blocks the rest of the group whether or not we can claim it.
            blocked_groups.push(item.message.group_id.clone());
            if item.claim.is_some() {
                continue;
            }

            let token = Uuid::new_v4().to_string();
            item.claim = Some(Claim { token: token.clone(), claimed_at: Instant::now() });
            deliveries.push(QueuedDelivery {
                receipt: DeliveryReceipt { message_id: item.id.clone(), claim_token: token },
                message: item.message.clone(),
            });
        }

        Ok(deliveries)
    }

    async fn acknowledge(&self, receipt: &DeliveryReceipt) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;

        let position = state.items.iter().position(|item| {
            item.id == receipt.message_id
                && item
                    .claim
                    .as_ref()
                    .is_some_and(|claim| claim.token == receipt.claim_token)
        });

        match position {
            Some(index) => {
                state.items.remove(index);
                Ok(())
            }
            None => Err(QueueError::StaleReceipt(receipt.message_id.clone())),
        }
    }
}
