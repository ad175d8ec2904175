use async_trait::async_trait;
use thiserror::Error;

use concierge_core::domain::restaurant::{Restaurant, RestaurantId};

pub mod memory;
pub mod queue;
pub mod restaurant;

pub use memory::{InMemoryFulfillmentQueue, InMemoryRestaurantRepository};
pub use queue::SqlFulfillmentQueue;
pub use restaurant::SqlRestaurantRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Keyed access to the restaurant store. The core only ever performs
/// single-key reads and writes; there are no scans, locks, or multi-record
/// transactions at this boundary.
#[async_trait]
pub trait RestaurantRepository: Send + Sync {
    async fn find_by_id(&self, id: &RestaurantId) -> Result<Option<Restaurant>, RepositoryError>;

    /// Insert or update; `id` is the stable key.
    async fn save(&self, restaurant: Restaurant) -> Result<(), RepositoryError>;

    async fn delete(&self, id: &RestaurantId) -> Result<(), RepositoryError>;

    async fn count(&self) -> Result<i64, RepositoryError>;
}
