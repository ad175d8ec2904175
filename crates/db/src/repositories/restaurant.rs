use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use concierge_core::domain::restaurant::{Restaurant, RestaurantId};

use super::{RepositoryError, RestaurantRepository};
use crate::DbPool;

pub struct SqlRestaurantRepository {
    pool: DbPool,
}

impl SqlRestaurantRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RestaurantRepository for SqlRestaurantRepository {
    async fn find_by_id(&self, id: &RestaurantId) -> Result<Option<Restaurant>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, cuisine, location, display_address_json, inserted_at
             FROM restaurant
             WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(restaurant_from_row).transpose()
    }

    async fn save(&self, restaurant: Restaurant) -> Result<(), RepositoryError> {
        let display_address_json = serde_json::to_string(&restaurant.display_address)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        sqlx::query(
            "INSERT INTO restaurant (id, name, cuisine, location, display_address_json, inserted_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                cuisine = excluded.cuisine,
                location = excluded.location,
                display_address_json = excluded.display_address_json,
                inserted_at = excluded.inserted_at",
        )
        .bind(&restaurant.id.0)
        .bind(&restaurant.name)
        .bind(&restaurant.cuisine)
        .bind(&restaurant.location)
        .bind(&display_address_json)
        .bind(restaurant.inserted_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &RestaurantId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM restaurant WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM restaurant")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("count"))
    }
}

fn restaurant_from_row(row: SqliteRow) -> Result<Restaurant, RepositoryError> {
    let display_address: Vec<String> =
        serde_json::from_str(&row.get::<String, _>("display_address_json"))
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

    let inserted_at = DateTime::parse_from_rfc3339(&row.get::<String, _>("inserted_at"))
        .map_err(|error| RepositoryError::Decode(error.to_string()))?
        .with_timezone(&Utc);

    Ok(Restaurant {
        id: RestaurantId(row.get::<String, _>("id")),
        name: row.get::<String, _>("name"),
        cuisine: row.get::<String, _>("cuisine"),
        location: row.get::<String, _>("location"),
        display_address,
        inserted_at,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use concierge_core::domain::restaurant::{Restaurant, RestaurantId};

    use crate::migrations;
    use crate::repositories::{RestaurantRepository, SqlRestaurantRepository};

    async fn repository() -> SqlRestaurantRepository {
        let pool = crate::connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        SqlRestaurantRepository::new(pool)
    }

    fn sample(id: &str) -> Restaurant {
        Restaurant {
            id: RestaurantId(id.to_string()),
            name: "Golden Wok".to_string(),
            cuisine: "chinese".to_string(),
            location: "new york".to_string(),
            display_address: vec!["88 Mott St".to_string(), "New York, NY 10013".to_string()],
            inserted_at: Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).single().expect("timestamp"),
        }
    }

    #[tokio::test]
    async fn save_and_find_round_trip() {
        let repository = repository().await;
        let restaurant = sample("r-1");

        repository.save(restaurant.clone()).await.expect("save");
        let found = repository.find_by_id(&restaurant.id).await.expect("find");

        assert_eq!(found, Some(restaurant));
    }

    #[tokio::test]
    async fn save_upserts_on_conflicting_id() {
        let repository = repository().await;
        let mut restaurant = sample("r-1");
        repository.save(restaurant.clone()).await.expect("save");

        restaurant.name = "Golden Wok II".to_string();
        repository.save(restaurant.clone()).await.expect("re-save");

        let found = repository.find_by_id(&restaurant.id).await.expect("find");
        assert_eq!(found.map(|restaurant| restaurant.name), Some("Golden Wok II".to_string()));
        assert_eq!(repository.count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn missing_id_resolves_to_none() {
        let repository = repository().await;
        let found =
            repository.find_by_id(&RestaurantId("ghost".to_string())).await.expect("find");
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn delete_removes_the_record() {
        let repository = repository().await;
        let restaurant = sample("r-1");
        repository.save(restaurant.clone()).await.expect("save");

        repository.delete(&restaurant.id).await.expect("delete");

        assert_eq!(repository.find_by_id(&restaurant.id).await.expect("find"), None);
        assert_eq!(repository.count().await.expect("count"), 0);
    }
}
