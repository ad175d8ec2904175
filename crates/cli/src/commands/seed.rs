use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use concierge_core::config::{AppConfig, LoadOptions};
use concierge_core::{Restaurant, RestaurantId};
use concierge_db::repositories::{RestaurantRepository, SqlRestaurantRepository};
use concierge_db::{connect_with_settings, migrations};
use concierge_fulfillment::{HttpSearchIndex, SearchIndex};

use crate::commands::CommandResult;

/// One business listing as exported by the business-search API: only the
/// fields the store needs are read, everything else is ignored.
#[derive(Debug, Deserialize)]
pub struct Listing {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<ListingLocation>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListingLocation {
    #[serde(default)]
    pub display_address: Vec<String>,
}

impl Listing {
    fn into_restaurant(self, location: &str, cuisine: &str, now: DateTime<Utc>) -> Restaurant {
        Restaurant {
            id: RestaurantId(self.id),
            name: self.name,
            cuisine: cuisine.to_lowercase(),
            location: location.to_lowercase(),
            display_address: self.location.unwrap_or_default().display_address,
            inserted_at: now,
        }
    }
}

/// Upsert every listing through the repository; returns how many landed.
pub async fn ingest_listings(
    repository: &dyn RestaurantRepository,
    listings: Vec<Listing>,
    location: &str,
    cuisine: &str,
    now: DateTime<Utc>,
) -> Result<usize, String> {
    let mut ingested = 0;
    for listing in listings {
        let restaurant = listing.into_restaurant(location, cuisine, now);
        repository.save(restaurant).await.map_err(|error| error.to_string())?;
        ingested += 1;
    }
    Ok(ingested)
}

pub fn run(file: &Path, location: &str, cuisine: &str, mirror: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let raw = match fs::read_to_string(file) {
        Ok(raw) => raw,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "listing_file",
                format!("could not read `{}`: {error}", file.display()),
                2,
            );
        }
    };

    let listings: Vec<Listing> = match serde_json::from_str(&raw) {
        Ok(listings) => listings,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "listing_parse",
                format!("could not parse `{}`: {error}", file.display()),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let repository = SqlRestaurantRepository::new(pool.clone());
        let now = Utc::now();

        let mirror_ids: Vec<RestaurantId> = listings
            .iter()
            .map(|listing| RestaurantId(listing.id.clone()))
            .collect();

        let ingested = ingest_listings(&repository, listings, location, cuisine, now)
            .await
            .map_err(|error| ("seed_execution", error, 5u8))?;

        let mut mirrored = 0;
        if mirror {
            let index = HttpSearchIndex::new(&config.search)
                .map_err(|error| ("index_mirror", error.to_string(), 6u8))?;
            let indexed_cuisine = cuisine.to_lowercase();
            for id in &mirror_ids {
                index
                    .upsert_document(id, &indexed_cuisine)
                    .await
                    .map_err(|error| ("index_mirror", error.to_string(), 6u8))?;
                mirrored += 1;
            }
        }

        pool.close().await;
        Ok((ingested, mirrored))
    });

    match result {
        Ok((ingested, mirrored)) if mirror => CommandResult::success(
            "seed",
            format!("ingested {ingested} listings, mirrored {mirrored} search documents"),
        ),
        Ok((ingested, _)) => {
            CommandResult::success("seed", format!("ingested {ingested} listings"))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use concierge_core::RestaurantId;
    use concierge_db::repositories::{InMemoryRestaurantRepository, RestaurantRepository};

    use super::{ingest_listings, Listing};

    fn listings(raw: &str) -> Vec<Listing> {
        serde_json::from_str(raw).expect("listings should parse")
    }

    #[tokio::test]
    async fn listings_are_stamped_and_upserted() {
        let repository = InMemoryRestaurantRepository::default();
        let parsed = listings(
            r#"[
                {"id": "r-1", "name": "Trattoria Romana",
                 "location": {"display_address": ["12 Mulberry St", "New York, NY"]}},
                {"id": "r-2", "name": "Pasta Fresca", "rating": 4.5}
            ]"#,
        );

        let ingested = ingest_listings(&repository, parsed, "New York", "Italian", Utc::now())
            .await
            .expect("ingest");

        assert_eq!(ingested, 2);
        assert_eq!(repository.count().await.expect("count"), 2);

        let first = repository
            .find_by_id(&RestaurantId("r-1".to_string()))
            .await
            .expect("find")
            .expect("r-1 present");
        assert_eq!(first.cuisine, "italian");
        assert_eq!(first.location, "new york");
        assert_eq!(first.display_address_line(), "12 Mulberry St");

        // Listings without an address still ingest.
        let second = repository
            .find_by_id(&RestaurantId("r-2".to_string()))
            .await
            .expect("find")
            .expect("r-2 present");
        assert!(second.display_address.is_empty());
    }

    #[tokio::test]
    async fn re_ingesting_the_same_listing_updates_in_place() {
        let repository = InMemoryRestaurantRepository::default();
        let now = Utc::now();

        ingest_listings(
            &repository,
            listings(r#"[{"id": "r-1", "name": "Old Name"}]"#),
            "boston",
            "thai",
            now,
        )
        .await
        .expect("ingest");
        ingest_listings(
            &repository,
            listings(r#"[{"id": "r-1", "name": "New Name"}]"#),
            "boston",
            "thai",
            now,
        )
        .await
        .expect("re-ingest");

        assert_eq!(repository.count().await.expect("count"), 1);
        let restaurant = repository
            .find_by_id(&RestaurantId("r-1".to_string()))
            .await
            .expect("find")
            .expect("present");
        assert_eq!(restaurant.name, "New Name");
    }
}
