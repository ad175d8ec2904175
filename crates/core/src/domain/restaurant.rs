use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identifier assigned at ingestion time, unique per restaurant and
/// stable across updates.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RestaurantId(pub String);

impl std::fmt::Display for RestaurantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A restaurant record as stored and as resolved for a suggestion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    pub name: String,
    pub cuisine: String,
    pub location: String,
    /// Ordered address lines; notifications use the first one.
    pub display_address: Vec<String>,
    pub inserted_at: DateTime<Utc>,
}

impl Restaurant {
    pub fn display_address_line(&self) -> &str {
        self.display_address.first().map(String::as_str).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{Restaurant, RestaurantId};

    #[test]
    fn first_address_line_is_used_for_display() {
        let restaurant = Restaurant {
            id: RestaurantId("r-1".to_string()),
            name: "Trattoria Romana".to_string(),
            cuisine: "italian".to_string(),
            location: "new york".to_string(),
            display_address: vec!["12 Mulberry St".to_string(), "New York, NY 10013".to_string()],
            inserted_at: Utc::now(),
        };

        assert_eq!(restaurant.display_address_line(), "12 Mulberry St");
    }

    #[test]
    fn missing_address_lines_render_empty() {
        let restaurant = Restaurant {
            id: RestaurantId("r-2".to_string()),
            name: "Nameless".to_string(),
            cuisine: "thai".to_string(),
            location: "boston".to_string(),
            display_address: Vec::new(),
            inserted_at: Utc::now(),
        };

        assert_eq!(restaurant.display_address_line(), "");
    }
}
