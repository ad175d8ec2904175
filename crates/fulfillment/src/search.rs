use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::sync::RwLock;

use concierge_core::config::SearchConfig;
use concierge_core::domain::restaurant::RestaurantId;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search index request failed: {0}")]
    Transport(String),
    #[error("search index returned status {0}")]
    Status(u16),
    #[error("search index response could not be decoded: {0}")]
    Decode(String),
}

/// What the worker consumes from a query response: the hit count and the
/// first hit's restaurant id. Nothing else in the response matters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchHits {
    pub total: u64,
    pub top_id: Option<RestaurantId>,
}

/// The cuisine-keyed search index. Queries are exact-term and case
/// sensitive against the indexed value; ordering is whatever the index
/// natively returns.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn search_by_cuisine(&self, cuisine: &str) -> Result<SearchHits, SearchError>;

    async fn upsert_document(&self, id: &RestaurantId, cuisine: &str) -> Result<(), SearchError>;

    async fn delete_document(&self, id: &RestaurantId) -> Result<(), SearchError>;
}

/// OpenSearch-compatible HTTP client.
pub struct HttpSearchIndex {
    client: reqwest::Client,
    base_url: String,
    index: String,
    username: String,
    password: SecretString,
}

impl HttpSearchIndex {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| SearchError::Transport(error.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            index: config.index.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn search_url(&self) -> String {
        format!("{}/{}/_search", self.base_url, self.index)
    }

    fn document_url(&self, id: &RestaurantId) -> String {
        format!("{}/{}/_doc/{}", self.base_url, self.index, id.0)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.username.is_empty() {
            request
        } else {
            request.basic_auth(&self.username, Some(self.password.expose_secret()))
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    total: HitsTotal,
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct HitsTotal {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: HitSource,
}

#[derive(Debug, Deserialize)]
struct HitSource {
    id: String,
}

#[async_trait]
impl SearchIndex for HttpSearchIndex {
    async fn search_by_cuisine(&self, cuisine: &str) -> Result<SearchHits, SearchError> {
        let query = json!({
            "query": {
                "term": {
                    "Cuisine": {
                        "value": cuisine
                    }
                }
            }
        });

        let response = self
            .authorize(self.client.post(self.search_url()))
            .json(&query)
            .send()
            .await
            .map_err(|error| SearchError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|error| SearchError::Decode(error.to_string()))?;

        Ok(SearchHits {
            total: parsed.hits.total.value,
            top_id: parsed.hits.hits.into_iter().next().map(|hit| RestaurantId(hit.source.id)),
        })
    }

    async fn upsert_document(&self, id: &RestaurantId, cuisine: &str) -> Result<(), SearchError> {
        let document = json!({ "id": id.0, "Cuisine": cuisine });

        let response = self
            .authorize(self.client.put(self.document_url(id)))
            .json(&document)
            .send()
            .await
            .map_err(|error| SearchError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }
        Ok(())
    }

    async fn delete_document(&self, id: &RestaurantId) -> Result<(), SearchError> {
        let response = self
            .authorize(self.client.delete(self.document_url(id)))
            .send()
            .await
            .map_err(|error| SearchError::Transport(error.to_string()))?;

        let status = response.status();
        // Deleting an already-absent document is not a failure.
        if !status.is_success() && status.as_u16() != 404 {
            return Err(SearchError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// In-process index with the same matching semantics as the HTTP client:
/// exact, case-sensitive cuisine match, insertion order as native order.
#[derive(Default)]
pub struct InMemorySearchIndex {
    documents: RwLock<Vec<(RestaurantId, String)>>,
}

impl InMemorySearchIndex {
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl SearchIndex for InMemorySearchIndex {
    async fn search_by_cuisine(&self, cuisine: &str) -> Result<SearchHits, SearchError> {
        let documents = self.documents.read().await;
        let matches: Vec<&(RestaurantId, String)> = documents
            .iter()
            .filter(|(_, indexed_cuisine)| indexed_cuisine == cuisine)
            .collect();

        Ok(SearchHits {
            total: matches.len() as u64,
            top_id: matches.first().map(|(id, _)| id.clone()),
        })
    }

    async fn upsert_document(&self, id: &RestaurantId, cuisine: &str) -> Result<(), SearchError> {
        let mut documents = self.documents.write().await;
        match documents.iter_mut().find(|(existing, _)| existing == id) {
            Some(entry) => entry.1 = cuisine.to_string(),
            None => documents.push((id.clone(), cuisine.to_string())),
        }
        Ok(())
    }

    async fn delete_document(&self, id: &RestaurantId) -> Result<(), SearchError> {
        let mut documents = self.documents.write().await;
        documents.retain(|(existing, _)| existing != id);
        Ok(())
    }
}
