use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use concierge_core::config::EmailConfig;
use concierge_core::domain::reservation::DATE_WIRE_FORMAT;
use concierge_core::{Restaurant, ReservationRequest};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageId(pub String);

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("email transport rejected the send: {0}")]
    Transport(String),
    #[error("email API returned status {0}")]
    Status(u16),
}

/// One outbound email. Plain text only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, email: &Email) -> Result<MessageId, DeliveryError>;
}

/// Transactional-mail HTTP API client. Sender identity and credentials are
/// fixed by configuration.
pub struct HttpEmailTransport {
    client: reqwest::Client,
    api_url: String,
    api_key: SecretString,
    sender: String,
}

impl HttpEmailTransport {
    pub fn new(config: &EmailConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| DeliveryError::Transport(error.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            sender: config.sender.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

#[async_trait]
impl EmailTransport for HttpEmailTransport {
    async fn send(&self, email: &Email) -> Result<MessageId, DeliveryError> {
        let payload = json!({
            "from": self.sender,
            "to": [email.to],
            "subject": email.subject,
            "text": email.body,
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|error| DeliveryError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }

        let parsed: SendResponse = response
            .json()
            .await
            .map_err(|error| DeliveryError::Transport(error.to_string()))?;

        Ok(MessageId(parsed.id))
    }
}

/// Recording transport for tests: accepts (or rejects) every send and keeps
/// what it saw.
#[derive(Default)]
pub struct InMemoryEmailTransport {
    rejecting: bool,
    sent: Mutex<Vec<Email>>,
}

impl InMemoryEmailTransport {
    pub fn rejecting() -> Self {
        Self { rejecting: true, sent: Mutex::new(Vec::new()) }
    }

    pub async fn sent(&self) -> Vec<Email> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl EmailTransport for InMemoryEmailTransport {
    async fn send(&self, email: &Email) -> Result<MessageId, DeliveryError> {
        if self.rejecting {
            return Err(DeliveryError::Transport("transport configured to reject".to_string()));
        }
        let mut sent = self.sent.lock().await;
        sent.push(email.clone());
        Ok(MessageId(format!("mem-{}", sent.len())))
    }
}

/// Formats and sends exactly one email per invocation: a restaurant
/// suggestion, or an apology when no match could be resolved.
#[derive(Clone)]
pub struct Notifier {
    transport: Arc<dyn EmailTransport>,
    subject: String,
}

impl Notifier {
    pub fn new(transport: Arc<dyn EmailTransport>, subject: impl Into<String>) -> Self {
        Self { transport, subject: subject.into() }
    }

    pub async fn send_suggestion(
        &self,
        restaurant: &Restaurant,
        request: &ReservationRequest,
    ) -> Result<MessageId, DeliveryError> {
        let body = format!(
            "Hello! Here are my {cuisine} restaurant suggestions for {count} people, \
             for {date} at {time}: {name}, located at {address}.\n\
             Hope you enjoy your meal!",
            cuisine = request.cuisine,
            count = request.party_size,
            date = request.date.format(DATE_WIRE_FORMAT),
            time = request.time,
            name = restaurant.name,
            address = restaurant.display_address_line(),
        );

        let message_id = self
            .transport
            .send(&Email { to: request.email.clone(), subject: self.subject.clone(), body })
            .await?;

        info!(
            event_name = "notify.suggestion_sent",
            correlation_id = %request.group_id,
            message_id = %message_id.0,
            restaurant_id = %restaurant.id,
            "suggestion email sent"
        );
        Ok(message_id)
    }

    pub async fn send_apology(
        &self,
        request: &ReservationRequest,
    ) -> Result<MessageId, DeliveryError> {
        let body = format!(
            "Hi there, unfortunately we don't appear to have any suggestions for \
             {cuisine} in {location}, for {count} guests on {date} at {time}. \
             Please try again once more restaurants have been indexed.",
            cuisine = request.cuisine,
            location = request.location,
            count = request.party_size,
            date = request.date.format(DATE_WIRE_FORMAT),
            time = request.time,
        );

        let message_id = self
            .transport
            .send(&Email { to: request.email.clone(), subject: self.subject.clone(), body })
            .await?;

        info!(
            event_name = "notify.apology_sent",
            correlation_id = %request.group_id,
            message_id = %message_id.0,
            "no-match apology email sent"
        );
        Ok(message_id)
    }
}
