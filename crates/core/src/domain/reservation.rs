use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::slots::{SlotName, SlotSet};
use crate::queue::{AttributeValue, MessageAttributes, QueueMessage};
use crate::validation;

/// Wire shape for the `date` message attribute.
pub const DATE_WIRE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BuildRequestError {
    #[error("slot `{slot}` is required for fulfillment but was not collected")]
    MissingSlot { slot: SlotName },
    #[error("slot `{slot}` value `{value}` is not usable for fulfillment")]
    UnusableSlot { slot: SlotName, value: String },
}

#[derive(Debug, Error)]
pub enum MessageDecodeError {
    #[error("message attribute `{0}` is missing")]
    MissingAttribute(&'static str),
    #[error("message attribute `{name}` holds unusable value `{value}`")]
    InvalidAttribute { name: &'static str, value: String },
}

/// The fully-validated output of a completed dialog, queued for
/// asynchronous fulfillment. Built once per fulfilled dialog, emitted once,
/// never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRequest {
    pub location: String,
    pub cuisine: String,
    pub date: NaiveDate,
    pub time: String,
    pub party_size: u8,
    pub phone: String,
    pub email: String,
    /// Conversation correlation id; queue ordering group.
    pub group_id: String,
    /// Fresh per construction, so two completed dialogs with identical
    /// details are never deduplicated against each other.
    pub dedupe_id: String,
}

impl ReservationRequest {
    /// Build a request from a completed slot set. The dialog runtime only
    /// invokes fulfillment once every required slot is filled, so a missing
    /// or unusable slot here means the runtime contract was violated and the
    /// turn must fail loudly.
    pub fn from_slots(
        slots: &SlotSet,
        group_id: impl Into<String>,
    ) -> Result<Self, BuildRequestError> {
        let date_text = required(slots, SlotName::Date)?;
        let date = validation::parse_reservation_date(&date_text).ok_or_else(|| {
            BuildRequestError::UnusableSlot { slot: SlotName::Date, value: date_text.clone() }
        })?;

        let count_text = required(slots, SlotName::Count)?;
        let party_size = count_text
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|count| (1..=8).contains(count))
            .ok_or_else(|| BuildRequestError::UnusableSlot {
                slot: SlotName::Count,
                value: count_text.clone(),
            })?;

        Ok(Self {
            location: required(slots, SlotName::Location)?,
            cuisine: required(slots, SlotName::Cuisine)?,
            date,
            time: required(slots, SlotName::Time)?,
            party_size,
            phone: required(slots, SlotName::Phone)?,
            email: required(slots, SlotName::Email)?,
            group_id: group_id.into(),
            dedupe_id: Uuid::new_v4().to_string(),
        })
    }

    /// Every field as a typed message attribute, so the consumer can filter
    /// and route without touching the body.
    pub fn attributes(&self) -> MessageAttributes {
        let mut attributes = MessageAttributes::new();
        attributes.insert("location".to_string(), AttributeValue::String(self.location.clone()));
        attributes.insert("cuisine".to_string(), AttributeValue::String(self.cuisine.clone()));
        attributes.insert(
            "date".to_string(),
            AttributeValue::String(self.date.format(DATE_WIRE_FORMAT).to_string()),
        );
        attributes.insert("time".to_string(), AttributeValue::String(self.time.clone()));
        attributes.insert("count".to_string(), AttributeValue::Number(i64::from(self.party_size)));
        attributes.insert("phone".to_string(), AttributeValue::String(self.phone.clone()));
        attributes.insert("email".to_string(), AttributeValue::String(self.email.clone()));
        attributes
    }

    pub fn to_queue_message(&self) -> QueueMessage {
        QueueMessage {
            group_id: self.group_id.clone(),
            dedupe_id: self.dedupe_id.clone(),
            body: format!("{} suggestion requested for {}", self.cuisine, self.location),
            attributes: self.attributes(),
        }
    }

    /// Re-extract a request from its queued form. Inverse of
    /// `to_queue_message` for every field.
    pub fn from_message(message: &QueueMessage) -> Result<Self, MessageDecodeError> {
        let date_text = string_attribute(message, "date")?;
        let date = NaiveDate::parse_from_str(&date_text, DATE_WIRE_FORMAT).map_err(|_| {
            MessageDecodeError::InvalidAttribute { name: "date", value: date_text.clone() }
        })?;

        let count = message
            .attributes
            .get("count")
            .ok_or(MessageDecodeError::MissingAttribute("count"))?;
        let party_size = count
            .as_i64()
            .and_then(|count| u8::try_from(count).ok())
            .filter(|count| (1..=8).contains(count))
            .ok_or_else(|| MessageDecodeError::InvalidAttribute {
                name: "count",
                value: format!("{count:?}"),
            })?;

        Ok(Self {
            location: string_attribute(message, "location")?,
            cuisine: string_attribute(message, "cuisine")?,
            date,
            time: string_attribute(message, "time")?,
            party_size,
            phone: string_attribute(message, "phone")?,
            email: string_attribute(message, "email")?,
            group_id: message.group_id.clone(),
            dedupe_id: message.dedupe_id.clone(),
        })
    }
}

fn required(slots: &SlotSet, slot: SlotName) -> Result<String, BuildRequestError> {
    slots
        .interpreted(slot)
        .map(str::to_string)
        .ok_or(BuildRequestError::MissingSlot { slot })
}

fn string_attribute(
    message: &QueueMessage,
    name: &'static str,
) -> Result<String, MessageDecodeError> {
    message
        .attributes
        .get(name)
        .ok_or(MessageDecodeError::MissingAttribute(name))?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| MessageDecodeError::InvalidAttribute {
            name,
            value: "non-string attribute".to_string(),
        })
}
