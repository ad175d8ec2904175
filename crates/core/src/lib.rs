pub mod config;
pub mod domain;
pub mod queue;
pub mod validation;

pub use chrono;

pub use domain::directive::{DialogDirective, FulfillmentState, SessionAttributes};
pub use domain::reservation::{BuildRequestError, MessageDecodeError, ReservationRequest};
pub use domain::restaurant::{Restaurant, RestaurantId};
pub use domain::slots::{SlotName, SlotSet, SlotValue};
pub use domain::turn::{DialogTurn, InvocationSource};
pub use queue::{
    AttributeValue, DeliveryReceipt, FulfillmentQueue, MessageAttributes, QueueError, QueueMessage,
    QueuedDelivery,
};
pub use validation::{validate_dining_slots, ValidationVerdict};
