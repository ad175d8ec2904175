use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use concierge_core::domain::reservation::BuildRequestError;
use concierge_core::{DialogDirective, DialogTurn};
use concierge_fulfillment::{EmitError, RequestEmitter};

use crate::clock::Clock;
use crate::dining::handle_dining;

pub const GREETING_INTENT: &str = "GreetingIntent";
pub const THANK_YOU_INTENT: &str = "ThankYouIntent";
pub const DINING_SUGGESTION_INTENT: &str = "DiningSuggestionIntent";

const GREETING_MESSAGE: &str = "Hi there, how can I help you?";
const THANK_YOU_MESSAGE: &str = "Thanks for chatting with me!";

#[derive(Debug, Error)]
pub enum DialogError {
    /// Fatal for the turn: no directive is produced and the runtime sees an
    /// error response.
    #[error("intent `{intent_name}` is not supported")]
    UnsupportedIntent { intent_name: String },
    /// Fulfillment was invoked before every required slot was collected,
    /// which breaks the runtime contract.
    #[error("fulfillment invoked with unusable slots: {0}")]
    IncompleteFulfillment(#[from] BuildRequestError),
    #[error(transparent)]
    Emit(#[from] EmitError),
}

/// Routes one inbound dialog turn to its intent handler. Holds no dialog
/// state of its own: everything it needs is in the turn payload, and the
/// runtime serializes turns within a conversation.
pub struct Dispatcher {
    emitter: RequestEmitter,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    pub fn new(emitter: RequestEmitter, clock: Arc<dyn Clock>) -> Self {
        Self { emitter, clock }
    }

    pub async fn dispatch(&self, turn: &DialogTurn) -> Result<DialogDirective, DialogError> {
        debug!(
            event_name = "dialog.turn_received",
            correlation_id = %turn.originating_request_id,
            intent_name = %turn.intent_name,
            invocation_source = ?turn.invocation_source,
            "dispatching dialog turn"
        );

        match turn.intent_name.as_str() {
            GREETING_INTENT => Ok(DialogDirective::close(
                turn.session_attributes.clone(),
                &turn.intent_name,
                GREETING_MESSAGE,
            )),
            // Deliberately the same shape as the greeting: a plain close.
            THANK_YOU_INTENT => Ok(DialogDirective::close(
                turn.session_attributes.clone(),
                &turn.intent_name,
                THANK_YOU_MESSAGE,
            )),
            DINING_SUGGESTION_INTENT => {
                handle_dining(turn, self.clock.today(), &self.emitter).await
            }
            _ => Err(DialogError::UnsupportedIntent { intent_name: turn.intent_name.clone() }),
        }
    }
}
