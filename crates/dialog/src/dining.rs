use chrono::NaiveDate;
use tracing::info;

use concierge_core::validation::{validate_dining_slots, ValidationVerdict};
use concierge_core::{DialogDirective, DialogTurn, InvocationSource, ReservationRequest};
use concierge_fulfillment::RequestEmitter;

use crate::dispatcher::DialogError;

const FULFILLED_MESSAGE: &str = "Thanks, you're all set! You should receive my suggestions \
                                 via SMS or email in a few minutes!";

/// The dining suggestion state machine. During elicitation every present
/// slot is validated and the first violation forces a re-prompt for exactly
/// that slot; once the runtime moves to fulfillment, the collected slots
/// become a queued reservation request.
pub async fn handle_dining(
    turn: &DialogTurn,
    today: NaiveDate,
    emitter: &RequestEmitter,
) -> Result<DialogDirective, DialogError> {
    match turn.invocation_source {
        InvocationSource::DialogCodeHook => Ok(elicit_or_delegate(turn, today)),
        InvocationSource::FulfillmentCodeHook => fulfill(turn, emitter).await,
    }
}

fn elicit_or_delegate(turn: &DialogTurn, today: NaiveDate) -> DialogDirective {
    match validate_dining_slots(&turn.slots, today) {
        ValidationVerdict::Valid => DialogDirective::delegate(
            turn.session_attributes.clone(),
            &turn.intent_name,
            turn.slots.clone(),
        ),
        ValidationVerdict::Invalid { slot, message } => {
            info!(
                event_name = "dialog.slot_rejected",
                correlation_id = %turn.originating_request_id,
                slot = %slot,
                "re-eliciting invalid slot"
            );
            DialogDirective::elicit_slot(
                turn.session_attributes.clone(),
                &turn.intent_name,
                turn.slots.cleared(slot),
                slot,
                message,
            )
        }
    }
}

/// The runtime only calls fulfillment once every required slot is filled,
/// so building the request cannot normally fail. If the queue is down the
/// error propagates: no "you're all set" is ever returned for a request
/// that was not actually queued.
async fn fulfill(
    turn: &DialogTurn,
    emitter: &RequestEmitter,
) -> Result<DialogDirective, DialogError> {
    let request = ReservationRequest::from_slots(&turn.slots, &turn.originating_request_id)?;
    emitter.emit(&request).await?;

    Ok(DialogDirective::close(
        turn.session_attributes.clone(),
        &turn.intent_name,
        FULFILLED_MESSAGE,
    ))
}
