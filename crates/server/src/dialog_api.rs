//! HTTP boundary for the dialog runtime: one POST per conversational turn,
//! one directive per response. The wire shapes here follow the runtime's
//! camelCase envelope; everything else in the workspace speaks the core
//! types.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::warn;

use concierge_core::{
    DialogDirective, DialogTurn, FulfillmentState, InvocationSource, SlotName, SlotSet, SlotValue,
};
use concierge_dialog::{DialogError, Dispatcher};

#[derive(Clone)]
pub struct DialogState {
    dispatcher: Arc<Dispatcher>,
}

pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/v1/dialog", post(post_dialog))
        .with_state(DialogState { dispatcher })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    invocation_source: InvocationSource,
    request_id: String,
    #[serde(default)]
    session_attributes: Option<BTreeMap<String, String>>,
    current_intent: WireIntent,
}

#[derive(Debug, Deserialize)]
pub struct WireIntent {
    name: String,
    #[serde(default)]
    slots: BTreeMap<String, Option<WireSlotValue>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSlotValue {
    raw_value: String,
    #[serde(default)]
    interpreted_value: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveResponse {
    session_attributes: BTreeMap<String, String>,
    dialog_action: WireDialogAction,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireDialogAction {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    intent_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    slots: Option<BTreeMap<String, Option<WireSlotValue>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    slot_to_elicit: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fulfillment_state: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<WireMessage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    content_type: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub correlation_id: String,
}

impl TurnRequest {
    fn into_turn(self) -> DialogTurn {
        let mut slots = SlotSet::default();
        for (name, value) in self.current_intent.slots {
            // Slots outside the dining model are not part of any directive
            // we produce; ignore them rather than failing the turn.
            let Some(slot) = SlotName::from_wire(&name) else {
                continue;
            };
            let value = value.map(|value| {
                let interpreted =
                    value.interpreted_value.unwrap_or_else(|| value.raw_value.clone());
                SlotValue { raw: value.raw_value, interpreted }
            });
            slots.set(slot, value);
        }

        DialogTurn {
            invocation_source: self.invocation_source,
            intent_name: self.current_intent.name,
            slots,
            session_attributes: self.session_attributes.unwrap_or_default(),
            originating_request_id: self.request_id,
        }
    }
}

fn wire_slots(slots: &SlotSet) -> BTreeMap<String, Option<WireSlotValue>> {
    SlotName::ALL
        .iter()
        .map(|name| {
            let value = slots.get(*name).map(|value| WireSlotValue {
                raw_value: value.raw.clone(),
                interpreted_value: Some(value.interpreted.clone()),
            });
            (name.as_str().to_string(), value)
        })
        .collect()
}

fn wire_message(content: String) -> WireMessage {
    WireMessage { content_type: "PlainText", content }
}

impl From<DialogDirective> for DirectiveResponse {
    fn from(directive: DialogDirective) -> Self {
        match directive {
            DialogDirective::ElicitSlot {
                session_attributes,
                intent_name,
                slots,
                slot_to_elicit,
                message,
            } => Self {
                session_attributes,
                dialog_action: WireDialogAction {
                    kind: "ElicitSlot",
                    intent_name: Some(intent_name),
                    slots: Some(wire_slots(&slots)),
                    slot_to_elicit: Some(slot_to_elicit.as_str()),
                    fulfillment_state: None,
                    message: Some(wire_message(message)),
                },
            },
            DialogDirective::ConfirmIntent { session_attributes, intent_name, slots, message } => {
                Self {
                    session_attributes,
                    dialog_action: WireDialogAction {
                        kind: "ConfirmIntent",
                        intent_name: Some(intent_name),
                        slots: Some(wire_slots(&slots)),
                        slot_to_elicit: None,
                        fulfillment_state: None,
                        message: Some(wire_message(message)),
                    },
                }
            }
            DialogDirective::Delegate { session_attributes, intent_name, slots } => Self {
                session_attributes,
                dialog_action: WireDialogAction {
                    kind: "Delegate",
                    intent_name: Some(intent_name),
                    slots: Some(wire_slots(&slots)),
                    slot_to_elicit: None,
                    fulfillment_state: None,
                    message: None,
                },
            },
            DialogDirective::Close {
                session_attributes,
                intent_name,
                fulfillment_state,
                message,
            } => Self {
                session_attributes,
                dialog_action: WireDialogAction {
                    kind: "Close",
                    intent_name: Some(intent_name),
                    slots: None,
                    slot_to_elicit: None,
                    fulfillment_state: Some(match fulfillment_state {
                        FulfillmentState::Fulfilled => "Fulfilled",
                    }),
                    message: Some(wire_message(message)),
                },
            },
        }
    }
}

pub async fn post_dialog(
    State(state): State<DialogState>,
    Json(request): Json<TurnRequest>,
) -> Result<Json<DirectiveResponse>, (StatusCode, Json<ErrorResponse>)> {
    let turn = request.into_turn();
    let correlation_id = turn.originating_request_id.clone();

    match state.dispatcher.dispatch(&turn).await {
        Ok(directive) => Ok(Json(directive.into())),
        Err(error) => {
            warn!(
                event_name = "dialog.turn_failed",
                correlation_id = %correlation_id,
                error = %error,
                "dialog turn produced no directive"
            );
            let status = match &error {
                DialogError::UnsupportedIntent { .. }
                | DialogError::IncompleteFulfillment(_) => StatusCode::UNPROCESSABLE_ENTITY,
                DialogError::Emit(_) => StatusCode::BAD_GATEWAY,
            };
            Err((status, Json(ErrorResponse { error: error.to_string(), correlation_id })))
        }
    }
}
