use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::slots::SlotSet;

/// Which phase of the dialog the runtime is invoking: per-turn slot
/// validation, or the final fulfillment call once every required slot is
/// filled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvocationSource {
    DialogCodeHook,
    FulfillmentCodeHook,
}

/// One inbound request from the dialog runtime. Turns are never persisted;
/// everything the engine needs arrives in the payload and state lives in the
/// runtime's replayed `slots`/`session_attributes`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogTurn {
    pub invocation_source: InvocationSource,
    pub intent_name: String,
    pub slots: SlotSet,
    /// Opaque pass-through: echoed back unchanged on every directive.
    pub session_attributes: BTreeMap<String, String>,
    /// Correlation id tying the eventual queue message group to this
    /// conversation.
    pub originating_request_id: String,
}

impl DialogTurn {
    /// Copy-with-override for re-elicitation: same turn, one slot unset.
    pub fn with_cleared_slot(&self, name: crate::domain::slots::SlotName) -> Self {
        Self { slots: self.slots.cleared(name), ..self.clone() }
    }
}
