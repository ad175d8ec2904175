use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::slots::{SlotName, SlotSet};

pub type SessionAttributes = BTreeMap<String, String>;

/// Terminal state reported on a `Close` directive. The engine never closes a
/// dialog as failed: business-rule violations become re-elicitations and
/// infrastructure failures propagate as errors instead of directives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FulfillmentState {
    Fulfilled,
}

/// The outbound decision for one dialog turn, consumed by the external
/// dialog runtime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogDirective {
    ElicitSlot {
        session_attributes: SessionAttributes,
        intent_name: String,
        slots: SlotSet,
        slot_to_elicit: SlotName,
        message: String,
    },
    ConfirmIntent {
        session_attributes: SessionAttributes,
        intent_name: String,
        slots: SlotSet,
        message: String,
    },
    Delegate {
        session_attributes: SessionAttributes,
        intent_name: String,
        slots: SlotSet,
    },
    Close {
        session_attributes: SessionAttributes,
        intent_name: String,
        fulfillment_state: FulfillmentState,
        message: String,
    },
}

impl DialogDirective {
    /// Re-prompt for exactly one named slot. The slot snapshot is echoed
    /// back unchanged apart from the target slot, which callers clear before
    /// building the directive.
    pub fn elicit_slot(
        session_attributes: SessionAttributes,
        intent_name: impl Into<String>,
        slots: SlotSet,
        slot_to_elicit: SlotName,
        message: impl Into<String>,
    ) -> Self {
        Self::ElicitSlot {
            session_attributes,
            intent_name: intent_name.into(),
            slots,
            slot_to_elicit,
            message: message.into(),
        }
    }

    pub fn confirm_intent(
        session_attributes: SessionAttributes,
        intent_name: impl Into<String>,
        slots: SlotSet,
        message: impl Into<String>,
    ) -> Self {
        Self::ConfirmIntent {
            session_attributes,
            intent_name: intent_name.into(),
            slots,
            message: message.into(),
        }
    }

    /// Hand control back to the runtime to pick the next slot to elicit.
    pub fn delegate(
        session_attributes: SessionAttributes,
        intent_name: impl Into<String>,
        slots: SlotSet,
    ) -> Self {
        Self::Delegate { session_attributes, intent_name: intent_name.into(), slots }
    }

    /// Terminate the turn. Always `Fulfilled`.
    pub fn close(
        session_attributes: SessionAttributes,
        intent_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Close {
            session_attributes,
            intent_name: intent_name.into(),
            fulfillment_state: FulfillmentState::Fulfilled,
            message: message.into(),
        }
    }

    pub fn session_attributes(&self) -> &SessionAttributes {
        match self {
            Self::ElicitSlot { session_attributes, .. }
            | Self::ConfirmIntent { session_attributes, .. }
            | Self::Delegate { session_attributes, .. }
            | Self::Close { session_attributes, .. } => session_attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::domain::slots::{SlotName, SlotSet, SlotValue};

    use super::{DialogDirective, FulfillmentState, SessionAttributes};

    fn attrs() -> SessionAttributes {
        let mut attrs = BTreeMap::new();
        attrs.insert("channel".to_string(), "web".to_string());
        attrs
    }

    #[test]
    fn close_always_reports_fulfilled() {
        let directive = DialogDirective::close(attrs(), "GreetingIntent", "Hi there");

        assert!(matches!(
            directive,
            DialogDirective::Close { fulfillment_state: FulfillmentState::Fulfilled, .. }
        ));
    }

    #[test]
    fn constructors_are_deterministic() {
        let mut slots = SlotSet::default();
        slots.set(SlotName::Cuisine, Some(SlotValue::verbatim("italian")));

        let first = DialogDirective::elicit_slot(
            attrs(),
            "DiningSuggestionIntent",
            slots.clone(),
            SlotName::Location,
            "Which city?",
        );
        let second = DialogDirective::elicit_slot(
            attrs(),
            "DiningSuggestionIntent",
            slots.clone(),
            SlotName::Location,
            "Which city?",
        );
        assert_eq!(first, second);

        let delegate_first =
            DialogDirective::delegate(attrs(), "DiningSuggestionIntent", slots.clone());
        let delegate_second = DialogDirective::delegate(attrs(), "DiningSuggestionIntent", slots);
        assert_eq!(delegate_first, delegate_second);

        let close_first = DialogDirective::close(attrs(), "ThankYouIntent", "Bye");
        let close_second = DialogDirective::close(attrs(), "ThankYouIntent", "Bye");
        assert_eq!(close_first, close_second);
    }

    #[test]
    fn elicit_slot_names_the_slot_to_reprompt() {
        let directive = DialogDirective::elicit_slot(
            SessionAttributes::new(),
            "DiningSuggestionIntent",
            SlotSet::default(),
            SlotName::Count,
            "How many guests?",
        );

        match directive {
            DialogDirective::ElicitSlot { slot_to_elicit, message, .. } => {
                assert_eq!(slot_to_elicit, SlotName::Count);
                assert_eq!(message, "How many guests?");
            }
            other => panic!("expected elicit slot, got {other:?}"),
        }
    }
}
