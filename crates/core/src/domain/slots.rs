use serde::{Deserialize, Serialize};

/// The seven slots the dining dialog collects. The wire names mirror the
/// dialog runtime's bot definition, which capitalizes `Location` and
/// `Cuisine` but nothing else.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotName {
    Location,
    Cuisine,
    Date,
    Time,
    Count,
    Phone,
    Email,
}

impl SlotName {
    pub const ALL: [SlotName; 7] = [
        SlotName::Location,
        SlotName::Cuisine,
        SlotName::Date,
        SlotName::Time,
        SlotName::Count,
        SlotName::Phone,
        SlotName::Email,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Location => "Location",
            Self::Cuisine => "Cuisine",
            Self::Date => "date",
            Self::Time => "time",
            Self::Count => "count",
            Self::Phone => "phone",
            Self::Email => "email",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|slot| slot.as_str() == name)
    }
}

impl std::fmt::Display for SlotName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recognized slot value. Validation and fulfillment always read
/// the `interpreted` form; `raw` is kept for operator-facing logs only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotValue {
    pub raw: String,
    pub interpreted: String,
}

impl SlotValue {
    pub fn new(raw: impl Into<String>, interpreted: impl Into<String>) -> Self {
        Self { raw: raw.into(), interpreted: interpreted.into() }
    }

    /// A value whose raw and interpreted forms coincide.
    pub fn verbatim(value: impl Into<String>) -> Self {
        let value = value.into();
        Self { raw: value.clone(), interpreted: value }
    }
}

/// The fixed record of collected dialog slots. Every call site accounts for
/// all seven slots; there is no loosely-shaped dictionary to misspell a key
/// into.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSet {
    pub location: Option<SlotValue>,
    pub cuisine: Option<SlotValue>,
    pub date: Option<SlotValue>,
    pub time: Option<SlotValue>,
    pub count: Option<SlotValue>,
    pub phone: Option<SlotValue>,
    pub email: Option<SlotValue>,
}

impl SlotSet {
    pub fn get(&self, name: SlotName) -> Option<&SlotValue> {
        match name {
            SlotName::Location => self.location.as_ref(),
            SlotName::Cuisine => self.cuisine.as_ref(),
            SlotName::Date => self.date.as_ref(),
            SlotName::Time => self.time.as_ref(),
            SlotName::Count => self.count.as_ref(),
            SlotName::Phone => self.phone.as_ref(),
            SlotName::Email => self.email.as_ref(),
        }
    }

    pub fn set(&mut self, name: SlotName, value: Option<SlotValue>) {
        match name {
            SlotName::Location => self.location = value,
            SlotName::Cuisine => self.cuisine = value,
            SlotName::Date => self.date = value,
            SlotName::Time => self.time = value,
            SlotName::Count => self.count = value,
            SlotName::Phone => self.phone = value,
            SlotName::Email => self.email = value,
        }
    }

    /// Copy-with-override used when re-eliciting: the violating slot is
    /// cleared to unset, every other collected value is preserved.
    pub fn cleared(&self, name: SlotName) -> Self {
        let mut slots = self.clone();
        slots.set(name, None);
        slots
    }

    pub fn interpreted(&self, name: SlotName) -> Option<&str> {
        self.get(name).map(|value| value.interpreted.as_str())
    }

    pub fn is_empty(&self) -> bool {
        SlotName::ALL.iter().all(|name| self.get(*name).is_none())
    }
}
