use chrono::NaiveDate;

use crate::domain::slots::{SlotName, SlotSet};

/// Cities the concierge has restaurant coverage for.
pub const SUPPORTED_CITIES: &[&str] = &[
    "new york",
    "los angeles",
    "chicago",
    "houston",
    "philadelphia",
    "phoenix",
    "san antonio",
    "san diego",
    "dallas",
    "san jose",
    "austin",
    "jacksonville",
    "san francisco",
    "indianapolis",
    "columbus",
    "fort worth",
    "charlotte",
    "detroit",
    "el paso",
    "seattle",
    "denver",
    "washington dc",
    "memphis",
    "boston",
    "nashville",
    "baltimore",
    "portland",
];

pub const SUPPORTED_CUISINES: &[&str] = &[
    "vegetarian",
    "seafood",
    "indian",
    "chinese",
    "american",
    "italian",
    "japanese",
    "mexican",
    "mediterranean",
    "vegan",
    "chicken",
    "steak",
    "noodles",
    "fast food",
    "deli",
    "convenience",
    "sandwiches",
    "desserts",
    "burgers",
    "salad",
    "coffee",
    "thai",
    "brazilian",
];

/// Textual date shapes diners actually type. Tried in order; first parse
/// wins.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%m/%d/%y",
    "%B %d, %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%d %B %Y",
];

/// Result of validating a slot set. `Invalid` always names exactly one slot
/// and carries a non-empty user-facing message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationVerdict {
    Valid,
    Invalid { slot: SlotName, message: String },
}

impl ValidationVerdict {
    fn invalid(slot: SlotName, message: impl Into<String>) -> Self {
        Self::Invalid { slot, message: message.into() }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn violated_slot(&self) -> Option<SlotName> {
        match self {
            Self::Valid => None,
            Self::Invalid { slot, .. } => Some(*slot),
        }
    }
}

pub fn is_supported_city(city: &str) -> bool {
    let city = city.to_lowercase();
    SUPPORTED_CITIES.contains(&city.as_str())
}

pub fn is_supported_cuisine(cuisine: &str) -> bool {
    let cuisine = cuisine.to_lowercase();
    SUPPORTED_CUISINES.contains(&cuisine.as_str())
}

/// Parse a free-form reservation date. Returns `None` when no supported
/// shape matches.
pub fn parse_reservation_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS.iter().find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

/// Validate the collected dining slots in fixed priority order, stopping at
/// the first violation: location, cuisine, date, count. Absent slots are
/// skipped; they simply have not been elicited yet. `today` is threaded in
/// from the caller's configured timezone so validation itself never consults
/// process-global state.
pub fn validate_dining_slots(slots: &SlotSet, today: NaiveDate) -> ValidationVerdict {
    if let Some(location) = slots.interpreted(SlotName::Location) {
        if !is_supported_city(location) {
            return ValidationVerdict::invalid(
                SlotName::Location,
                format!(
                    "We currently do not support {location} as a valid location. \
                     Can you try a different city?"
                ),
            );
        }
    }

    if let Some(cuisine) = slots.interpreted(SlotName::Cuisine) {
        if !is_supported_cuisine(cuisine) {
            return ValidationVerdict::invalid(
                SlotName::Cuisine,
                format!(
                    "We currently do not support {cuisine} as a valid cuisine. \
                     Can you try a different one?"
                ),
            );
        }
    }

    if let Some(date_text) = slots.interpreted(SlotName::Date) {
        let Some(date) = parse_reservation_date(date_text) else {
            return ValidationVerdict::invalid(
                SlotName::Date,
                "I did not understand your reservation date. \
                 When would you like to make your reservation?",
            );
        };
        if date <= today {
            return ValidationVerdict::invalid(
                SlotName::Date,
                "Reservations must be scheduled at least one day in advance. \
                 Can you try a different date?",
            );
        }
    }

    if let Some(count_text) = slots.interpreted(SlotName::Count) {
        let party_size = count_text.trim().parse::<i64>().ok();
        if !party_size.is_some_and(|count| (1..=8).contains(&count)) {
            return ValidationVerdict::invalid(
                SlotName::Count,
                "You can make a reservation for one to eight guests. \
                 How many guests will be attending?",
            );
        }
    }

    ValidationVerdict::Valid
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::domain::slots::{SlotName, SlotSet, SlotValue};

    use super::{parse_reservation_date, validate_dining_slots, ValidationVerdict};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date")
    }

    fn slots(entries: &[(SlotName, &str)]) -> SlotSet {
        let mut slots = SlotSet::default();
        for (name, value) in entries {
            slots.set(*name, Some(SlotValue::verbatim(*value)));
        }
        slots
    }

    #[test]
    fn empty_slot_set_is_valid() {
        assert_eq!(validate_dining_slots(&SlotSet::default(), today()), ValidationVerdict::Valid);
    }

    #[test]
    fn all_present_and_well_formed_is_valid() {
        let slots = slots(&[
            (SlotName::Location, "New York"),
            (SlotName::Cuisine, "Italian"),
            (SlotName::Date, "2024-03-16"),
            (SlotName::Time, "19:00"),
            (SlotName::Count, "4"),
            (SlotName::Phone, "+12125550123"),
            (SlotName::Email, "diner@example.com"),
        ]);

        assert!(validate_dining_slots(&slots, today()).is_valid());
    }

    #[test]
    fn partial_slot_sets_skip_absent_slots() {
        let slots = slots(&[(SlotName::Cuisine, "thai")]);
        assert!(validate_dining_slots(&slots, today()).is_valid());
    }

    #[test]
    fn unsupported_city_names_location_and_echoes_the_city() {
        let slots = slots(&[(SlotName::Location, "Paris")]);
        let verdict = validate_dining_slots(&slots, today());

        match verdict {
            ValidationVerdict::Invalid { slot, message } => {
                assert_eq!(slot, SlotName::Location);
                assert!(message.contains("Paris"));
            }
            ValidationVerdict::Valid => panic!("Paris should not validate"),
        }
    }

    #[test]
    fn city_match_is_case_insensitive() {
        let slots = slots(&[(SlotName::Location, "SEATTLE")]);
        assert!(validate_dining_slots(&slots, today()).is_valid());
    }

    #[test]
    fn unsupported_cuisine_names_cuisine() {
        let slots = slots(&[(SlotName::Location, "boston"), (SlotName::Cuisine, "klingon")]);
        let verdict = validate_dining_slots(&slots, today());
        assert_eq!(verdict.violated_slot(), Some(SlotName::Cuisine));
    }

    #[test]
    fn first_violation_wins_over_later_checks() {
        // Location and count are both invalid; location is checked first.
        let slots = slots(&[(SlotName::Location, "Gotham"), (SlotName::Count, "0")]);
        let verdict = validate_dining_slots(&slots, today());
        assert_eq!(verdict.violated_slot(), Some(SlotName::Location));
    }

    #[test]
    fn unparseable_date_is_rejected_with_clarification() {
        let slots = slots(&[(SlotName::Date, "whenever works")]);
        let verdict = validate_dining_slots(&slots, today());

        match verdict {
            ValidationVerdict::Invalid { slot, message } => {
                assert_eq!(slot, SlotName::Date);
                assert!(message.contains("did not understand"));
            }
            ValidationVerdict::Valid => panic!("gibberish date should not validate"),
        }
    }

    #[test]
    fn same_day_reservations_are_rejected() {
        let slots = slots(&[(SlotName::Date, "2024-03-15")]);
        let verdict = validate_dining_slots(&slots, today());

        match verdict {
            ValidationVerdict::Invalid { slot, message } => {
                assert_eq!(slot, SlotName::Date);
                assert!(message.contains("at least one day in advance"));
            }
            ValidationVerdict::Valid => panic!("same-day date should not validate"),
        }
    }

    #[test]
    fn next_day_reservations_are_accepted() {
        let slots = slots(&[(SlotName::Date, "2024-03-16")]);
        assert!(validate_dining_slots(&slots, today()).is_valid());
    }

    #[test]
    fn past_dates_are_rejected() {
        let slots = slots(&[(SlotName::Date, "2023-12-24")]);
        assert_eq!(
            validate_dining_slots(&slots, today()).violated_slot(),
            Some(SlotName::Date)
        );
    }

    #[test]
    fn party_size_bounds_are_inclusive() {
        for count in ["1", "8"] {
            let slots = slots(&[(SlotName::Count, count)]);
            assert!(
                validate_dining_slots(&slots, today()).is_valid(),
                "count {count} should validate"
            );
        }

        for count in ["0", "9"] {
            let slots = slots(&[(SlotName::Count, count)]);
            assert_eq!(
                validate_dining_slots(&slots, today()).violated_slot(),
                Some(SlotName::Count),
                "count {count} should be rejected"
            );
        }
    }

    #[test]
    fn non_numeric_party_size_is_rejected() {
        let slots = slots(&[(SlotName::Count, "a few")]);
        assert_eq!(validate_dining_slots(&slots, today()).violated_slot(), Some(SlotName::Count));
    }

    #[test]
    fn free_form_dates_parse_across_shapes() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 16).expect("valid date");
        for text in ["2024-03-16", "03/16/2024", "March 16, 2024", "Mar 16 2024", "16 March 2024"]
        {
            assert_eq!(parse_reservation_date(text), Some(expected), "failed to parse {text}");
        }

        assert_eq!(parse_reservation_date("soonish"), None);
    }
}
