use chrono::{FixedOffset, NaiveDate, Utc};

/// Source of "today" for date validation. Threaded explicitly into the
/// dispatcher so concurrent conversations never race on process-global
/// timezone state.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock shifted by a fixed UTC offset (the deployment's diner-facing
/// timezone, from configuration).
#[derive(Clone, Copy, Debug)]
pub struct OffsetClock {
    offset: FixedOffset,
}

impl OffsetClock {
    /// `None` when the offset lies outside the representable range of
    /// roughly a day; configuration validation keeps real deployments well
    /// inside it.
    pub fn from_hours(hours: i32) -> Option<Self> {
        FixedOffset::east_opt(hours.checked_mul(3600)?).map(|offset| Self { offset })
    }
}

impl Clock for OffsetClock {
    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }
}

/// Pinned clock for tests.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::OffsetClock;

    #[test]
    fn offsets_within_a_day_are_accepted() {
        assert!(OffsetClock::from_hours(-5).is_some());
        assert!(OffsetClock::from_hours(0).is_some());
        assert!(OffsetClock::from_hours(14).is_some());
    }

    #[test]
    fn offsets_beyond_a_day_are_rejected() {
        assert!(OffsetClock::from_hours(25).is_none());
        assert!(OffsetClock::from_hours(-25).is_none());
    }
}
