pub mod clock;
pub mod dining;
pub mod dispatcher;

pub use clock::{Clock, FixedClock, OffsetClock};
pub use dispatcher::{
    DialogError, Dispatcher, DINING_SUGGESTION_INTENT, GREETING_INTENT, THANK_YOU_INTENT,
};
