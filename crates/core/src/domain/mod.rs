pub mod directive;
pub mod reservation;
pub mod restaurant;
pub mod slots;
pub mod turn;
