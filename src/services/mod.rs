pub mod booking;
pub mod clock;
pub mod inventory;
pub mod points;
pub mod sweep;
