pub mod booking;
pub mod listing;
pub mod points;

pub use booking::{
    Booking, BookingReceipt, BookingRequest, BookingStatus, CancellationReceipt, NewBooking,
    StayDates,
};
pub use listing::{InventoryEntry, Listing, ListingUpdate, NewListing};
pub use points::{PointsTransaction, TransactionKind};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
