use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DATE_FORMAT;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub listing_id: i64,
    pub customer_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub created_at: NaiveDateTime,
    pub is_cancelled: bool,
    pub is_completed: bool,
    pub points_earned: i64,
    pub points_redeemed: i64,
    pub redemption_amount: i64,
}

impl Booking {
    pub fn stay(&self) -> StayDates {
        StayDates {
            check_in: self.check_in,
            check_out: self.check_out,
        }
    }

    pub fn created_at_utc(&self) -> DateTime<Utc> {
        self.created_at.and_utc()
    }

    pub fn status(&self) -> BookingStatus {
        if self.is_cancelled {
            BookingStatus::Cancelled
        } else if self.is_completed {
            BookingStatus::Completed
        } else {
            BookingStatus::Active
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub listing_id: i64,
    pub customer_id: i64,
    pub stay: StayDates,
    pub created_at: NaiveDateTime,
    pub points_earned: i64,
    pub points_redeemed: i64,
    pub redemption_amount: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Active,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Active => "active",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(BookingStatus::Active),
            "cancelled" => Some(BookingStatus::Cancelled),
            "completed" => Some(BookingStatus::Completed),
            _ => None,
        }
    }
}

// Half-open night range [check_in, check_out).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayDates {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl StayDates {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, String> {
        if check_out <= check_in {
            return Err(format!(
                "check_out ({check_out}) must be after check_in ({check_in})"
            ));
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    pub fn parse(check_in: &str, check_out: &str) -> Result<Self, String> {
        let check_in = parse_date("check_in", check_in)?;
        let check_out = parse_date("check_out", check_out)?;
        Self::new(check_in, check_out)
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let check_out = self.check_out;
        self.check_in
            .iter_days()
            .take_while(move |d| *d < check_out)
    }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| format!("{field} must be a date in YYYY-MM-DD format, got {value:?}"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub listing_id: i64,
    pub customer_id: i64,
    pub check_in: String,
    pub check_out: String,
    #[serde(default)]
    pub redeem_points: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingReceipt {
    pub booking_id: i64,
    pub points_earned: i64,
    pub points_redeemed: i64,
    pub redemption_amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationReceipt {
    pub booking_id: i64,
    pub nights_released: i64,
    pub points_reverted: i64,
    pub points_restored: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_parse_valid_range() {
        let stay = StayDates::parse("2024-01-01", "2024-01-03").unwrap();
        assert_eq!(stay.nights(), 2);
        let nights: Vec<_> = stay.dates().collect();
        assert_eq!(nights, vec![date("2024-01-01"), date("2024-01-02")]);
    }

    #[test]
    fn test_parse_rejects_malformed_date() {
        assert!(StayDates::parse("01/01/2024", "2024-01-03").is_err());
        assert!(StayDates::parse("2024-01-01", "").is_err());
    }

    #[test]
    fn test_rejects_zero_and_negative_nights() {
        assert!(StayDates::parse("2024-01-03", "2024-01-03").is_err());
        assert!(StayDates::parse("2024-01-03", "2024-01-01").is_err());
    }

    #[test]
    fn test_range_across_month_end() {
        let stay = StayDates::parse("2024-02-28", "2024-03-02").unwrap();
        assert_eq!(stay.nights(), 3);
        assert_eq!(stay.dates().last(), Some(date("2024-03-01")));
    }

    #[test]
    fn test_status_precedence() {
        let mut booking = Booking {
            id: 1,
            listing_id: 1,
            customer_id: 1,
            check_in: date("2024-01-01"),
            check_out: date("2024-01-02"),
            created_at: date("2023-12-01").and_hms_opt(0, 0, 0).unwrap(),
            is_cancelled: false,
            is_completed: false,
            points_earned: 15,
            points_redeemed: 0,
            redemption_amount: 0,
        };
        assert_eq!(booking.status(), BookingStatus::Active);
        booking.is_completed = true;
        assert_eq!(booking.status(), BookingStatus::Completed);
        booking.is_cancelled = true;
        assert_eq!(booking.status(), BookingStatus::Cancelled);
    }
}
