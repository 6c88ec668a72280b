use std::sync::Arc;

use rusqlite::{Connection, TransactionBehavior};

use crate::db::queries;
use crate::services::clock::Clock;
use crate::services::inventory;
use crate::state::AppState;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SweepReport {
    pub bookings_completed: usize,
    pub nights_released: i64,
}

pub fn complete_expired_bookings(
    conn: &mut Connection,
    clock: &dyn Clock,
) -> rusqlite::Result<SweepReport> {
    let today = clock.now().date_naive();
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut report = SweepReport::default();
    for booking in queries::list_expired_open_bookings(&tx, today)? {
        let stay = booking.stay();
        if queries::mark_booking_completed(&tx, booking.id)? {
            inventory::release(&tx, booking.listing_id, &stay)?;
            report.bookings_completed += 1;
            report.nights_released += stay.nights();
        }
    }

    tx.commit()?;
    Ok(report)
}

pub async fn run_periodic(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(state.config.sweep_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        let result = match state.db.lock() {
            Ok(mut db) => complete_expired_bookings(&mut db, state.clock.as_ref()),
            Err(_) => {
                tracing::error!("database lock poisoned, stopping completion sweep");
                return;
            }
        };

        match result {
            Ok(report) if report.bookings_completed > 0 => {
                tracing::info!(
                    completed = report.bookings_completed,
                    nights_released = report.nights_released,
                    "completed expired bookings"
                );
            }
            Ok(_) => tracing::debug!("no expired bookings"),
            Err(e) => tracing::error!(error = %e, "completion sweep failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{BookingRequest, NewListing};
    use crate::services::booking::create_booking;
    use crate::services::clock::ManualClock;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn setup() -> (Connection, ManualClock, i64) {
        let conn = db::init_db(":memory:").unwrap();
        let listing_id = queries::insert_listing(
            &conn,
            &NewListing {
                owner_id: 1,
                title: "Mirissa Beach Huts".to_string(),
                description: None,
                location: None,
                price: 0.0,
                currency: None,
                rooms_available: 2,
            },
        )
        .unwrap();
        queries::approve_listing(&conn, listing_id).unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2023, 12, 30, 9, 0, 0).unwrap());
        (conn, clock, listing_id)
    }

    fn book(conn: &mut Connection, clock: &ManualClock, listing_id: i64, stay: (&str, &str)) -> i64 {
        create_booking(
            conn,
            clock,
            &BookingRequest {
                listing_id,
                customer_id: 3,
                check_in: stay.0.to_string(),
                check_out: stay.1.to_string(),
                redeem_points: 0,
            },
        )
        .unwrap()
        .booking_id
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_sweep_completes_only_expired_bookings() {
        let (mut conn, clock, listing_id) = setup();
        let past = book(&mut conn, &clock, listing_id, ("2024-01-01", "2024-01-03"));
        let future = book(&mut conn, &clock, listing_id, ("2024-01-02", "2024-01-06"));

        clock.set(Utc.with_ymd_and_hms(2024, 1, 3, 0, 30, 0).unwrap());
        let report = complete_expired_bookings(&mut conn, &clock).unwrap();
        assert_eq!(
            report,
            SweepReport {
                bookings_completed: 1,
                nights_released: 2
            }
        );

        assert!(queries::get_booking(&conn, past).unwrap().unwrap().is_completed);
        assert!(!queries::get_booking(&conn, future).unwrap().unwrap().is_completed);
        assert_eq!(inventory::booked_rooms(&conn, listing_id, date("2024-01-01")).unwrap(), 0);
        assert_eq!(inventory::booked_rooms(&conn, listing_id, date("2024-01-02")).unwrap(), 1);
    }

    #[test]
    fn test_sweep_is_idempotent() {
        let (mut conn, clock, listing_id) = setup();
        book(&mut conn, &clock, listing_id, ("2024-01-01", "2024-01-03"));
        book(&mut conn, &clock, listing_id, ("2024-01-01", "2024-01-02"));

        clock.set(Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap());
        assert_eq!(complete_expired_bookings(&mut conn, &clock).unwrap().bookings_completed, 2);
        assert_eq!(
            complete_expired_bookings(&mut conn, &clock).unwrap(),
            SweepReport::default()
        );
        assert_eq!(inventory::booked_rooms(&conn, listing_id, date("2024-01-01")).unwrap(), 0);
    }

    #[test]
    fn test_sweep_skips_cancelled_bookings() {
        let (mut conn, clock, listing_id) = setup();
        let cancelled = book(&mut conn, &clock, listing_id, ("2024-01-01", "2024-01-03"));
        crate::services::booking::cancel_booking(&mut conn, &clock, cancelled).unwrap();
        book(&mut conn, &clock, listing_id, ("2024-01-01", "2024-01-03"));

        clock.set(Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap());
        let report = complete_expired_bookings(&mut conn, &clock).unwrap();
        assert_eq!(report.bookings_completed, 1);
        assert!(!queries::get_booking(&conn, cancelled).unwrap().unwrap().is_completed);
    }
}
