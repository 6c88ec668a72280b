use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

use crate::models::{
    Booking, BookingStatus, Listing, NewBooking, NewListing, DATE_FORMAT, TIMESTAMP_FORMAT,
};

// ── Listings ──

const LISTING_COLUMNS: &str = "id, owner_id, title, description, location, price, currency, \
     rooms_available, is_approved, created_at, updated_at";

pub fn insert_listing(conn: &Connection, listing: &NewListing) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO listings (owner_id, title, description, location, price, currency, rooms_available)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            listing.owner_id,
            listing.title.trim(),
            listing.description,
            listing.location,
            listing.price,
            listing.currency.as_deref().unwrap_or("LKR"),
            listing.rooms_available,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_listing(conn: &Connection, id: i64) -> rusqlite::Result<Option<Listing>> {
    let result = conn.query_row(
        &format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id = ?1"),
        params![id],
        parse_listing_row,
    );

    match result {
        Ok(listing) => Ok(Some(listing)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn get_approved_listing(conn: &Connection, id: i64) -> rusqlite::Result<Option<Listing>> {
    Ok(get_listing(conn, id)?.filter(|l| l.is_approved))
}

pub fn list_approved_listings(conn: &Connection) -> rusqlite::Result<Vec<Listing>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LISTING_COLUMNS} FROM listings WHERE is_approved = 1 ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map([], parse_listing_row)?;
    rows.collect()
}

pub fn list_owner_listings(conn: &Connection, owner_id: i64) -> rusqlite::Result<Vec<Listing>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LISTING_COLUMNS} FROM listings WHERE owner_id = ?1 ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map(params![owner_id], parse_listing_row)?;
    rows.collect()
}

pub fn update_listing(conn: &Connection, listing: &Listing) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE listings SET title = ?1, description = ?2, location = ?3, price = ?4,
            rooms_available = ?5, updated_at = datetime('now')
         WHERE id = ?6",
        params![
            listing.title,
            listing.description,
            listing.location,
            listing.price,
            listing.rooms_available,
            listing.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn approve_listing(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE listings SET is_approved = 1, updated_at = datetime('now') WHERE id = ?1",
        params![id],
    )?;
    Ok(count > 0)
}

pub fn delete_listing(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    let count = conn.execute("DELETE FROM listings WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn listing_capacity(conn: &Connection, id: i64) -> rusqlite::Result<Option<i64>> {
    let result = conn.query_row(
        "SELECT rooms_available FROM listings WHERE id = ?1",
        params![id],
        |row| row.get(0),
    );

    match result {
        Ok(capacity) => Ok(Some(capacity)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

fn parse_listing_row(row: &Row) -> rusqlite::Result<Listing> {
    Ok(Listing {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        location: row.get(4)?,
        price: row.get(5)?,
        currency: row.get(6)?,
        rooms_available: row.get(7)?,
        is_approved: row.get::<_, i32>(8)? != 0,
        created_at: timestamp_column(row, 9)?,
        updated_at: timestamp_column(row, 10)?,
    })
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, listing_id, customer_id, check_in, check_out, created_at, \
     is_cancelled, is_completed, points_earned, points_redeemed, redemption_amount";

pub fn insert_booking(conn: &Connection, booking: &NewBooking) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO bookings (listing_id, customer_id, check_in, check_out, created_at,
            points_earned, points_redeemed, redemption_amount)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            booking.listing_id,
            booking.customer_id,
            booking.stay.check_in.format(DATE_FORMAT).to_string(),
            booking.stay.check_out.format(DATE_FORMAT).to_string(),
            booking.created_at.format(TIMESTAMP_FORMAT).to_string(),
            booking.points_earned,
            booking.points_redeemed,
            booking.redemption_amount,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_booking(conn: &Connection, id: i64) -> rusqlite::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        parse_booking_row,
    );

    match result {
        Ok(booking) => Ok(Some(booking)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn list_customer_bookings(conn: &Connection, customer_id: i64) -> rusqlite::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE customer_id = ?1 ORDER BY check_in ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![customer_id], parse_booking_row)?;
    rows.collect()
}

pub fn list_recent_bookings(
    conn: &Connection,
    status_filter: Option<BookingStatus>,
    limit: i64,
) -> rusqlite::Result<Vec<Booking>> {
    let condition = match status_filter {
        Some(BookingStatus::Active) => "WHERE is_cancelled = 0 AND is_completed = 0",
        Some(BookingStatus::Cancelled) => "WHERE is_cancelled = 1",
        Some(BookingStatus::Completed) => "WHERE is_cancelled = 0 AND is_completed = 1",
        None => "",
    };

    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings {condition} ORDER BY created_at DESC, id DESC LIMIT ?1"
    ))?;
    let rows = stmt.query_map(params![limit], parse_booking_row)?;
    rows.collect()
}

pub fn count_listing_bookings(conn: &Connection, listing_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE listing_id = ?1",
        params![listing_id],
        |row| row.get(0),
    )
}

pub fn mark_booking_cancelled(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET is_cancelled = 1 WHERE id = ?1 AND is_cancelled = 0",
        params![id],
    )?;
    Ok(count > 0)
}

pub fn mark_booking_completed(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET is_completed = 1 WHERE id = ?1 AND is_completed = 0",
        params![id],
    )?;
    Ok(count > 0)
}

pub fn list_expired_open_bookings(
    conn: &Connection,
    today: NaiveDate,
) -> rusqlite::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE is_cancelled = 0 AND is_completed = 0 AND check_out <= ?1
         ORDER BY check_out ASC, id ASC"
    ))?;
    let rows = stmt.query_map(
        params![today.format(DATE_FORMAT).to_string()],
        parse_booking_row,
    )?;
    rows.collect()
}

fn parse_booking_row(row: &Row) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: row.get(0)?,
        listing_id: row.get(1)?,
        customer_id: row.get(2)?,
        check_in: date_column(row, 3)?,
        check_out: date_column(row, 4)?,
        created_at: timestamp_column(row, 5)?,
        is_cancelled: row.get::<_, i32>(6)? != 0,
        is_completed: row.get::<_, i32>(7)? != 0,
        points_earned: row.get(8)?,
        points_redeemed: row.get(9)?,
        redemption_amount: row.get(10)?,
    })
}

// ── Column helpers ──

pub(crate) fn date_column(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::StayDates;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn new_listing(rooms: i64) -> NewListing {
        NewListing {
            owner_id: 42,
            title: "Riverside Eco Lodge".to_string(),
            description: Some("Solar powered cabins".to_string()),
            location: Some("Ella".to_string()),
            price: 8500.0,
            currency: None,
            rooms_available: rooms,
        }
    }

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_listing_pending_until_approved() {
        let conn = setup_db();
        let id = insert_listing(&conn, &new_listing(3)).unwrap();

        let listing = get_listing(&conn, id).unwrap().unwrap();
        assert!(!listing.is_approved);
        assert_eq!(listing.currency, "LKR");
        assert!(get_approved_listing(&conn, id).unwrap().is_none());
        assert!(list_approved_listings(&conn).unwrap().is_empty());

        assert!(approve_listing(&conn, id).unwrap());
        assert!(get_approved_listing(&conn, id).unwrap().is_some());
        assert_eq!(list_approved_listings(&conn).unwrap().len(), 1);
        assert_eq!(list_owner_listings(&conn, 42).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_listing() {
        let conn = setup_db();
        assert!(get_listing(&conn, 999).unwrap().is_none());
        assert!(listing_capacity(&conn, 999).unwrap().is_none());
        assert!(!approve_listing(&conn, 999).unwrap());
    }

    #[test]
    fn test_booking_insert_and_cancel() {
        let conn = setup_db();
        let listing_id = insert_listing(&conn, &new_listing(2)).unwrap();
        let stay = StayDates::parse("2024-01-01", "2024-01-03").unwrap();

        let id = insert_booking(
            &conn,
            &NewBooking {
                listing_id,
                customer_id: 9,
                stay,
                created_at: ts("2023-12-20 10:00:00"),
                points_earned: 30,
                points_redeemed: 0,
                redemption_amount: 0,
            },
        )
        .unwrap();

        let booking = get_booking(&conn, id).unwrap().unwrap();
        assert_eq!(booking.stay(), stay);
        assert_eq!(booking.created_at, ts("2023-12-20 10:00:00"));
        assert_eq!(booking.status(), BookingStatus::Active);

        assert!(mark_booking_cancelled(&conn, id).unwrap());
        assert!(!mark_booking_cancelled(&conn, id).unwrap());
        assert_eq!(
            list_recent_bookings(&conn, Some(BookingStatus::Cancelled), 10)
                .unwrap()
                .len(),
            1
        );
        assert!(list_recent_bookings(&conn, Some(BookingStatus::Active), 10)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_storage_rejects_inverted_dates() {
        let conn = setup_db();
        let listing_id = insert_listing(&conn, &new_listing(2)).unwrap();
        let result = conn.execute(
            "INSERT INTO bookings (listing_id, customer_id, check_in, check_out, created_at)
             VALUES (?1, 1, '2024-01-03', '2024-01-01', '2023-12-01 00:00:00')",
            params![listing_id],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_expired_open_bookings() {
        let conn = setup_db();
        let listing_id = insert_listing(&conn, &new_listing(2)).unwrap();
        let make = |check_in: &str, check_out: &str| NewBooking {
            listing_id,
            customer_id: 1,
            stay: StayDates::parse(check_in, check_out).unwrap(),
            created_at: ts("2023-12-01 00:00:00"),
            points_earned: 0,
            points_redeemed: 0,
            redemption_amount: 0,
        };
        let past = insert_booking(&conn, &make("2024-01-01", "2024-01-03")).unwrap();
        let today = insert_booking(&conn, &make("2024-01-04", "2024-01-05")).unwrap();
        let cancelled = insert_booking(&conn, &make("2024-01-01", "2024-01-02")).unwrap();
        insert_booking(&conn, &make("2024-01-05", "2024-01-07")).unwrap();
        mark_booking_cancelled(&conn, cancelled).unwrap();

        let cutoff = NaiveDate::parse_from_str("2024-01-05", "%Y-%m-%d").unwrap();
        let ids: Vec<i64> = list_expired_open_bookings(&conn, cutoff)
            .unwrap()
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec![past, today]);
    }
}
