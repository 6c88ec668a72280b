use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::queries;
use crate::models::{InventoryEntry, StayDates, DATE_FORMAT};

pub fn booked_rooms(conn: &Connection, listing_id: i64, date: NaiveDate) -> rusqlite::Result<i64> {
    let booked: Option<i64> = conn
        .query_row(
            "SELECT rooms_booked FROM room_availability WHERE listing_id = ?1 AND date = ?2",
            params![listing_id, date.format(DATE_FORMAT).to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(booked.unwrap_or(0))
}

pub fn first_unavailable_date(
    conn: &Connection,
    listing_id: i64,
    stay: &StayDates,
) -> rusqlite::Result<Option<NaiveDate>> {
    let capacity = queries::listing_capacity(conn, listing_id)?.unwrap_or(0);

    for date in stay.dates() {
        if booked_rooms(conn, listing_id, date)? >= capacity {
            return Ok(Some(date));
        }
    }
    Ok(None)
}

pub fn check_availability(
    conn: &Connection,
    listing_id: i64,
    stay: &StayDates,
) -> rusqlite::Result<bool> {
    Ok(first_unavailable_date(conn, listing_id, stay)?.is_none())
}

// Storage refuses to push a night past the listing capacity.
pub fn reserve(conn: &Connection, listing_id: i64, stay: &StayDates) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO room_availability (listing_id, date, rooms_booked) VALUES (?1, ?2, 1)
         ON CONFLICT(listing_id, date) DO UPDATE SET rooms_booked = rooms_booked + 1",
    )?;
    for date in stay.dates() {
        stmt.execute(params![listing_id, date.format(DATE_FORMAT).to_string()])?;
    }
    Ok(())
}

pub fn release(conn: &Connection, listing_id: i64, stay: &StayDates) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(
        "UPDATE room_availability SET rooms_booked = MAX(rooms_booked - 1, 0)
         WHERE listing_id = ?1 AND date = ?2",
    )?;
    for date in stay.dates() {
        stmt.execute(params![listing_id, date.format(DATE_FORMAT).to_string()])?;
    }
    Ok(())
}

pub fn occupancy(
    conn: &Connection,
    listing_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> rusqlite::Result<Vec<InventoryEntry>> {
    let mut stmt = conn.prepare(
        "SELECT listing_id, date, rooms_booked FROM room_availability
         WHERE listing_id = ?1 AND date >= ?2 AND date < ?3
         ORDER BY date ASC",
    )?;
    let rows = stmt.query_map(
        params![
            listing_id,
            from.format(DATE_FORMAT).to_string(),
            to.format(DATE_FORMAT).to_string()
        ],
        |row| {
            Ok(InventoryEntry {
                listing_id: row.get(0)?,
                date: queries::date_column(row, 1)?,
                rooms_booked: row.get(2)?,
            })
        },
    )?;
    rows.collect()
}

pub fn peak_booked(conn: &Connection, listing_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(rooms_booked), 0) FROM room_availability WHERE listing_id = ?1",
        params![listing_id],
        |row| row.get(0),
    )
}
