use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::queries;
use crate::models::{PointsTransaction, TransactionKind, TIMESTAMP_FORMAT};

pub const POINTS_PER_BOOKING_DAY: i64 = 15;
pub const LKR_PER_POINT: i64 = 10;

pub fn get_balance(conn: &Connection, user_id: i64) -> rusqlite::Result<i64> {
    let balance: Option<i64> = conn
        .query_row(
            "SELECT balance FROM points_balance WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(balance.unwrap_or(0))
}

// The result is clamped at zero; callers check funds first.
pub fn adjust_balance(conn: &Connection, user_id: i64, delta: i64) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO points_balance (user_id, balance, updated_at)
         VALUES (?1, MAX(?2, 0), datetime('now'))
         ON CONFLICT(user_id) DO UPDATE SET
           balance = MAX(points_balance.balance + ?2, 0),
           updated_at = datetime('now')",
        params![user_id, delta],
    )?;
    get_balance(conn, user_id)
}

#[derive(Debug, Clone)]
pub struct TransactionRecord<'a> {
    pub user_id: i64,
    pub points: i64,
    pub kind: TransactionKind,
    pub reverts: Option<TransactionKind>,
    pub booking_id: Option<i64>,
    pub description: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

pub fn record_transaction(conn: &Connection, record: &TransactionRecord<'_>) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO points_transactions (user_id, points, type, reverts, booking_id, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.user_id,
            record.points,
            record.kind.as_str(),
            record.reverts.map(|k| k.as_str()),
            record.booking_id,
            record.description,
            record.created_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_transactions(
    conn: &Connection,
    user_id: i64,
    limit: i64,
) -> rusqlite::Result<Vec<PointsTransaction>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, points, type, reverts, booking_id, description, created_at
         FROM points_transactions WHERE user_id = ?1
         ORDER BY id DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![user_id, limit], parse_transaction_row)?;
    rows.collect()
}

pub fn replay_balance(conn: &Connection, user_id: i64) -> rusqlite::Result<i64> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, points, type, reverts, booking_id, description, created_at
         FROM points_transactions WHERE user_id = ?1
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![user_id], parse_transaction_row)?;

    let mut balance = 0;
    for tx in rows {
        balance += tx?.signed_points();
    }
    Ok(balance)
}

fn parse_transaction_row(row: &rusqlite::Row) -> rusqlite::Result<PointsTransaction> {
    let kind_str: String = row.get(3)?;
    let reverts_str: Option<String> = row.get(4)?;

    Ok(PointsTransaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        points: row.get(2)?,
        kind: parse_kind(3, &kind_str)?,
        reverts: reverts_str.map(|s| parse_kind(4, &s)).transpose()?,
        booking_id: row.get(5)?,
        description: row.get(6)?,
        created_at: queries::timestamp_column(row, 7)?,
    })
}

fn parse_kind(idx: usize, s: &str) -> rusqlite::Result<TransactionKind> {
    TransactionKind::parse(s).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown points transaction type: {s}").into(),
        )
    })
}
