use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{
    Booking, BookingReceipt, BookingRequest, CancellationReceipt, DATE_FORMAT, TIMESTAMP_FORMAT,
};
use crate::services::booking;
use crate::state::AppState;

#[derive(Serialize)]
pub struct BookingResponse {
    id: i64,
    listing_id: i64,
    customer_id: i64,
    check_in: String,
    check_out: String,
    nights: i64,
    status: &'static str,
    created_at: String,
    points_earned: i64,
    points_redeemed: i64,
    redemption_amount: i64,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            listing_id: b.listing_id,
            customer_id: b.customer_id,
            check_in: b.check_in.format(DATE_FORMAT).to_string(),
            check_out: b.check_out.format(DATE_FORMAT).to_string(),
            nights: b.stay().nights(),
            status: b.status().as_str(),
            created_at: b.created_at.format(TIMESTAMP_FORMAT).to_string(),
            points_earned: b.points_earned,
            points_redeemed: b.points_redeemed,
            redemption_amount: b.redemption_amount,
        }
    }
}

// POST /bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BookingRequest>,
) -> Result<(StatusCode, Json<BookingReceipt>), AppError> {
    let receipt = {
        let mut db = state.db()?;
        booking::create_booking(&mut db, state.clock.as_ref(), &body)?
    };

    Ok((StatusCode::CREATED, Json(receipt)))
}

// GET /bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = {
        let db = state.db()?;
        queries::get_booking(&db, id)?
    };

    booking
        .map(|b| Json(b.into()))
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

// POST /bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<CancellationReceipt>, AppError> {
    let receipt = {
        let mut db = state.db()?;
        booking::cancel_booking(&mut db, state.clock.as_ref(), id)?
    };

    Ok(Json(receipt))
}

// GET /users/:id/bookings
pub async fn customer_bookings(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<i64>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let bookings = {
        let db = state.db()?;
        queries::list_customer_bookings(&db, customer_id)?
    };

    Ok(Json(bookings.into_iter().map(BookingResponse::from).collect()))
}
