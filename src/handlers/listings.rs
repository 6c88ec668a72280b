use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, NaiveDate};
use rusqlite::TransactionBehavior;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Listing, ListingUpdate, NewListing, StayDates, DATE_FORMAT};
use crate::services::inventory;
use crate::state::AppState;

const MAX_AVAILABILITY_NIGHTS: i64 = 366;
const DEFAULT_AVAILABILITY_NIGHTS: i64 = 30;

// GET /listings
pub async fn list_listings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Listing>>, AppError> {
    let listings = {
        let db = state.db()?;
        queries::list_approved_listings(&db)?
    };

    Ok(Json(listings))
}

// GET /business/:owner_id/listings
pub async fn owner_listings(
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<i64>,
) -> Result<Json<Vec<Listing>>, AppError> {
    let listings = {
        let db = state.db()?;
        queries::list_owner_listings(&db, owner_id)?
    };

    Ok(Json(listings))
}

// POST /listings
pub async fn create_listing(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewListing>,
) -> Result<(StatusCode, Json<Listing>), AppError> {
    body.validate().map_err(AppError::BadRequest)?;

    let listing = {
        let db = state.db()?;
        let id = queries::insert_listing(&db, &body)?;
        queries::get_listing(&db, id)?
    }
    .ok_or_else(|| AppError::Internal("listing vanished after insert".to_string()))?;

    tracing::info!(listing_id = listing.id, owner_id = listing.owner_id, "listing submitted for approval");
    Ok((StatusCode::CREATED, Json(listing)))
}

// GET /listings/:id
pub async fn get_listing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Listing>, AppError> {
    let listing = {
        let db = state.db()?;
        queries::get_approved_listing(&db, id)?
    };

    listing
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("listing {id}")))
}

// PUT /listings/:id
pub async fn update_listing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<ListingUpdate>,
) -> Result<Json<Listing>, AppError> {
    let mut db = state.db()?;
    let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut listing = queries::get_listing(&tx, id)?
        .ok_or_else(|| AppError::NotFound(format!("listing {id}")))?;
    body.apply(&mut listing).map_err(AppError::BadRequest)?;

    let peak = inventory::peak_booked(&tx, id)?;
    if listing.rooms_available < peak {
        return Err(AppError::Conflict(format!(
            "cannot reduce capacity to {} while {peak} rooms are booked on some night",
            listing.rooms_available
        )));
    }

    queries::update_listing(&tx, &listing)?;
    let updated = queries::get_listing(&tx, id)?
        .ok_or_else(|| AppError::NotFound(format!("listing {id}")))?;
    tx.commit()?;

    Ok(Json(updated))
}

// DELETE /listings/:id
pub async fn delete_listing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut db = state.db()?;
    let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let bookings = queries::count_listing_bookings(&tx, id)?;
    if bookings > 0 {
        return Err(AppError::Conflict(format!(
            "listing {id} has {bookings} bookings and cannot be deleted"
        )));
    }
    if !queries::delete_listing(&tx, id)? {
        return Err(AppError::NotFound(format!("listing {id}")));
    }
    tx.commit()?;

    tracing::info!(listing_id = id, "listing deleted");
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Serialize)]
pub struct NightAvailability {
    date: String,
    rooms_booked: i64,
    rooms_free: i64,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    listing_id: i64,
    capacity: i64,
    nights: Vec<NightAvailability>,
}

// GET /listings/:id/availability
pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let from = match query.from.as_deref() {
        Some(s) => parse_date("from", s)?,
        None => state.clock.now().date_naive(),
    };
    let to = match query.to.as_deref() {
        Some(s) => parse_date("to", s)?,
        None => from + Duration::days(DEFAULT_AVAILABILITY_NIGHTS),
    };
    let range = StayDates::new(from, to).map_err(AppError::BadRequest)?;
    if range.nights() > MAX_AVAILABILITY_NIGHTS {
        return Err(AppError::BadRequest(format!(
            "availability range is limited to {MAX_AVAILABILITY_NIGHTS} nights"
        )));
    }

    let (listing, entries) = {
        let db = state.db()?;
        let listing = queries::get_approved_listing(&db, id)?
            .ok_or_else(|| AppError::NotFound(format!("listing {id}")))?;
        let entries = inventory::occupancy(&db, id, from, to)?;
        (listing, entries)
    };

    let mut entries = entries.into_iter().peekable();
    let nights = range
        .dates()
        .map(|date| {
            let rooms_booked = entries
                .next_if(|e| e.date == date)
                .map(|e| e.rooms_booked)
                .unwrap_or(0);
            NightAvailability {
                date: date.format(DATE_FORMAT).to_string(),
                rooms_booked,
                rooms_free: (listing.rooms_available - rooms_booked).max(0),
            }
        })
        .collect();

    Ok(Json(AvailabilityResponse {
        listing_id: id,
        capacity: listing.rooms_available,
        nights,
    }))
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| AppError::BadRequest(format!("{field} must be a date in YYYY-MM-DD format")))
}
