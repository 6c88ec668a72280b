use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::bookings::BookingResponse;
use crate::models::BookingStatus;
use crate::services::{points, sweep};
use crate::state::AppState;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

// POST /api/admin/listings/:id/approve
pub async fn approve_listing(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let approved = {
        let db = state.db()?;
        queries::approve_listing(&db, id)?
    };

    if !approved {
        return Err(AppError::NotFound(format!("listing {id}")));
    }
    tracing::info!(listing_id = id, "listing approved");
    Ok(Json(serde_json::json!({ "ok": true })))
}

// POST /api/admin/sweep
pub async fn run_sweep(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<sweep::SweepReport>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let report = {
        let mut db = state.db()?;
        sweep::complete_expired_bookings(&mut db, state.clock.as_ref())?
    };

    Ok(Json(report))
}

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let status = match query.status.as_deref() {
        Some(s) => Some(
            BookingStatus::parse(s)
                .ok_or_else(|| AppError::BadRequest(format!("unknown booking status: {s}")))?,
        ),
        None => None,
    };
    let limit = query.limit.unwrap_or(50).clamp(1, 500);

    let bookings = {
        let db = state.db()?;
        queries::list_recent_bookings(&db, status, limit)?
    };

    Ok(Json(bookings.into_iter().map(BookingResponse::from).collect()))
}

// GET /api/admin/points/:user_id/audit
#[derive(Serialize)]
pub struct PointsAudit {
    user_id: i64,
    balance: i64,
    replayed: i64,
    consistent: bool,
}

pub async fn audit_points(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(user_id): Path<i64>,
) -> Result<Json<PointsAudit>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let (balance, replayed) = {
        let db = state.db()?;
        (
            points::get_balance(&db, user_id)?,
            points::replay_balance(&db, user_id)?,
        )
    };

    if balance != replayed {
        tracing::warn!(user_id, balance, replayed, "points balance does not match transaction log");
    }

    Ok(Json(PointsAudit {
        user_id,
        balance,
        replayed,
        consistent: balance == replayed,
    }))
}
