use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::PointsTransaction;
use crate::services::points;
use crate::state::AppState;

// GET /eco_points/:user_id/balance
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let balance = {
        let db = state.db()?;
        points::get_balance(&db, user_id)?
    };

    Ok(Json(serde_json::json!({ "user_id": user_id, "balance": balance })))
}

#[derive(Deserialize)]
pub struct TransactionsQuery {
    pub limit: Option<i64>,
}

// GET /eco_points/:user_id/transactions
pub async fn get_transactions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<Vec<PointsTransaction>>, AppError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);

    let transactions = {
        let db = state.db()?;
        points::list_transactions(&db, user_id, limit)?
    };

    Ok(Json(transactions))
}
