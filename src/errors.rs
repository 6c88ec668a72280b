use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("booking {0} is already cancelled")]
    AlreadyCancelled(i64),

    #[error("no rooms available on {date}")]
    NoAvailability { date: NaiveDate },

    #[error("insufficient points: requested {requested}, balance {balance}")]
    InsufficientPoints { requested: i64, balance: i64 },

    #[error("cancellation window of {hours} hours has expired")]
    WindowExpired { hours: i64 },

    #[error("storage failure: {0}")]
    StorageFailure(#[from] rusqlite::Error),
}

impl BookingError {
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::InvalidRequest(_) => "invalid_request",
            BookingError::NotFound(_) => "not_found",
            BookingError::AlreadyCancelled(_) => "already_cancelled",
            BookingError::NoAvailability { .. } => "no_availability",
            BookingError::InsufficientPoints { .. } => "insufficient_points",
            BookingError::WindowExpired { .. } => "window_expired",
            BookingError::StorageFailure(_) => "storage_failure",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::StorageFailure(_))
    }

    fn status(&self) -> StatusCode {
        match self {
            BookingError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            BookingError::NotFound(_) => StatusCode::NOT_FOUND,
            BookingError::AlreadyCancelled(_) => StatusCode::CONFLICT,
            BookingError::NoAvailability { .. } => StatusCode::CONFLICT,
            BookingError::InsufficientPoints { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            BookingError::WindowExpired { .. } => StatusCode::FORBIDDEN,
            BookingError::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "storage_failure",
            AppError::Booking(e) => e.code(),
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "invalid_request",
            AppError::Conflict(_) => "conflict",
            AppError::Unauthorized => "unauthorized",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Booking(e) => e.status(),
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "error": self.to_string(), "code": self.code() });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_storage_failures_are_retryable() {
        assert!(BookingError::StorageFailure(rusqlite::Error::QueryReturnedNoRows).is_retryable());
        assert!(!BookingError::WindowExpired { hours: 3 }.is_retryable());
        assert!(!BookingError::InsufficientPoints {
            requested: 10,
            balance: 0
        }
        .is_retryable());
    }

    #[test]
    fn test_booking_errors_map_to_distinct_statuses() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let cases = [
            (BookingError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (BookingError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (BookingError::NoAvailability { date }, StatusCode::CONFLICT),
            (
                BookingError::InsufficientPoints {
                    requested: 1,
                    balance: 0,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (BookingError::WindowExpired { hours: 3 }, StatusCode::FORBIDDEN),
        ];
        for (err, status) in cases {
            let res = AppError::from(err).into_response();
            assert_eq!(res.status(), status);
        }
    }
}
