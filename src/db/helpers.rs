//! Helpers that turn query results into early-return error responses.
//!
//! ```ignore
//! let user = ok_or_return!(require_record(
//!     find_active_user_by_email(pool, &email).await,
//!     "User not found"
//! ));
//! ```

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde_json::json;

/// Unwraps a `DbResult<T>` inside a handler returning `HttpResponse`.
#[macro_export]
macro_rules! ok_or_return {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(response) => return response,
        }
    };
}

/// Result type for database operations that return an HttpResponse on error
pub type DbResult<T> = Result<T, HttpResponse>;

/// `{"error": message}` with the given status.
pub fn error_response(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(json!({ "error": message }))
}

/// Unwrap an optional database result, returning NotFound if None.
pub fn require_record<T>(
    result: Result<Option<T>, sqlx::Error>,
    not_found_message: &str,
) -> DbResult<T> {
    match result {
        Ok(Some(record)) => Ok(record),
        Ok(None) => Err(error_response(StatusCode::NOT_FOUND, not_found_message)),
        Err(e) => {
            tracing::error!("Database error: {}", e);
            Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))
        }
    }
}

/// Unwrap a database result, answering 500 with `failure_message` on error.
pub fn db_result<T>(result: Result<T, sqlx::Error>, failure_message: &str) -> DbResult<T> {
    result.map_err(|e| {
        tracing::error!("Database error: {}", e);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, failure_message)
    })
}
