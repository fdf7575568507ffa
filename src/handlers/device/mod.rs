pub mod device_data;
pub mod device_management;
pub mod telemetry;

use actix_web::{http::StatusCode, HttpResponse};

use crate::db::devices::DeviceError;
use crate::db::helpers::error_response;

/// Link/unlink failures as `{"error"}` responses.
pub fn device_error_response(err: DeviceError, failure_message: &str) -> HttpResponse {
    match err {
        DeviceError::Database(e) => {
            tracing::error!("Database error: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, failure_message)
        }
        other => error_response(StatusCode::BAD_REQUEST, &other.to_string()),
    }
}
