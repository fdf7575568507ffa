use actix_web::{http::StatusCode, web, HttpResponse};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;

use crate::db::devices::{find_active_owner, insert_reading};
use crate::db::helpers::{db_result, error_response};
use crate::models::device::{parse_device_timestamp, DeviceDataUpdate, SavedReading, TelemetryPayload};
use crate::models::realtime::RealtimeEvent;
use crate::ok_or_return;
use crate::services::SessionRegistry;

/// Unauthenticated ingestion endpoint for wearables.
///
/// The reading is stored against the device's current owner and forwarded
/// to that owner's live sessions as `device_data_update`.
#[tracing::instrument(name = "Receive device data", skip(payload, pool, sessions))]
pub async fn receive_device_data(
    payload: web::Json<TelemetryPayload>,
    pool: web::Data<SqlitePool>,
    sessions: web::Data<SessionRegistry>,
) -> HttpResponse {
    let payload = payload.into_inner();

    let Some(device_id) = payload.device_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "device_id is required");
    };
    let Some(raw_timestamp) = payload.timestamp.as_deref().filter(|ts| !ts.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "timestamp is required");
    };

    let owner = ok_or_return!(db_result(
        find_active_owner(&pool, device_id).await,
        "Failed to process device data"
    ));
    let Some((user_id, user_email)) = owner else {
        tracing::warn!("Telemetry from unlinked device {}", device_id);
        return error_response(StatusCode::NOT_FOUND, "Device not linked to any user");
    };

    let timestamp = parse_device_timestamp(raw_timestamp).unwrap_or_else(|| {
        tracing::warn!("Unparsable device timestamp '{}', using current time", raw_timestamp);
        Utc::now()
    });

    let reading_id = ok_or_return!(db_result(
        insert_reading(&pool, device_id, user_id, timestamp, &payload.data).await,
        "Failed to process device data"
    ));

    let update = DeviceDataUpdate {
        device_id: device_id.to_string(),
        timestamp: raw_timestamp.to_string(),
        temperature_c: payload.data.temperature_c,
        heart_rate_bpm: payload.data.heart_rate_bpm,
        spo2_percent: payload.data.spo2_percent,
        ecg_data: payload.data.ecg_mv.clone(),
    };
    let event = RealtimeEvent::new("device_data_update", json!(update));
    let delivered = sessions.push_to_user(&user_email, &event);
    tracing::info!(
        "Stored reading {} from device {} and pushed it to {} session(s)",
        reading_id,
        device_id,
        delivered
    );

    let saved = SavedReading {
        id: reading_id,
        user_id,
        device_id: device_id.to_string(),
        timestamp,
    };
    HttpResponse::Ok().json(json!({
        "message": "Data received successfully",
        "device_id": device_id,
        "timestamp": raw_timestamp,
        "data_saved": saved,
    }))
}
