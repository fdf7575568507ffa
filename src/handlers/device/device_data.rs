use actix_web::{http::StatusCode, web, HttpResponse};
use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::SqlitePool;

use crate::db::devices::{latest_reading, readings_since};
use crate::db::helpers::{db_result, error_response};
use crate::handlers::current_user;
use crate::middleware::auth::Claims;
use crate::models::device::{
    DeviceChartSeries, DeviceData24hQuery, DeviceDataQuery, DeviceReading, DEFAULT_WINDOW_HOURS,
};
use crate::ok_or_return;

fn no_device() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "has_device": false,
        "message": "No device linked",
    }))
}

/// Chart series for the linked device over the last `hours`.
#[tracing::instrument(name = "Get device data", skip(pool, claims, query), fields(email = %claims.email()))]
pub async fn get_device_data(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
    query: web::Query<DeviceDataQuery>,
) -> HttpResponse {
    let user = ok_or_return!(current_user(&pool, &claims).await);
    let Some(device_id) = user.linked_device_id.as_deref() else {
        return no_device();
    };

    let since = Utc::now() - Duration::hours(query.window_hours());
    let records = ok_or_return!(db_result(
        readings_since(&pool, user.id, device_id, since).await,
        "Failed to get device data"
    ));

    HttpResponse::Ok().json(json!({
        "has_device": true,
        "data": DeviceChartSeries::from_records(&records),
    }))
}

#[tracing::instrument(name = "Get latest device data", skip(pool, claims), fields(email = %claims.email()))]
pub async fn get_latest_device_data(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    let user = ok_or_return!(current_user(&pool, &claims).await);
    let Some(device_id) = user.linked_device_id.as_deref() else {
        return no_device();
    };

    let latest = ok_or_return!(db_result(
        latest_reading(&pool, user.id, device_id).await,
        "Failed to get latest device data"
    ));

    match latest {
        Some(record) => HttpResponse::Ok().json(json!({
            "has_device": true,
            "has_data": true,
            "latest_data": DeviceReading::from_record(&record, false),
        })),
        None => HttpResponse::Ok().json(json!({
            "has_device": true,
            "has_data": false,
            "message": "No data available from device",
        })),
    }
}

/// Raw readings of the last 24 hours, for the linked device or the one given in the query.
#[tracing::instrument(name = "Get device data 24h", skip(pool, claims, query), fields(email = %claims.email()))]
pub async fn get_device_data_24h(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
    query: web::Query<DeviceData24hQuery>,
) -> HttpResponse {
    let user = ok_or_return!(current_user(&pool, &claims).await);

    let requested = query
        .device_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());
    let Some(device_id) = requested.or(user.linked_device_id.as_deref()) else {
        return error_response(StatusCode::BAD_REQUEST, "No device linked to this user");
    };

    let since = Utc::now() - Duration::hours(DEFAULT_WINDOW_HOURS);
    let records = ok_or_return!(db_result(
        readings_since(&pool, user.id, device_id, since).await,
        "Failed to get device data"
    ));

    let device_data: Vec<DeviceReading> = records
        .iter()
        .map(|record| DeviceReading::from_record(record, true))
        .collect();
    HttpResponse::Ok().json(json!({
        "count": device_data.len(),
        "device_data": device_data,
    }))
}
