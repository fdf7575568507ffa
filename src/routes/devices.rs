use actix_web::{delete, get, post, web, HttpResponse};
use sqlx::SqlitePool;

use crate::handlers::device::device_data::{get_device_data, get_device_data_24h, get_latest_device_data};
use crate::handlers::device::device_management::{
    get_device_info, get_user_devices, link_device_simple, link_user_device, unlink_device_simple,
    unlink_user_device,
};
use crate::handlers::device::telemetry::receive_device_data;
use crate::middleware::auth::Claims;
use crate::models::device::{DeviceData24hQuery, DeviceDataQuery, LinkDeviceRequest, TelemetryPayload};
use crate::services::SessionRegistry;

// Wearables post here without a token.
#[post("/device")]
async fn device_telemetry(
    payload: web::Json<TelemetryPayload>,
    pool: web::Data<SqlitePool>,
    sessions: web::Data<SessionRegistry>,
) -> HttpResponse {
    receive_device_data(payload, pool, sessions).await
}

#[get("/devices")]
async fn list_devices(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    get_user_devices(pool, claims).await
}

#[post("/devices/link")]
async fn link_device(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
    body: web::Json<LinkDeviceRequest>,
) -> HttpResponse {
    link_user_device(pool, claims, body).await
}

#[delete("/devices/{device_id}/unlink")]
async fn unlink_device(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> HttpResponse {
    unlink_user_device(pool, claims, path).await
}

#[get("/device/info")]
async fn device_info(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    get_device_info(pool, claims).await
}

#[post("/device/link")]
async fn link_current_device(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
    body: web::Json<LinkDeviceRequest>,
) -> HttpResponse {
    link_device_simple(pool, claims, body).await
}

#[post("/device/unlink")]
async fn unlink_current_device(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    unlink_device_simple(pool, claims).await
}

#[get("/device/data")]
async fn device_data(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
    query: web::Query<DeviceDataQuery>,
) -> HttpResponse {
    get_device_data(pool, claims, query).await
}

#[get("/device/data/latest")]
async fn latest_device_data(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    get_latest_device_data(pool, claims).await
}

#[get("/device-data/24h")]
async fn device_data_24h(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
    query: web::Query<DeviceData24hQuery>,
) -> HttpResponse {
    get_device_data_24h(pool, claims, query).await
}
