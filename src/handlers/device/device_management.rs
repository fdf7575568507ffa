use actix_web::{http::StatusCode, web, HttpResponse};
use serde_json::json;
use sqlx::SqlitePool;

use crate::db::devices::{
    active_device_for_user, link_device, list_devices, unlink_current_device, unlink_device,
};
use crate::db::helpers::{db_result, error_response};
use crate::handlers::current_user;
use crate::handlers::device::device_error_response;
use crate::middleware::auth::Claims;
use crate::models::device::{DeviceInfo, LinkDeviceRequest, DEFAULT_DEVICE_TYPE};
use crate::ok_or_return;

#[tracing::instrument(name = "List devices", skip(pool, claims), fields(email = %claims.email()))]
pub async fn get_user_devices(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    let user = ok_or_return!(current_user(&pool, &claims).await);
    let devices = ok_or_return!(db_result(list_devices(&pool, user.id).await, "Failed to get devices"));
    HttpResponse::Ok().json(json!({ "devices": devices }))
}

#[tracing::instrument(name = "Link device", skip(pool, claims, body), fields(email = %claims.email()))]
pub async fn link_user_device(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
    body: web::Json<LinkDeviceRequest>,
) -> HttpResponse {
    let device_id = match body.validated_device_id() {
        Ok(id) => id,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };
    let user = ok_or_return!(current_user(&pool, &claims).await);

    let device_name = body.device_name();
    match link_device(&pool, user.id, &device_id, device_name.as_deref(), &body.device_type()).await {
        Ok(device) => {
            tracing::info!("Device {} linked to user {}", device_id, user.id);
            HttpResponse::Created().json(json!({
                "message": "Device linked successfully",
                "device": device,
            }))
        }
        Err(e) => device_error_response(e, "Failed to link device"),
    }
}

#[tracing::instrument(name = "Unlink device", skip(pool, claims), fields(email = %claims.email()))]
pub async fn unlink_user_device(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> HttpResponse {
    let user = ok_or_return!(current_user(&pool, &claims).await);
    let device_id = path.into_inner();

    match unlink_device(&pool, user.id, device_id.trim()).await {
        Ok(()) => {
            tracing::info!("Device {} unlinked from user {}", device_id, user.id);
            HttpResponse::Ok().json(json!({ "message": "Device unlinked successfully" }))
        }
        Err(e) => device_error_response(e, "Failed to unlink device"),
    }
}

#[tracing::instrument(name = "Get device info", skip(pool, claims), fields(email = %claims.email()))]
pub async fn get_device_info(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    let user = ok_or_return!(current_user(&pool, &claims).await);

    let Some(device_id) = user.linked_device_id.clone() else {
        return HttpResponse::Ok().json(json!({
            "has_device": false,
            "message": "No device linked",
        }));
    };

    let device = ok_or_return!(db_result(
        active_device_for_user(&pool, user.id).await,
        "Failed to get device info"
    ));
    let device_type = device
        .filter(|d| d.device_id == device_id)
        .map(|d| d.device_type)
        .unwrap_or_else(|| DEFAULT_DEVICE_TYPE.to_string());

    let device_info = DeviceInfo {
        device_id,
        device_type,
        linked_at: user.device_linked_at,
    };
    HttpResponse::Ok().json(json!({
        "has_device": true,
        "device_info": device_info,
    }))
}

/// Single-device variant used by the dashboard: only the id is supplied.
#[tracing::instrument(name = "Link device (simple)", skip(pool, claims, body), fields(email = %claims.email()))]
pub async fn link_device_simple(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
    body: web::Json<LinkDeviceRequest>,
) -> HttpResponse {
    let device_id = match body.validated_device_id() {
        Ok(id) => id,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };
    let user = ok_or_return!(current_user(&pool, &claims).await);

    match link_device(&pool, user.id, &device_id, None, DEFAULT_DEVICE_TYPE).await {
        Ok(device) => {
            tracing::info!("Device {} linked to user {}", device_id, user.id);
            let device_info = DeviceInfo {
                device_id: device.device_id,
                device_type: device.device_type,
                linked_at: Some(device.updated_at),
            };
            HttpResponse::Ok().json(json!({
                "message": "Device linked successfully",
                "device_info": device_info,
            }))
        }
        Err(e) => device_error_response(e, "Failed to link device"),
    }
}

#[tracing::instrument(name = "Unlink device (simple)", skip(pool, claims), fields(email = %claims.email()))]
pub async fn unlink_device_simple(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    let user = ok_or_return!(current_user(&pool, &claims).await);

    match unlink_current_device(&pool, user.id).await {
        Ok(()) => {
            tracing::info!("Current device unlinked from user {}", user.id);
            HttpResponse::Ok().json(json!({ "message": "Device unlinked successfully" }))
        }
        Err(e) => device_error_response(e, "Failed to unlink device"),
    }
}
