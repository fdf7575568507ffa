use actix_web::{http::StatusCode, web, HttpResponse};
use serde_json::json;
use sqlx::SqlitePool;

use crate::db::helpers::{db_result, error_response, require_record};
use crate::db::vital_signs::{insert_vital_signs, latest_vital_signs, list_vital_signs};
use crate::handlers::current_user;
use crate::middleware::auth::Claims;
use crate::models::vital_signs::{NewVitalSigns, VitalSignsQuery, VitalSignsView};
use crate::ok_or_return;

#[tracing::instrument(
    name = "Save vital signs",
    skip(pool, claims, body),
    fields(email = %claims.email())
)]
pub async fn save_vital_signs(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
    body: web::Json<NewVitalSigns>,
) -> HttpResponse {
    let user = ok_or_return!(current_user(&pool, &claims).await);

    if let Err(message) = body.validate() {
        return error_response(StatusCode::BAD_REQUEST, &message);
    }

    let vital_id = ok_or_return!(db_result(
        insert_vital_signs(&pool, user.id, &body).await,
        "Failed to save vital signs"
    ));
    tracing::info!("Vital signs {} saved for user {}", vital_id, user.id);

    HttpResponse::Created().json(json!({
        "message": "Vital signs saved successfully",
        "vital_id": vital_id,
    }))
}

#[tracing::instrument(
    name = "Get vital signs history",
    skip(pool, claims, query),
    fields(email = %claims.email())
)]
pub async fn get_vital_signs(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
    query: web::Query<VitalSignsQuery>,
) -> HttpResponse {
    let user = ok_or_return!(current_user(&pool, &claims).await);
    let vital_signs = ok_or_return!(db_result(
        list_vital_signs(&pool, user.id, query.limit()).await,
        "Failed to get vital signs"
    ));

    let vital_signs: Vec<VitalSignsView> = vital_signs.into_iter().map(VitalSignsView::from).collect();
    HttpResponse::Ok().json(json!({ "vital_signs": vital_signs }))
}

#[tracing::instrument(
    name = "Get latest vital signs",
    skip(pool, claims),
    fields(email = %claims.email())
)]
pub async fn get_latest_vital_signs(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    let user = ok_or_return!(current_user(&pool, &claims).await);
    let latest = ok_or_return!(require_record(
        latest_vital_signs(&pool, user.id).await,
        "No vital signs found"
    ));

    HttpResponse::Ok().json(json!({ "vital_signs": VitalSignsView::from(latest) }))
}
