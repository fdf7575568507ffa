use actix_web::{http::StatusCode, web, HttpResponse};
use serde_json::json;
use sqlx::SqlitePool;

use crate::db::helpers::{db_result, error_response};
use crate::db::medical_history::{insert_condition, list_conditions};
use crate::handlers::current_user;
use crate::middleware::auth::Claims;
use crate::models::medical_history::{ConditionStatus, NewMedicalCondition};
use crate::ok_or_return;
use crate::utils::validation::{non_blank, parse_optional_date};

#[tracing::instrument(
    name = "Add medical condition",
    skip(pool, claims, body),
    fields(email = %claims.email())
)]
pub async fn add_medical_condition(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
    body: web::Json<NewMedicalCondition>,
) -> HttpResponse {
    let user = ok_or_return!(current_user(&pool, &claims).await);
    let condition = body.into_inner();

    let Some(condition_name) = non_blank(condition.condition_name) else {
        return error_response(StatusCode::BAD_REQUEST, "Condition name is required");
    };

    let status = match condition.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => match ConditionStatus::try_from(raw) {
            Ok(status) => status,
            Err(message) => return error_response(StatusCode::BAD_REQUEST, &message),
        },
        None => ConditionStatus::Active,
    };

    // An unparsable diagnosis date is stored as unknown
    let diagnosis_date = parse_optional_date(condition.diagnosis_date.as_deref());
    let notes = non_blank(condition.notes);

    let condition_id = ok_or_return!(db_result(
        insert_condition(&pool, user.id, &condition_name, diagnosis_date, status, notes.as_deref()).await,
        "Failed to add medical condition"
    ));
    tracing::info!("Medical condition {} added for user {}", condition_id, user.id);

    HttpResponse::Created().json(json!({
        "message": "Medical condition added successfully",
        "condition_id": condition_id,
    }))
}

#[tracing::instrument(
    name = "Get medical history",
    skip(pool, claims),
    fields(email = %claims.email())
)]
pub async fn get_medical_history(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    let user = ok_or_return!(current_user(&pool, &claims).await);
    let history = ok_or_return!(db_result(
        list_conditions(&pool, user.id).await,
        "Failed to get medical history"
    ));

    HttpResponse::Ok().json(json!({ "medical_history": history }))
}
