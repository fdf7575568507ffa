use actix_web::{get, post, web, HttpResponse};
use sqlx::SqlitePool;

use crate::handlers::health_data::medical_history::{add_medical_condition, get_medical_history};
use crate::handlers::health_data::vital_signs::{get_latest_vital_signs, get_vital_signs, save_vital_signs};
use crate::middleware::auth::Claims;
use crate::models::medical_history::NewMedicalCondition;
use crate::models::vital_signs::{NewVitalSigns, VitalSignsQuery};

#[post("/vital-signs")]
async fn save_vitals(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
    data: web::Json<NewVitalSigns>,
) -> HttpResponse {
    save_vital_signs(pool, claims, data).await
}

#[get("/vital-signs")]
async fn list_vitals(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
    query: web::Query<VitalSignsQuery>,
) -> HttpResponse {
    get_vital_signs(pool, claims, query).await
}

#[get("/vital-signs/latest")]
async fn latest_vitals(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    get_latest_vital_signs(pool, claims).await
}

#[post("/medical-history")]
async fn add_condition(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
    data: web::Json<NewMedicalCondition>,
) -> HttpResponse {
    add_medical_condition(pool, claims, data).await
}

#[get("/medical-history")]
async fn medical_history(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    get_medical_history(pool, claims).await
}
