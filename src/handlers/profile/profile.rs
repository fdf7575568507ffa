use actix_web::{http::StatusCode, web, HttpResponse};
use serde_json::json;
use sqlx::SqlitePool;

use crate::db::helpers::{db_result, error_response};
use crate::db::users::{deactivate_user, save_profile};
use crate::handlers::current_user;
use crate::middleware::auth::Claims;
use crate::models::user::{UpdateProfileRequest, UserProfile, UserRecord, UserSummary};
use crate::ok_or_return;
use crate::utils::validation::{non_blank, parse_date_of_birth, today};

#[tracing::instrument(
    name = "Get user profile",
    skip(pool, claims),
    fields(email = %claims.email())
)]
pub async fn get_user_profile(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    let user = ok_or_return!(current_user(&pool, &claims).await);
    HttpResponse::Ok().json(json!({ "user": UserSummary::from_record(&user, true) }))
}

#[tracing::instrument(
    name = "Update user profile",
    skip(pool, claims, body),
    fields(email = %claims.email())
)]
pub async fn update_user_profile(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
    body: web::Json<UpdateProfileRequest>,
) -> HttpResponse {
    let mut user = ok_or_return!(current_user(&pool, &claims).await);

    if let Err(message) = apply_profile_update(&mut user, body.into_inner()) {
        return error_response(StatusCode::BAD_REQUEST, message);
    }

    let updated = ok_or_return!(db_result(save_profile(&pool, &user).await, "Profile update failed"));
    tracing::info!("Profile updated for user {}", updated.id);

    HttpResponse::Ok().json(json!({
        "message": "Profile updated successfully",
        "user": UserProfile::from(updated),
    }))
}

#[tracing::instrument(
    name = "Delete user account",
    skip(pool, claims),
    fields(email = %claims.email())
)]
pub async fn delete_user_profile(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    let user = ok_or_return!(current_user(&pool, &claims).await);
    let deactivated = ok_or_return!(db_result(
        deactivate_user(&pool, user.id).await,
        "Failed to delete account"
    ));
    if !deactivated {
        return error_response(StatusCode::NOT_FOUND, "User not found");
    }

    tracing::info!("User {} deactivated", user.id);
    HttpResponse::Ok().json(json!({ "message": "Account deleted successfully" }))
}

/// Copy the fields present in `update` onto `user`. The emergency contact is replaced as a whole.
pub fn apply_profile_update(user: &mut UserRecord, update: UpdateProfileRequest) -> Result<(), &'static str> {
    if let Some(name) = update.name {
        let name = name.trim();
        if name.is_empty() {
            return Err("Name cannot be empty");
        }
        user.name = name.to_string();
    }
    if let Some(phone) = update.phone {
        user.phone = non_blank(Some(phone));
    }
    if let Some(gender) = update.gender {
        user.gender = non_blank(Some(gender));
    }
    if let Some(raw) = update.date_of_birth {
        user.date_of_birth = match non_blank(Some(raw)) {
            Some(raw) => Some(parse_date_of_birth(&raw, today())?),
            None => None,
        };
    }

    let Some(metadata) = update.metadata else {
        return Ok(());
    };

    if let Some(health) = metadata.health {
        if health.height.is_some() {
            user.height = health.height;
        }
        if health.weight.is_some() {
            user.weight = health.weight;
        }
        if let Some(blood_type) = health.blood_type {
            user.blood_type = non_blank(Some(blood_type));
        }
        if let Some(allergies) = health.allergies {
            user.allergies = non_blank(Some(allergies));
        }
        if let Some(medications) = health.medications {
            user.current_medications = non_blank(Some(medications));
        }
        if let Some(conditions) = health.medical_conditions {
            user.medical_conditions = non_blank(Some(conditions));
        }
    }

    if let Some(contact) = metadata.emergency_contact {
        user.emergency_contact_name = non_blank(contact.name);
        user.emergency_contact_relationship = non_blank(contact.relationship);
        user.emergency_contact_phone = non_blank(contact.phone);
    }

    if let Some(preferences) = metadata.preferences {
        if let Some(marketing) = preferences.marketing_emails {
            user.marketing_emails_consent = marketing;
        }
        if let Some(sms) = preferences.sms_notifications {
            user.sms_notifications_consent = sms;
        }
    }

    Ok(())
}
