use actix_web::{http::StatusCode, web, HttpResponse};
use secrecy::ExposeSecret;
use serde_json::json;
use sqlx::SqlitePool;

use crate::auth::jwt::generate_token;
use crate::config::jwt::JwtSettings;
use crate::db::helpers::error_response;
use crate::db::is_unique_violation;
use crate::db::users::{email_taken, insert_user};
use crate::middleware::auth::TokenScope;
use crate::models::user::{
    EmergencyContact, NewUser, RegisteredUser, RegistrationMetadata, RegistrationRequest,
};
use crate::utils::password::hash_password;
use crate::utils::validation::{
    is_valid_email, is_valid_password, non_blank, normalize_email, parse_date_of_birth, today,
};

#[tracing::instrument(
    name = "Adding a new user",
    // Don't show arguments
    skip(user_form, pool, jwt_settings),
    fields(
        email = %user_form.email
    )
)]
pub async fn register_user(
    user_form: web::Json<RegistrationRequest>,
    pool: web::Data<SqlitePool>,
    jwt_settings: web::Data<JwtSettings>,
) -> HttpResponse {
    let form = user_form.into_inner();
    let email = normalize_email(&form.email);
    let name = form.name.trim().to_string();

    if email.is_empty() || form.password.expose_secret().is_empty() || name.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Email, password, and name are required");
    }
    if !is_valid_email(&email) {
        return error_response(StatusCode::BAD_REQUEST, "Please enter a valid email address");
    }
    if !is_valid_password(form.password.expose_secret()) {
        return error_response(StatusCode::BAD_REQUEST, "Password must be at least 6 characters long");
    }

    let date_of_birth = match non_blank(form.date_of_birth) {
        Some(raw) => match parse_date_of_birth(&raw, today()) {
            Ok(dob) => Some(dob),
            Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
        },
        None => None,
    };

    match email_taken(&pool, &email).await {
        Ok(true) => return error_response(StatusCode::CONFLICT, "User already exists"),
        Ok(false) => {}
        Err(e) => {
            tracing::error!("Failed to check for existing user: {:?}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Registration failed. Please try again.");
        }
    }

    let password_hash = match hash_password(form.password.expose_secret()) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("Failed to hash password: {:?}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Registration failed. Please try again.");
        }
    };

    let new_user = NewUser {
        email,
        password_hash,
        name,
        phone: non_blank(form.phone),
        date_of_birth,
        gender: non_blank(form.gender),
        metadata: clean_metadata(form.metadata.unwrap_or_default()),
    };

    let user = match insert_user(&pool, &new_user).await {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            return error_response(StatusCode::CONFLICT, "User already exists");
        }
        Err(e) => {
            tracing::error!("Failed to execute user insert query: {:?}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Registration failed. Please try again.");
        }
    };

    let token = match generate_token(&user.email, TokenScope::Session, &jwt_settings) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Error generating JWT token: {:?}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Registration failed. Please try again.");
        }
    };

    tracing::info!("New user registered: {} (id {})", user.email, user.id);
    HttpResponse::Created().json(json!({
        "message": "Healthcare account created successfully",
        "token": token,
        "user": RegisteredUser::from(&user),
    }))
}

/// Blank form fields are stored as NULL.
fn clean_metadata(metadata: RegistrationMetadata) -> RegistrationMetadata {
    let RegistrationMetadata {
        height,
        weight,
        blood_type,
        allergies,
        medications,
        medical_conditions,
        emergency_contact,
        preferences,
    } = metadata;

    RegistrationMetadata {
        height,
        weight,
        blood_type: non_blank(blood_type),
        allergies: non_blank(allergies),
        medications: non_blank(medications),
        medical_conditions: non_blank(medical_conditions),
        emergency_contact: emergency_contact.map(|contact| EmergencyContact {
            name: non_blank(contact.name),
            relationship: non_blank(contact.relationship),
            phone: non_blank(contact.phone),
        }),
        preferences,
    }
}
