use actix_web::HttpRequest;

use crate::auth::jwt::decode_token;
use crate::config::jwt::JwtSettings;
use crate::middleware::auth::{bearer_token, Claims, TokenScope};

use super::messages::TokenQuery;

/// Session claims from `?token=` or, failing that, the Authorization header.
pub fn authenticate(
    req: &HttpRequest,
    query: &TokenQuery,
    jwt_settings: &JwtSettings,
) -> Result<Claims, &'static str> {
    let token = query
        .token
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .or_else(|| bearer_token(req))
        .ok_or("Authentication required")?;

    decode_token(&token, TokenScope::Session, jwt_settings).map_err(|e| {
        tracing::warn!("Rejected real-time token: {:?}", e);
        "Invalid token"
    })
}
