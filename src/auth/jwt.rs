use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;

use crate::config::jwt::JwtSettings;
use crate::middleware::auth::{Claims, TokenScope};

pub fn generate_token(
    email: &str,
    scope: TokenScope,
    jwt_settings: &JwtSettings,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let expires_at = now + Duration::hours(jwt_settings.expiration_hours);

    let claims = Claims {
        sub: email.to_string(),
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
        scope,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_settings.secret.expose_secret().as_bytes()),
    )
}

/// Decode and check signature, expiry and scope.
pub fn decode_token(
    token: &str,
    scope: TokenScope,
    jwt_settings: &JwtSettings,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_settings.secret.expose_secret().as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?
    .claims;

    if claims.scope != scope {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidToken.into());
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> JwtSettings {
        JwtSettings::new("unit-test-secret".to_string(), 24)
    }

    #[test]
    fn session_token_round_trips() {
        let token = generate_token("jane@example.com", TokenScope::Session, &settings()).unwrap();
        let claims = decode_token(&token, TokenScope::Session, &settings()).unwrap();
        assert_eq!(claims.sub, "jane@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn scopes_are_not_interchangeable() {
        let reset = generate_token("jane@example.com", TokenScope::PasswordReset, &settings()).unwrap();
        assert!(decode_token(&reset, TokenScope::Session, &settings()).is_err());

        let session = generate_token("jane@example.com", TokenScope::Session, &settings()).unwrap();
        assert!(decode_token(&session, TokenScope::PasswordReset, &settings()).is_err());
    }

    #[test]
    fn rejects_tokens_signed_with_another_secret() {
        let other = JwtSettings::new("another-secret".to_string(), 24);
        let token = generate_token("jane@example.com", TokenScope::Session, &other).unwrap();
        assert!(decode_token(&token, TokenScope::Session, &settings()).is_err());
    }
}
