//! Bearer-token authentication for the internal API surface.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts, RequestPartsExt};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use bcrypt::{hash, verify, DEFAULT_COST};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::routes::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated user id.
    pub sub: Uuid,
    pub email: String,
    pub role: String,
    pub exp: usize,
}

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password, DEFAULT_COST)
}

pub fn verify_password(password: &str, hashed: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, hashed)
}

pub fn create_token(
    user_id: Uuid,
    email: &str,
    role: &str,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = (chrono::Utc::now() + chrono::Duration::hours(24)).timestamp() as usize;
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role: role.to_string(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn validate_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

impl FromRequestParts<Arc<AppState>> for Claims {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Unauthorized("Unauthorized".to_string()))?;

        validate_token(bearer.token(), &state.config.jwt_secret)
            .map_err(|_| AppError::Unauthorized("Invalid authentication".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let user_id = Uuid::new_v4();
        let token = create_token(user_id, "owner@example.com", "admin", "secret").unwrap();
        let claims = validate_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "owner@example.com");
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = create_token(Uuid::new_v4(), "a@b.c", "agent", "secret").unwrap();
        assert!(validate_token(&token, "other-secret").is_err());
    }

    #[test]
    fn password_hashing() {
        let hashed = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hashed).unwrap());
        assert!(!verify_password("hunter3", &hashed).unwrap());
    }
}
