use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{HeaderValue, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{ROLE_USER, ROLE_VENDOR},
};

/// Token payload issued by the external auth module.
#[derive(Debug, Deserialize, Serialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

/// Identity of the caller, resolved per request and passed explicitly to services.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: String,
}

impl AuthUser {
    pub fn buyer(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: ROLE_USER.into(),
        }
    }

    pub fn vendor(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: ROLE_VENDOR.into(),
        }
    }

    pub fn is_vendor(&self) -> bool {
        self.role == ROLE_VENDOR
    }
}

pub fn ensure_vendor(user: &AuthUser) -> Result<(), AppError> {
    if !user.is_vendor() {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

fn user_from_header(auth_header: &HeaderValue) -> Result<AuthUser, AppError> {
    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::BadRequest("Invalid Authorization header".into()))?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::BadRequest("Invalid Authorization scheme".into()))?
        .trim();

    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::BadRequest("Invalid or expired token".into()))?;

    let user_id = Uuid::parse_str(&decoded.claims.sub)
        .map_err(|_| AppError::BadRequest("Invalid user id in token".into()))?;

    Ok(AuthUser {
        user_id,
        role: decoded.claims.role,
    })
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::BadRequest("Missing Authorization header".into()))?;
        user_from_header(auth_header)
    }
}

/// Anonymous callers are allowed; a present but invalid token is still rejected.
impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;
    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        parts
            .headers
            .get(header::AUTHORIZATION)
            .map(user_from_header)
            .transpose()
    }
}
