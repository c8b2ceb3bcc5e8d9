use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};

use crate::{
    infrastructure::{
        auth::{decode_token, extract_bearer, Claims},
        config::Config,
    },
    presentation::rest::ApiError,
};

/// Verified bearer identity. Rejects with 401 when the token is missing,
/// malformed, tampered or expired.
pub struct AuthUser(pub Claims);

/// `AuthUser` narrowed to admins. Rejects with 403 when the verified claims
/// carry a non-admin role.
pub struct AdminUser(pub Claims);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let config = parts
            .extensions
            .get::<Config>()
            .ok_or_else(|| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "missing config"))?;

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(extract_bearer)
            .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?;

        let claims = decode_token(&config.secret, token)
            .map_err(|e| ApiError::unauthorized(e.to_string()))?;

        Ok(Self(claims))
    }
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;

        if !claims.is_admin() {
            return Err(ApiError::forbidden());
        }

        Ok(Self(claims))
    }
}
