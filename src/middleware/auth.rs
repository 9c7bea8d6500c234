use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};

use crate::{error::AppError, state::AppState};

/// The caller behind a valid `Authorization: Bearer <jwt>` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub is_host: bool,
}

pub fn ensure_host(user: &AuthUser) -> Result<(), AppError> {
    if !user.is_host {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Token from a `Bearer` authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or(AppError::Unauthorized("Not authenticated"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::invalid_credentials())?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .or_else(|| auth_str.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::invalid_credentials())?;
    Ok(token)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let user = state.auth.get_current_user_from_token(token).await?;

        Ok(AuthUser {
            user_id: user.id,
            email: user.email,
            is_host: user.is_host,
        })
    }
}
