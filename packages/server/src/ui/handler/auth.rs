//! Bearer token extractor for the HTTP API.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::{domain::VerifiedUser, ui::state::AppState};

use super::error::ApiError;

/// `Authorization: Bearer <token>` を IdentityProvider で検証したユーザー
pub struct AuthenticatedUser(pub VerifiedUser);

impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::MissingToken)?;

        let user = state.authenticate_usecase.verify(token).await?;
        Ok(Self(user))
    }
}
