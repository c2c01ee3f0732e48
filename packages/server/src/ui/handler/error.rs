//! HTTP API error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    domain::AuthError, infrastructure::dto::http::ErrorResponse, usecase::HistoryError,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing or malformed bearer token")]
    MissingToken,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    History(#[from] HistoryError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingToken => StatusCode::UNAUTHORIZED,
            ApiError::Auth(AuthError::InvalidToken) => StatusCode::UNAUTHORIZED,
            ApiError::Auth(AuthError::Blocked(_)) => StatusCode::FORBIDDEN,
            ApiError::Auth(AuthError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::History(HistoryError::InvalidRoomId(_)) => StatusCode::BAD_REQUEST,
            ApiError::History(HistoryError::NotAMember { .. }) => StatusCode::FORBIDDEN,
            ApiError::History(HistoryError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("HTTP request failed: {}", self);
        } else {
            tracing::warn!("HTTP request rejected ({}): {}", status, self);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StorageError;

    #[test]
    fn test_status_codes() {
        // テスト項目: エラーの種類ごとに HTTP ステータスが決まる
        // given (前提条件):
        let cases = [
            (ApiError::MissingToken, StatusCode::UNAUTHORIZED),
            (
                ApiError::Auth(AuthError::Blocked("mallory".to_string())),
                StatusCode::FORBIDDEN,
            ),
            (
                ApiError::History(HistoryError::NotAMember {
                    room_id: "R1".to_string(),
                    user_id: "bob".to_string(),
                }),
                StatusCode::FORBIDDEN,
            ),
            (
                ApiError::History(HistoryError::Storage(StorageError::Backend(
                    "locked".to_string(),
                ))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        // when (操作) / then (期待する結果):
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
