//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    infrastructure::dto::http::{
        ChatMessageDto, HealthResponse, MarkSeenResponse, RoomOverviewDto, UnreadCountResponse,
    },
    ui::state::AppState,
};

use super::{auth::AuthenticatedUser, error::ApiError};

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Live chat / video group sizes (diagnostics)
pub async fn debug_rooms(State(state): State<Arc<AppState>>) -> Json<RoomOverviewDto> {
    Json(state.get_room_overview_usecase.execute().into())
}

/// `GET /chat/{room_id}`
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(room_id): Path<String>,
) -> Result<Json<Vec<ChatMessageDto>>, ApiError> {
    let messages = state
        .chat_history_usecase
        .list_messages(&user, room_id)
        .await?;

    // Domain Model から DTO への変換
    let dtos = messages
        .iter()
        .map(|message| ChatMessageDto::from_domain(message, state.display_offset_minutes))
        .collect();
    Ok(Json(dtos))
}

/// `PATCH /chat/seen/{room_id}`
pub async fn mark_seen(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(room_id): Path<String>,
) -> Result<Json<MarkSeenResponse>, ApiError> {
    let updated = state.chat_history_usecase.mark_seen(&user, room_id).await?;
    Ok(Json(MarkSeenResponse { updated }))
}

/// `GET /chat/unread/{room_id}`
pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(room_id): Path<String>,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let count = state
        .chat_history_usecase
        .unread_count(&user, room_id)
        .await?;
    Ok(Json(UnreadCountResponse { count }))
}
