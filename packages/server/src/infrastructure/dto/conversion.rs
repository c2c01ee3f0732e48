//! Conversion logic between DTOs and domain / usecase types.

use std::fmt::Display;

use tsudoi_shared::time::{timestamp_to_hh_mm, timestamp_to_rfc3339};

use crate::domain::{AuthError, ChatMessage, GroupOccupancy, VerifiedUser};
use crate::infrastructure::dto::{http, websocket as ws};
use crate::usecase::{
    AuthenticateError, JoinError, RoomOverview, SendMessageError, SignalError,
};

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&VerifiedUser> for ws::UserInfo {
    fn from(user: &VerifiedUser) -> Self {
        Self {
            id: user.id.as_str().to_string(),
            full_name: user.full_name.clone(),
        }
    }
}

impl ws::ReceiveMessagePayload {
    pub fn from_domain(message: &ChatMessage, offset_minutes: i32) -> Self {
        Self {
            user: ws::UserInfo {
                id: message.author.as_str().to_string(),
                full_name: message.author_name.clone(),
            },
            text: message.text.as_str().to_string(),
            time: timestamp_to_hh_mm(message.created_at.value(), offset_minutes),
        }
    }
}

impl http::ChatMessageDto {
    pub fn from_domain(message: &ChatMessage, offset_minutes: i32) -> Self {
        Self {
            id: message.id.value(),
            room_id: message.room_id.as_str().to_string(),
            user_id: message.author.as_str().to_string(),
            full_name: message.author_name.clone(),
            text: message.text.as_str().to_string(),
            created_at: timestamp_to_rfc3339(message.created_at.value(), offset_minutes),
            time: timestamp_to_hh_mm(message.created_at.value(), offset_minutes),
            seen: message.seen,
        }
    }
}

impl From<GroupOccupancy> for http::GroupOccupancyDto {
    fn from(model: GroupOccupancy) -> Self {
        Self {
            room_id: model.room_id.into_string(),
            connections: model.connections,
        }
    }
}

impl From<RoomOverview> for http::RoomOverviewDto {
    fn from(model: RoomOverview) -> Self {
        Self {
            connections: model.connections,
            chat: model.chat.into_iter().map(Into::into).collect(),
            video: model.video.into_iter().map(Into::into).collect(),
        }
    }
}

// ========================================
// UseCase Error → Negative acknowledgement
// ========================================

impl From<&AuthError> for ws::ErrorCode {
    fn from(error: &AuthError) -> Self {
        match error {
            AuthError::InvalidToken => ws::ErrorCode::InvalidToken,
            AuthError::Blocked(_) => ws::ErrorCode::UserBlocked,
            AuthError::Unavailable(_) => ws::ErrorCode::MembershipUnavailable,
        }
    }
}

impl From<&AuthenticateError> for ws::ErrorCode {
    fn from(error: &AuthenticateError) -> Self {
        match error {
            AuthenticateError::Auth(e) => e.into(),
            AuthenticateError::AlreadyAuthenticated(_) => ws::ErrorCode::AlreadyAuthenticated,
            AuthenticateError::Registry(_) => ws::ErrorCode::NotAuthenticated,
        }
    }
}

impl From<&JoinError> for ws::ErrorCode {
    fn from(error: &JoinError) -> Self {
        match error {
            JoinError::InvalidRoomId(_) => ws::ErrorCode::ValidationFailed,
            JoinError::NotAuthenticated | JoinError::Registry(_) => {
                ws::ErrorCode::NotAuthenticated
            }
            JoinError::NotAMember { .. } => ws::ErrorCode::NotAMember,
            JoinError::MembershipUnavailable(_) => ws::ErrorCode::MembershipUnavailable,
        }
    }
}

impl From<&SendMessageError> for ws::ErrorCode {
    fn from(error: &SendMessageError) -> Self {
        match error {
            SendMessageError::Validation(_) => ws::ErrorCode::ValidationFailed,
            SendMessageError::NotAuthenticated | SendMessageError::Registry(_) => {
                ws::ErrorCode::NotAuthenticated
            }
            SendMessageError::NotInRoom(_) => ws::ErrorCode::NotInRoom,
            SendMessageError::PersistenceFailed(_) => ws::ErrorCode::PersistenceFailed,
        }
    }
}

impl From<&SignalError> for ws::ErrorCode {
    fn from(error: &SignalError) -> Self {
        match error {
            SignalError::Validation(_) => ws::ErrorCode::ValidationFailed,
            SignalError::NotInRoom(_) => ws::ErrorCode::NotInRoom,
            SignalError::PeerNotInRoom(_) => ws::ErrorCode::PeerNotInRoom,
        }
    }
}

/// 送信元に返す否定応答（`error` イベント）を組み立てる
pub fn rejection<E>(source: &str, room_id: Option<&str>, error: &E) -> ws::ServerEvent
where
    E: Display,
    for<'a> ws::ErrorCode: From<&'a E>,
{
    ws::ServerEvent::Error(ws::ErrorPayload {
        source: source.to_string(),
        room_id: room_id.map(str::to_string),
        code: ws::ErrorCode::from(error),
        message: error.to_string(),
    })
}
