//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

/// One entry of `GET /chat/{room_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageDto {
    pub id: i64,
    pub room_id: String,
    pub user_id: String,
    pub full_name: String,
    pub text: String,
    /// RFC 3339 in the display offset
    pub created_at: String,
    /// `HH:MM` in the display offset
    pub time: String,
    pub seen: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkSeenResponse {
    pub updated: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
}

/// `GET /debug/rooms`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomOverviewDto {
    pub connections: usize,
    pub chat: Vec<GroupOccupancyDto>,
    pub video: Vec<GroupOccupancyDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupOccupancyDto {
    pub room_id: String,
    pub connections: usize,
}
