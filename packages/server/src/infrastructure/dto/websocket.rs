//! WebSocket relay event DTOs.
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}` with
//! kebab-case event names and camelCase payload fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events sent by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    Authenticate(AuthenticatePayload),
    JoinRoom(RoomPayload),
    LeaveRoom(RoomPayload),
    SendMessage(SendMessagePayload),
    VideoJoinRoom(RoomPayload),
    VideoLeaveRoom(RoomPayload),
    VideoOffer(OfferPayload),
    VideoAnswer(AnswerPayload),
    VideoIceCandidate(CandidatePayload),
}

impl ClientEvent {
    /// Wire name of the event, used as the `source` of negative acknowledgements.
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Authenticate(_) => "authenticate",
            ClientEvent::JoinRoom(_) => "join-room",
            ClientEvent::LeaveRoom(_) => "leave-room",
            ClientEvent::SendMessage(_) => "send-message",
            ClientEvent::VideoJoinRoom(_) => "video-join-room",
            ClientEvent::VideoLeaveRoom(_) => "video-leave-room",
            ClientEvent::VideoOffer(_) => "video-offer",
            ClientEvent::VideoAnswer(_) => "video-answer",
            ClientEvent::VideoIceCandidate(_) => "video-ice-candidate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatePayload {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPayload {
    pub room_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    #[serde(default)]
    pub room_id: String,
    pub message: OutgoingChatMessage,
}

/// Chat message body as sent by the client.
///
/// `user_id` and `user` are accepted for compatibility with older clients and
/// ignored: the author is always the identity attached to the connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingChatMessage {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferPayload {
    pub room_id: String,
    pub offer: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPayload {
    pub room_id: String,
    pub answer: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePayload {
    pub room_id: String,
    pub candidate: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

/// Events sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    Connected(ConnectedPayload),
    Authenticated(UserInfo),
    RoomJoined(RoomPayload),
    RoomLeft(RoomPayload),
    VideoRoomJoined(VideoRoomJoinedPayload),
    VideoRoomLeft(RoomPayload),
    ReceiveMessage(ReceiveMessagePayload),
    VideoUserJoined(PeerPayload),
    VideoUserLeft(PeerPayload),
    VideoOffer(RelayedOffer),
    VideoAnswer(RelayedAnswer),
    VideoIceCandidate(RelayedCandidate),
    Error(ErrorPayload),
}

impl ServerEvent {
    pub fn to_json(&self) -> String {
        // Every payload is built from strings and JSON values, so encoding cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedPayload {
    pub socket_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiveMessagePayload {
    pub user: UserInfo,
    pub text: String,
    /// Server-assigned creation time, `HH:MM` in the display offset.
    pub time: String,
}

/// Positive acknowledgement of `video-join-room`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRoomJoinedPayload {
    pub room_id: String,
    /// Connection ids already in the call, to which the new peer sends offers.
    pub peers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerPayload {
    pub socket_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayedOffer {
    pub offer: Value,
    pub sender: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayedAnswer {
    pub answer: Value,
    pub sender: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayedCandidate {
    pub candidate: Value,
    pub sender: String,
}

/// Negative acknowledgement codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    InvalidPayload,
    ValidationFailed,
    NotAuthenticated,
    InvalidToken,
    UserBlocked,
    AlreadyAuthenticated,
    NotAMember,
    NotInRoom,
    PeerNotInRoom,
    PersistenceFailed,
    MembershipUnavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    /// Name of the inbound event that was rejected.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    pub code: ErrorCode,
    pub message: String,
}
