//! UseCase 層のエラー型
//!
//! いずれも送信元の接続に否定応答（`error` イベント）として返されるか、
//! HTTP のステータスコードに変換されます。プロセスを落とすものはありません。

use thiserror::Error;

use crate::domain::{AuthError, RegistryError, StorageError, ValueObjectError};

/// 接続へのユーザー紐づけのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthenticateError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("connection is already authenticated as '{0}'")]
    AlreadyAuthenticated(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// ブロードキャストグループへの join のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("invalid room id: {0}")]
    InvalidRoomId(ValueObjectError),

    #[error("connection is not authenticated")]
    NotAuthenticated,

    #[error("user '{user_id}' is not a member of room '{room_id}'")]
    NotAMember { room_id: String, user_id: String },

    #[error("membership check failed: {0}")]
    MembershipUnavailable(StorageError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// チャットメッセージ送信のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendMessageError {
    #[error("invalid message: {0}")]
    Validation(ValueObjectError),

    #[error("connection is not authenticated")]
    NotAuthenticated,

    #[error("connection has not joined room '{0}'")]
    NotInRoom(String),

    #[error("failed to persist message: {0}")]
    PersistenceFailed(StorageError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// シグナリング中継のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("invalid signaling payload: {0}")]
    Validation(ValueObjectError),

    #[error("connection has not joined the video call of room '{0}'")]
    NotInRoom(String),

    #[error("peer '{0}' is not in the video call")]
    PeerNotInRoom(String),
}

/// チャット履歴（読み取り側）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("invalid room id: {0}")]
    InvalidRoomId(ValueObjectError),

    #[error("user '{user_id}' is not a member of room '{room_id}'")]
    NotAMember { room_id: String, user_id: String },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
