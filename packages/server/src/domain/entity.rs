//! Entities
//!
//! ID で識別されるドメインオブジェクトを定義します。

use std::collections::HashSet;

use serde::Serialize;

use super::value_object::{ConnectionId, MessageId, MessageText, RoomId, Timestamp, UserId};

/// 外部の認証基盤によって検証済みのユーザー
///
/// 接続に紐づけられた後は、イベントペイロード内の自己申告 ID ではなく
/// 常にこちらが発言者として扱われます。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedUser {
    pub id: UserId,
    pub full_name: String,
}

impl VerifiedUser {
    pub fn new(id: UserId, full_name: String) -> Self {
        Self { id, full_name }
    }
}

/// 永続化済みチャットメッセージ
///
/// `seen` は閲覧者ごとの既読状態です（閲覧者自身の発言は常に既読）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub room_id: RoomId,
    pub author: UserId,
    pub author_name: String,
    pub text: MessageText,
    pub created_at: Timestamp,
    pub seen: bool,
}

/// ブロードキャストグループの種類
///
/// チャットとビデオ通話は別々のグループとして管理されます。
/// チャットに参加していてもビデオ通話には参加していない、という状態があり得るためです。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Chat,
    Video,
}

/// Connection Registry が保持する接続レコード
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub id: ConnectionId,
    pub user: Option<VerifiedUser>,
    pub chat_rooms: HashSet<RoomId>,
    pub video_rooms: HashSet<RoomId>,
    pub connected_at: Timestamp,
}

impl ConnectionRecord {
    pub fn new(id: ConnectionId, connected_at: Timestamp) -> Self {
        Self {
            id,
            user: None,
            chat_rooms: HashSet::new(),
            video_rooms: HashSet::new(),
            connected_at,
        }
    }

    pub fn rooms(&self, kind: GroupKind) -> &HashSet<RoomId> {
        match kind {
            GroupKind::Chat => &self.chat_rooms,
            GroupKind::Video => &self.video_rooms,
        }
    }

    pub fn rooms_mut(&mut self, kind: GroupKind) -> &mut HashSet<RoomId> {
        match kind {
            GroupKind::Chat => &mut self.chat_rooms,
            GroupKind::Video => &mut self.video_rooms,
        }
    }
}

/// ルームごとのブロードキャストグループの人数（診断用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupOccupancy {
    pub room_id: RoomId,
    pub connections: usize,
}
