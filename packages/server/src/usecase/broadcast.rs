//! Room Broadcast
//!
//! `broadcast(RoomId, Payload, ExcludeConnectionId?)` を提供します。
//! グループのスナップショットを取ってから配信するため、配信中の join / leave と競合しません。

use std::sync::Arc;

use crate::domain::{ConnectionId, MessagePushError, MessagePusher, RoomGroupRepository, RoomId};

/// 1 種類のブロードキャストグループ（チャット or ビデオ）への配信
pub struct RoomBroadcaster {
    groups: Arc<dyn RoomGroupRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl RoomBroadcaster {
    pub fn new(
        groups: Arc<dyn RoomGroupRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            groups,
            message_pusher,
        }
    }

    pub fn groups(&self) -> &dyn RoomGroupRepository {
        self.groups.as_ref()
    }

    /// ルームのグループ全員に配信し、実際に届いた接続を返す
    ///
    /// `exclude` を指定した場合、その接続には配信しません。
    /// ある受信者への配信失敗は、残りの受信者への配信を妨げません。
    pub async fn broadcast(
        &self,
        room_id: &RoomId,
        payload: &str,
        exclude: Option<&ConnectionId>,
    ) -> Vec<ConnectionId> {
        let targets: Vec<ConnectionId> = self
            .groups
            .members(room_id)
            .into_iter()
            .filter(|id| exclude != Some(id))
            .collect();
        if targets.is_empty() {
            return Vec::new();
        }
        let delivered = self.message_pusher.broadcast(&targets, payload).await;
        tracing::debug!(
            "Broadcasted to {}/{} connection(s) in room '{}'",
            delivered.len(),
            targets.len(),
            room_id.as_str()
        );
        delivered
    }

    /// グループ内の特定の接続にのみ配信する
    pub async fn send_to_member(
        &self,
        room_id: &RoomId,
        target: &ConnectionId,
        payload: &str,
    ) -> Result<(), MessagePushError> {
        if !self.groups.contains(room_id, target) {
            return Err(MessagePushError::ClientNotFound(
                target.as_str().to_string(),
            ));
        }
        self.message_pusher.push_to(target, payload).await
    }
}
