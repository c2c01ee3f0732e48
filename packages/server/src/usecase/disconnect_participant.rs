//! UseCase: 切断処理（onDisconnect）
//!
//! 接続を Registry から外し、参加していた全てのチャット・ビデオグループから取り除きます。
//! ビデオ通話に残っているピアには退出を通知します。
//! 2 回呼ばれても 2 回目は何もしません。

use std::sync::Arc;

use crate::domain::{ConnectionId, ConnectionRepository, MessagePusher, RoomGroupRepository, RoomId};

use super::broadcast::RoomBroadcaster;

/// 切断時に後片付けしたルームの一覧
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectSummary {
    pub chat_rooms: Vec<RoomId>,
    pub video_rooms: Vec<RoomId>,
}

/// 切断処理のユースケース
pub struct DisconnectParticipantUseCase {
    connections: Arc<dyn ConnectionRepository>,
    chat_groups: Arc<dyn RoomGroupRepository>,
    video: Arc<RoomBroadcaster>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectParticipantUseCase {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        chat_groups: Arc<dyn RoomGroupRepository>,
        video: Arc<RoomBroadcaster>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            connections,
            chat_groups,
            video,
            message_pusher,
        }
    }

    /// 切断処理を実行
    ///
    /// # Arguments
    ///
    /// * `connection_id` - 切断された接続
    /// * `left_announcement` - ビデオ通話の残りのピアに送る JSON（DTO 層で生成されたもの）
    ///
    /// # Returns
    ///
    /// * `Some(DisconnectSummary)` - 後片付けしたルーム
    /// * `None` - 既に切断処理済み
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        left_announcement: &str,
    ) -> Option<DisconnectSummary> {
        let record = self.connections.unregister(connection_id)?;
        self.message_pusher.unregister_client(connection_id).await;

        let mut chat_rooms: Vec<RoomId> = record.chat_rooms.into_iter().collect();
        chat_rooms.sort();
        for room_id in &chat_rooms {
            self.chat_groups.leave(room_id, connection_id);
        }

        let mut video_rooms: Vec<RoomId> = record.video_rooms.into_iter().collect();
        video_rooms.sort();
        for room_id in &video_rooms {
            if self.video.groups().leave(room_id, connection_id) {
                self.video
                    .broadcast(room_id, left_announcement, Some(connection_id))
                    .await;
            }
        }

        tracing::info!(
            "Connection '{}' disconnected (chat rooms: {}, video rooms: {})",
            connection_id.as_str(),
            chat_rooms.len(),
            video_rooms.len()
        );
        Some(DisconnectSummary {
            chat_rooms,
            video_rooms,
        })
    }
}
