//! UseCase: 接続処理（onConnect）
//!
//! 新しい接続に一意な ConnectionId を払い出し、Connection Registry と
//! MessagePusher に登録します。接続時点で認証済みならユーザーも紐づけます。

use std::sync::Arc;

use tsudoi_shared::time::Clock;

use crate::domain::{
    ConnectionId, ConnectionRepository, MessagePusher, PusherChannel, Timestamp, VerifiedUser,
};

/// 接続処理のユースケース
pub struct ConnectParticipantUseCase {
    connections: Arc<dyn ConnectionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl ConnectParticipantUseCase {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            connections,
            message_pusher,
            clock,
        }
    }

    /// 接続を登録して ConnectionId を返す
    ///
    /// # Arguments
    ///
    /// * `sender` - この接続の送信タスクへつながるチャネル
    /// * `user` - アップグレード前に検証済みのユーザー（トークンなしなら `None`）
    pub async fn execute(
        &self,
        sender: PusherChannel,
        user: Option<VerifiedUser>,
    ) -> ConnectionId {
        let connection_id = ConnectionId::generate();
        let connected_at = Timestamp::new(self.clock.now_millis());

        self.connections
            .register(connection_id.clone(), connected_at);
        if let Some(user) = user {
            let user_id = user.id.clone();
            if let Err(e) = self.connections.attach_user(&connection_id, user) {
                tracing::warn!("Failed to attach user '{}': {}", user_id.as_str(), e);
            }
        }
        self.message_pusher
            .register_client(connection_id.clone(), sender)
            .await;

        tracing::info!(
            "Connection '{}' registered ({} active)",
            connection_id.as_str(),
            self.connections.count()
        );
        connection_id
    }
}
