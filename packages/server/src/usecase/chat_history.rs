//! UseCase: チャット履歴の参照（listMessages / markSeen / unreadCount）
//!
//! HTTP API から呼ばれる読み取り側の操作です。
//! いずれも呼び出したユーザーがルームのメンバーであることを要求します。

use std::sync::Arc;

use crate::domain::{ChatMessage, MembershipAuthority, MessageLog, RoomId, VerifiedUser};

use super::error::HistoryError;

pub struct ChatHistoryUseCase {
    membership: Arc<dyn MembershipAuthority>,
    message_log: Arc<dyn MessageLog>,
}

impl ChatHistoryUseCase {
    pub fn new(
        membership: Arc<dyn MembershipAuthority>,
        message_log: Arc<dyn MessageLog>,
    ) -> Self {
        Self {
            membership,
            message_log,
        }
    }

    /// ルームの全メッセージを挿入順に返す（`seen` は呼び出したユーザー視点）
    pub async fn list_messages(
        &self,
        user: &VerifiedUser,
        room_id: String,
    ) -> Result<Vec<ChatMessage>, HistoryError> {
        let room_id = self.authorize(user, room_id).await?;
        Ok(self.message_log.list(&room_id, &user.id).await?)
    }

    /// 呼び出し時点で存在するメッセージを全て既読にし、新たに既読になった件数を返す
    pub async fn mark_seen(
        &self,
        user: &VerifiedUser,
        room_id: String,
    ) -> Result<u64, HistoryError> {
        let room_id = self.authorize(user, room_id).await?;
        let updated = self.message_log.mark_seen(&room_id, &user.id).await?;
        tracing::debug!(
            "Marked {} message(s) seen in room '{}' for '{}'",
            updated,
            room_id.as_str(),
            user.id.as_str()
        );
        Ok(updated)
    }

    pub async fn unread_count(
        &self,
        user: &VerifiedUser,
        room_id: String,
    ) -> Result<u64, HistoryError> {
        let room_id = self.authorize(user, room_id).await?;
        Ok(self.message_log.unread_count(&room_id, &user.id).await?)
    }

    async fn authorize(&self, user: &VerifiedUser, room_id: String) -> Result<RoomId, HistoryError> {
        let room_id = RoomId::new(room_id).map_err(HistoryError::InvalidRoomId)?;
        if !self.membership.is_member(&room_id, &user.id).await? {
            return Err(HistoryError::NotAMember {
                room_id: room_id.into_string(),
                user_id: user.id.as_str().to_string(),
            });
        }
        Ok(room_id)
    }
}
