//! UseCase: WebRTC シグナリング中継
//!
//! offer / answer / ICE candidate の中身は解釈せず、そのまま中継します。
//! 中継できるのはルームのビデオグループに参加している接続だけで、
//! 送信者自身には決して配信しません。

use std::sync::Arc;

use crate::domain::{ConnectionId, GroupKind, RoomId};

use super::{
    broadcast::RoomBroadcaster,
    error::{JoinError, SignalError},
    membership_guard::{Admission, MembershipGuard},
};

/// ビデオ通話への参加結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoJoin {
    pub admission: Admission,
    /// 参加時点で通話にいた他のピア
    pub peers: Vec<ConnectionId>,
}

pub struct SignalingUseCase {
    guard: Arc<MembershipGuard>,
    video: Arc<RoomBroadcaster>,
}

impl SignalingUseCase {
    pub fn new(guard: Arc<MembershipGuard>, video: Arc<RoomBroadcaster>) -> Self {
        Self { guard, video }
    }

    /// ビデオグループに参加し、既存のピアに新しいピアを通知する（relayJoin）
    ///
    /// `announcement` は既存ピアへ送る JSON です。既に参加済みなら通知しません。
    pub async fn join(
        &self,
        connection_id: &ConnectionId,
        room_id: String,
        announcement: &str,
    ) -> Result<VideoJoin, JoinError> {
        let room_id = RoomId::new(room_id).map_err(JoinError::InvalidRoomId)?;
        let admission = self
            .guard
            .admit(
                self.video.groups(),
                GroupKind::Video,
                connection_id,
                room_id,
            )
            .await?;
        if admission.newly_joined {
            self.video
                .broadcast(&admission.room_id, announcement, Some(connection_id))
                .await;
        }
        let peers = self
            .video
            .groups()
            .members(&admission.room_id)
            .into_iter()
            .filter(|id| id != connection_id)
            .collect();
        Ok(VideoJoin { admission, peers })
    }

    /// ビデオグループから抜け、残りのピアに通知する（relayLeave）
    pub async fn leave(
        &self,
        connection_id: &ConnectionId,
        room_id: String,
        announcement: &str,
    ) -> Result<bool, SignalError> {
        let room_id = RoomId::new(room_id).map_err(SignalError::Validation)?;
        let removed =
            self.guard
                .release(self.video.groups(), GroupKind::Video, connection_id, &room_id);
        if removed {
            self.video
                .broadcast(&room_id, announcement, Some(connection_id))
                .await;
        }
        Ok(removed)
    }

    /// offer / answer / ICE candidate を中継する
    ///
    /// `to` を指定した場合はその接続だけに、指定しない場合は送信者以外の全ピアに届けます。
    /// 実際に配信できた接続を返します。
    pub async fn relay(
        &self,
        sender: &ConnectionId,
        room_id: String,
        to: Option<String>,
        payload: &str,
    ) -> Result<Vec<ConnectionId>, SignalError> {
        let room_id = RoomId::new(room_id).map_err(SignalError::Validation)?;
        if !self.video.groups().contains(&room_id, sender) {
            tracing::warn!(
                "Connection '{}' relayed signaling to room '{}' without joining the call",
                sender.as_str(),
                room_id.as_str()
            );
            return Err(SignalError::NotInRoom(room_id.into_string()));
        }

        match to {
            None => Ok(self
                .video
                .broadcast(&room_id, payload, Some(sender))
                .await),
            Some(target) => {
                let target = ConnectionId::new(target).map_err(SignalError::Validation)?;
                if &target == sender {
                    return Err(SignalError::PeerNotInRoom(target.into_string()));
                }
                self.video
                    .send_to_member(&room_id, &target, payload)
                    .await
                    .map_err(|e| {
                        tracing::warn!("Targeted signaling was not delivered: {}", e);
                        SignalError::PeerNotInRoom(target.as_str().to_string())
                    })?;
                Ok(vec![target])
            }
        }
    }
}
