//! グループ参加の入場判定
//!
//! チャットとビデオ通話の join はどちらも「認証済み」かつ「ルームのメンバー」であることを
//! 要求します。判定と、Connection Registry / Room Broadcast Group への登録をここにまとめます。

use std::sync::Arc;

use crate::domain::{
    ConnectionId, ConnectionRepository, GroupKind, MembershipAuthority, RegistryError,
    RoomGroupRepository, RoomId, VerifiedUser,
};

use super::error::JoinError;

/// join が受理された結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub room_id: RoomId,
    pub user: VerifiedUser,
    /// 今回初めてグループに加わったか（既に参加済みなら `false`）
    pub newly_joined: bool,
}

pub struct MembershipGuard {
    connections: Arc<dyn ConnectionRepository>,
    membership: Arc<dyn MembershipAuthority>,
}

impl MembershipGuard {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        membership: Arc<dyn MembershipAuthority>,
    ) -> Self {
        Self {
            connections,
            membership,
        }
    }

    /// 接続のユーザーがルームのメンバーであることを確認する
    pub async fn authorize(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
    ) -> Result<VerifiedUser, JoinError> {
        let user = self
            .connections
            .user_of(connection_id)?
            .ok_or(JoinError::NotAuthenticated)?;

        match self.membership.is_member(room_id, &user.id).await {
            Ok(true) => Ok(user),
            Ok(false) => {
                tracing::warn!(
                    "User '{}' is not a member of room '{}'",
                    user.id.as_str(),
                    room_id.as_str()
                );
                Err(JoinError::NotAMember {
                    room_id: room_id.as_str().to_string(),
                    user_id: user.id.into_string(),
                })
            }
            Err(e) => {
                tracing::error!(
                    "Membership check for room '{}' failed: {}",
                    room_id.as_str(),
                    e
                );
                Err(JoinError::MembershipUnavailable(e))
            }
        }
    }

    /// 入場判定をしたうえで接続をグループに加える
    ///
    /// Registry への記録 → グループへの追加の順に行い、その間に切断された場合は
    /// グループから取り除きます（切断済みの接続がグループに残らないように）。
    pub async fn admit(
        &self,
        groups: &dyn RoomGroupRepository,
        kind: GroupKind,
        connection_id: &ConnectionId,
        room_id: RoomId,
    ) -> Result<Admission, JoinError> {
        let user = self.authorize(connection_id, &room_id).await?;

        self.connections.record_join(connection_id, kind, &room_id)?;
        let newly_joined = groups.join(&room_id, connection_id);

        if !self.connections.contains(connection_id) {
            groups.leave(&room_id, connection_id);
            return Err(JoinError::Registry(RegistryError::ConnectionNotFound(
                connection_id.as_str().to_string(),
            )));
        }

        tracing::info!(
            "Connection '{}' ({}) joined {:?} group of room '{}'",
            connection_id.as_str(),
            user.id.as_str(),
            kind,
            room_id.as_str()
        );
        Ok(Admission {
            room_id,
            user,
            newly_joined,
        })
    }

    /// 接続をグループから外す（参加していなければ `false`）
    pub fn release(
        &self,
        groups: &dyn RoomGroupRepository,
        kind: GroupKind,
        connection_id: &ConnectionId,
        room_id: &RoomId,
    ) -> bool {
        self.connections.record_leave(connection_id, kind, room_id);
        let removed = groups.leave(room_id, connection_id);
        if removed {
            tracing::info!(
                "Connection '{}' left {:?} group of room '{}'",
                connection_id.as_str(),
                kind,
                room_id.as_str()
            );
        }
        removed
    }
}
