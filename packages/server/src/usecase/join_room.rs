//! UseCase: チャットルームへの join / leave

use std::sync::Arc;

use crate::domain::{ConnectionId, GroupKind, RoomGroupRepository, RoomId};

use super::{
    error::JoinError,
    membership_guard::{Admission, MembershipGuard},
};

pub struct JoinRoomUseCase {
    guard: Arc<MembershipGuard>,
    chat_groups: Arc<dyn RoomGroupRepository>,
}

impl JoinRoomUseCase {
    pub fn new(guard: Arc<MembershipGuard>, chat_groups: Arc<dyn RoomGroupRepository>) -> Self {
        Self { guard, chat_groups }
    }

    /// 接続をルームのチャットグループに加える
    ///
    /// 認証済みかつルームのメンバーである場合のみ受理されます。
    pub async fn join(
        &self,
        connection_id: &ConnectionId,
        room_id: String,
    ) -> Result<Admission, JoinError> {
        let room_id = RoomId::new(room_id).map_err(JoinError::InvalidRoomId)?;
        self.guard
            .admit(
                self.chat_groups.as_ref(),
                GroupKind::Chat,
                connection_id,
                room_id,
            )
            .await
    }

    /// 接続をルームのチャットグループから外す（参加していなければ `false`）
    pub fn leave(&self, connection_id: &ConnectionId, room_id: String) -> Result<bool, JoinError> {
        let room_id = RoomId::new(room_id).map_err(JoinError::InvalidRoomId)?;
        Ok(self.guard.release(
            self.chat_groups.as_ref(),
            GroupKind::Chat,
            connection_id,
            &room_id,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ConnectionRepository, Timestamp, UserId, ValueObjectError, VerifiedUser},
        infrastructure::{
            fixtures::DirectorySeed,
            repository::{
                InMemoryConnectionRepository, InMemoryDirectory, InMemoryRoomGroupRepository,
            },
        },
    };

    async fn setup() -> (
        JoinRoomUseCase,
        Arc<InMemoryConnectionRepository>,
        Arc<InMemoryRoomGroupRepository>,
    ) {
        let directory = Arc::new(InMemoryDirectory::new());
        directory
            .add_member(
                &RoomId::new("R1".to_string()).unwrap(),
                &UserId::new("alice".to_string()).unwrap(),
            )
            .await
            .unwrap();
        let connections = Arc::new(InMemoryConnectionRepository::new());
        let chat_groups = Arc::new(InMemoryRoomGroupRepository::new());
        let guard = Arc::new(MembershipGuard::new(connections.clone(), directory));
        (
            JoinRoomUseCase::new(guard, chat_groups.clone()),
            connections,
            chat_groups,
        )
    }

    fn connect_as(connections: &InMemoryConnectionRepository, user_id: &str) -> ConnectionId {
        let connection_id = ConnectionId::generate();
        connections.register(connection_id.clone(), Timestamp::new(0));
        let user = VerifiedUser::new(UserId::new(user_id.to_string()).unwrap(), user_id.to_string());
        connections.attach_user(&connection_id, user).unwrap();
        connection_id
    }

    #[tokio::test]
    async fn test_member_joins_chat_group() {
        // テスト項目: メンバーは join でき、グループに加わる
        // given (前提条件):
        let (usecase, connections, chat_groups) = setup().await;
        let alice = connect_as(&connections, "alice");

        // when (操作):
        let admission = usecase.join(&alice, "R1".to_string()).await.unwrap();

        // then (期待する結果):
        assert_eq!(admission.room_id.as_str(), "R1");
        assert!(admission.newly_joined);
        assert!(chat_groups.contains(&admission.room_id, &alice));
    }

    #[tokio::test]
    async fn test_non_member_is_rejected() {
        // テスト項目: メンバーでないユーザーの join は拒否され、グループは変化しない
        // given (前提条件):
        let (usecase, connections, chat_groups) = setup().await;
        let bob = connect_as(&connections, "bob");

        // when (操作):
        let result = usecase.join(&bob, "R1".to_string()).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(JoinError::NotAMember {
                room_id: "R1".to_string(),
                user_id: "bob".to_string(),
            })
        );
        assert!(chat_groups.occupancy().is_empty());
    }

    #[tokio::test]
    async fn test_empty_room_id_is_rejected() {
        // テスト項目: 空のルーム ID は検証エラーになる
        // given (前提条件):
        let (usecase, connections, _) = setup().await;
        let alice = connect_as(&connections, "alice");

        // when (操作):
        let result = usecase.join(&alice, String::new()).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(JoinError::InvalidRoomId(ValueObjectError::Empty("room_id")))
        );
    }

    #[tokio::test]
    async fn test_leave_removes_from_group() {
        // テスト項目: leave で接続がグループから外れ、2 回目は false を返す
        // given (前提条件):
        let (usecase, connections, chat_groups) = setup().await;
        let alice = connect_as(&connections, "alice");
        usecase.join(&alice, "R1".to_string()).await.unwrap();

        // when (操作):
        let first = usecase.leave(&alice, "R1".to_string()).unwrap();
        let second = usecase.leave(&alice, "R1".to_string()).unwrap();

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert!(chat_groups.occupancy().is_empty());
    }
}
