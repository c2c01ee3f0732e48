//! UseCase: チャットメッセージ送信（sendMessage）
//!
//! ## 処理の流れ
//!
//! 1. ルーム ID・本文の検証
//! 2. 発言者は接続に紐づいた認証済みユーザー（ペイロード内の自己申告は使わない）
//! 3. 送信者がそのルームのチャットグループに参加していることを確認
//! 4. Durable Message Log へ永続化
//! 5. 永続化に成功した場合のみ、送信者を含むチャットグループ全員へブロードキャスト
//!
//! 4 と 5 はルームごとの直列化ロックの中で行うため、同じルームでは
//! 配信順序と永続化順序が一致します。別のルームの送信は互いに待ちません。

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tsudoi_shared::time::Clock;

use crate::domain::{
    ChatMessage, ConnectionId, ConnectionRepository, MessageLog, MessageText, RoomId, Timestamp,
    VerifiedUser,
};

use super::{broadcast::RoomBroadcaster, error::SendMessageError};

/// 送信結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub message: ChatMessage,
    /// 実際に配信できた接続
    pub delivered: Vec<ConnectionId>,
}

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    connections: Arc<dyn ConnectionRepository>,
    message_log: Arc<dyn MessageLog>,
    chat: Arc<RoomBroadcaster>,
    clock: Arc<dyn Clock>,
    sequencers: DashMap<RoomId, Arc<Mutex<()>>>,
}

impl SendMessageUseCase {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        message_log: Arc<dyn MessageLog>,
        chat: Arc<RoomBroadcaster>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            connections,
            message_log,
            chat,
            clock,
            sequencers: DashMap::new(),
        }
    }

    /// メッセージ送信を実行
    ///
    /// # Arguments
    ///
    /// * `sender` - 送信元の接続
    /// * `room_id` - 送信先ルーム
    /// * `text` - 本文
    /// * `render` - 永続化済みメッセージから配信用 JSON を生成する関数（DTO 層が渡す）
    pub async fn execute<F>(
        &self,
        sender: &ConnectionId,
        room_id: String,
        text: String,
        render: F,
    ) -> Result<SentMessage, SendMessageError>
    where
        F: FnOnce(&ChatMessage) -> String + Send,
    {
        let room_id = RoomId::new(room_id).map_err(SendMessageError::Validation)?;
        let text = MessageText::new(text).map_err(SendMessageError::Validation)?;
        let author = self
            .connections
            .user_of(sender)?
            .ok_or(SendMessageError::NotAuthenticated)?;

        if !self.chat.groups().contains(&room_id, sender) {
            tracing::warn!(
                "Connection '{}' sent to room '{}' without joining it",
                sender.as_str(),
                room_id.as_str()
            );
            return Err(SendMessageError::NotInRoom(room_id.into_string()));
        }

        let sequencer = self.sequencer(&room_id);
        let result = {
            let _turn = sequencer.lock().await;
            self.persist_and_broadcast(&room_id, &author, &text, render).await
        };
        drop(sequencer);
        self.release_sequencer(&room_id);

        result
    }

    async fn persist_and_broadcast<F>(
        &self,
        room_id: &RoomId,
        author: &VerifiedUser,
        text: &MessageText,
        render: F,
    ) -> Result<SentMessage, SendMessageError>
    where
        F: FnOnce(&ChatMessage) -> String + Send,
    {
        let created_at = Timestamp::new(self.clock.now_millis());
        let message = self
            .message_log
            .append(room_id, author, text, created_at)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to persist message in room '{}': {}",
                    room_id.as_str(),
                    e
                );
                SendMessageError::PersistenceFailed(e)
            })?;

        let payload = render(&message);
        let delivered = self.chat.broadcast(room_id, &payload, None).await;

        Ok(SentMessage { message, delivered })
    }

    fn sequencer(&self, room_id: &RoomId) -> Arc<Mutex<()>> {
        self.sequencers.entry(room_id.clone()).or_default().clone()
    }

    /// 待っている送信がなければルームのロックを捨てる
    fn release_sequencer(&self, room_id: &RoomId) {
        self.sequencers.remove_if(room_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            MessagePusher, RoomGroupRepository, StorageError, UserId, VerifiedUser,
            repository::MockMessageLog,
        },
        infrastructure::{
            message_pusher::WebSocketMessagePusher,
            repository::{
                InMemoryConnectionRepository, InMemoryMessageLog, InMemoryRoomGroupRepository,
            },
        },
    };
    use tokio::sync::mpsc;
    use tsudoi_shared::time::FixedClock;

    struct Fixture {
        usecase: Arc<SendMessageUseCase>,
        connections: Arc<InMemoryConnectionRepository>,
        chat_groups: Arc<InMemoryRoomGroupRepository>,
        pusher: Arc<WebSocketMessagePusher>,
    }

    fn create_fixture(message_log: Arc<dyn MessageLog>) -> Fixture {
        let connections = Arc::new(InMemoryConnectionRepository::new());
        let chat_groups = Arc::new(InMemoryRoomGroupRepository::new());
        let pusher = Arc::new(WebSocketMessagePusher::new());
        let chat = Arc::new(RoomBroadcaster::new(chat_groups.clone(), pusher.clone()));
        let usecase = Arc::new(SendMessageUseCase::new(
            connections.clone(),
            message_log,
            chat,
            Arc::new(FixedClock::new(1_700_000_000_000)),
        ));
        Fixture {
            usecase,
            connections,
            chat_groups,
            pusher,
        }
    }

    fn room(id: &str) -> RoomId {
        RoomId::new(id.to_string()).unwrap()
    }

    async fn connect(
        fixture: &Fixture,
        user_id: &str,
        joined: Option<&str>,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection_id = ConnectionId::generate();
        fixture
            .connections
            .register(connection_id.clone(), Timestamp::new(0));
        let user = VerifiedUser::new(UserId::new(user_id.to_string()).unwrap(), user_id.to_string());
        fixture
            .connections
            .attach_user(&connection_id, user)
            .unwrap();
        fixture
            .pusher
            .register_client(connection_id.clone(), tx)
            .await;
        if let Some(room_id) = joined {
            fixture.chat_groups.join(&room(room_id), &connection_id);
        }
        (connection_id, rx)
    }

    fn render(message: &ChatMessage) -> String {
        format!("{}:{}", message.author.as_str(), message.text.as_str())
    }

    #[tokio::test]
    async fn test_send_message_reaches_every_member_including_sender() {
        // テスト項目: 送信者を含むチャットグループ全員にちょうど 1 回ずつ届く
        // given (前提条件):
        let fixture = create_fixture(Arc::new(InMemoryMessageLog::new()));
        let (alice, mut alice_rx) = connect(&fixture, "alice", Some("R1")).await;
        let (_bob, mut bob_rx) = connect(&fixture, "bob", Some("R1")).await;
        let (_carol, mut carol_rx) = connect(&fixture, "carol", Some("R2")).await;

        // when (操作):
        let sent = fixture
            .usecase
            .execute(&alice, "R1".to_string(), "hi".to_string(), render)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(sent.delivered.len(), 2);
        assert_eq!(sent.message.created_at, Timestamp::new(1_700_000_000_000));
        assert_eq!(alice_rx.recv().await, Some("alice:hi".to_string()));
        assert_eq!(bob_rx.recv().await, Some("alice:hi".to_string()));
        assert!(alice_rx.try_recv().is_err());
        assert!(carol_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_message_requires_joined_room() {
        // テスト項目: チャットグループに参加していない接続は送信できない
        // given (前提条件):
        let fixture = create_fixture(Arc::new(InMemoryMessageLog::new()));
        let (alice, _alice_rx) = connect(&fixture, "alice", None).await;

        // when (操作):
        let result = fixture
            .usecase
            .execute(&alice, "R1".to_string(), "hi".to_string(), render)
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(SendMessageError::NotInRoom("R1".to_string())));
    }

    #[tokio::test]
    async fn test_send_message_rejects_empty_text() {
        // テスト項目: 空の本文は永続化もブロードキャストもされない
        // given (前提条件):
        let mut message_log = MockMessageLog::new();
        message_log.expect_append().never();
        let fixture = create_fixture(Arc::new(message_log));
        let (alice, mut alice_rx) = connect(&fixture, "alice", Some("R1")).await;

        // when (操作):
        let result = fixture
            .usecase
            .execute(&alice, "R1".to_string(), String::new(), render)
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(SendMessageError::Validation(_))));
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_persistence_failure_broadcasts_nothing() {
        // テスト項目: 永続化に失敗したメッセージは誰にも配信されない
        // given (前提条件):
        let mut message_log = MockMessageLog::new();
        message_log
            .expect_append()
            .returning(|_, _, _, _| Err(StorageError::Backend("disk full".to_string())));
        let fixture = create_fixture(Arc::new(message_log));
        let (alice, mut alice_rx) = connect(&fixture, "alice", Some("R1")).await;
        let (_bob, mut bob_rx) = connect(&fixture, "bob", Some("R1")).await;

        // when (操作):
        let result = fixture
            .usecase
            .execute(&alice, "R1".to_string(), "hi".to_string(), render)
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(SendMessageError::PersistenceFailed(_))));
        assert!(alice_rx.try_recv().is_err());
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unauthenticated_connection_cannot_send() {
        // テスト項目: 認証されていない接続からの送信は拒否される
        // given (前提条件):
        let fixture = create_fixture(Arc::new(InMemoryMessageLog::new()));
        let connection_id = ConnectionId::generate();
        fixture
            .connections
            .register(connection_id.clone(), Timestamp::new(0));
        fixture.chat_groups.join(&room("R1"), &connection_id);

        // when (操作):
        let result = fixture
            .usecase
            .execute(&connection_id, "R1".to_string(), "hi".to_string(), render)
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(SendMessageError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_concurrent_sends_are_delivered_in_persistence_order() {
        // テスト項目: 同じルームへの同時送信でも、全員が永続化順に受信する
        // given (前提条件):
        let message_log = Arc::new(InMemoryMessageLog::new());
        let fixture = create_fixture(message_log.clone());
        let (alice, mut alice_rx) = connect(&fixture, "alice", Some("R1")).await;
        let (bob, mut bob_rx) = connect(&fixture, "bob", Some("R1")).await;

        // when (操作):
        let mut handles = Vec::new();
        for i in 0..20 {
            let usecase = fixture.usecase.clone();
            let sender = if i % 2 == 0 { alice.clone() } else { bob.clone() };
            handles.push(tokio::spawn(async move {
                usecase
                    .execute(&sender, "R1".to_string(), format!("m{}", i), |m| {
                        m.id.value().to_string()
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // then (期待する結果):
        let persisted: Vec<String> = message_log
            .list(&room("R1"), &UserId::new("alice".to_string()).unwrap())
            .await
            .unwrap()
            .iter()
            .map(|m| m.id.value().to_string())
            .collect();
        let mut alice_seen = Vec::new();
        let mut bob_seen = Vec::new();
        for _ in 0..20 {
            alice_seen.push(alice_rx.recv().await.unwrap());
            bob_seen.push(bob_rx.recv().await.unwrap());
        }
        assert_eq!(alice_seen, persisted);
        assert_eq!(bob_seen, persisted);
        assert!(fixture.usecase.sequencers.is_empty());
    }

    #[tokio::test]
    async fn test_room_lock_is_released_after_send() {
        // テスト項目: 送信が終わったルームの直列化ロックは残らない（失敗時も同様）
        // given (前提条件):
        let fixture = create_fixture(Arc::new(InMemoryMessageLog::new()));
        let (alice, _alice_rx) = connect(&fixture, "alice", Some("R1")).await;
        let (carol, _carol_rx) = connect(&fixture, "carol", Some("R2")).await;

        // when (操作):
        fixture
            .usecase
            .execute(&alice, "R1".to_string(), "hi".to_string(), render)
            .await
            .unwrap();
        fixture
            .usecase
            .execute(&carol, "R2".to_string(), "hello".to_string(), render)
            .await
            .unwrap();

        // then (期待する結果):
        assert!(fixture.usecase.sequencers.is_empty());

        // given (前提条件): 永続化が失敗するログ
        let mut message_log = MockMessageLog::new();
        message_log
            .expect_append()
            .returning(|_, _, _, _| Err(StorageError::Backend("disk full".to_string())));
        let failing = create_fixture(Arc::new(message_log));
        let (dave, _dave_rx) = connect(&failing, "dave", Some("R3")).await;

        // when (操作):
        let result = failing
            .usecase
            .execute(&dave, "R3".to_string(), "hi".to_string(), render)
            .await;

        // then (期待する結果):
        assert!(result.is_err());
        assert!(failing.usecase.sequencers.is_empty());
    }
}
