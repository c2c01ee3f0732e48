//! Shared application state.

use std::sync::Arc;

use tsudoi_shared::time::Clock;

use crate::{
    infrastructure::{
        StorageBackend,
        message_pusher::WebSocketMessagePusher,
        repository::{InMemoryConnectionRepository, InMemoryRoomGroupRepository},
    },
    usecase::{
        AuthenticateUseCase, ChatHistoryUseCase, ConnectParticipantUseCase,
        DisconnectParticipantUseCase, GetRoomOverviewUseCase, JoinRoomUseCase, MembershipGuard,
        RoomBroadcaster, SendMessageUseCase, SignalingUseCase,
    },
};

/// Shared application state
pub struct AppState {
    /// ConnectParticipantUseCase（接続のユースケース）
    pub connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    /// DisconnectParticipantUseCase（切断のユースケース）
    pub disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    /// AuthenticateUseCase（トークン検証・ユーザー紐づけのユースケース）
    pub authenticate_usecase: Arc<AuthenticateUseCase>,
    /// JoinRoomUseCase（チャットルーム join / leave のユースケース）
    pub join_room_usecase: Arc<JoinRoomUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    pub send_message_usecase: Arc<SendMessageUseCase>,
    /// SignalingUseCase（WebRTC シグナリング中継のユースケース）
    pub signaling_usecase: Arc<SignalingUseCase>,
    /// ChatHistoryUseCase（履歴・既読・未読のユースケース）
    pub chat_history_usecase: Arc<ChatHistoryUseCase>,
    /// GetRoomOverviewUseCase（グループ状況取得のユースケース）
    pub get_room_overview_usecase: Arc<GetRoomOverviewUseCase>,
    /// メッセージ時刻の表示に使う UTC オフセット（分）
    pub display_offset_minutes: i32,
}

impl AppState {
    /// ストレージバックエンドから全ての UseCase を組み立てる
    ///
    /// Connection Registry と Room Broadcast Group はプロセス内のメモリ上に置きます。
    pub fn new(
        storage: &StorageBackend,
        clock: Arc<dyn Clock>,
        display_offset_minutes: i32,
    ) -> Self {
        // 1. Presence（接続・ブロードキャストグループ）
        let connections = Arc::new(InMemoryConnectionRepository::new());
        let chat_groups = Arc::new(InMemoryRoomGroupRepository::new());
        let video_groups = Arc::new(InMemoryRoomGroupRepository::new());

        // 2. MessagePusher（WebSocket 実装）
        let message_pusher = Arc::new(WebSocketMessagePusher::new());
        let chat = Arc::new(RoomBroadcaster::new(
            chat_groups.clone(),
            message_pusher.clone(),
        ));
        let video = Arc::new(RoomBroadcaster::new(
            video_groups.clone(),
            message_pusher.clone(),
        ));
        let guard = Arc::new(MembershipGuard::new(
            connections.clone(),
            storage.membership.clone(),
        ));

        // 3. UseCases
        Self {
            connect_participant_usecase: Arc::new(ConnectParticipantUseCase::new(
                connections.clone(),
                message_pusher.clone(),
                clock.clone(),
            )),
            disconnect_participant_usecase: Arc::new(DisconnectParticipantUseCase::new(
                connections.clone(),
                chat_groups.clone(),
                video.clone(),
                message_pusher,
            )),
            authenticate_usecase: Arc::new(AuthenticateUseCase::new(
                storage.identity.clone(),
                connections.clone(),
            )),
            join_room_usecase: Arc::new(JoinRoomUseCase::new(guard.clone(), chat_groups.clone())),
            send_message_usecase: Arc::new(SendMessageUseCase::new(
                connections.clone(),
                storage.message_log.clone(),
                chat,
                clock,
            )),
            signaling_usecase: Arc::new(SignalingUseCase::new(guard, video)),
            chat_history_usecase: Arc::new(ChatHistoryUseCase::new(
                storage.membership.clone(),
                storage.message_log.clone(),
            )),
            get_room_overview_usecase: Arc::new(GetRoomOverviewUseCase::new(
                connections,
                chat_groups,
                video_groups,
            )),
            display_offset_minutes,
        }
    }
}
