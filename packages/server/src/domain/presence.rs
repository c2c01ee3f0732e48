//! Presence（接続と購読）の trait 定義
//!
//! プロセス内・非永続の状態です。プロセスが再起動すると全て失われ、
//! クライアントは再接続時に join し直します。
//!
//! どちらの操作もブロッキング I/O を伴わないため同期 trait としています。
//! 切断処理は「レジストリと全グループから取り除く」だけで完了し、
//! 配信中のメッセージの完了を待ちません。

use super::{
    ConnectionId, ConnectionRecord, GroupKind, GroupOccupancy, RegistryError, RoomId, Timestamp,
    VerifiedUser,
};

/// Connection Registry
///
/// 物理接続ごとに 1 レコード。接続のライフサイクルを排他的に所有します。
pub trait ConnectionRepository: Send + Sync {
    /// 空のルーム集合を持つ接続レコードを登録
    fn register(&self, connection_id: ConnectionId, connected_at: Timestamp);

    /// 接続レコードを削除して返す（存在しなければ `None`、冪等）
    fn unregister(&self, connection_id: &ConnectionId) -> Option<ConnectionRecord>;

    fn contains(&self, connection_id: &ConnectionId) -> bool;

    /// 検証済みユーザーを接続に紐づける
    fn attach_user(
        &self,
        connection_id: &ConnectionId,
        user: VerifiedUser,
    ) -> Result<(), RegistryError>;

    /// 接続に紐づくユーザー（未認証なら `None`）
    fn user_of(&self, connection_id: &ConnectionId) -> Result<Option<VerifiedUser>, RegistryError>;

    /// 接続が参加したルームを記録する（新規なら `true`）
    fn record_join(
        &self,
        connection_id: &ConnectionId,
        kind: GroupKind,
        room_id: &RoomId,
    ) -> Result<bool, RegistryError>;

    /// 接続が退出したルームを記録から外す（記録されていれば `true`）
    fn record_leave(&self, connection_id: &ConnectionId, kind: GroupKind, room_id: &RoomId)
    -> bool;

    fn count(&self) -> usize;
}

/// Room Broadcast Groups
///
/// ルーム ID から、そのルームに参加中の接続集合への対応表。
/// ルーム単位で排他され、無関係なルーム同士は競合しません。
pub trait RoomGroupRepository: Send + Sync {
    /// 接続をグループに追加（冪等、新規なら `true`）
    fn join(&self, room_id: &RoomId, connection_id: &ConnectionId) -> bool;

    /// 接続をグループから削除（冪等、削除したら `true`）
    fn leave(&self, room_id: &RoomId, connection_id: &ConnectionId) -> bool;

    fn contains(&self, room_id: &RoomId, connection_id: &ConnectionId) -> bool;

    /// グループのスナップショット
    fn members(&self, room_id: &RoomId) -> Vec<ConnectionId>;

    /// 空でないグループの一覧（ルーム ID 順）
    fn occupancy(&self) -> Vec<GroupOccupancy>;
}
