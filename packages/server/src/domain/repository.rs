//! Repository trait 定義（外部コラボレーター）
//!
//! リレーが永続化層に求めるインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! - `MembershipAuthority`: 「ユーザー U はルーム R のメンバーか？」
//! - `MessageLog`: 「ルーム R のログにメッセージ M を追記する」と、その読み出し
//! - `IdentityProvider`: アクセストークンの検証（ブロック済みユーザーの拒否を含む）

use async_trait::async_trait;

use super::{
    AuthError, ChatMessage, MessageText, RoomId, StorageError, Timestamp, UserId, VerifiedUser,
};

/// Membership Authority
///
/// ルームへの参加可否を判定します。リレーはブロードキャストグループへの
/// join を受け付ける前に必ずこれを呼び出します。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipAuthority: Send + Sync {
    /// ユーザーがルームのメンバーかどうか
    async fn is_member(&self, room_id: &RoomId, user_id: &UserId) -> Result<bool, StorageError>;
}

/// Durable Message Log
///
/// ルームごとの追記専用ログ。挿入順に読み出せることと、
/// (ルーム, ユーザー) ごとの既読ウォーターマークを提供します。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageLog: Send + Sync {
    /// メッセージを追記し、採番済みのメッセージを返す
    async fn append(
        &self,
        room_id: &RoomId,
        author: &VerifiedUser,
        text: &MessageText,
        created_at: Timestamp,
    ) -> Result<ChatMessage, StorageError>;

    /// ルームの全メッセージを挿入順（昇順）で取得
    ///
    /// `seen` は `viewer` から見た既読状態です。
    async fn list(&self, room_id: &RoomId, viewer: &UserId)
    -> Result<Vec<ChatMessage>, StorageError>;

    /// `user_id` 以外が発言した未読メッセージを既読にし、新たに既読になった件数を返す
    async fn mark_seen(&self, room_id: &RoomId, user_id: &UserId) -> Result<u64, StorageError>;

    /// `user_id` 以外が発言した未読メッセージの件数
    async fn unread_count(&self, room_id: &RoomId, user_id: &UserId)
    -> Result<u64, StorageError>;
}

/// Identity Provider
///
/// HTTP の認証ミドルウェアと同じ基準でアクセストークンを検証します。
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// トークンを検証し、紐づくユーザーを返す
    async fn verify_token(&self, token: &str) -> Result<VerifiedUser, AuthError>;
}
