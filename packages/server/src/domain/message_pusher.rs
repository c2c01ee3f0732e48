//! MessagePusher trait 定義
//!
//! 接続への配信を抽象化します。配信は受信者ごとに fire-and-forget で、
//! ある受信者のトランスポート障害が他の受信者への配信を妨げてはいけません。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ConnectionId, MessagePushError};

/// 接続ごとの送信チャンネル（WebSocket の書き込みタスクが受信側を持つ）
pub type PusherChannel = mpsc::UnboundedSender<String>;

#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続の送信チャンネルを登録
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel);

    /// 接続の送信チャンネルを登録解除
    async fn unregister_client(&self, connection_id: &ConnectionId);

    /// 特定の接続に送信
    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError>;

    /// 複数の接続に送信し、実際に届けた接続を返す（一部の失敗は許容）
    async fn broadcast(&self, targets: &[ConnectionId], content: &str) -> Vec<ConnectionId>;
}
