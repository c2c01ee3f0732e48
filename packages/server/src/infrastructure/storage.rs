//! ストレージバックエンドの選択
//!
//! 設定に応じてメモリ実装か SQLite 実装を用意し、ストレージ系の port を
//! trait object として束ねて返します。

use std::sync::Arc;

use crate::{
    config::StorageConfig,
    domain::{IdentityProvider, MembershipAuthority, MessageLog, StorageError},
    infrastructure::{
        fixtures::DirectorySeed,
        repository::{InMemoryDirectory, InMemoryMessageLog, SqliteStore},
    },
};

/// 開いたストレージバックエンド
#[derive(Clone)]
pub struct StorageBackend {
    pub message_log: Arc<dyn MessageLog>,
    pub membership: Arc<dyn MembershipAuthority>,
    pub identity: Arc<dyn IdentityProvider>,
    /// フィクスチャの投入先
    pub seed: Arc<dyn DirectorySeed>,
    sqlite: Option<SqliteStore>,
}

impl StorageBackend {
    pub fn in_memory() -> Self {
        let directory = Arc::new(InMemoryDirectory::new());
        Self {
            message_log: Arc::new(InMemoryMessageLog::new()),
            membership: directory.clone(),
            identity: directory.clone(),
            seed: directory,
            sqlite: None,
        }
    }

    pub fn sqlite(store: SqliteStore) -> Self {
        let shared = Arc::new(store.clone());
        Self {
            message_log: shared.clone(),
            membership: shared.clone(),
            identity: shared.clone(),
            seed: shared,
            sqlite: Some(store),
        }
    }

    pub async fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        match config {
            StorageConfig::InMemory => {
                tracing::info!("Using in-memory storage");
                Ok(Self::in_memory())
            }
            StorageConfig::Sqlite { database_url } => {
                tracing::info!("Using SQLite storage at {}", database_url);
                Ok(Self::sqlite(SqliteStore::connect(database_url).await?))
            }
        }
    }

    /// SQLite の接続プールを閉じる（メモリ実装では何もしない）
    pub async fn close(&self) {
        if let Some(store) = &self.sqlite {
            store.close().await;
        }
    }
}
