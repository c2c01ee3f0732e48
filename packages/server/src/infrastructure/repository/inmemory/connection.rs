//! InMemory Connection Repository 実装
//!
//! 接続 ID をキーとする並行ハッシュマップ（`DashMap`）で Connection Registry を実装します。
//! 接続ごとのハンドラタスクが並行に読み書きしても、グローバルなロックは取りません。

use dashmap::DashMap;

use crate::domain::{
    ConnectionId, ConnectionRecord, ConnectionRepository, GroupKind, RegistryError, RoomId,
    Timestamp, VerifiedUser,
};

#[derive(Default)]
pub struct InMemoryConnectionRepository {
    connections: DashMap<ConnectionId, ConnectionRecord>,
}

impl InMemoryConnectionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(connection_id: &ConnectionId) -> RegistryError {
    RegistryError::ConnectionNotFound(connection_id.as_str().to_string())
}

impl ConnectionRepository for InMemoryConnectionRepository {
    fn register(&self, connection_id: ConnectionId, connected_at: Timestamp) {
        let record = ConnectionRecord::new(connection_id.clone(), connected_at);
        self.connections.insert(connection_id, record);
    }

    fn unregister(&self, connection_id: &ConnectionId) -> Option<ConnectionRecord> {
        self.connections
            .remove(connection_id)
            .map(|(_, record)| record)
    }

    fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.connections.contains_key(connection_id)
    }

    fn attach_user(
        &self,
        connection_id: &ConnectionId,
        user: VerifiedUser,
    ) -> Result<(), RegistryError> {
        let mut record = self
            .connections
            .get_mut(connection_id)
            .ok_or_else(|| not_found(connection_id))?;
        record.user = Some(user);
        Ok(())
    }

    fn user_of(&self, connection_id: &ConnectionId) -> Result<Option<VerifiedUser>, RegistryError> {
        self.connections
            .get(connection_id)
            .map(|record| record.user.clone())
            .ok_or_else(|| not_found(connection_id))
    }

    fn record_join(
        &self,
        connection_id: &ConnectionId,
        kind: GroupKind,
        room_id: &RoomId,
    ) -> Result<bool, RegistryError> {
        let mut record = self
            .connections
            .get_mut(connection_id)
            .ok_or_else(|| not_found(connection_id))?;
        Ok(record.rooms_mut(kind).insert(room_id.clone()))
    }

    fn record_leave(
        &self,
        connection_id: &ConnectionId,
        kind: GroupKind,
        room_id: &RoomId,
    ) -> bool {
        self.connections
            .get_mut(connection_id)
            .map(|mut record| record.rooms_mut(kind).remove(room_id))
            .unwrap_or(false)
    }

    fn count(&self) -> usize {
        self.connections.len()
    }
}
