//! InMemory Room Broadcast Group 実装
//!
//! ルーム ID をキーとする `DashMap` のエントリロックが、そのルームの接続集合を保護します。
//! 同じルームへの並行な join / leave は直列化され、別のルームとは競合しません。
//! ブロードキャストは `members` でスナップショットを取ってから配信するため、
//! 配信中にグループを走査し続けることはありません。
//!
//! 空になったグループは `remove_if` でエントリロックを保持したまま削除します。
//! 並行する join は削除の前後どちらかに順序付けられるため、参加が失われることはありません。

use std::collections::HashSet;

use dashmap::DashMap;

use crate::domain::{ConnectionId, GroupOccupancy, RoomGroupRepository, RoomId};

#[derive(Default)]
pub struct InMemoryRoomGroupRepository {
    groups: DashMap<RoomId, HashSet<ConnectionId>>,
}

impl InMemoryRoomGroupRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoomGroupRepository for InMemoryRoomGroupRepository {
    fn join(&self, room_id: &RoomId, connection_id: &ConnectionId) -> bool {
        self.groups
            .entry(room_id.clone())
            .or_default()
            .insert(connection_id.clone())
    }

    fn leave(&self, room_id: &RoomId, connection_id: &ConnectionId) -> bool {
        let removed = {
            let Some(mut members) = self.groups.get_mut(room_id) else {
                return false;
            };
            members.remove(connection_id)
        };
        self.groups.remove_if(room_id, |_, members| members.is_empty());
        removed
    }

    fn contains(&self, room_id: &RoomId, connection_id: &ConnectionId) -> bool {
        self.groups
            .get(room_id)
            .is_some_and(|members| members.contains(connection_id))
    }

    fn members(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        self.groups
            .get(room_id)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn occupancy(&self) -> Vec<GroupOccupancy> {
        let mut occupancy: Vec<GroupOccupancy> = self
            .groups
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| GroupOccupancy {
                room_id: entry.key().clone(),
                connections: entry.value().len(),
            })
            .collect();
        occupancy.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        occupancy
    }
}
