//! UseCase: ブロードキャストグループの状況取得（デバッグ用）

use std::sync::Arc;

use crate::domain::{ConnectionRepository, GroupOccupancy, RoomGroupRepository};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomOverview {
    pub connections: usize,
    pub chat: Vec<GroupOccupancy>,
    pub video: Vec<GroupOccupancy>,
}

pub struct GetRoomOverviewUseCase {
    connections: Arc<dyn ConnectionRepository>,
    chat_groups: Arc<dyn RoomGroupRepository>,
    video_groups: Arc<dyn RoomGroupRepository>,
}

impl GetRoomOverviewUseCase {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        chat_groups: Arc<dyn RoomGroupRepository>,
        video_groups: Arc<dyn RoomGroupRepository>,
    ) -> Self {
        Self {
            connections,
            chat_groups,
            video_groups,
        }
    }

    pub fn execute(&self) -> RoomOverview {
        RoomOverview {
            connections: self.connections.count(),
            chat: self.chat_groups.occupancy(),
            video: self.video_groups.occupancy(),
        }
    }
}
