//! InMemory Message Log 実装
//!
//! ルームごとのログを `DashMap` のエントリとして保持します。
//! メッセージ ID は全ルーム共通のカウンタから、ルームのエントリロックを保持したまま採番するため、
//! ルーム内では挿入順に単調増加します。
//!
//! 既読状態は (ルーム, ユーザー) ごとのウォーターマーク（既読にした最大メッセージ ID）で表します。

use std::{
    collections::HashMap,
    sync::atomic::{AtomicI64, Ordering},
};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::{
    ChatMessage, MessageId, MessageLog, MessageText, RoomId, StorageError, Timestamp, UserId,
    VerifiedUser,
};

#[derive(Default)]
struct RoomLog {
    messages: Vec<ChatMessage>,
    watermarks: HashMap<UserId, MessageId>,
}

impl RoomLog {
    fn watermark(&self, user_id: &UserId) -> MessageId {
        self.watermarks
            .get(user_id)
            .copied()
            .unwrap_or(MessageId::new(0))
    }

    fn unread_after<'a>(
        &'a self,
        user_id: &'a UserId,
        watermark: MessageId,
    ) -> impl Iterator<Item = &'a ChatMessage> + 'a {
        self.messages
            .iter()
            .filter(move |m| m.id > watermark && &m.author != user_id)
    }
}

pub struct InMemoryMessageLog {
    rooms: DashMap<RoomId, RoomLog>,
    next_id: AtomicI64,
}

impl Default for InMemoryMessageLog {
    fn default() -> Self {
        Self {
            rooms: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

impl InMemoryMessageLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageLog for InMemoryMessageLog {
    async fn append(
        &self,
        room_id: &RoomId,
        author: &VerifiedUser,
        text: &MessageText,
        created_at: Timestamp,
    ) -> Result<ChatMessage, StorageError> {
        let mut log = self.rooms.entry(room_id.clone()).or_default();
        let message = ChatMessage {
            id: MessageId::new(self.next_id.fetch_add(1, Ordering::SeqCst)),
            room_id: room_id.clone(),
            author: author.id.clone(),
            author_name: author.full_name.clone(),
            text: text.clone(),
            created_at,
            seen: false,
        };
        log.messages.push(message.clone());
        Ok(message)
    }

    async fn list(
        &self,
        room_id: &RoomId,
        viewer: &UserId,
    ) -> Result<Vec<ChatMessage>, StorageError> {
        let Some(log) = self.rooms.get(room_id) else {
            return Ok(Vec::new());
        };
        let watermark = log.watermark(viewer);
        Ok(log
            .messages
            .iter()
            .map(|m| ChatMessage {
                seen: &m.author == viewer || m.id <= watermark,
                ..m.clone()
            })
            .collect())
    }

    async fn mark_seen(&self, room_id: &RoomId, user_id: &UserId) -> Result<u64, StorageError> {
        let Some(mut log) = self.rooms.get_mut(room_id) else {
            return Ok(0);
        };
        let Some(latest) = log.messages.last().map(|m| m.id) else {
            return Ok(0);
        };
        let watermark = log.watermark(user_id);
        let newly_seen = log.unread_after(user_id, watermark).count() as u64;
        if latest > watermark {
            log.watermarks.insert(user_id.clone(), latest);
        }
        Ok(newly_seen)
    }

    async fn unread_count(&self, room_id: &RoomId, user_id: &UserId) -> Result<u64, StorageError> {
        Ok(self
            .rooms
            .get(room_id)
            .map(|log| log.unread_after(user_id, log.watermark(user_id)).count() as u64)
            .unwrap_or(0))
    }
}
