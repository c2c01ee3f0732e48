//! SQLite Message Log 実装

use async_trait::async_trait;
use sqlx::{Row, sqlite::SqliteRow};

use crate::domain::{
    ChatMessage, MessageId, MessageLog, MessageText, RoomId, StorageError, Timestamp, UserId,
    VerifiedUser,
};

use super::SqliteStore;

fn row_to_message(row: &SqliteRow) -> Result<ChatMessage, StorageError> {
    let corrupt = |e: crate::domain::ValueObjectError| {
        StorageError::Backend(format!("corrupt message row: {}", e))
    };
    Ok(ChatMessage {
        id: MessageId::new(row.try_get("id")?),
        room_id: RoomId::new(row.try_get("room_id")?).map_err(corrupt)?,
        author: UserId::new(row.try_get("user_id")?).map_err(corrupt)?,
        author_name: row.try_get("full_name")?,
        text: MessageText::new(row.try_get("text")?).map_err(corrupt)?,
        created_at: Timestamp::new(row.try_get("created_at")?),
        seen: row.try_get::<i64, _>("seen")? != 0,
    })
}

#[async_trait]
impl MessageLog for SqliteStore {
    async fn append(
        &self,
        room_id: &RoomId,
        author: &VerifiedUser,
        text: &MessageText,
        created_at: Timestamp,
    ) -> Result<ChatMessage, StorageError> {
        let result = sqlx::query(
            "INSERT INTO messages (room_id, user_id, text, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(room_id.as_str())
        .bind(author.id.as_str())
        .bind(text.as_str())
        .bind(created_at.value())
        .execute(&self.pool)
        .await?;

        Ok(ChatMessage {
            id: MessageId::new(result.last_insert_rowid()),
            room_id: room_id.clone(),
            author: author.id.clone(),
            author_name: author.full_name.clone(),
            text: text.clone(),
            created_at,
            seen: false,
        })
    }

    async fn list(
        &self,
        room_id: &RoomId,
        viewer: &UserId,
    ) -> Result<Vec<ChatMessage>, StorageError> {
        let rows = sqlx::query(
            "SELECT m.id, m.room_id, m.user_id, COALESCE(u.full_name, m.user_id) AS full_name,
                    m.text, m.created_at,
                    CASE WHEN m.user_id = ? OR m.id <= COALESCE(s.last_seen_id, 0)
                         THEN 1 ELSE 0 END AS seen
             FROM messages m
             LEFT JOIN users u ON u.id = m.user_id
             LEFT JOIN message_seen s ON s.room_id = m.room_id AND s.user_id = ?
             WHERE m.room_id = ?
             ORDER BY m.id ASC",
        )
        .bind(viewer.as_str())
        .bind(viewer.as_str())
        .bind(room_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_message).collect()
    }

    async fn mark_seen(&self, room_id: &RoomId, user_id: &UserId) -> Result<u64, StorageError> {
        // 読み取りの後に書き込むので、書き込みロックを先に取る（待ちは busy_timeout に従う）
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let latest: Option<i64> = sqlx::query_scalar("SELECT MAX(id) FROM messages WHERE room_id = ?")
            .bind(room_id.as_str())
            .fetch_one(&mut *tx)
            .await?;
        let Some(latest) = latest else {
            tx.commit().await?;
            return Ok(0);
        };

        let watermark: i64 = sqlx::query_scalar(
            "SELECT last_seen_id FROM message_seen WHERE room_id = ? AND user_id = ?",
        )
        .bind(room_id.as_str())
        .bind(user_id.as_str())
        .fetch_optional(&mut *tx)
        .await?
        .unwrap_or(0);

        let newly_seen: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages
             WHERE room_id = ? AND user_id != ? AND id > ? AND id <= ?",
        )
        .bind(room_id.as_str())
        .bind(user_id.as_str())
        .bind(watermark)
        .bind(latest)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO message_seen (room_id, user_id, last_seen_id) VALUES (?, ?, ?)
             ON CONFLICT (room_id, user_id)
             DO UPDATE SET last_seen_id = MAX(last_seen_id, excluded.last_seen_id)",
        )
        .bind(room_id.as_str())
        .bind(user_id.as_str())
        .bind(latest)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(newly_seen as u64)
    }

    async fn unread_count(&self, room_id: &RoomId, user_id: &UserId) -> Result<u64, StorageError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages m
             WHERE m.room_id = ? AND m.user_id != ?
               AND m.id > COALESCE(
                   (SELECT last_seen_id FROM message_seen WHERE room_id = ? AND user_id = ?), 0)",
        )
        .bind(room_id.as_str())
        .bind(user_id.as_str())
        .bind(room_id.as_str())
        .bind(user_id.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }
}
