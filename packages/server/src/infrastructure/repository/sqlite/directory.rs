//! SQLite Directory 実装（Membership Authority / Identity Provider）

use async_trait::async_trait;
use sqlx::Row;

use crate::{
    domain::{
        AuthError, IdentityProvider, MembershipAuthority, RoomId, StorageError, UserId,
        VerifiedUser,
    },
    infrastructure::fixtures::DirectorySeed,
};

use super::SqliteStore;

#[async_trait]
impl MembershipAuthority for SqliteStore {
    async fn is_member(&self, room_id: &RoomId, user_id: &UserId) -> Result<bool, StorageError> {
        let row: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM room_members WHERE room_id = ? AND user_id = ?")
                .bind(room_id.as_str())
                .bind(user_id.as_str())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl IdentityProvider for SqliteStore {
    async fn verify_token(&self, token: &str) -> Result<VerifiedUser, AuthError> {
        let row = sqlx::query(
            "SELECT u.id, u.full_name, u.blocked
             FROM access_tokens t
             JOIN users u ON u.id = t.user_id
             WHERE t.token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Unavailable(e.to_string()))?
        .ok_or(AuthError::InvalidToken)?;

        let decode = |e: sqlx::Error| AuthError::Unavailable(e.to_string());
        let id: String = row.try_get("id").map_err(decode)?;
        let full_name: String = row.try_get("full_name").map_err(decode)?;
        let blocked: i64 = row.try_get("blocked").map_err(decode)?;

        if blocked != 0 {
            return Err(AuthError::Blocked(id));
        }
        let id = UserId::new(id).map_err(|_| AuthError::InvalidToken)?;
        Ok(VerifiedUser::new(id, full_name))
    }
}

#[async_trait]
impl DirectorySeed for SqliteStore {
    async fn upsert_user(&self, user: &VerifiedUser, blocked: bool) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO users (id, full_name, blocked) VALUES (?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET full_name = excluded.full_name, blocked = excluded.blocked",
        )
        .bind(user.id.as_str())
        .bind(&user.full_name)
        .bind(blocked as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn issue_token(&self, token: &str, user_id: &UserId) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO access_tokens (token, user_id) VALUES (?, ?)
             ON CONFLICT (token) DO UPDATE SET user_id = excluded.user_id",
        )
        .bind(token)
        .bind(user_id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn add_member(&self, room_id: &RoomId, user_id: &UserId) -> Result<(), StorageError> {
        sqlx::query("INSERT OR IGNORE INTO room_members (room_id, user_id) VALUES (?, ?)")
            .bind(room_id.as_str())
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
