//! InMemory Directory 実装
//!
//! ユーザー・アクセストークン・ルームメンバーシップをプロセス内に保持し、
//! `MembershipAuthority` と `IdentityProvider` を実装します。
//! 開発用の `--in-memory` モードとテストで使用します。

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::{
    domain::{
        AuthError, IdentityProvider, MembershipAuthority, RoomId, StorageError, UserId,
        VerifiedUser,
    },
    infrastructure::fixtures::DirectorySeed,
};

struct UserEntry {
    full_name: String,
    blocked: bool,
}

#[derive(Default)]
pub struct InMemoryDirectory {
    users: DashMap<UserId, UserEntry>,
    tokens: DashMap<String, UserId>,
    members: DashMap<RoomId, HashSet<UserId>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MembershipAuthority for InMemoryDirectory {
    async fn is_member(&self, room_id: &RoomId, user_id: &UserId) -> Result<bool, StorageError> {
        Ok(self
            .members
            .get(room_id)
            .is_some_and(|members| members.contains(user_id)))
    }
}

#[async_trait]
impl IdentityProvider for InMemoryDirectory {
    async fn verify_token(&self, token: &str) -> Result<VerifiedUser, AuthError> {
        let user_id = self
            .tokens
            .get(token)
            .map(|entry| entry.value().clone())
            .ok_or(AuthError::InvalidToken)?;
        let entry = self.users.get(&user_id).ok_or(AuthError::InvalidToken)?;
        if entry.blocked {
            return Err(AuthError::Blocked(user_id.into_string()));
        }
        Ok(VerifiedUser::new(user_id, entry.full_name.clone()))
    }
}

#[async_trait]
impl DirectorySeed for InMemoryDirectory {
    async fn upsert_user(&self, user: &VerifiedUser, blocked: bool) -> Result<(), StorageError> {
        self.users.insert(
            user.id.clone(),
            UserEntry {
                full_name: user.full_name.clone(),
                blocked,
            },
        );
        Ok(())
    }

    async fn issue_token(&self, token: &str, user_id: &UserId) -> Result<(), StorageError> {
        self.tokens.insert(token.to_string(), user_id.clone());
        Ok(())
    }

    async fn add_member(&self, room_id: &RoomId, user_id: &UserId) -> Result<(), StorageError> {
        self.members
            .entry(room_id.clone())
            .or_default()
            .insert(user_id.clone());
        Ok(())
    }
}
