//! Directory fixtures
//!
//! ユーザー・トークン・メンバーシップの管理 API はこのリレーの範囲外です。
//! ローカル実行や検証用に、JSON ファイルからディレクトリへ投入する手段だけを提供します。
//!
//! ```json
//! {
//!   "users": [{ "id": "u1", "fullName": "Alice", "token": "alice-token", "blocked": false }],
//!   "rooms": [{ "id": "R1", "members": ["u1"] }]
//! }
//! ```

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{RoomId, StorageError, UserId, ValueObjectError, VerifiedUser};

/// ディレクトリへの書き込み口（フィクスチャ投入専用）
#[async_trait]
pub trait DirectorySeed: Send + Sync {
    async fn upsert_user(&self, user: &VerifiedUser, blocked: bool) -> Result<(), StorageError>;

    async fn issue_token(&self, token: &str, user_id: &UserId) -> Result<(), StorageError>;

    async fn add_member(&self, room_id: &RoomId, user_id: &UserId) -> Result<(), StorageError>;
}

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixtures: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse fixtures: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid fixture value: {0}")]
    Invalid(#[from] ValueObjectError),

    #[error("failed to store fixtures: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Default, Deserialize)]
pub struct Fixtures {
    #[serde(default)]
    pub users: Vec<UserFixture>,
    #[serde(default)]
    pub rooms: Vec<RoomFixture>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFixture {
    pub id: String,
    pub full_name: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub blocked: bool,
}

#[derive(Debug, Deserialize)]
pub struct RoomFixture {
    pub id: String,
    #[serde(default)]
    pub members: Vec<String>,
}

/// 投入結果（ログ出力用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub rooms: usize,
}

impl Fixtures {
    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// 全ての値を検証してから投入する（途中で不正値が見つかれば何も書き込まない）
    pub async fn apply(&self, seed: &dyn DirectorySeed) -> Result<SeedSummary, FixtureError> {
        let mut users = Vec::with_capacity(self.users.len());
        for fixture in &self.users {
            let user = VerifiedUser::new(
                UserId::new(fixture.id.clone())?,
                fixture.full_name.clone(),
            );
            users.push((user, fixture));
        }
        let mut rooms = Vec::with_capacity(self.rooms.len());
        for fixture in &self.rooms {
            let room_id = RoomId::new(fixture.id.clone())?;
            let members = fixture
                .members
                .iter()
                .map(|member| UserId::new(member.clone()))
                .collect::<Result<Vec<_>, _>>()?;
            rooms.push((room_id, members));
        }

        for (user, fixture) in &users {
            seed.upsert_user(user, fixture.blocked).await?;
            if let Some(token) = &fixture.token {
                seed.issue_token(token, &user.id).await?;
            }
        }
        for (room_id, members) in &rooms {
            for member in members {
                seed.add_member(room_id, member).await?;
            }
        }

        Ok(SeedSummary {
            users: users.len(),
            rooms: rooms.len(),
        })
    }
}
