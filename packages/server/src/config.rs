//! Server configuration.

use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://tsudoi.db?mode=rwc";

/// Where messages, users and memberships are stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// Process-local maps, lost on restart
    InMemory,
    Sqlite { database_url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub storage: StorageConfig,
    /// JSON file seeding users, tokens and room memberships
    pub fixtures: Option<PathBuf>,
    /// UTC offset used to render message times (`JST_OFFSET_MINUTES` by default)
    pub display_offset_minutes: i32,
}
