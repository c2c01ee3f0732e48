//! Repository 実装

pub mod inmemory;
pub mod sqlite;

pub use inmemory::{
    InMemoryConnectionRepository, InMemoryDirectory, InMemoryMessageLog,
    InMemoryRoomGroupRepository,
};
pub use sqlite::SqliteStore;
