//! InMemory 実装

pub mod connection;
pub mod directory;
pub mod message_log;
pub mod room_group;

pub use connection::InMemoryConnectionRepository;
pub use directory::InMemoryDirectory;
pub use message_log::InMemoryMessageLog;
pub use room_group::InMemoryRoomGroupRepository;
