//! Infrastructure layer: storage backends, the WebSocket pusher, wire DTOs and fixtures.

pub mod dto;
pub mod fixtures;
pub mod message_pusher;
pub mod repository;
pub mod storage;

pub use storage::StorageBackend;
