//! Request handlers.

mod auth;
mod error;
mod http;
mod websocket;

pub use http::{debug_rooms, health_check, list_messages, mark_seen, unread_count};
pub use websocket::websocket_handler;
