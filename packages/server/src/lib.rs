//! Tsudoi relay server: room chat with durable history and WebRTC signaling over WebSocket.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
