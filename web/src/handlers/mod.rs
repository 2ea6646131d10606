//! HTTP and WebSocket handlers.

pub mod todos;
pub mod updates;
