//! retro-server
//!
//! Multi-room async WebSocket server for the retro board.

pub mod config;
pub mod fanout;
pub mod registry;
pub mod server;
pub mod types;

// these are internal modules, not re-exported
mod client;
mod room_task;
