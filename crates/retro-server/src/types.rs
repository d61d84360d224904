//! Shared types for the retro board server.
//!
//! This module defines:
//! - channel aliases between connection tasks and room tasks
//! - `RoomCommand`: messages flowing from connections into a room

use std::sync::Arc;

use retro_core::{Operation, ServerEvent, SessionId};
use tokio::sync::mpsc;

/// Outbound events from a room to one connection.
///
/// Bounded: a connection that cannot keep up loses events instead of
/// stalling its room. Events are shared between all recipients of a
/// broadcast.
pub type OutboundTx = mpsc::Sender<Arc<ServerEvent>>;
pub type OutboundRx = mpsc::Receiver<Arc<ServerEvent>>;

/// Message flowing from a connection task into a room task.
#[derive(Debug)]
pub enum RoomCommand {
    /// Admit a session. Only ever sent by the registry, under its lock.
    Join {
        session: SessionId,
        username: String,
        outbound: OutboundTx,
    },

    /// Apply an operation on behalf of a session.
    Apply { session: SessionId, op: Operation },

    /// The session's connection is gone.
    Leave { session: SessionId },
}

/// Channel from connections → room task (the room's mailbox).
pub type RoomTx = mpsc::UnboundedSender<RoomCommand>;
pub type RoomRx = mpsc::UnboundedReceiver<RoomCommand>;
