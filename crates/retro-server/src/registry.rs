//! Room registry: room id → running room task.
//!
//! Rooms are created lazily by the first join and removed by their own
//! task once the last member has left. Both happen under the registry
//! lock, and joins are enqueued on a room's mailbox while that lock is
//! held, so:
//! - a room id never has two live tasks at once;
//! - a room is never removed while a join for it is in flight (the
//!   retiring task finds the join in its mailbox and starts over as a
//!   fresh room instead of exiting).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use retro_core::{DuplicateUsernamePolicy, SessionId};
use tokio::sync::{mpsc, Mutex};
use tracing::info;

use crate::room_task;
use crate::types::{OutboundTx, RoomCommand, RoomRx, RoomTx};

/// Registry entry for one live room.
#[derive(Debug)]
struct RoomHandle {
    tx: RoomTx,
    /// Distinguishes successive tasks that served the same room id.
    generation: u64,
}

/// All live rooms of one server instance.
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, RoomHandle>>,
    next_session: AtomicU64,
    next_generation: AtomicU64,
    policy: DuplicateUsernamePolicy,
}

impl RoomRegistry {
    pub fn new(policy: DuplicateUsernamePolicy) -> Self {
        RoomRegistry {
            rooms: Mutex::new(HashMap::new()),
            next_session: AtomicU64::new(1),
            next_generation: AtomicU64::new(1),
            policy,
        }
    }

    pub fn policy(&self) -> DuplicateUsernamePolicy {
        self.policy
    }

    /// Allocate a session id, unique for the lifetime of this registry.
    pub fn next_session_id(&self) -> SessionId {
        SessionId(self.next_session.fetch_add(1, Ordering::Relaxed))
    }

    /// Look up or create `room_id` and enqueue the join on its mailbox.
    ///
    /// Returns the room's mailbox for the session's later operations.
    pub async fn join(
        self: &Arc<Self>,
        room_id: &str,
        session: SessionId,
        username: &str,
        outbound: OutboundTx,
    ) -> RoomTx {
        let mut rooms = self.rooms.lock().await;

        let mut command = RoomCommand::Join {
            session,
            username: username.to_string(),
            outbound,
        };

        if let Some(handle) = rooms.get(room_id) {
            match handle.tx.send(command) {
                Ok(()) => return handle.tx.clone(),
                // The task died without retiring; replace it below.
                Err(mpsc::error::SendError(returned)) => command = returned,
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        // The receiver is still held locally, so this cannot fail.
        let _ = tx.send(command);
        rooms.insert(
            room_id.to_string(),
            RoomHandle {
                tx: tx.clone(),
                generation,
            },
        );
        info!(room = %room_id, generation, "room created");

        let registry = Arc::clone(self);
        let room_id = room_id.to_string();
        tokio::spawn(async move {
            room_task::run_room_loop(room_id, generation, rx, registry).await;
        });

        tx
    }

    /// Called by an emptied room task.
    ///
    /// If a command arrived in the meantime, it is handed back and the
    /// task must continue as a fresh room. Otherwise the registry entry is
    /// removed (if it still belongs to this task) and `None` tells the
    /// task to stop.
    pub(crate) async fn retire(
        &self,
        room_id: &str,
        generation: u64,
        rx: &mut RoomRx,
    ) -> Option<RoomCommand> {
        let mut rooms = self.rooms.lock().await;

        if let Ok(command) = rx.try_recv() {
            return Some(command);
        }

        if rooms.get(room_id).is_some_and(|h| h.generation == generation) {
            rooms.remove(room_id);
            info!(room = %room_id, generation, "room destroyed");
        }
        None
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Whether `room_id` currently has a live room.
    pub async fn contains(&self, room_id: &str) -> bool {
        self.rooms.lock().await.contains_key(room_id)
    }
}
