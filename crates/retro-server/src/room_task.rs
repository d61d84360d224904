//! Per-room task.
//!
//! This task owns one `RoomState` and its `Fanout`, and processes the
//! room's mailbox one command at a time. That makes it the room's
//! exclusive section: no two operations on the same room ever interleave,
//! while different rooms run in parallel.
//!
//! Lifecycle: created by the registry on first join; when the last member
//! leaves it asks the registry to retire it, which either removes the room
//! or hands back a command that raced in, in which case the task carries on
//! as a brand-new room.

use std::sync::Arc;

use retro_core::RoomState;
use tracing::{debug, info};

use crate::fanout::Fanout;
use crate::registry::RoomRegistry;
use crate::types::{RoomCommand, RoomRx};

/// Run the processing loop for `room_id`.
pub async fn run_room_loop(
    room_id: String,
    generation: u64,
    mut room_rx: RoomRx,
    registry: Arc<RoomRegistry>,
) {
    let policy = registry.policy();
    let mut room = RoomState::new(room_id.clone(), policy);
    let mut fanout = Fanout::new(room_id.clone());

    let mut next = room_rx.recv().await;

    while let Some(command) = next {
        handle_command(&mut room, &mut fanout, command);

        if room.is_empty() {
            match registry.retire(&room_id, generation, &mut room_rx).await {
                Some(command) => {
                    debug!(room = %room_id, generation, "room emptied with pending command, starting fresh");
                    room = RoomState::new(room_id.clone(), policy);
                    fanout = Fanout::new(room_id.clone());
                    next = Some(command);
                    continue;
                }
                None => {
                    if fanout.dropped() > 0 {
                        info!(room = %room_id, dropped = fanout.dropped(), "room closed with dropped events");
                    }
                    return;
                }
            }
        }

        next = room_rx.recv().await;
    }

    debug!(room = %room_id, generation, "room mailbox closed");
}

fn handle_command(room: &mut RoomState, fanout: &mut Fanout, command: RoomCommand) {
    match command {
        RoomCommand::Join {
            session,
            username,
            outbound,
        } => {
            fanout.attach(session, outbound);
            let dispatches = room.join(session, &username);
            info!(room = %room.room_id(), user = %username, %session, members = room.members().len(), "join");
            fanout.dispatch_all(dispatches);
        }
        RoomCommand::Apply { session, op } => {
            let kind = op.kind();
            let dispatches = room.apply(session, op);
            debug!(room = %room.room_id(), %session, op = kind, events = dispatches.len(), "apply");
            fanout.dispatch_all(dispatches);
        }
        RoomCommand::Leave { session } => {
            let owner_before = room.owner().map(str::to_owned);
            let dispatches = room.leave(session);
            if !dispatches.is_empty() {
                info!(room = %room.room_id(), %session, members = room.members().len(), "leave");
            }
            if room.owner().is_some() && room.owner() != owner_before.as_deref() {
                info!(room = %room.room_id(), owner = ?room.owner(), "owner changed");
            }
            fanout.dispatch_all(dispatches);
            // A stale leave (replaced session) still drops any channel left behind.
            fanout.detach(session);
        }
    }
}
