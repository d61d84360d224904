//! JSON encoding/decoding for room messages.
//!
//! This module converts between:
//! - text frames (`&str` / `String`)
//! - logical `retro_core::Operation` / `ServerEvent`
//!
//! ```text
//! Input (client → server)
//! -----------------------
//! {"type":"add-item","payload":{"category":"went_well","item":{"id":"i1","content":"x"}}}
//! {"type":"remove-item","payload":{"category":"went_well","itemId":"i1"}}
//! {"type":"move-item","payload":{"source":{"droppableId":"went_well","index":0},
//!                                "destination":{"droppableId":"action_items","index":0},
//!                                "itemId":"i1"}}
//! {"type":"toggle-visibility"}
//! {"type":"toggle-like","payload":{"category":"went_well","itemId":"i1","userId":"bob"}}
//!
//! Output (server → client)
//! ------------------------
//! {"type":"initial-state","payload":{"items":{...},"isRoomOwner":true,"isHidden":false},
//!                         "data":{...same as payload...}}
//! {"type":"item-added","payload":{"category":"went_well","item":{...}}}
//! {"type":"item-removed","payload":{"category":"went_well","itemId":"i1"}}
//! {"type":"item-moved","payload":{"source":{...},"destination":{...},"item":{...}}}
//! {"type":"visibility-changed","payload":{"isHidden":true}}
//! {"type":"owner-changed","payload":{"newOwner":"bob"}}
//! {"type":"like-updated","payload":{"category":"went_well","itemId":"i1","likes":["bob"]}}
//! {"type":"room-not-found","payload":{}}
//! {"type":"join-rejected","payload":{"reason":"username-taken"}}
//! {"type":"session-replaced","payload":{}}
//! ```
//!
//! One message per frame; the transport provides framing.
//!
//! `initial-state` also carries its payload under `data`, which is where the
//! browser client reads the snapshot from. Decoders ignore the alias.

use retro_core::{Category, JoinRejection, Operation, Position, ServerEvent, Snapshot};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::wire_types::{
    AddItemPayload, Envelope, MoveItemPayload, RemoveItemPayload, ToggleLikePayload, WireEvent,
    WireInputType, WirePosition,
};

/// Errors that can occur while decoding/encoding frames.
///
/// None of these are fatal to a connection: the frame is dropped and the
/// connection carries on.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Not JSON, or JSON of the wrong shape.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Envelope `type` outside the known vocabulary.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    /// Category identifier outside the fixed set.
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    /// A field had a value we cannot map.
    #[error("invalid field: {0}")]
    InvalidField(&'static str),

    /// Handshake query lacks (or has an empty) required parameter.
    #[error("missing handshake parameter: {0}")]
    MissingParameter(&'static str),
}

// ============================================================================
// INPUT: client → server
// ============================================================================

/// Decode a single inbound text frame.
pub fn decode_input(text: &str) -> Result<Operation, ProtocolError> {
    let envelope: Envelope = serde_json::from_str(text)?;

    let wire_type = WireInputType::from_name(&envelope.kind)
        .ok_or_else(|| ProtocolError::UnknownMessageType(envelope.kind.clone()))?;

    match wire_type {
        WireInputType::AddItem => {
            let p: AddItemPayload = payload(envelope.payload)?;
            Ok(Operation::AddItem {
                category: parse_category(&p.category)?,
                item: p.item,
            })
        }
        WireInputType::RemoveItem => {
            let p: RemoveItemPayload = payload(envelope.payload)?;
            Ok(Operation::RemoveItem {
                category: parse_category(&p.category)?,
                item_id: p.item_id,
            })
        }
        WireInputType::MoveItem => {
            let p: MoveItemPayload = payload(envelope.payload)?;
            Ok(Operation::MoveItem {
                source: position_from_wire(&p.source)?,
                destination: position_from_wire(&p.destination)?,
                item_id: p.item_id,
            })
        }
        WireInputType::ToggleVisibility => Ok(Operation::ToggleVisibility),
        WireInputType::ToggleLike => {
            let p: ToggleLikePayload = payload(envelope.payload)?;
            Ok(Operation::ToggleLike {
                category: parse_category(&p.category)?,
                item_id: p.item_id,
            })
        }
    }
}

/// Encode an operation as an inbound frame (used by clients and tests).
pub fn encode_input(op: &Operation) -> Result<String, ProtocolError> {
    let (wire_type, payload) = match op {
        Operation::AddItem { category, item } => (
            WireInputType::AddItem,
            serde_json::to_value(AddItemPayload {
                category: category.as_str().to_string(),
                item: item.clone(),
            })?,
        ),
        Operation::RemoveItem { category, item_id } => (
            WireInputType::RemoveItem,
            serde_json::to_value(RemoveItemPayload {
                category: category.as_str().to_string(),
                item_id: item_id.clone(),
            })?,
        ),
        Operation::MoveItem {
            source,
            destination,
            item_id,
        } => (
            WireInputType::MoveItem,
            serde_json::to_value(MoveItemPayload {
                source: position_to_wire(source),
                destination: position_to_wire(destination),
                item_id: item_id.clone(),
            })?,
        ),
        Operation::ToggleVisibility => (WireInputType::ToggleVisibility, Value::Null),
        Operation::ToggleLike { category, item_id } => (
            WireInputType::ToggleLike,
            serde_json::to_value(ToggleLikePayload {
                category: category.as_str().to_string(),
                item_id: item_id.clone(),
                user_id: None,
            })?,
        ),
    };

    let envelope = Envelope {
        kind: wire_type.as_str().to_string(),
        payload,
    };
    Ok(serde_json::to_string(&envelope)?)
}

// ============================================================================
// OUTPUT: server → client
// ============================================================================

/// Encode a single outbound event.
pub fn encode_output(event: &ServerEvent) -> Result<String, ProtocolError> {
    let wire = event_to_wire(event);
    if !matches!(wire, WireEvent::InitialState { .. }) {
        return Ok(serde_json::to_string(&wire)?);
    }

    let mut value = serde_json::to_value(&wire)?;
    if let Value::Object(fields) = &mut value {
        if let Some(payload) = fields.get(INITIAL_STATE_PAYLOAD).cloned() {
            fields.insert(INITIAL_STATE_ALIAS.to_string(), payload);
        }
    }
    Ok(serde_json::to_string(&value)?)
}

const INITIAL_STATE_PAYLOAD: &str = "payload";
const INITIAL_STATE_ALIAS: &str = "data";

/// Decode a single outbound frame (used by clients and tests).
pub fn decode_output(text: &str) -> Result<ServerEvent, ProtocolError> {
    let mut value: Value = serde_json::from_str(text)?;
    if let Value::Object(fields) = &mut value {
        fields.remove(INITIAL_STATE_ALIAS);
    }
    let wire: WireEvent = serde_json::from_value(value)?;
    event_from_wire(wire)
}

fn event_to_wire(event: &ServerEvent) -> WireEvent {
    match event {
        ServerEvent::InitialState(snapshot) => WireEvent::InitialState {
            items: snapshot.items.clone(),
            is_room_owner: snapshot.is_owner,
            is_hidden: snapshot.is_hidden,
        },
        ServerEvent::ItemAdded { category, item } => WireEvent::ItemAdded {
            category: *category,
            item: item.clone(),
        },
        ServerEvent::ItemRemoved { category, item_id } => WireEvent::ItemRemoved {
            category: *category,
            item_id: item_id.clone(),
        },
        ServerEvent::ItemMoved {
            source,
            destination,
            item,
        } => WireEvent::ItemMoved {
            source: position_to_wire(source),
            destination: position_to_wire(destination),
            item: item.clone(),
        },
        ServerEvent::VisibilityChanged { hidden } => WireEvent::VisibilityChanged { is_hidden: *hidden },
        ServerEvent::OwnerChanged { new_owner } => WireEvent::OwnerChanged {
            new_owner: new_owner.clone(),
        },
        ServerEvent::LikeUpdated {
            category,
            item_id,
            likes,
        } => WireEvent::LikeUpdated {
            category: *category,
            item_id: item_id.clone(),
            likes: likes.clone(),
        },
        ServerEvent::RoomNotFound => WireEvent::RoomNotFound {},
        ServerEvent::JoinRejected(reason) => WireEvent::JoinRejected {
            reason: reason.as_str().to_string(),
        },
        ServerEvent::SessionReplaced => WireEvent::SessionReplaced {},
    }
}

fn event_from_wire(wire: WireEvent) -> Result<ServerEvent, ProtocolError> {
    Ok(match wire {
        WireEvent::InitialState {
            items,
            is_room_owner,
            is_hidden,
        } => ServerEvent::InitialState(Snapshot {
            items,
            is_owner: is_room_owner,
            is_hidden,
        }),
        WireEvent::ItemAdded { category, item } => ServerEvent::ItemAdded { category, item },
        WireEvent::ItemRemoved { category, item_id } => ServerEvent::ItemRemoved { category, item_id },
        WireEvent::ItemMoved {
            source,
            destination,
            item,
        } => ServerEvent::ItemMoved {
            source: position_from_wire(&source)?,
            destination: position_from_wire(&destination)?,
            item,
        },
        WireEvent::VisibilityChanged { is_hidden } => ServerEvent::VisibilityChanged { hidden: is_hidden },
        WireEvent::OwnerChanged { new_owner } => ServerEvent::OwnerChanged { new_owner },
        WireEvent::LikeUpdated {
            category,
            item_id,
            likes,
        } => ServerEvent::LikeUpdated {
            category,
            item_id,
            likes,
        },
        WireEvent::RoomNotFound {} => ServerEvent::RoomNotFound,
        WireEvent::JoinRejected { reason } => match reason.as_str() {
            "username-taken" => ServerEvent::JoinRejected(JoinRejection::UsernameTaken),
            _ => return Err(ProtocolError::InvalidField("reason")),
        },
        WireEvent::SessionReplaced {} => ServerEvent::SessionReplaced,
    })
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

fn payload<T: DeserializeOwned>(value: Value) -> Result<T, ProtocolError> {
    Ok(serde_json::from_value(value)?)
}

fn parse_category(name: &str) -> Result<Category, ProtocolError> {
    name.parse::<Category>()
        .map_err(|_| ProtocolError::UnknownCategory(name.to_string()))
}

fn position_from_wire(pos: &WirePosition) -> Result<Position, ProtocolError> {
    let category = parse_category(&pos.droppable_id)?;
    let index = usize::try_from(pos.index.max(0)).unwrap_or(usize::MAX);
    Ok(Position::new(category, index))
}

fn position_to_wire(pos: &Position) -> WirePosition {
    WirePosition {
        droppable_id: pos.category.as_str().to_string(),
        index: i64::try_from(pos.index).unwrap_or(i64::MAX),
    }
}
