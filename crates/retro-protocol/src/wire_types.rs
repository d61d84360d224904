//! Wire-level message shapes.
//!
//! Every frame is one JSON object `{"type": ..., "payload": {...}}`.
//! Inbound frames are decoded in two steps (envelope, then the payload for
//! the named type) so that an unknown `type` can be reported as such instead
//! of as a generic parse failure. Outbound frames are a single adjacently
//! tagged enum.
//!
//! Field names follow the browser client: `itemId`, `droppableId`,
//! `isRoomOwner`, `isHidden`, `newOwner`.

use retro_core::{Category, Item, ItemStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound message types (client → server).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WireInputType {
    AddItem,
    RemoveItem,
    MoveItem,
    ToggleVisibility,
    ToggleLike,
}

impl WireInputType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "add-item" => Some(WireInputType::AddItem),
            "remove-item" => Some(WireInputType::RemoveItem),
            "move-item" => Some(WireInputType::MoveItem),
            "toggle-visibility" => Some(WireInputType::ToggleVisibility),
            "toggle-like" => Some(WireInputType::ToggleLike),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WireInputType::AddItem => "add-item",
            WireInputType::RemoveItem => "remove-item",
            WireInputType::MoveItem => "move-item",
            WireInputType::ToggleVisibility => "toggle-visibility",
            WireInputType::ToggleLike => "toggle-like",
        }
    }
}

/// Generic inbound envelope. `payload` stays untyped until `type` is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

/// Board position as the drag-and-drop client names it.
///
/// `index` is signed on the wire so a negative index can be clamped to 0
/// instead of failing the whole message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePosition {
    pub droppable_id: String,
    pub index: i64,
}

// -----------------------------------------------------------------------------
// Inbound payloads
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddItemPayload {
    pub category: String,
    pub item: Item,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemPayload {
    pub category: String,
    pub item_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveItemPayload {
    pub source: WirePosition,
    pub destination: WirePosition,
    pub item_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleLikePayload {
    pub category: String,
    pub item_id: String,

    /// Sent by the browser client; the server likes on behalf of the
    /// session's username instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

// -----------------------------------------------------------------------------
// Outbound
// -----------------------------------------------------------------------------

/// Outbound message (server → client).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum WireEvent {
    #[serde(rename_all = "camelCase")]
    InitialState {
        items: ItemStore,
        is_room_owner: bool,
        is_hidden: bool,
    },

    ItemAdded {
        category: Category,
        item: Item,
    },

    #[serde(rename_all = "camelCase")]
    ItemRemoved {
        category: Category,
        item_id: String,
    },

    ItemMoved {
        source: WirePosition,
        destination: WirePosition,
        item: Item,
    },

    #[serde(rename_all = "camelCase")]
    VisibilityChanged {
        is_hidden: bool,
    },

    #[serde(rename_all = "camelCase")]
    OwnerChanged {
        new_owner: String,
    },

    #[serde(rename_all = "camelCase")]
    LikeUpdated {
        category: Category,
        item_id: String,
        likes: Vec<String>,
    },

    RoomNotFound {},

    JoinRejected {
        reason: String,
    },

    SessionReplaced {},
}
