//! Message types used by the room coordinator.
//!
//! These are **transport-agnostic** logical messages:
//! - [`Operation`]: a mutation requested by a room member.
//! - [`ServerEvent`]: an event the room produces.
//! - [`Dispatch`]: who an event goes to (or which session to detach).
//!
//! The JSON encoding lives in the `retro-protocol` crate; this module is
//! purely logical.

use crate::category::Category;
use crate::item::Item;
use crate::item_store::ItemStore;
use crate::member::SessionId;

/// A position on the board: a category and an index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub category: Category,
    pub index: usize,
}

impl Position {
    pub fn new(category: Category, index: usize) -> Self {
        Position { category, index }
    }
}

/// A mutation requested by a connected member.
///
/// The acting username is never part of the operation: it comes from the
/// session that submitted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Append an item to a category.
    AddItem { category: Category, item: Item },

    /// Remove an item (author or owner only).
    RemoveItem { category: Category, item_id: String },

    /// Move an item to another position, possibly in another category.
    MoveItem {
        source: Position,
        destination: Position,
        item_id: String,
    },

    /// Flip the room-wide hidden flag (owner only).
    ToggleVisibility,

    /// Like or un-like an item as the acting user.
    ToggleLike { category: Category, item_id: String },
}

impl Operation {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::AddItem { .. } => "add-item",
            Operation::RemoveItem { .. } => "remove-item",
            Operation::MoveItem { .. } => "move-item",
            Operation::ToggleVisibility => "toggle-visibility",
            Operation::ToggleLike { .. } => "toggle-like",
        }
    }
}

/// Full room state sent to a joining connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub items: ItemStore,
    pub is_owner: bool,
    pub is_hidden: bool,
}

/// Why a join was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRejection {
    /// Another live connection already uses this username in the room.
    UsernameTaken,
}

impl JoinRejection {
    pub fn as_str(self) -> &'static str {
        match self {
            JoinRejection::UsernameTaken => "username-taken",
        }
    }
}

/// An event produced by a room (or by the connection layer on its behalf).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Snapshot for a newly joined connection.
    InitialState(Snapshot),

    ItemAdded { category: Category, item: Item },

    ItemRemoved { category: Category, item_id: String },

    /// `item` carries the full current content so out-of-sync clients can heal.
    ItemMoved {
        source: Position,
        destination: Position,
        item: Item,
    },

    VisibilityChanged { hidden: bool },

    OwnerChanged { new_owner: String },

    /// `likes` is the full resulting set, not a delta.
    LikeUpdated {
        category: Category,
        item_id: String,
        likes: Vec<String>,
    },

    /// The session's room no longer exists.
    RoomNotFound,

    /// The join was refused; the connection will be closed.
    JoinRejected(JoinRejection),

    /// A newer connection with the same username took this session's place.
    SessionReplaced,
}

impl ServerEvent {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::InitialState(_) => "initial-state",
            ServerEvent::ItemAdded { .. } => "item-added",
            ServerEvent::ItemRemoved { .. } => "item-removed",
            ServerEvent::ItemMoved { .. } => "item-moved",
            ServerEvent::VisibilityChanged { .. } => "visibility-changed",
            ServerEvent::OwnerChanged { .. } => "owner-changed",
            ServerEvent::LikeUpdated { .. } => "like-updated",
            ServerEvent::RoomNotFound => "room-not-found",
            ServerEvent::JoinRejected(_) => "join-rejected",
            ServerEvent::SessionReplaced => "session-replaced",
        }
    }
}

/// Routing directive produced by the room state machine.
///
/// The coordinator decides *what* happens; the fan-out layer owns the
/// actual connections and carries these out in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Deliver to exactly one session.
    Unicast(SessionId, ServerEvent),

    /// Deliver to every current member, the originator included.
    Broadcast(ServerEvent),

    /// Stop delivering to this session and drop its outbound channel.
    Disconnect(SessionId),
}
