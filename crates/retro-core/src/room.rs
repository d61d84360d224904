//! Authoritative state of one room and the rules for changing it.
//!
//! `RoomState` is the single place where operations are applied. It is
//! synchronous and owns no connections: every call returns the
//! [`Dispatch`] directives describing what to send to whom, and the caller
//! (the server's room task) carries them out. Calls on one `RoomState`
//! must be serialized, which the owning task guarantees by processing its
//! mailbox one command at a time.
//!
//! Policies:
//! - The first member to join becomes owner.
//! - When the owner leaves, the earliest-joined remaining member becomes owner.
//! - Item authorship and likes are bound to the session's username,
//!   never to payload fields.
//! - Denied or stale operations produce no dispatches at all.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::category::Category;
use crate::error::CoreError;
use crate::item::Item;
use crate::item_store::ItemStore;
use crate::member::{Members, SessionId};
use crate::messages::{Dispatch, JoinRejection, Operation, Position, ServerEvent, Snapshot};

/// What to do when a username joins a room where it is already connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateUsernamePolicy {
    /// The new connection replaces the old one, which is told and closed.
    #[default]
    Takeover,
    /// The new connection is refused and closed.
    Reject,
}

impl FromStr for DuplicateUsernamePolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "takeover" => Ok(DuplicateUsernamePolicy::Takeover),
            "reject" => Ok(DuplicateUsernamePolicy::Reject),
            _ => Err(CoreError::UnknownPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for DuplicateUsernamePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateUsernamePolicy::Takeover => f.write_str("takeover"),
            DuplicateUsernamePolicy::Reject => f.write_str("reject"),
        }
    }
}

/// State of a single room.
#[derive(Debug, Clone)]
pub struct RoomState {
    room_id: String,
    store: ItemStore,
    members: Members,
    owner: Option<String>,
    hidden: bool,
    policy: DuplicateUsernamePolicy,
}

impl RoomState {
    /// Create an empty, memberless room.
    pub fn new(room_id: impl Into<String>, policy: DuplicateUsernamePolicy) -> Self {
        RoomState {
            room_id: room_id.into(),
            store: ItemStore::new(),
            members: Members::new(),
            owner: None,
            hidden: false,
            policy,
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    pub fn members(&self) -> &Members {
        &self.members
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// A room with no members is destroyed by its owner task.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn is_owner(&self, username: &str) -> bool {
        self.owner.as_deref() == Some(username)
    }

    fn snapshot_for(&self, username: &str) -> Snapshot {
        Snapshot {
            items: self.store.clone(),
            is_owner: self.is_owner(username),
            is_hidden: self.hidden,
        }
    }

    // -------------------------------------------------------------------------
    // Membership
    // -------------------------------------------------------------------------

    /// Admit `session` under `username`.
    ///
    /// The joining session always receives either its `initial-state` or a
    /// rejection; nothing about a join is broadcast.
    pub fn join(&mut self, session: SessionId, username: &str) -> Vec<Dispatch> {
        if let Some(existing) = self.members.by_username(username) {
            if existing.session == session {
                return Vec::new();
            }

            return match self.policy {
                DuplicateUsernamePolicy::Reject => {
                    debug!(room = %self.room_id, user = %username, %session, "username taken, rejecting join");
                    vec![
                        Dispatch::Unicast(
                            session,
                            ServerEvent::JoinRejected(JoinRejection::UsernameTaken),
                        ),
                        Dispatch::Disconnect(session),
                    ]
                }
                DuplicateUsernamePolicy::Takeover => {
                    let mut out = Vec::with_capacity(3);
                    if let Some(previous) = self.members.rebind(username, session) {
                        debug!(room = %self.room_id, user = %username, %previous, %session, "session taken over");
                        out.push(Dispatch::Unicast(previous, ServerEvent::SessionReplaced));
                        out.push(Dispatch::Disconnect(previous));
                    }
                    out.push(Dispatch::Unicast(
                        session,
                        ServerEvent::InitialState(self.snapshot_for(username)),
                    ));
                    out
                }
            };
        }

        if self.members.is_empty() {
            self.owner = Some(username.to_string());
        }
        self.members.push(username, session);

        vec![Dispatch::Unicast(
            session,
            ServerEvent::InitialState(self.snapshot_for(username)),
        )]
    }

    /// Remove `session` from the room.
    ///
    /// A session that is not (or no longer) a member is ignored, so a
    /// replaced connection's late disconnect cannot evict its successor.
    pub fn leave(&mut self, session: SessionId) -> Vec<Dispatch> {
        let Some(member) = self.members.remove_session(session) else {
            return Vec::new();
        };

        let mut out = vec![Dispatch::Disconnect(session)];

        if self.members.is_empty() {
            self.owner = None;
            return out;
        }

        if self.is_owner(&member.username) {
            self.owner = self.members.first().map(|m| m.username.clone());
            if let Some(new_owner) = self.owner.clone() {
                out.push(Dispatch::Broadcast(ServerEvent::OwnerChanged { new_owner }));
            }
        }

        out
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    /// Apply an operation submitted by `session`.
    pub fn apply(&mut self, session: SessionId, op: Operation) -> Vec<Dispatch> {
        let Some(username) = self.members.by_session(session).map(|m| m.username.clone()) else {
            debug!(room = %self.room_id, %session, op = op.kind(), "operation from non-member ignored");
            return Vec::new();
        };

        match op {
            Operation::AddItem { category, item } => self.add_item(&username, category, item),
            Operation::RemoveItem { category, item_id } => {
                self.remove_item(&username, category, &item_id)
            }
            Operation::MoveItem {
                source,
                destination,
                item_id,
            } => self.move_item(source, destination, &item_id),
            Operation::ToggleVisibility => self.toggle_visibility(&username),
            Operation::ToggleLike { category, item_id } => {
                self.toggle_like(&username, category, &item_id)
            }
        }
    }

    fn may_remove(&self, username: &str, item: &Item) -> bool {
        item.author == username || self.is_owner(username)
    }

    fn add_item(&mut self, username: &str, category: Category, mut item: Item) -> Vec<Dispatch> {
        if item.content.trim().is_empty() {
            debug!(room = %self.room_id, user = %username, "empty item content dropped");
            return Vec::new();
        }

        item.author = username.to_string();
        item.likes.clear();

        let mut out = Vec::with_capacity(2);

        // Last write wins on id collisions, but only for someone who could
        // have removed the earlier item anyway.
        if let Some((existing_category, index)) = self.store.locate(&item.id) {
            let existing = &self.store.items(existing_category)[index];
            if !self.may_remove(username, existing) {
                debug!(room = %self.room_id, user = %username, item = %item.id, "id collision with foreign item, add dropped");
                return Vec::new();
            }
            self.store.remove(existing_category, &item.id);
            out.push(Dispatch::Broadcast(ServerEvent::ItemRemoved {
                category: existing_category,
                item_id: item.id.clone(),
            }));
        }

        self.store.push(category, item.clone());
        out.push(Dispatch::Broadcast(ServerEvent::ItemAdded { category, item }));
        out
    }

    fn remove_item(&mut self, username: &str, category: Category, item_id: &str) -> Vec<Dispatch> {
        let allowed = match self.store.get(category, item_id) {
            Some(item) => self.may_remove(username, item),
            None => return Vec::new(),
        };
        if !allowed {
            debug!(room = %self.room_id, user = %username, item = %item_id, "remove denied");
            return Vec::new();
        }

        match self.store.remove(category, item_id) {
            Some(_) => vec![Dispatch::Broadcast(ServerEvent::ItemRemoved {
                category,
                item_id: item_id.to_string(),
            })],
            None => Vec::new(),
        }
    }

    fn move_item(&mut self, source: Position, destination: Position, item_id: &str) -> Vec<Dispatch> {
        match self
            .store
            .move_item(source.category, item_id, destination.category, destination.index)
        {
            Some(outcome) => vec![Dispatch::Broadcast(ServerEvent::ItemMoved {
                source: Position::new(source.category, outcome.from_index),
                destination: Position::new(destination.category, outcome.to_index),
                item: outcome.item,
            })],
            None => {
                debug!(room = %self.room_id, item = %item_id, source = %source.category, "stale move ignored");
                Vec::new()
            }
        }
    }

    fn toggle_visibility(&mut self, username: &str) -> Vec<Dispatch> {
        if !self.is_owner(username) {
            debug!(room = %self.room_id, user = %username, "visibility toggle by non-owner ignored");
            return Vec::new();
        }
        self.hidden = !self.hidden;
        vec![Dispatch::Broadcast(ServerEvent::VisibilityChanged {
            hidden: self.hidden,
        })]
    }

    fn toggle_like(&mut self, username: &str, category: Category, item_id: &str) -> Vec<Dispatch> {
        let Some(item) = self.store.get_mut(category, item_id) else {
            return Vec::new();
        };
        item.toggle_like(username);
        vec![Dispatch::Broadcast(ServerEvent::LikeUpdated {
            category,
            item_id: item_id.to_string(),
            likes: item.likes_vec(),
        })]
    }
}
