//! retro-core
//!
//! Pure room logic for the retro board:
//! - categories and items
//! - per-room ordered item store
//! - join-ordered membership
//! - the room state machine (join / apply / leave)
//! - logical input/output messages

pub mod category;
pub mod error;
pub mod item;
pub mod item_store;
pub mod member;
pub mod messages;
pub mod room;

pub use category::Category;
pub use error::CoreError;
pub use item::Item;
pub use item_store::{ItemStore, MoveOutcome};
pub use member::{Member, Members, SessionId};

pub use messages::{
    Dispatch,
    JoinRejection,
    Operation,
    Position,
    ServerEvent,
    Snapshot,
};

pub use room::{DuplicateUsernamePolicy, RoomState};
