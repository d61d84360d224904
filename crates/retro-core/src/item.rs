//! A single card on the board.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A board item.
///
/// `id` is chosen by the submitting client and treated as opaque. `author`
/// and `likes` are overwritten by the room on `add-item`, so whatever a
/// client puts there is only a display hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub content: String,

    #[serde(default)]
    pub author: String,

    /// Usernames that liked this item. Serialized as a sorted array.
    #[serde(default)]
    pub likes: BTreeSet<String>,
}

impl Item {
    /// Create an item with no likes.
    pub fn new(id: impl Into<String>, content: impl Into<String>, author: impl Into<String>) -> Self {
        Item {
            id: id.into(),
            content: content.into(),
            author: author.into(),
            likes: BTreeSet::new(),
        }
    }

    /// Add `username` to the likes if absent, remove it otherwise.
    ///
    /// Returns `true` when the user now likes the item.
    pub fn toggle_like(&mut self, username: &str) -> bool {
        if self.likes.remove(username) {
            false
        } else {
            self.likes.insert(username.to_string());
            true
        }
    }

    /// Likes as a list, in the order they are serialized.
    pub fn likes_vec(&self) -> Vec<String> {
        self.likes.iter().cloned().collect()
    }
}
