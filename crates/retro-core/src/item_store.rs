//! Per-room ordered item lists, one per category.
//!
//! - Insertion order is the display order.
//! - Each item lives in exactly one category at a time.
//! - A move removes the item from its source list and inserts it into the
//!   destination list in one step, so no intermediate state is visible.
//!
//! Lookups are linear scans. Boards hold tens of items, so an index map
//! would cost more in bookkeeping than it saves.

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::item::Item;

/// Ordered items for all three categories of a room.
///
/// Serializes as `{"went_well": [...], "to_improve": [...], "action_items": [...]}`,
/// which is exactly the `items` field of the `initial-state` message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStore {
    went_well: Vec<Item>,
    to_improve: Vec<Item>,
    action_items: Vec<Item>,
}

/// Where an item ended up after [`ItemStore::move_item`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Index the item was found at in the source category.
    pub from_index: usize,
    /// Index the item was inserted at, after clamping.
    pub to_index: usize,
    /// The moved item, as it now sits in the destination category.
    pub item: Item,
}

impl ItemStore {
    /// Create an empty store.
    pub fn new() -> Self {
        ItemStore::default()
    }

    /// Items of one category, in display order.
    pub fn items(&self, category: Category) -> &[Item] {
        match category {
            Category::WentWell => &self.went_well,
            Category::ToImprove => &self.to_improve,
            Category::ActionItems => &self.action_items,
        }
    }

    fn items_mut(&mut self, category: Category) -> &mut Vec<Item> {
        match category {
            Category::WentWell => &mut self.went_well,
            Category::ToImprove => &mut self.to_improve,
            Category::ActionItems => &mut self.action_items,
        }
    }

    /// Number of items in one category.
    pub fn len(&self, category: Category) -> usize {
        self.items(category).len()
    }

    /// Total number of items across all categories.
    pub fn total(&self) -> usize {
        Category::ALL.iter().map(|c| self.len(*c)).sum()
    }

    /// True when no category holds any item.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Append an item to the end of a category.
    pub fn push(&mut self, category: Category, item: Item) {
        self.items_mut(category).push(item);
    }

    /// Find an item by id within one category.
    pub fn get(&self, category: Category, item_id: &str) -> Option<&Item> {
        self.items(category).iter().find(|item| item.id == item_id)
    }

    /// Mutable lookup by id within one category.
    pub fn get_mut(&mut self, category: Category, item_id: &str) -> Option<&mut Item> {
        self.items_mut(category).iter_mut().find(|item| item.id == item_id)
    }

    /// Find an item anywhere in the store.
    ///
    /// Returns its category and index.
    pub fn locate(&self, item_id: &str) -> Option<(Category, usize)> {
        Category::ALL.iter().find_map(|category| {
            self.items(*category)
                .iter()
                .position(|item| item.id == item_id)
                .map(|index| (*category, index))
        })
    }

    /// Remove the first item with `item_id` from `category`.
    ///
    /// An absent id is not an error; `None` is returned and nothing changes.
    pub fn remove(&mut self, category: Category, item_id: &str) -> Option<Item> {
        let items = self.items_mut(category);
        let index = items.iter().position(|item| item.id == item_id)?;
        Some(items.remove(index))
    }

    /// Move `item_id` from `source` to `destination` at `index`.
    ///
    /// The item must currently be in `source`; otherwise the move is treated
    /// as already applied elsewhere and `None` is returned without touching
    /// the store. `index` is clamped to `[0, len(destination)]` where the
    /// length is measured after the item left its source list.
    pub fn move_item(
        &mut self,
        source: Category,
        item_id: &str,
        destination: Category,
        index: usize,
    ) -> Option<MoveOutcome> {
        let from_index = self.items(source).iter().position(|item| item.id == item_id)?;
        let item = self.items_mut(source).remove(from_index);

        let target = self.items_mut(destination);
        let to_index = index.min(target.len());
        target.insert(to_index, item.clone());

        Some(MoveOutcome {
            from_index,
            to_index,
            item,
        })
    }
}
