//! Per-container item identity tables.
//!
//! A container with an attached `CollectionItemIds` table addresses its items
//! by `ItemId` in serialized paths. Containers without a table fall back to
//! raw indices. The table is keyed by the item's current `Index`, so list
//! edits must shift it (`shift_insert` / `shift_remove`); dictionary and set
//! keys are stable by construction.

use crate::ids::ItemId;
use crate::value::Index;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ItemIdsRepr", into = "ItemIdsRepr")]
pub struct CollectionItemIds {
    by_index: BTreeMap<Index, ItemId>,
    /// Ids of items that were removed and must not be reused.
    deleted: Vec<ItemId>,
}

/// JSON maps need string keys, so the table travels as a list of pairs.
#[derive(Serialize, Deserialize)]
struct ItemIdsRepr {
    items: Vec<(Index, ItemId)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    deleted: Vec<ItemId>,
}

impl From<ItemIdsRepr> for CollectionItemIds {
    fn from(repr: ItemIdsRepr) -> Self {
        Self {
            by_index: repr.items.into_iter().collect(),
            deleted: repr.deleted,
        }
    }
}

impl From<CollectionItemIds> for ItemIdsRepr {
    fn from(ids: CollectionItemIds) -> Self {
        Self {
            items: ids.by_index.into_iter().collect(),
            deleted: ids.deleted,
        }
    }
}

impl CollectionItemIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }

    pub fn get(&self, index: &Index) -> Option<ItemId> {
        self.by_index.get(index).copied()
    }

    /// Assign `id` to `index`, returning the id it replaces.
    pub fn insert(&mut self, index: Index, id: ItemId) -> Option<ItemId> {
        self.by_index.insert(index, id)
    }

    /// Existing id for `index`, or a freshly minted one that is stored before
    /// returning. The flag is `true` when the id was minted by this call.
    pub fn get_or_mint(&mut self, index: Index) -> (ItemId, bool) {
        if let Some(id) = self.by_index.get(&index) {
            return (*id, false);
        }
        let id = ItemId::new();
        self.by_index.insert(index, id);
        (id, true)
    }

    /// Current index of the item carrying `id`.
    pub fn index_of(&self, id: ItemId) -> Option<&Index> {
        self.by_index
            .iter()
            .find_map(|(index, candidate)| (*candidate == id).then_some(index))
    }

    pub fn contains_id(&self, id: ItemId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn remove(&mut self, index: &Index) -> Option<ItemId> {
        self.by_index.remove(index)
    }

    /// Make room for an item inserted at `position`: every positional entry at
    /// or after it moves one slot up.
    pub fn shift_insert(&mut self, position: usize) {
        self.reindex(|p| if p >= position { p + 1 } else { p });
    }

    /// Forget the item at `position` and close the gap. Returns its id.
    pub fn shift_remove(&mut self, position: usize) -> Option<ItemId> {
        let removed = self.by_index.remove(&Index::Position(position));
        self.reindex(|p| if p > position { p - 1 } else { p });
        removed
    }

    pub fn mark_deleted(&mut self, id: ItemId) {
        if !self.deleted.contains(&id) {
            self.deleted.push(id);
        }
    }

    pub fn is_deleted(&self, id: ItemId) -> bool {
        self.deleted.contains(&id)
    }

    pub fn deleted(&self) -> &[ItemId] {
        &self.deleted
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Index, &ItemId)> {
        self.by_index.iter()
    }

    fn reindex(&mut self, map: impl Fn(usize) -> usize) {
        let old = std::mem::take(&mut self.by_index);
        self.by_index = old
            .into_iter()
            .map(|(index, id)| match index {
                Index::Position(p) => (Index::Position(map(p)), id),
                other => (other, id),
            })
            .collect();
    }
}
