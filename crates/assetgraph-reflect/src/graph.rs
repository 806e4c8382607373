//! The object-graph arena.
//!
//! `ObjectGraph` owns every object of one asset. Containment and reference
//! edges are both plain `Value::Object(handle)` slots; deciding which edge owns
//! an aliased object is left to the reference policy of the layer above.
//!
//! Each graph carries a process-local `GraphToken` so that handles and nodes
//! from one graph instance are never silently used against another. The token
//! is not serialized: a deserialized graph gets a fresh one, and so does a
//! clone (a derived asset starts life as a clone of its archetype).

use crate::error::{ReflectError, Result};
use crate::ids::Identifier;
use crate::item_ids::CollectionItemIds;
use crate::value::{Index, Key, ObjectHandle, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_GRAPH_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Process-local brand of one `ObjectGraph` instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphToken(NonZeroU64);

impl GraphToken {
    pub fn new() -> Self {
        let raw = NEXT_GRAPH_TOKEN.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    pub fn raw(self) -> u64 {
        self.0.get()
    }
}

impl Default for GraphToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GraphToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "graph#{}", self.0)
    }
}

/// What is left of a slot whose content could not be deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnloadableInfo {
    /// Type the slot was supposed to hold.
    pub type_name: String,
    /// Why loading failed (missing type, bad data, ...).
    pub reason: String,
    /// Raw serialized content, kept so the data is not lost on save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl UnloadableInfo {
    pub fn new(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            reason: reason.into(),
            payload: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Object,
    Collection,
    Array,
    Dictionary,
    Set,
    Unloadable,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShapeKind::Object => "object",
            ShapeKind::Collection => "collection",
            ShapeKind::Array => "array",
            ShapeKind::Dictionary => "dictionary",
            ShapeKind::Set => "set",
            ShapeKind::Unloadable => "unloadable placeholder",
        };
        f.write_str(name)
    }
}

/// Structural content of an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// Named members in declaration order.
    Object { members: Vec<(String, Value)> },
    Collection {
        items: Vec<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ids: Option<CollectionItemIds>,
    },
    /// Fixed length: items can be overwritten but never removed.
    Array { items: Vec<Value> },
    /// Entries in insertion order, keys unique.
    Dictionary {
        entries: Vec<(Key, Value)>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ids: Option<CollectionItemIds>,
    },
    /// Items keyed by `Key::from_value`.
    Set {
        items: Vec<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ids: Option<CollectionItemIds>,
    },
    Unloadable(UnloadableInfo),
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Object { .. } => ShapeKind::Object,
            Shape::Collection { .. } => ShapeKind::Collection,
            Shape::Array { .. } => ShapeKind::Array,
            Shape::Dictionary { .. } => ShapeKind::Dictionary,
            Shape::Set { .. } => ShapeKind::Set,
            Shape::Unloadable(_) => ShapeKind::Unloadable,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Shape::Collection { .. } | Shape::Array { .. } | Shape::Dictionary { .. } | Shape::Set { .. }
        )
    }

    pub fn item_ids(&self) -> Option<&CollectionItemIds> {
        match self {
            Shape::Collection { ids, .. } | Shape::Dictionary { ids, .. } | Shape::Set { ids, .. } => {
                ids.as_ref()
            }
            _ => None,
        }
    }

    fn item_ids_slot(&mut self) -> Option<&mut Option<CollectionItemIds>> {
        match self {
            Shape::Collection { ids, .. } | Shape::Dictionary { ids, .. } | Shape::Set { ids, .. } => {
                Some(ids)
            }
            _ => None,
        }
    }
}

/// One object in the arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectData {
    pub type_name: String,
    /// Present on identifiable objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Identifier>,
    pub shape: Shape,
}

impl ObjectData {
    pub fn object(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: None,
            shape: Shape::Object {
                members: Vec::new(),
            },
        }
    }

    pub fn collection(type_name: impl Into<String>, items: Vec<Value>) -> Self {
        Self {
            type_name: type_name.into(),
            id: None,
            shape: Shape::Collection { items, ids: None },
        }
    }

    pub fn array(type_name: impl Into<String>, items: Vec<Value>) -> Self {
        Self {
            type_name: type_name.into(),
            id: None,
            shape: Shape::Array { items },
        }
    }

    pub fn dictionary(type_name: impl Into<String>, entries: Vec<(Key, Value)>) -> Self {
        Self {
            type_name: type_name.into(),
            id: None,
            shape: Shape::Dictionary { entries, ids: None },
        }
    }

    pub fn set(type_name: impl Into<String>, items: Vec<Value>) -> Self {
        Self {
            type_name: type_name.into(),
            id: None,
            shape: Shape::Set { items, ids: None },
        }
    }

    pub fn unloadable(info: UnloadableInfo) -> Self {
        Self {
            type_name: info.type_name.clone(),
            id: None,
            shape: Shape::Unloadable(info),
        }
    }

    pub fn with_id(mut self, id: Identifier) -> Self {
        self.id = Some(id);
        self
    }

    /// Append a member (object shapes only; ignored otherwise).
    pub fn with_member(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Shape::Object { members } = &mut self.shape {
            members.push((name.into(), value.into()));
        }
        self
    }

    /// Attach an empty item-id table (collections, dictionaries and sets).
    pub fn with_item_ids(mut self) -> Self {
        if let Some(slot) = self.shape.item_ids_slot() {
            slot.get_or_insert_with(CollectionItemIds::new);
        }
        self
    }

    pub fn is_identifiable(&self) -> bool {
        self.id.is_some()
    }

    pub fn is_unloadable(&self) -> bool {
        matches!(self.shape, Shape::Unloadable(_))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ObjectGraph {
    #[serde(skip)]
    token: GraphToken,
    objects: Vec<ObjectData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    root: Option<ObjectHandle>,
}

impl Default for ObjectGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// A clone is a new graph instance: same content and handles, fresh token.
impl Clone for ObjectGraph {
    fn clone(&self) -> Self {
        Self {
            token: GraphToken::new(),
            objects: self.objects.clone(),
            root: self.root,
        }
    }
}

/// Content equality; tokens are ignored.
impl PartialEq for ObjectGraph {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.objects == other.objects
    }
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self {
            token: GraphToken::new(),
            objects: Vec::new(),
            root: None,
        }
    }

    pub fn token(&self) -> GraphToken {
        self.token
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn add_object(&mut self, data: ObjectData) -> ObjectHandle {
        let handle = ObjectHandle::new(self.objects.len() as u32);
        self.objects.push(data);
        handle
    }

    pub fn set_root(&mut self, handle: ObjectHandle) -> Result<()> {
        self.get(handle)?;
        self.root = Some(handle);
        Ok(())
    }

    pub fn root(&self) -> Option<ObjectHandle> {
        self.root
    }

    pub fn contains(&self, handle: ObjectHandle) -> bool {
        handle.slot() < self.objects.len()
    }

    pub fn handles(&self) -> impl Iterator<Item = ObjectHandle> + '_ {
        (0..self.objects.len()).map(|i| ObjectHandle::new(i as u32))
    }

    pub fn get(&self, handle: ObjectHandle) -> Result<&ObjectData> {
        self.objects
            .get(handle.slot())
            .ok_or(ReflectError::UnknownHandle(handle))
    }

    pub fn get_mut(&mut self, handle: ObjectHandle) -> Result<&mut ObjectData> {
        self.objects
            .get_mut(handle.slot())
            .ok_or(ReflectError::UnknownHandle(handle))
    }

    pub fn identifier(&self, handle: ObjectHandle) -> Option<Identifier> {
        self.objects.get(handle.slot()).and_then(|o| o.id)
    }

    /// Identifier of the object a value points at, if it is identifiable.
    pub fn identifier_of(&self, value: &Value) -> Option<Identifier> {
        value.as_object().and_then(|h| self.identifier(h))
    }

    pub fn is_unloadable(&self, value: &Value) -> bool {
        value
            .as_object()
            .and_then(|h| self.objects.get(h.slot()))
            .map(ObjectData::is_unloadable)
            .unwrap_or(false)
    }

    /// First object in arena order carrying `id`.
    pub fn find_identifiable(&self, id: Identifier) -> Option<ObjectHandle> {
        self.objects
            .iter()
            .position(|o| o.id == Some(id))
            .map(|i| ObjectHandle::new(i as u32))
    }

    // ========================================================================
    // Members
    // ========================================================================

    pub fn members(&self, handle: ObjectHandle) -> Result<&[(String, Value)]> {
        match &self.get(handle)?.shape {
            Shape::Object { members } => Ok(members),
            other => Err(shape_mismatch(handle, "object", other)),
        }
    }

    pub fn member(&self, handle: ObjectHandle, name: &str) -> Result<&Value> {
        self.members(handle)?
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| ReflectError::UnknownMember {
                handle,
                member: name.to_string(),
            })
    }

    /// Overwrite an existing member, returning the previous value.
    pub fn set_member(&mut self, handle: ObjectHandle, name: &str, value: Value) -> Result<Value> {
        let data = self.get_mut(handle)?;
        let kind = data.shape.kind();
        let Shape::Object { members } = &mut data.shape else {
            return Err(mismatch(handle, "object", kind));
        };
        let slot = members
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| ReflectError::UnknownMember {
                handle,
                member: name.to_string(),
            })?;
        Ok(std::mem::replace(slot, value))
    }

    // ========================================================================
    // Items
    // ========================================================================

    /// Indices of a container in enumeration order.
    pub fn item_indices(&self, handle: ObjectHandle) -> Result<Vec<Index>> {
        match &self.get(handle)?.shape {
            Shape::Collection { items, .. } | Shape::Array { items } => {
                Ok((0..items.len()).map(Index::Position).collect())
            }
            Shape::Dictionary { entries, .. } => {
                Ok(entries.iter().map(|(k, _)| Index::Key(k.clone())).collect())
            }
            Shape::Set { items, .. } => Ok(items
                .iter()
                .filter_map(Key::from_value)
                .map(Index::Key)
                .collect()),
            other => Err(shape_mismatch(handle, "container", other)),
        }
    }

    pub fn item(&self, handle: ObjectHandle, index: &Index) -> Result<&Value> {
        let out_of_range = || ReflectError::IndexOutOfRange {
            handle,
            index: index.clone(),
        };
        match (&self.get(handle)?.shape, index) {
            (Shape::Collection { items, .. } | Shape::Array { items }, Index::Position(p)) => {
                items.get(*p).ok_or_else(out_of_range)
            }
            (Shape::Dictionary { entries, .. }, Index::Key(key)) => entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v)
                .ok_or_else(out_of_range),
            (Shape::Set { items, .. }, Index::Key(key)) => items
                .iter()
                .find(|v| Key::from_value(v).as_ref() == Some(key))
                .ok_or_else(out_of_range),
            (shape, _) if shape.is_container() => Err(out_of_range()),
            (shape, _) => Err(shape_mismatch(handle, "container", shape)),
        }
    }

    /// Overwrite an existing collection/array position or dictionary entry.
    /// Set elements are their own key and cannot be overwritten in place.
    pub fn set_item(&mut self, handle: ObjectHandle, index: &Index, value: Value) -> Result<Value> {
        let out_of_range = || ReflectError::IndexOutOfRange {
            handle,
            index: index.clone(),
        };
        let data = self.get_mut(handle)?;
        let kind = data.shape.kind();
        let slot = match (&mut data.shape, index) {
            (Shape::Collection { items, .. } | Shape::Array { items }, Index::Position(p)) => {
                items.get_mut(*p).ok_or_else(out_of_range)?
            }
            (Shape::Dictionary { entries, .. }, Index::Key(key)) => entries
                .iter_mut()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v)
                .ok_or_else(out_of_range)?,
            (Shape::Set { .. }, _) => {
                return Err(mismatch(handle, "collection, array or dictionary", kind))
            }
            (shape, _) if shape.is_container() => return Err(out_of_range()),
            (shape, _) => return Err(shape_mismatch(handle, "container", shape)),
        };
        Ok(std::mem::replace(slot, value))
    }

    /// Append to a collection or add to a set. Returns the new item's index.
    pub fn push_item(&mut self, handle: ObjectHandle, value: Value) -> Result<Index> {
        let data = self.get_mut(handle)?;
        match &mut data.shape {
            Shape::Collection { items, .. } => {
                items.push(value);
                Ok(Index::Position(items.len() - 1))
            }
            Shape::Set { items, .. } => {
                let key = Key::from_value(&value).ok_or(ReflectError::UnkeyableValue)?;
                if items.iter().any(|v| Key::from_value(v).as_ref() == Some(&key)) {
                    return Err(ReflectError::DuplicateKey { handle, key });
                }
                items.push(value);
                Ok(Index::Key(key))
            }
            other => Err(shape_mismatch(handle, "collection or set", other)),
        }
    }

    /// Insert into a collection, shifting later items (and their ids).
    pub fn insert_item(&mut self, handle: ObjectHandle, position: usize, value: Value) -> Result<()> {
        let data = self.get_mut(handle)?;
        let kind = data.shape.kind();
        let Shape::Collection { items, ids } = &mut data.shape else {
            return Err(mismatch(handle, "collection", kind));
        };
        if position > items.len() {
            return Err(ReflectError::IndexOutOfRange {
                handle,
                index: Index::Position(position),
            });
        }
        items.insert(position, value);
        if let Some(ids) = ids {
            ids.shift_insert(position);
        }
        Ok(())
    }

    pub fn insert_entry(&mut self, handle: ObjectHandle, key: Key, value: Value) -> Result<()> {
        let data = self.get_mut(handle)?;
        let kind = data.shape.kind();
        let Shape::Dictionary { entries, .. } = &mut data.shape else {
            return Err(mismatch(handle, "dictionary", kind));
        };
        if entries.iter().any(|(k, _)| *k == key) {
            return Err(ReflectError::DuplicateKey { handle, key });
        }
        entries.push((key, value));
        Ok(())
    }

    /// Remove an item from a collection, dictionary or set.
    ///
    /// Returns the removed value and the item id it carried, if any. Arrays
    /// are fixed-length: clear them with `set_item(.., Value::Null)` instead.
    pub fn remove_item(
        &mut self,
        handle: ObjectHandle,
        index: &Index,
    ) -> Result<(Value, Option<crate::ItemId>)> {
        let out_of_range = || ReflectError::IndexOutOfRange {
            handle,
            index: index.clone(),
        };
        let data = self.get_mut(handle)?;
        match (&mut data.shape, index) {
            (Shape::Collection { items, ids }, Index::Position(p)) => {
                if *p >= items.len() {
                    return Err(out_of_range());
                }
                let value = items.remove(*p);
                let id = ids.as_mut().and_then(|ids| ids.shift_remove(*p));
                Ok((value, id))
            }
            (Shape::Dictionary { entries, ids }, Index::Key(key)) => {
                let pos = entries
                    .iter()
                    .position(|(k, _)| k == key)
                    .ok_or_else(out_of_range)?;
                let (_, value) = entries.remove(pos);
                let id = ids.as_mut().and_then(|ids| ids.remove(index));
                Ok((value, id))
            }
            (Shape::Set { items, ids }, Index::Key(key)) => {
                let pos = items
                    .iter()
                    .position(|v| Key::from_value(v).as_ref() == Some(key))
                    .ok_or_else(out_of_range)?;
                let value = items.remove(pos);
                let id = ids.as_mut().and_then(|ids| ids.remove(index));
                Ok((value, id))
            }
            (shape, _) if matches!(shape, Shape::Array { .. }) => {
                Err(shape_mismatch(handle, "collection, dictionary or set", shape))
            }
            (shape, _) if shape.is_container() => Err(out_of_range()),
            (shape, _) => Err(shape_mismatch(handle, "container", shape)),
        }
    }

    // ========================================================================
    // Item identifiers
    // ========================================================================

    pub fn item_ids(&self, handle: ObjectHandle) -> Result<Option<&CollectionItemIds>> {
        Ok(self.get(handle)?.shape.item_ids())
    }

    pub fn item_ids_mut(&mut self, handle: ObjectHandle) -> Result<Option<&mut CollectionItemIds>> {
        Ok(self
            .get_mut(handle)?
            .shape
            .item_ids_slot()
            .and_then(|slot| slot.as_mut()))
    }

    /// Attach an (empty) id table if none exists yet and return it.
    pub fn attach_item_ids(&mut self, handle: ObjectHandle) -> Result<&mut CollectionItemIds> {
        let data = self.get_mut(handle)?;
        let kind = data.shape.kind();
        data.shape
            .item_ids_slot()
            .map(|slot| slot.get_or_insert_with(CollectionItemIds::new))
            .ok_or(ReflectError::ItemIdsUnsupported(kind))
    }
}

fn shape_mismatch(handle: ObjectHandle, expected: &'static str, actual: &Shape) -> ReflectError {
    mismatch(handle, expected, actual.kind())
}

fn mismatch(handle: ObjectHandle, expected: &'static str, actual: ShapeKind) -> ReflectError {
    ReflectError::ShapeMismatch {
        handle,
        expected,
        actual,
    }
}
