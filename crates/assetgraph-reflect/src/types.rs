//! Type-shape descriptors.
//!
//! Facts about a type that the data alone does not carry: which members hold
//! references (aliases owned elsewhere) rather than owned sub-objects, whether
//! a container's items are references, and which containers opt out of
//! stable item identity and are addressed positionally.
//!
//! Unknown types answer `false` to every query.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub name: String,
    /// Members whose object value is a reference, never owned.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub reference_members: BTreeSet<String>,
    /// Every item of this container is a reference.
    #[serde(default)]
    pub item_references: bool,
    /// Items of this container are addressed by position, never by `ItemId`.
    #[serde(default)]
    pub non_identifiable_items: bool,
    /// Members whose whole subtree is addressed positionally.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub non_identifiable_members: BTreeSet<String>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_reference_member(mut self, member: impl Into<String>) -> Self {
        self.reference_members.insert(member.into());
        self
    }

    pub fn with_item_references(mut self) -> Self {
        self.item_references = true;
        self
    }

    pub fn with_non_identifiable_items(mut self) -> Self {
        self.non_identifiable_items = true;
        self
    }

    pub fn with_non_identifiable_member(mut self, member: impl Into<String>) -> Self {
        self.non_identifiable_members.insert(member.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRegistry {
    types: BTreeMap<String, TypeDescriptor>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a descriptor, keyed by its name.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> &mut Self {
        self.types.insert(descriptor.name.clone(), descriptor);
        self
    }

    pub fn get(&self, type_name: &str) -> Option<&TypeDescriptor> {
        self.types.get(type_name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn is_member_reference(&self, type_name: &str, member: &str) -> bool {
        self.get(type_name)
            .map(|d| d.reference_members.contains(member))
            .unwrap_or(false)
    }

    pub fn are_items_references(&self, type_name: &str) -> bool {
        self.get(type_name).map(|d| d.item_references).unwrap_or(false)
    }

    pub fn items_non_identifiable(&self, type_name: &str) -> bool {
        self.get(type_name)
            .map(|d| d.non_identifiable_items)
            .unwrap_or(false)
    }

    pub fn member_non_identifiable(&self, type_name: &str, member: &str) -> bool {
        self.get(type_name)
            .map(|d| d.non_identifiable_members.contains(member))
            .unwrap_or(false)
    }
}

impl FromIterator<TypeDescriptor> for TypeRegistry {
    fn from_iter<I: IntoIterator<Item = TypeDescriptor>>(iter: I) -> Self {
        let mut registry = Self::new();
        for descriptor in iter {
            registry.register(descriptor);
        }
        registry
    }
}
