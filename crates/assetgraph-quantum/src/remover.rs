//! Unloadable placeholder removal.
//!
//! Run right after an asset is deserialized: every slot holding an
//! unloadable placeholder is found, then cleared. Member slots and array
//! positions are set to `Null`; collection, dictionary and set items are
//! removed outright.
//!
//! Removal goes in reverse discovery order. A path recorded for a later
//! collection item still addresses the right element because every item
//! before it is still in place when it is removed.

use crate::error::{GraphError, Result};
use crate::node::{MemberNode, ObjectNode};
use crate::path::{GraphPath, PathStep};
use crate::policy::{ItemKind, ReferencePolicy};
use crate::visitor::{self, walk_item, walk_member, GraphVisitor, VisitContext};
use crate::QuantumConfig;
use assetgraph_reflect::{Index, ObjectGraph, ObjectHandle, Shape, UnloadableInfo, Value};
use parking_lot::Mutex;
use serde::Serialize;
use std::ops::{Deref, DerefMut};

/// A placeholder and the slot it was found in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnloadableItem {
    pub path: GraphPath,
    pub handle: ObjectHandle,
    pub info: UnloadableInfo,
}

/// Reusable remover. Holds the items of the last pass; each pass starts by
/// clearing them.
#[derive(Debug, Default)]
pub struct UnloadableObjectRemover {
    items: Vec<UnloadableItem>,
    config: QuantumConfig,
}

impl UnloadableObjectRemover {
    pub fn new(config: QuantumConfig) -> Self {
        Self {
            items: Vec::new(),
            config,
        }
    }

    /// Items found by the last pass.
    pub fn items(&self) -> &[UnloadableItem] {
        &self.items
    }

    /// Find every placeholder without touching the graph.
    pub fn discover(&mut self, graph: &ObjectGraph, policy: &dyn ReferencePolicy) -> Result<&[UnloadableItem]> {
        self.items.clear();
        let mut cx = VisitContext::new(graph, policy).with_max_depth(self.config.max_depth);
        visitor::visit_root(self, &mut cx)?;
        tracing::debug!(count = self.items.len(), "discovered unloadable placeholders");
        Ok(&self.items)
    }

    /// Find every placeholder and clear it. Returns what was removed.
    pub fn run(&mut self, graph: &mut ObjectGraph, policy: &dyn ReferencePolicy) -> Result<Vec<UnloadableItem>> {
        self.discover(graph, policy)?;
        let root = graph
            .root()
            .ok_or_else(|| GraphError::invalid_argument("graph has no root object"))?;
        for item in self.items.iter().rev() {
            clear_slot(graph, root, &item.path)?;
        }
        if !self.items.is_empty() {
            tracing::debug!(count = self.items.len(), "removed unloadable placeholders");
        }
        Ok(std::mem::take(&mut self.items))
    }

    /// Record `value` if it is a placeholder. Returns `true` when it was.
    fn record(&mut self, cx: &VisitContext<'_>, value: &Value) -> Result<bool> {
        let Some(handle) = value.as_object() else {
            return Ok(false);
        };
        let Shape::Unloadable(info) = &cx.graph().get(handle)?.shape else {
            return Ok(false);
        };
        tracing::trace!(path = %cx.path(), type_name = %info.type_name, "unloadable placeholder");
        self.items.push(UnloadableItem {
            path: cx.path().clone(),
            handle,
            info: info.clone(),
        });
        Ok(true)
    }

    fn item<'a>(
        &mut self,
        cx: &mut VisitContext<'a>,
        container: &ObjectNode,
        kind: ItemKind,
        index: &Index,
        value: &'a Value,
    ) -> Result<()> {
        if self.record(cx, value)? {
            return Ok(());
        }
        walk_item(self, cx, container, kind, index, value)
    }
}

impl GraphVisitor for UnloadableObjectRemover {
    fn visit_object_member<'a>(
        &mut self,
        cx: &mut VisitContext<'a>,
        member: &MemberNode,
        value: &'a Value,
    ) -> Result<()> {
        if self.record(cx, value)? {
            return Ok(());
        }
        walk_member(self, cx, member, value)
    }

    fn visit_collection_item<'a>(
        &mut self,
        cx: &mut VisitContext<'a>,
        container: &ObjectNode,
        index: &Index,
        value: &'a Value,
    ) -> Result<()> {
        self.item(cx, container, ItemKind::Collection, index, value)
    }

    fn visit_array_item<'a>(
        &mut self,
        cx: &mut VisitContext<'a>,
        container: &ObjectNode,
        index: &Index,
        value: &'a Value,
    ) -> Result<()> {
        self.item(cx, container, ItemKind::Array, index, value)
    }

    fn visit_dictionary_key_value<'a>(
        &mut self,
        cx: &mut VisitContext<'a>,
        container: &ObjectNode,
        key: &Index,
        value: &'a Value,
    ) -> Result<()> {
        self.item(cx, container, ItemKind::Dictionary, key, value)
    }

    fn visit_set_item<'a>(
        &mut self,
        cx: &mut VisitContext<'a>,
        container: &ObjectNode,
        index: &Index,
        value: &'a Value,
    ) -> Result<()> {
        self.item(cx, container, ItemKind::Set, index, value)
    }
}

/// Clear the slot a path ends on.
fn clear_slot(graph: &mut ObjectGraph, root: ObjectHandle, path: &GraphPath) -> Result<()> {
    let Some((parent, last)) = path.split_last() else {
        return Err(GraphError::invalid_argument("the root object cannot be removed"));
    };
    let owner = parent
        .resolve(graph, root)?
        .object(graph)
        .ok_or_else(|| GraphError::mismatch(&parent, "slot owner is not an object"))?;
    match last {
        PathStep::Member(name) => {
            graph.set_member(owner, name, Value::Null)?;
        }
        PathStep::Index(index) => {
            if matches!(graph.get(owner)?.shape, Shape::Array { .. }) {
                graph.set_item(owner, index, Value::Null)?;
            } else {
                graph.remove_item(owner, index)?;
            }
        }
        PathStep::Target => {
            return Err(GraphError::mismatch(path, "a slot path cannot end on a target step"));
        }
    }
    Ok(())
}

// ============================================================================
// Pool
// ============================================================================

/// Hands out removers to worker threads and takes them back when the guard
/// drops. Each remover is used by one thread at a time.
#[derive(Debug, Default)]
pub struct RemoverPool {
    idle: Mutex<Vec<UnloadableObjectRemover>>,
    config: QuantumConfig,
}

impl RemoverPool {
    pub fn new(config: QuantumConfig) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            config,
        }
    }

    pub fn get(&self) -> PooledRemover<'_> {
        let remover = self
            .idle
            .lock()
            .pop()
            .unwrap_or_else(|| UnloadableObjectRemover::new(self.config.clone()));
        PooledRemover { pool: self, remover }
    }

    /// Number of removers waiting to be reused.
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }
}

pub struct PooledRemover<'p> {
    pool: &'p RemoverPool,
    remover: UnloadableObjectRemover,
}

impl Deref for PooledRemover<'_> {
    type Target = UnloadableObjectRemover;

    fn deref(&self) -> &Self::Target {
        &self.remover
    }
}

impl DerefMut for PooledRemover<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.remover
    }
}

impl Drop for PooledRemover<'_> {
    fn drop(&mut self) {
        let mut remover = std::mem::take(&mut self.remover);
        remover.items.clear();
        remover.config = self.pool.config.clone();
        self.pool.idle.lock().push(remover);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::NoReferences;
    use assetgraph_reflect::{ItemId, Key, ObjectData};

    fn placeholder(graph: &mut ObjectGraph, type_name: &str) -> Value {
        Value::Object(graph.add_object(ObjectData::unloadable(UnloadableInfo::new(type_name, "unknown type"))))
    }

    fn list_graph(with_ids: bool) -> (ObjectGraph, ObjectHandle, Vec<Value>) {
        let mut graph = ObjectGraph::new();
        let a = Value::Object(graph.add_object(ObjectData::object("A")));
        let u1 = placeholder(&mut graph, "Missing.One");
        let b = Value::Object(graph.add_object(ObjectData::object("B")));
        let u2 = placeholder(&mut graph, "Missing.Two");
        let mut list = ObjectData::collection("List", vec![a.clone(), u1, b.clone(), u2]);
        if with_ids {
            list = list.with_item_ids();
        }
        let list = graph.add_object(list);
        if with_ids {
            let ids = graph.attach_item_ids(list).unwrap();
            for i in 0..4 {
                ids.insert(Index::Position(i), ItemId::from_u128(100 + i as u128));
            }
        }
        let root = graph.add_object(ObjectData::object("Root").with_member("Items", list));
        graph.set_root(root).unwrap();
        (graph, list, vec![a, b])
    }

    #[test]
    fn test_interleaved_placeholders_are_removed() {
        for with_ids in [false, true] {
            let (mut graph, list, kept) = list_graph(with_ids);
            let removed = UnloadableObjectRemover::default().run(&mut graph, &NoReferences).unwrap();
            assert_eq!(removed.len(), 2);
            assert_eq!(removed[0].path.to_string(), "Items->[1]");
            assert_eq!(removed[1].info.type_name, "Missing.Two");

            let items: Vec<_> = graph
                .item_indices(list)
                .unwrap()
                .iter()
                .map(|i| graph.item(list, i).unwrap().clone())
                .collect();
            assert_eq!(items, kept);
            if with_ids {
                let ids = graph.item_ids(list).unwrap().unwrap();
                assert_eq!(ids.get(&Index::Position(1)), Some(ItemId::from_u128(102)));
            }
        }
    }

    #[test]
    fn test_second_run_finds_nothing() {
        let (mut graph, _, _) = list_graph(false);
        let mut remover = UnloadableObjectRemover::default();
        assert_eq!(remover.run(&mut graph, &NoReferences).unwrap().len(), 2);
        assert!(remover.run(&mut graph, &NoReferences).unwrap().is_empty());
    }

    #[test]
    fn test_discover_leaves_graph_untouched() {
        let (graph, _, _) = list_graph(false);
        let before = graph.clone();
        let mut remover = UnloadableObjectRemover::default();
        assert_eq!(remover.discover(&graph, &NoReferences).unwrap().len(), 2);
        assert_eq!(graph, before);
    }

    #[test]
    fn test_member_array_dictionary_and_set_slots() {
        let mut graph = ObjectGraph::new();
        let u_member = placeholder(&mut graph, "M");
        let u_array = placeholder(&mut graph, "A");
        let u_dict = placeholder(&mut graph, "D");
        let u_set = placeholder(&mut graph, "S");
        let array = graph.add_object(ObjectData::array("Arr", vec![Value::Int(1), u_array]));
        let dict = graph.add_object(ObjectData::dictionary(
            "Dict",
            vec![(Key::Str("keep".into()), Value::Int(1)), (Key::Str("drop".into()), u_dict)],
        ));
        let set = graph.add_object(ObjectData::set("Set", vec![Value::Int(7), u_set]));
        let root = graph.add_object(
            ObjectData::object("Root")
                .with_member("Broken", u_member)
                .with_member("Arr", array)
                .with_member("Dict", dict)
                .with_member("Set", set),
        );
        graph.set_root(root).unwrap();

        let removed = UnloadableObjectRemover::default().run(&mut graph, &NoReferences).unwrap();
        assert_eq!(removed.len(), 4);
        assert_eq!(graph.member(root, "Broken").unwrap(), &Value::Null);
        assert_eq!(graph.item(array, &Index::Position(1)).unwrap(), &Value::Null);
        assert_eq!(graph.item_indices(dict).unwrap(), vec![Index::Key(Key::Str("keep".into()))]);
        assert_eq!(graph.item_indices(set).unwrap(), vec![Index::Key(Key::Int(7))]);
    }

    #[test]
    fn test_pool_reuses_removers() {
        let pool = RemoverPool::default();
        {
            let (mut graph, _, _) = list_graph(false);
            let mut remover = pool.get();
            remover.run(&mut graph, &NoReferences).unwrap();
        }
        assert_eq!(pool.idle(), 1);
        let remover = pool.get();
        assert!(remover.items().is_empty());
        assert_eq!(pool.idle(), 0);
    }
}
