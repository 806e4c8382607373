//! Depth-first graph visitor.
//!
//! `GraphVisitor` has one hook per slot shape. Each default hook calls the
//! matching `walk_*` function, which carries on the traversal. An override
//! that wants to stop recursion simply does not call it.
//!
//! Before a slot hook runs, the walker has already pushed the slot's step
//! (`Member(name)` or `Index(i)`) onto `VisitContext::path`, so the hook sees
//! the path of the slot it is looking at.
//!
//! Order is deterministic: members in declaration order, collection and array
//! items by position, dictionary entries and set items in enumeration order.
//!
//! ## Ownership
//!
//! For each slot holding an object the `ReferencePolicy` is asked whether the
//! edge is a reference. References are reported through `visit_reference` and
//! never entered. The first containment edge to reach an object owns it: a
//! later edge to an object that was already entered is reported as a
//! reference too, which also stops cycles.

use crate::error::{GraphError, Result};
use crate::node::{MemberNode, NodeContainer, ObjectNode};
use crate::path::GraphPath;
use crate::policy::{Edge, ItemKind, ReferencePolicy};
use ahash::AHashSet;
use assetgraph_reflect::{Index, Key, ObjectGraph, ObjectHandle, Shape, TypeRegistry, Value};

/// Descriptor registry used when a pass is given none.
static NO_TYPES: std::sync::OnceLock<TypeRegistry> = std::sync::OnceLock::new();

/// Traversal state shared by the walker and the visitor hooks.
pub struct VisitContext<'a> {
    nodes: NodeContainer<'a>,
    policy: &'a dyn ReferencePolicy,
    types: &'a TypeRegistry,
    path: GraphPath,
    entered: AHashSet<ObjectHandle>,
    depth: usize,
    max_depth: usize,
    non_identifiable_depth: usize,
}

impl<'a> VisitContext<'a> {
    pub fn new(graph: &'a ObjectGraph, policy: &'a dyn ReferencePolicy) -> Self {
        Self {
            nodes: NodeContainer::new(graph),
            policy,
            types: NO_TYPES.get_or_init(TypeRegistry::new),
            path: GraphPath::new(),
            entered: AHashSet::new(),
            depth: 0,
            max_depth: crate::QuantumConfig::default().max_depth,
            non_identifiable_depth: 0,
        }
    }

    pub fn with_types(mut self, types: &'a TypeRegistry) -> Self {
        self.types = types;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn graph(&self) -> &'a ObjectGraph {
        self.nodes.graph()
    }

    pub fn nodes(&self) -> NodeContainer<'a> {
        self.nodes
    }

    pub fn policy(&self) -> &'a dyn ReferencePolicy {
        self.policy
    }

    pub fn types(&self) -> &'a TypeRegistry {
        self.types
    }

    /// Path from the traversal root to the current position.
    pub fn path(&self) -> &GraphPath {
        &self.path
    }

    /// Greater than zero while inside a subtree whose declared shape opts out
    /// of collection item identity.
    pub fn non_identifiable_depth(&self) -> usize {
        self.non_identifiable_depth
    }

    pub fn is_reference(&self, edge: &Edge<'_>) -> bool {
        self.policy.is_reference(self.graph(), edge)
    }
}

pub trait GraphVisitor {
    fn visit_object(&mut self, cx: &mut VisitContext<'_>, node: &ObjectNode) -> Result<()> {
        walk_object(self, cx, node)
    }

    fn visit_object_member<'a>(
        &mut self,
        cx: &mut VisitContext<'a>,
        member: &MemberNode,
        value: &'a Value,
    ) -> Result<()> {
        walk_member(self, cx, member, value)
    }

    fn visit_collection_item<'a>(
        &mut self,
        cx: &mut VisitContext<'a>,
        container: &ObjectNode,
        index: &Index,
        value: &'a Value,
    ) -> Result<()> {
        walk_item(self, cx, container, ItemKind::Collection, index, value)
    }

    fn visit_array_item<'a>(
        &mut self,
        cx: &mut VisitContext<'a>,
        container: &ObjectNode,
        index: &Index,
        value: &'a Value,
    ) -> Result<()> {
        walk_item(self, cx, container, ItemKind::Array, index, value)
    }

    fn visit_dictionary_key_value<'a>(
        &mut self,
        cx: &mut VisitContext<'a>,
        container: &ObjectNode,
        key: &Index,
        value: &'a Value,
    ) -> Result<()> {
        walk_item(self, cx, container, ItemKind::Dictionary, key, value)
    }

    fn visit_set_item<'a>(
        &mut self,
        cx: &mut VisitContext<'a>,
        container: &ObjectNode,
        index: &Index,
        value: &'a Value,
    ) -> Result<()> {
        walk_item(self, cx, container, ItemKind::Set, index, value)
    }

    /// An edge that was not followed. `target` is the aliased object.
    fn visit_reference(
        &mut self,
        _cx: &mut VisitContext<'_>,
        _edge: &Edge<'_>,
        _target: ObjectHandle,
    ) -> Result<()> {
        Ok(())
    }
}

/// Visit the graph from `root`.
pub fn visit<V: GraphVisitor + ?Sized>(
    visitor: &mut V,
    cx: &mut VisitContext<'_>,
    root: &ObjectNode,
) -> Result<()> {
    cx.nodes.check_object(root)?;
    cx.path = GraphPath::new();
    cx.entered.clear();
    cx.depth = 0;
    cx.non_identifiable_depth = 0;
    visitor.visit_object(cx, root)
}

/// Visit the graph from its root object.
pub fn visit_root<V: GraphVisitor + ?Sized>(visitor: &mut V, cx: &mut VisitContext<'_>) -> Result<()> {
    let root = cx.nodes.root_node()?;
    visit(visitor, cx, &root)
}

/// Enter an object and hand each of its slots to the visitor.
pub fn walk_object<V: GraphVisitor + ?Sized>(
    visitor: &mut V,
    cx: &mut VisitContext<'_>,
    node: &ObjectNode,
) -> Result<()> {
    if cx.depth >= cx.max_depth {
        return Err(GraphError::DepthExceeded(cx.max_depth));
    }
    let graph = cx.graph();
    let data = graph.get(node.handle())?;
    cx.entered.insert(node.handle());
    cx.depth += 1;

    let opts_out = cx.types.items_non_identifiable(&data.type_name);
    if opts_out {
        cx.non_identifiable_depth += 1;
    }
    let result = walk_slots(visitor, cx, node, &data.type_name, &data.shape);
    if opts_out {
        cx.non_identifiable_depth -= 1;
    }
    cx.depth -= 1;
    result
}

fn walk_slots<'a, V: GraphVisitor + ?Sized>(
    visitor: &mut V,
    cx: &mut VisitContext<'a>,
    node: &ObjectNode,
    type_name: &str,
    shape: &'a Shape,
) -> Result<()> {
    match shape {
        Shape::Object { members } => {
            for (name, value) in members {
                let member = cx.nodes.member_node(node, name)?;
                let opts_out = cx.types.member_non_identifiable(type_name, name);
                cx.path.push_member(name.as_str());
                if opts_out {
                    cx.non_identifiable_depth += 1;
                }
                let result = visitor.visit_object_member(cx, &member, value);
                if opts_out {
                    cx.non_identifiable_depth -= 1;
                }
                cx.path.pop();
                result?;
            }
        }
        Shape::Collection { items, .. } => {
            for (i, value) in items.iter().enumerate() {
                let index = Index::Position(i);
                with_index(cx, &index, |cx| visitor.visit_collection_item(cx, node, &index, value))?;
            }
        }
        Shape::Array { items } => {
            for (i, value) in items.iter().enumerate() {
                let index = Index::Position(i);
                with_index(cx, &index, |cx| visitor.visit_array_item(cx, node, &index, value))?;
            }
        }
        Shape::Dictionary { entries, .. } => {
            for (key, value) in entries {
                let index = Index::Key(key.clone());
                with_index(cx, &index, |cx| {
                    visitor.visit_dictionary_key_value(cx, node, &index, value)
                })?;
            }
        }
        Shape::Set { items, .. } => {
            for value in items {
                let Some(key) = Key::from_value(value) else {
                    continue;
                };
                let index = Index::Key(key);
                with_index(cx, &index, |cx| visitor.visit_set_item(cx, node, &index, value))?;
            }
        }
        Shape::Unloadable(_) => {}
    }
    Ok(())
}

fn with_index<'a>(
    cx: &mut VisitContext<'a>,
    index: &Index,
    f: impl FnOnce(&mut VisitContext<'a>) -> Result<()>,
) -> Result<()> {
    cx.path.push_index(index.clone());
    let result = f(cx);
    cx.path.pop();
    result
}

/// Continue into a member's value.
pub fn walk_member<'a, V: GraphVisitor + ?Sized>(
    visitor: &mut V,
    cx: &mut VisitContext<'a>,
    member: &MemberNode,
    value: &'a Value,
) -> Result<()> {
    let edge = Edge::Member {
        owner: member.owner().handle(),
        name: member.name(),
        value,
    };
    let Some(target) = follow(visitor, cx, &edge)? else {
        return Ok(());
    };
    cx.path.push_target();
    let result = visitor.visit_object(cx, &target);
    cx.path.pop();
    result
}

/// Continue into an item's value.
pub fn walk_item<'a, V: GraphVisitor + ?Sized>(
    visitor: &mut V,
    cx: &mut VisitContext<'a>,
    container: &ObjectNode,
    kind: ItemKind,
    index: &Index,
    value: &'a Value,
) -> Result<()> {
    let edge = Edge::Item {
        container: container.handle(),
        kind,
        index,
        value,
    };
    match follow(visitor, cx, &edge)? {
        Some(target) => visitor.visit_object(cx, &target),
        None => Ok(()),
    }
}

/// Classify an edge. Returns the node to enter for containment edges;
/// reports references and returns `None` for them and for scalar slots.
fn follow<V: GraphVisitor + ?Sized>(
    visitor: &mut V,
    cx: &mut VisitContext<'_>,
    edge: &Edge<'_>,
) -> Result<Option<ObjectNode>> {
    let Some(target) = edge.target() else {
        return Ok(None);
    };
    if cx.is_reference(edge) || cx.entered.contains(&target) {
        tracing::trace!(path = %cx.path, %target, "reference edge");
        visitor.visit_reference(cx, edge, target)?;
        return Ok(None);
    }
    cx.nodes.object_node(target).map(Some)
}
