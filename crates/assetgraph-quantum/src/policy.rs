//! Reference classification.
//!
//! Any object can be reachable from more than one slot. Exactly one slot owns
//! it (the containment edge); the others alias it (object references). The
//! policy decides, edge by edge, which is which. Visitors never recurse across
//! an edge the policy calls a reference.

use assetgraph_reflect::{Index, ObjectGraph, ObjectHandle, TypeRegistry, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Collection,
    Array,
    Dictionary,
    Set,
}

/// One edge of the graph, as seen by a policy.
#[derive(Debug, Clone, Copy)]
pub enum Edge<'e> {
    Member {
        owner: ObjectHandle,
        name: &'e str,
        value: &'e Value,
    },
    Item {
        container: ObjectHandle,
        kind: ItemKind,
        index: &'e Index,
        value: &'e Value,
    },
}

impl<'e> Edge<'e> {
    pub fn value(&self) -> &'e Value {
        match self {
            Edge::Member { value, .. } | Edge::Item { value, .. } => value,
        }
    }

    /// Object on the far side of the edge.
    pub fn target(&self) -> Option<ObjectHandle> {
        self.value().as_object()
    }

    /// Object the edge starts from.
    pub fn source(&self) -> ObjectHandle {
        match self {
            Edge::Member { owner, .. } => *owner,
            Edge::Item { container, .. } => *container,
        }
    }
}

pub trait ReferencePolicy {
    /// `true` when `edge` is an object reference rather than a containment
    /// edge. Only asked about edges whose value is an object.
    fn is_reference(&self, graph: &ObjectGraph, edge: &Edge<'_>) -> bool;
}

impl<F> ReferencePolicy for F
where
    F: Fn(&ObjectGraph, &Edge<'_>) -> bool,
{
    fn is_reference(&self, graph: &ObjectGraph, edge: &Edge<'_>) -> bool {
        self(graph, edge)
    }
}

/// Every edge is a containment edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReferences;

impl ReferencePolicy for NoReferences {
    fn is_reference(&self, _graph: &ObjectGraph, _edge: &Edge<'_>) -> bool {
        false
    }
}

/// Answers from the declared reference members / reference containers of a
/// `TypeRegistry`.
#[derive(Debug, Clone, Copy)]
pub struct DeclaredReferences<'r> {
    types: &'r TypeRegistry,
}

impl<'r> DeclaredReferences<'r> {
    pub fn new(types: &'r TypeRegistry) -> Self {
        Self { types }
    }
}

impl ReferencePolicy for DeclaredReferences<'_> {
    fn is_reference(&self, graph: &ObjectGraph, edge: &Edge<'_>) -> bool {
        let Ok(source) = graph.get(edge.source()) else {
            return false;
        };
        match edge {
            Edge::Member { name, .. } => self.types.is_member_reference(&source.type_name, name),
            Edge::Item { .. } => self.types.are_items_references(&source.type_name),
        }
    }
}
