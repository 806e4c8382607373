//! Graph nodes.
//!
//! A node names a location in one `ObjectGraph` instance:
//!
//! - an **object node** stands for an object (plain object, collection,
//!   array, dictionary, set or placeholder) and, for containers, exposes its
//!   *item references*;
//! - a **member node** stands for one named member slot of a plain object and
//!   has a *target* when the slot holds an object.
//!
//! Nodes are small values branded with the graph's `GraphToken`. The
//! `NodeContainer` hands them out, checks that nodes passed back to it belong
//! to its graph, and answers the value/target/item questions about them.

use crate::error::{GraphError, Result};
use assetgraph_reflect::{
    GraphToken, Identifier, Index, ObjectGraph, ObjectHandle, Shape, ShapeKind, Value,
};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectNode {
    token: GraphToken,
    handle: ObjectHandle,
}

impl ObjectNode {
    pub fn token(&self) -> GraphToken {
        self.token
    }

    pub fn handle(&self) -> ObjectHandle {
        self.handle
    }
}

impl fmt::Display for ObjectNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.token, self.handle)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberNode {
    token: GraphToken,
    owner: ObjectHandle,
    name: String,
}

impl MemberNode {
    pub fn token(&self) -> GraphToken {
        self.token
    }

    pub fn owner(&self) -> ObjectNode {
        ObjectNode {
            token: self.token,
            handle: self.owner,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for MemberNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner(), self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GraphNode {
    Object(ObjectNode),
    Member(MemberNode),
}

impl GraphNode {
    pub fn token(&self) -> GraphToken {
        match self {
            GraphNode::Object(n) => n.token,
            GraphNode::Member(n) => n.token,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectNode> {
        match self {
            GraphNode::Object(n) => Some(n),
            GraphNode::Member(_) => None,
        }
    }

    pub fn as_member(&self) -> Option<&MemberNode> {
        match self {
            GraphNode::Member(n) => Some(n),
            GraphNode::Object(_) => None,
        }
    }
}

impl From<ObjectNode> for GraphNode {
    fn from(node: ObjectNode) -> Self {
        GraphNode::Object(node)
    }
}

impl From<MemberNode> for GraphNode {
    fn from(node: MemberNode) -> Self {
        GraphNode::Member(node)
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphNode::Object(n) => n.fmt(f),
            GraphNode::Member(n) => n.fmt(f),
        }
    }
}

/// Edge from a container to one of its items.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemReference {
    pub index: Index,
    pub value: Value,
    /// Node of the item when the item is an object.
    pub target: Option<ObjectNode>,
}

/// An identifiable object, as returned by lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct IdentifiableRef {
    pub id: Identifier,
    #[serde(serialize_with = "serialize_handle")]
    pub node: ObjectNode,
}

fn serialize_handle<S: serde::Serializer>(node: &ObjectNode, s: S) -> std::result::Result<S::Ok, S::Error> {
    node.handle.serialize(s)
}

/// Owner of the nodes of one graph.
#[derive(Debug, Clone, Copy)]
pub struct NodeContainer<'g> {
    graph: &'g ObjectGraph,
}

impl<'g> NodeContainer<'g> {
    pub fn new(graph: &'g ObjectGraph) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &'g ObjectGraph {
        self.graph
    }

    pub fn token(&self) -> GraphToken {
        self.graph.token()
    }

    pub fn root_node(&self) -> Result<ObjectNode> {
        let root = self
            .graph
            .root()
            .ok_or_else(|| GraphError::invalid_argument("graph has no root object"))?;
        self.object_node(root)
    }

    /// Node of the object behind `handle`.
    pub fn object_node(&self, handle: ObjectHandle) -> Result<ObjectNode> {
        if !self.graph.contains(handle) {
            return Err(GraphError::invalid_argument(format!(
                "{handle} is not an object of {}",
                self.token()
            )));
        }
        Ok(ObjectNode {
            token: self.token(),
            handle,
        })
    }

    /// Node of the object a value points at; `None` for scalars and null.
    pub fn node_for_value(&self, value: &Value) -> Result<Option<ObjectNode>> {
        value.as_object().map(|h| self.object_node(h)).transpose()
    }

    pub fn member_node(&self, owner: &ObjectNode, name: &str) -> Result<MemberNode> {
        self.check_object(owner)?;
        self.graph.member(owner.handle, name)?;
        Ok(MemberNode {
            token: self.token(),
            owner: owner.handle,
            name: name.to_string(),
        })
    }

    /// Member nodes of a plain object, in declaration order.
    pub fn member_nodes(&self, owner: &ObjectNode) -> Result<Vec<MemberNode>> {
        self.check_object(owner)?;
        Ok(self
            .graph
            .members(owner.handle)?
            .iter()
            .map(|(name, _)| MemberNode {
                token: self.token(),
                owner: owner.handle,
                name: name.clone(),
            })
            .collect())
    }

    /// Fail unless `node` was handed out for this graph and still resolves.
    pub fn check(&self, node: &GraphNode) -> Result<()> {
        match node {
            GraphNode::Object(n) => self.check_object(n),
            GraphNode::Member(n) => {
                self.check_object(&n.owner())?;
                self.graph.member(n.owner, &n.name)?;
                Ok(())
            }
        }
    }

    pub fn check_object(&self, node: &ObjectNode) -> Result<()> {
        if node.token != self.token() {
            return Err(GraphError::invalid_argument(format!(
                "node {node} does not belong to {}",
                self.token()
            )));
        }
        self.graph.get(node.handle)?;
        Ok(())
    }

    pub fn shape_kind(&self, node: &ObjectNode) -> Result<ShapeKind> {
        self.check_object(node)?;
        Ok(self.graph.get(node.handle)?.shape.kind())
    }

    /// Current value of a node: the object itself for object nodes, the slot
    /// content for member nodes.
    pub fn value_of(&self, node: &GraphNode) -> Result<Value> {
        self.check(node)?;
        match node {
            GraphNode::Object(n) => Ok(Value::Object(n.handle)),
            GraphNode::Member(n) => Ok(self.graph.member(n.owner, &n.name)?.clone()),
        }
    }

    /// Object node the member points at, if the member holds an object.
    pub fn target_of(&self, member: &MemberNode) -> Result<Option<ObjectNode>> {
        self.check(&GraphNode::Member(member.clone()))?;
        let value = self.graph.member(member.owner, &member.name)?;
        self.node_for_value(value)
    }

    /// Item references of a container in enumeration order; `None` when the
    /// node is not a container.
    pub fn item_references(&self, node: &ObjectNode) -> Result<Option<Vec<ItemReference>>> {
        self.check_object(node)?;
        if !self.graph.get(node.handle)?.shape.is_container() {
            return Ok(None);
        }
        let mut out = Vec::new();
        for index in self.graph.item_indices(node.handle)? {
            let value = self.graph.item(node.handle, &index)?.clone();
            let target = self.node_for_value(&value)?;
            out.push(ItemReference {
                index,
                value,
                target,
            });
        }
        Ok(Some(out))
    }

    /// The item reference at `index`, or `None` if the container has no such
    /// item (or the node is not a container).
    pub fn item_reference(&self, node: &ObjectNode, index: &Index) -> Result<Option<ItemReference>> {
        self.check_object(node)?;
        if !self.graph.get(node.handle)?.shape.is_container() {
            return Ok(None);
        }
        let Ok(value) = self.graph.item(node.handle, index) else {
            return Ok(None);
        };
        let value = value.clone();
        let target = self.node_for_value(&value)?;
        Ok(Some(ItemReference {
            index: index.clone(),
            value,
            target,
        }))
    }

    /// Target object of the item at `index`.
    pub fn indexed_target(&self, node: &ObjectNode, index: &Index) -> Result<Option<ObjectNode>> {
        Ok(self.item_reference(node, index)?.and_then(|r| r.target))
    }

    pub fn is_identifiable(&self, value: &Value) -> bool {
        self.graph.identifier_of(value).is_some()
    }

    /// The identifiable object a node currently holds, if any.
    pub fn identifiable(&self, node: &GraphNode) -> Result<Option<IdentifiableRef>> {
        let value = self.value_of(node)?;
        let Some(id) = self.graph.identifier_of(&value) else {
            return Ok(None);
        };
        let Some(handle) = value.as_object() else {
            return Ok(None);
        };
        Ok(Some(IdentifiableRef {
            id,
            node: self.object_node(handle)?,
        }))
    }

    pub(crate) fn is_container(&self, node: &ObjectNode) -> bool {
        self.graph
            .get(node.handle)
            .map(|d| d.shape.is_container())
            .unwrap_or(false)
    }

    pub(crate) fn is_plain_object(&self, node: &ObjectNode) -> bool {
        self.graph
            .get(node.handle)
            .map(|d| matches!(d.shape, Shape::Object { .. }))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetgraph_reflect::{ObjectData, ReflectError};

    fn graph() -> ObjectGraph {
        let mut graph = ObjectGraph::new();
        let child = graph.add_object(ObjectData::object("Child").with_id(Identifier::from_u128(1)));
        let list = graph.add_object(ObjectData::collection("List", vec![Value::Object(child), Value::Int(2)]));
        let root = graph.add_object(
            ObjectData::object("Root")
                .with_member("Child", child)
                .with_member("List", list)
                .with_member("Name", "root"),
        );
        graph.set_root(root).unwrap();
        graph
    }

    #[test]
    fn test_member_target() {
        let graph = graph();
        let nodes = NodeContainer::new(&graph);
        let root = nodes.root_node().unwrap();
        let child = nodes.member_node(&root, "Child").unwrap();
        let target = nodes.target_of(&child).unwrap().unwrap();
        assert_eq!(target.handle(), ObjectHandle::new(0));

        let name = nodes.member_node(&root, "Name").unwrap();
        assert_eq!(nodes.target_of(&name).unwrap(), None);
        assert_eq!(nodes.value_of(&name.into()).unwrap(), Value::from("root"));
    }

    #[test]
    fn test_item_references() {
        let graph = graph();
        let nodes = NodeContainer::new(&graph);
        let list = nodes.object_node(ObjectHandle::new(1)).unwrap();
        let refs = nodes.item_references(&list).unwrap().unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].target.map(|t| t.handle()), Some(ObjectHandle::new(0)));
        assert_eq!(refs[1].target, None);

        let root = nodes.root_node().unwrap();
        assert_eq!(nodes.item_references(&root).unwrap(), None);
        assert_eq!(nodes.item_reference(&list, &Index::Position(9)).unwrap(), None);
    }

    #[test]
    fn test_foreign_nodes_are_rejected() {
        let a = graph();
        let b = a.clone();
        let node_in_a = NodeContainer::new(&a).root_node().unwrap();
        let err = NodeContainer::new(&b).check_object(&node_in_a).unwrap_err();
        assert!(matches!(err, GraphError::InvalidArgument(_)));
    }

    #[test]
    fn test_missing_member_surfaces_reflect_error() {
        let graph = graph();
        let nodes = NodeContainer::new(&graph);
        let root = nodes.root_node().unwrap();
        let err = nodes.member_node(&root, "Nope").unwrap_err();
        assert!(matches!(
            err,
            GraphError::Reflect(ReflectError::UnknownMember { .. })
        ));
    }

    #[test]
    fn test_identifiable_lookup() {
        let graph = graph();
        let nodes = NodeContainer::new(&graph);
        let root = nodes.root_node().unwrap();
        let child = nodes.member_node(&root, "Child").unwrap();
        let found = nodes.identifiable(&child.into()).unwrap().unwrap();
        assert_eq!(found.id, Identifier::from_u128(1));
        assert_eq!(nodes.identifiable(&root.into()).unwrap(), None);
    }
}
