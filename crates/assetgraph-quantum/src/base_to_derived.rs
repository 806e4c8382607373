//! Base-to-derived registry.
//!
//! An asset may derive from a base (archetype) asset. While the derived graph
//! is materialized, every identifiable node of the base graph is paired with
//! its counterpart in the derived graph. The pairs let later edits to the base
//! be propagated, and let a reference in the derived graph that still points
//! at a base object be re-targeted to the matching derived object.
//!
//! Keys are always base-graph nodes and values derived-graph nodes. A
//! registry lives for one derivation pass.

use crate::config::QuantumConfig;
use crate::error::Result;
use crate::node::{GraphNode, IdentifiableRef, ItemReference, MemberNode, NodeContainer, ObjectNode};
use crate::policy::{Edge, ItemKind, ReferencePolicy};
use crate::visitor::{self, walk_item, walk_member, walk_object, GraphVisitor, VisitContext};
use ahash::AHashMap;
use assetgraph_reflect::{Index, ObjectGraph, ShapeKind, Value};

/// Finds, for an item of a derived container, the matching item of the base
/// container.
pub trait BaseLinker {
    fn find_base_reference(
        &self,
        base: &NodeContainer<'_>,
        base_container: &ObjectNode,
        derived: &NodeContainer<'_>,
        derived_container: &ObjectNode,
        derived_reference: &ItemReference,
    ) -> Result<Option<ItemReference>>;
}

/// Matches items by shared `ItemId`. Items without an id, and base
/// containers without an id table, fall back to the same index (position or
/// key) on the base side.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemIdBaseLinker;

impl BaseLinker for ItemIdBaseLinker {
    fn find_base_reference(
        &self,
        base: &NodeContainer<'_>,
        base_container: &ObjectNode,
        derived: &NodeContainer<'_>,
        derived_container: &ObjectNode,
        derived_reference: &ItemReference,
    ) -> Result<Option<ItemReference>> {
        let derived_id = derived
            .graph()
            .item_ids(derived_container.handle())?
            .and_then(|ids| ids.get(&derived_reference.index));
        let base_ids = base.graph().item_ids(base_container.handle())?;
        match (derived_id, base_ids) {
            // An id the base never had marks an item added by the derived asset.
            (Some(id), Some(base_ids)) => match base_ids.index_of(id) {
                Some(index) => base.item_reference(base_container, index),
                None => Ok(None),
            },
            _ => base.item_reference(base_container, &derived_reference.index),
        }
    }
}

pub struct BaseToDerivedRegistry<'g> {
    base: NodeContainer<'g>,
    derived: NodeContainer<'g>,
    policy: &'g dyn ReferencePolicy,
    linker: &'g dyn BaseLinker,
    base_to_derived: AHashMap<GraphNode, GraphNode>,
}

impl<'g> BaseToDerivedRegistry<'g> {
    pub fn new(
        base: &'g ObjectGraph,
        derived: &'g ObjectGraph,
        policy: &'g dyn ReferencePolicy,
        linker: &'g dyn BaseLinker,
    ) -> Self {
        Self {
            base: NodeContainer::new(base),
            derived: NodeContainer::new(derived),
            policy,
            linker,
            base_to_derived: AHashMap::new(),
        }
    }

    pub fn base(&self) -> NodeContainer<'g> {
        self.base
    }

    pub fn derived(&self) -> NodeContainer<'g> {
        self.derived
    }

    /// Record the pairing of one structurally corresponding pair of nodes.
    ///
    /// A missing base node, or one whose value is null, records nothing.
    pub fn register_base_to_derived(
        &mut self,
        base_node: Option<&GraphNode>,
        derived_node: &GraphNode,
    ) -> Result<()> {
        let Some(base_node) = base_node else {
            return Ok(());
        };
        self.base.check(base_node)?;
        self.derived.check(derived_node)?;
        let base_value = self.base.value_of(base_node)?;
        if base_value.is_null() {
            return Ok(());
        }

        if self.base.is_identifiable(&base_value) {
            self.insert(base_node.clone(), derived_node.clone());

            if let (GraphNode::Member(base_member), Some(base_target)) =
                (base_node, base_value.as_object())
            {
                let edge = Edge::Member {
                    owner: base_member.owner().handle(),
                    name: base_member.name(),
                    value: &base_value,
                };
                if !self.policy.is_reference(self.base.graph(), &edge) {
                    let derived_target = match derived_node {
                        GraphNode::Member(m) => self.derived.target_of(m)?,
                        GraphNode::Object(_) => None,
                    };
                    // Overridden to null or a plain value in the derived asset.
                    let Some(derived_target) = derived_target else {
                        tracing::debug!(%base_member, %derived_node, "derived member has no target");
                        return Ok(());
                    };
                    let base_target = self.base.object_node(base_target)?;
                    self.insert(base_target.into(), derived_target.into());
                }
            }
        }

        if let (GraphNode::Object(base_object), GraphNode::Object(derived_object)) = (base_node, derived_node) {
            self.register_items(base_object, derived_object)?;
        }
        Ok(())
    }

    fn register_items(&mut self, base_object: &ObjectNode, derived_object: &ObjectNode) -> Result<()> {
        let (Some(_), Some(derived_items)) = (
            self.base.item_references(base_object)?,
            self.derived.item_references(derived_object)?,
        ) else {
            return Ok(());
        };
        let kind = item_kind(self.base.shape_kind(base_object)?);
        for reference in &derived_items {
            let Some(base_reference) = self.linker.find_base_reference(
                &self.base,
                base_object,
                &self.derived,
                derived_object,
                reference,
            )?
            else {
                tracing::debug!(%derived_object, index = %reference.index, "no base counterpart");
                continue;
            };
            let Some(base_target) = base_reference.target else {
                continue;
            };
            let edge = Edge::Item {
                container: base_object.handle(),
                kind,
                index: &base_reference.index,
                value: &base_reference.value,
            };
            if self.policy.is_reference(self.base.graph(), &edge)
                || !self.base.is_identifiable(&base_reference.value)
            {
                continue;
            }
            if let Some(derived_target) = self.derived.indexed_target(derived_object, &reference.index)? {
                self.insert(base_target.into(), derived_target.into());
            }
        }
        Ok(())
    }

    fn insert(&mut self, base: GraphNode, derived: GraphNode) {
        tracing::trace!(%base, %derived, "base to derived");
        if let Some(previous) = self.base_to_derived.insert(base.clone(), derived.clone()) {
            if previous != derived {
                tracing::warn!(%base, %previous, %derived, "base node re-mapped");
            }
        }
    }

    /// Derived counterpart of a base-graph value.
    ///
    /// `derived_referencer` is the derived node asking; it must belong to the
    /// derived graph. Null or scalar base values, handles the base graph does
    /// not hold and unmapped objects resolve to `None`.
    pub fn resolve_from_base(
        &self,
        base_reference: &Value,
        derived_referencer: &GraphNode,
    ) -> Result<Option<IdentifiableRef>> {
        self.derived.check(derived_referencer)?;
        if base_reference.as_object().is_some_and(|h| !self.base.graph().contains(h)) {
            return Ok(None);
        }
        let Some(base_node) = self.base.node_for_value(base_reference)? else {
            return Ok(None);
        };
        match self.base_to_derived.get(&GraphNode::Object(base_node)) {
            Some(derived) => self.derived.identifiable(derived),
            None => Ok(None),
        }
    }

    pub fn derived_of(&self, base_node: &GraphNode) -> Option<&GraphNode> {
        self.base_to_derived.get(base_node)
    }

    pub fn len(&self) -> usize {
        self.base_to_derived.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base_to_derived.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GraphNode, &GraphNode)> {
        self.base_to_derived.iter()
    }
}

fn item_kind(shape: ShapeKind) -> ItemKind {
    match shape {
        ShapeKind::Array => ItemKind::Array,
        ShapeKind::Dictionary => ItemKind::Dictionary,
        ShapeKind::Set => ItemKind::Set,
        _ => ItemKind::Collection,
    }
}

// ============================================================================
// Graph linker
// ============================================================================

/// Walks the derived graph and, alongside, its base, registering each
/// corresponding pair.
///
/// Members are matched by name, container items through the `BaseLinker`.
/// Where the base has no counterpart the subtree is walked with no base and
/// nothing is registered for it.
pub fn link_to_base<'g>(
    base: &'g ObjectGraph,
    derived: &'g ObjectGraph,
    policy: &'g dyn ReferencePolicy,
    linker: &'g dyn BaseLinker,
) -> Result<BaseToDerivedRegistry<'g>> {
    link_to_base_with_config(base, derived, policy, linker, &QuantumConfig::default())
}

/// `link_to_base` with the walk bounded by `config.max_depth`.
pub fn link_to_base_with_config<'g>(
    base: &'g ObjectGraph,
    derived: &'g ObjectGraph,
    policy: &'g dyn ReferencePolicy,
    linker: &'g dyn BaseLinker,
    config: &QuantumConfig,
) -> Result<BaseToDerivedRegistry<'g>> {
    let mut registry = BaseToDerivedRegistry::new(base, derived, policy, linker);
    let base_root = registry.base.root_node()?;
    let derived_root = registry.derived.root_node()?;
    let mut walker = BaseGraphLinker {
        registry: &mut registry,
        base_stack: vec![Some(base_root)],
    };
    let mut cx = VisitContext::new(derived, policy).with_max_depth(config.max_depth);
    visitor::visit(&mut walker, &mut cx, &derived_root)?;
    tracing::debug!(pairs = registry.len(), "linked derived graph to base");
    Ok(registry)
}

struct BaseGraphLinker<'r, 'g> {
    registry: &'r mut BaseToDerivedRegistry<'g>,
    /// Base counterpart of each derived object being walked.
    base_stack: Vec<Option<ObjectNode>>,
}

impl BaseGraphLinker<'_, '_> {
    fn current_base(&self) -> Option<ObjectNode> {
        self.base_stack.last().copied().flatten()
    }

    fn base_item(&self, derived_container: &ObjectNode, index: &Index, value: &Value) -> Result<Option<ObjectNode>> {
        let Some(base_container) = self.current_base() else {
            return Ok(None);
        };
        let derived = self.registry.derived;
        let base = self.registry.base;
        let reference = ItemReference {
            index: index.clone(),
            value: value.clone(),
            target: derived.node_for_value(value)?,
        };
        let found = self.registry.linker.find_base_reference(
            &base,
            &base_container,
            &derived,
            derived_container,
            &reference,
        )?;
        Ok(found.and_then(|r| r.target))
    }

    fn walk_linked_item<'a>(
        &mut self,
        cx: &mut VisitContext<'a>,
        container: &ObjectNode,
        kind: ItemKind,
        index: &Index,
        value: &'a Value,
    ) -> Result<()> {
        let base_target = self.base_item(container, index, value)?;
        self.base_stack.push(base_target);
        let result = walk_item(self, cx, container, kind, index, value);
        self.base_stack.pop();
        result
    }
}

impl GraphVisitor for BaseGraphLinker<'_, '_> {
    fn visit_object(&mut self, cx: &mut VisitContext<'_>, node: &ObjectNode) -> Result<()> {
        let base = self.current_base().map(GraphNode::Object);
        self.registry.register_base_to_derived(base.as_ref(), &GraphNode::Object(*node))?;
        walk_object(self, cx, node)
    }

    fn visit_object_member<'a>(
        &mut self,
        cx: &mut VisitContext<'a>,
        member: &MemberNode,
        value: &'a Value,
    ) -> Result<()> {
        let base_member = match self.current_base() {
            Some(owner) => self.registry.base.member_node(&owner, member.name()).ok(),
            None => None,
        };
        let base_member = base_member.map(GraphNode::Member);
        self.registry
            .register_base_to_derived(base_member.as_ref(), &GraphNode::Member(member.clone()))?;

        let base_target = match &base_member {
            Some(GraphNode::Member(m)) => self.registry.base.target_of(m)?,
            _ => None,
        };
        self.base_stack.push(base_target);
        let result = walk_member(self, cx, member, value);
        self.base_stack.pop();
        result
    }

    fn visit_collection_item<'a>(
        &mut self,
        cx: &mut VisitContext<'a>,
        container: &ObjectNode,
        index: &Index,
        value: &'a Value,
    ) -> Result<()> {
        self.walk_linked_item(cx, container, ItemKind::Collection, index, value)
    }

    fn visit_array_item<'a>(
        &mut self,
        cx: &mut VisitContext<'a>,
        container: &ObjectNode,
        index: &Index,
        value: &'a Value,
    ) -> Result<()> {
        self.walk_linked_item(cx, container, ItemKind::Array, index, value)
    }

    fn visit_dictionary_key_value<'a>(
        &mut self,
        cx: &mut VisitContext<'a>,
        container: &ObjectNode,
        key: &Index,
        value: &'a Value,
    ) -> Result<()> {
        self.walk_linked_item(cx, container, ItemKind::Dictionary, key, value)
    }

    fn visit_set_item<'a>(
        &mut self,
        cx: &mut VisitContext<'a>,
        container: &ObjectNode,
        index: &Index,
        value: &'a Value,
    ) -> Result<()> {
        self.walk_linked_item(cx, container, ItemKind::Set, index, value)
    }
}
