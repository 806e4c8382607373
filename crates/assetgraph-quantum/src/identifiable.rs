//! Identifiable object registry.
//!
//! Builds `Identifier -> object` for every identifiable object reached
//! through a *reference* edge. Objects reached only by containment are left
//! out: they are found structurally and need no lookup table. The table is
//! what reference resolution and reference validation consult.

use crate::error::{GraphError, Result};
use crate::node::{NodeContainer, ObjectNode};
use crate::policy::{Edge, ReferencePolicy};
use crate::visitor::{self, GraphVisitor, VisitContext};
use crate::QuantumConfig;
use assetgraph_reflect::{Identifier, ObjectGraph, ObjectHandle};
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct IdentifiableObjectCollector {
    found: BTreeMap<Identifier, ObjectNode>,
    config: QuantumConfig,
}

impl IdentifiableObjectCollector {
    pub fn new(config: QuantumConfig) -> Self {
        Self {
            found: BTreeMap::new(),
            config,
        }
    }

    /// Collect from the graph's root.
    pub fn collect(
        graph: &ObjectGraph,
        policy: &dyn ReferencePolicy,
    ) -> Result<BTreeMap<Identifier, ObjectNode>> {
        let root = NodeContainer::new(graph).root_node()?;
        Self::new(QuantumConfig::default()).collect_from(graph, policy, &root)
    }

    /// Collect starting at `root`, consuming the collector.
    pub fn collect_from(
        mut self,
        graph: &ObjectGraph,
        policy: &dyn ReferencePolicy,
        root: &ObjectNode,
    ) -> Result<BTreeMap<Identifier, ObjectNode>> {
        let mut cx = VisitContext::new(graph, policy).with_max_depth(self.config.max_depth);
        visitor::visit(&mut self, &mut cx, root)?;
        tracing::debug!(count = self.found.len(), "collected identifiable references");
        Ok(self.found)
    }
}

impl GraphVisitor for IdentifiableObjectCollector {
    fn visit_reference(
        &mut self,
        cx: &mut VisitContext<'_>,
        _edge: &Edge<'_>,
        target: ObjectHandle,
    ) -> Result<()> {
        let Some(id) = cx.graph().identifier(target) else {
            return Ok(());
        };
        let node = cx.nodes().object_node(target)?;
        if let Some(previous) = self.found.insert(id, node) {
            if previous.handle() != target {
                if self.config.strict_identifiers {
                    return Err(GraphError::IdentifierCollision {
                        id,
                        first: previous.handle(),
                        second: target,
                    });
                }
                tracing::warn!(%id, first = %previous.handle(), second = %target, "identifier collision");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{DeclaredReferences, NoReferences};
    use assetgraph_reflect::{ObjectData, TypeDescriptor, TypeRegistry, Value};

    const PART: Identifier = Identifier::from_u128(0xA);
    const OWNED: Identifier = Identifier::from_u128(0xB);

    fn types() -> TypeRegistry {
        [TypeDescriptor::new("Scene")
            .with_reference_member("Selected")
            .with_reference_member("Focus")]
        .into_iter()
        .collect()
    }

    fn scene(second_ref_to_other: bool) -> (ObjectGraph, ObjectHandle) {
        let mut graph = ObjectGraph::new();
        let part = graph.add_object(ObjectData::object("Part").with_id(PART));
        let other = graph.add_object(ObjectData::object("Part").with_id(PART));
        let owned = graph.add_object(ObjectData::object("Part").with_id(OWNED));
        let parts = graph.add_object(ObjectData::collection(
            "Parts",
            vec![Value::Object(part), Value::Object(owned)],
        ));
        let focus = if second_ref_to_other { other } else { part };
        let root = graph.add_object(
            ObjectData::object("Scene")
                .with_member("Parts", parts)
                .with_member("Selected", part)
                .with_member("Focus", focus),
        );
        graph.set_root(root).unwrap();
        (graph, part)
    }

    #[test]
    fn test_only_reference_reached_objects_are_registered() {
        let (graph, part) = scene(false);
        let types = types();
        let found = IdentifiableObjectCollector::collect(&graph, &DeclaredReferences::new(&types)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[&PART].handle(), part);
        assert!(!found.contains_key(&OWNED));
    }

    #[test]
    fn test_containment_only_graph_registers_nothing() {
        let (graph, _) = scene(false);
        // Without declared references the second and third edges to `part`
        // are still references (first containment edge owns it).
        let found = IdentifiableObjectCollector::collect(&graph, &NoReferences).unwrap();
        assert_eq!(found.keys().copied().collect::<Vec<_>>(), vec![PART]);
    }

    #[test]
    fn test_collision_is_fatal_when_strict() {
        let (graph, _) = scene(true);
        let types = types();
        let err = IdentifiableObjectCollector::collect(&graph, &DeclaredReferences::new(&types)).unwrap_err();
        assert!(matches!(err, GraphError::IdentifierCollision { id, .. } if id == PART));
    }

    #[test]
    fn test_collision_keeps_last_when_lenient() {
        let (graph, _) = scene(true);
        let types = types();
        let config = QuantumConfig {
            strict_identifiers: false,
            ..QuantumConfig::default()
        };
        let root = NodeContainer::new(&graph).root_node().unwrap();
        let found = IdentifiableObjectCollector::new(config)
            .collect_from(&graph, &DeclaredReferences::new(&types), &root)
            .unwrap();
        assert_eq!(found[&PART].handle(), ObjectHandle::new(1));
    }

    #[test]
    fn test_missing_root_is_invalid_argument() {
        let graph = ObjectGraph::new();
        let err = IdentifiableObjectCollector::collect(&graph, &NoReferences).unwrap_err();
        assert!(matches!(err, GraphError::InvalidArgument(_)));
    }
}
