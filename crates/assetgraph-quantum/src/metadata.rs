//! Path conversion and object-reference metadata.
//!
//! `PathConverter::convert_path` turns a `GraphPath` into a
//! `SerializationPath`, validating every step against the live graph.
//! Container steps are written as item ids when the container carries an id
//! table and the walk is not inside a region that opted out of item
//! identity. A slot that has no id yet gets one minted and stored in the
//! graph, so converting a path **mutates the graph**: converting the same
//! path again yields the same id.
//!
//! `MetadataCollector` walks a graph and records every object reference as
//! a serialization path plus the identifier it points at, which is what a
//! serializer writes next to the asset to restore references on load.

use crate::error::{GraphError, Result};
use crate::path::{Cursor, GraphPath, PathStep};
use crate::policy::{Edge, ReferencePolicy};
use crate::serialization_path::{PathElement, SerializationPath};
use crate::visitor::{self, GraphVisitor, VisitContext};
use crate::QuantumConfig;
use assetgraph_reflect::{Identifier, Index, ObjectGraph, ObjectHandle, Shape, TypeRegistry};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathConverter {
    mint_item_ids: bool,
}

impl Default for PathConverter {
    fn default() -> Self {
        Self { mint_item_ids: true }
    }
}

impl PathConverter {
    pub fn new(config: &QuantumConfig) -> Self {
        Self {
            mint_item_ids: config.mint_item_ids,
        }
    }

    /// Convert `path`, walked from `root`.
    ///
    /// `non_identifiable_depth > 0` forces raw indices for every container
    /// step. Fails with `StructuralMismatch` when a step does not fit the
    /// shape found in the graph.
    pub fn convert_path(
        &self,
        graph: &mut ObjectGraph,
        root: ObjectHandle,
        path: &GraphPath,
        non_identifiable_depth: usize,
    ) -> Result<SerializationPath> {
        let mut out = SerializationPath::new();
        let mut walked = GraphPath::new();
        let mut cursor = Cursor::Object(root);
        for step in path.steps() {
            walked.push(step.clone());
            if let PathStep::Member(_) = step {
                let is_plain_object = cursor
                    .object(graph)
                    .and_then(|h| graph.get(h).ok())
                    .map(|d| matches!(d.shape, Shape::Object { .. }))
                    .unwrap_or(false);
                if !is_plain_object {
                    return Err(GraphError::mismatch(&walked, "member step requires an object node"));
                }
            }
            let next = cursor
                .step(graph, step)
                .map_err(|message| GraphError::mismatch(&walked, message))?;
            match step {
                PathStep::Member(name) => out.push_member(name.as_str()),
                PathStep::Target => {}
                PathStep::Index(index) => {
                    let Cursor::Item { container, .. } = &next else {
                        return Err(GraphError::mismatch(&walked, "index step did not land on an item"));
                    };
                    out.push(self.item_element(graph, *container, index, non_identifiable_depth)?);
                }
            }
            cursor = next;
        }
        Ok(out)
    }

    fn item_element(
        &self,
        graph: &mut ObjectGraph,
        container: ObjectHandle,
        index: &Index,
        non_identifiable_depth: usize,
    ) -> Result<PathElement> {
        if non_identifiable_depth > 0 {
            return Ok(PathElement::Index(index.clone()));
        }
        let Some(ids) = graph.item_ids_mut(container)? else {
            return Ok(PathElement::Index(index.clone()));
        };
        if let Some(id) = ids.get(index) {
            return Ok(PathElement::ItemId(id));
        }
        if !self.mint_item_ids {
            return Ok(PathElement::Index(index.clone()));
        }
        let (id, _) = ids.get_or_mint(index.clone());
        tracing::debug!(%container, %index, %id, "minted item id");
        Ok(PathElement::ItemId(id))
    }
}

/// Turn a serialization path back into a graph path over the current graph.
///
/// Target steps are re-inserted wherever a member is followed by another
/// element, and item ids are looked up in the container's id table.
pub fn resolve_serialization_path(
    graph: &ObjectGraph,
    root: ObjectHandle,
    path: &SerializationPath,
) -> Result<GraphPath> {
    let mut out = GraphPath::new();
    let mut cursor = Cursor::Object(root);
    for element in path.elements() {
        if let Cursor::Member { .. } = cursor {
            out.push_target();
            cursor = cursor
                .step(graph, &PathStep::Target)
                .map_err(|message| GraphError::mismatch(&out, message))?;
        }
        let step = match element {
            PathElement::Member(name) => PathStep::Member(name.clone()),
            PathElement::Index(index) => PathStep::Index(index.clone()),
            PathElement::ItemId(id) => {
                let container = cursor
                    .object(graph)
                    .ok_or_else(|| GraphError::mismatch(&out, "item id on a non-object position"))?;
                let index = graph
                    .item_ids(container)?
                    .and_then(|ids| ids.index_of(*id))
                    .ok_or_else(|| GraphError::mismatch(&out, format!("no item carries id {id}")))?;
                PathStep::Index(index.clone())
            }
        };
        out.push(step.clone());
        cursor = cursor
            .step(graph, &step)
            .map_err(|message| GraphError::mismatch(&out, message))?;
    }
    Ok(out)
}

// ============================================================================
// Metadata collector
// ============================================================================

/// One object reference, ready to be written next to the asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectReferenceMetadata {
    pub path: SerializationPath,
    pub id: Identifier,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingReference {
    path: GraphPath,
    non_identifiable_depth: usize,
    id: Identifier,
}

/// Records the object references of a graph.
///
/// `collect` only reads the graph; `finish` converts the recorded paths and
/// may mint item ids on the way.
#[derive(Debug, Default)]
pub struct MetadataCollector {
    pending: Vec<PendingReference>,
    config: QuantumConfig,
}

impl MetadataCollector {
    pub fn new(config: QuantumConfig) -> Self {
        Self {
            pending: Vec::new(),
            config,
        }
    }

    pub fn collect(
        &mut self,
        graph: &ObjectGraph,
        policy: &dyn ReferencePolicy,
        types: &TypeRegistry,
    ) -> Result<()> {
        self.pending.clear();
        let mut cx = VisitContext::new(graph, policy)
            .with_types(types)
            .with_max_depth(self.config.max_depth);
        visitor::visit_root(self, &mut cx)?;
        tracing::debug!(count = self.pending.len(), "collected object references");
        Ok(())
    }

    /// Number of references waiting to be converted.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn finish(self, graph: &mut ObjectGraph) -> Result<Vec<ObjectReferenceMetadata>> {
        let root = graph
            .root()
            .ok_or_else(|| GraphError::invalid_argument("graph has no root object"))?;
        let converter = PathConverter::new(&self.config);
        self.pending
            .into_iter()
            .map(|pending| {
                let path = converter.convert_path(graph, root, &pending.path, pending.non_identifiable_depth)?;
                Ok(ObjectReferenceMetadata { path, id: pending.id })
            })
            .collect()
    }
}

impl GraphVisitor for MetadataCollector {
    fn visit_reference(&mut self, cx: &mut VisitContext<'_>, _edge: &Edge<'_>, target: ObjectHandle) -> Result<()> {
        let Some(id) = cx.graph().identifier(target) else {
            return Ok(());
        };
        self.pending.push(PendingReference {
            path: cx.path().clone(),
            non_identifiable_depth: cx.non_identifiable_depth(),
            id,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::DeclaredReferences;
    use assetgraph_reflect::{ItemId, ObjectData, TypeDescriptor, Value};

    struct Fixture {
        graph: ObjectGraph,
        root: ObjectHandle,
        list: ObjectHandle,
    }

    fn fixture(attach_ids: bool) -> Fixture {
        let mut graph = ObjectGraph::new();
        let items: Vec<Value> = (0..3)
            .map(|i| Value::Object(graph.add_object(ObjectData::object("Item").with_member("N", i as i64))))
            .collect();
        let mut list = ObjectData::collection("List", items);
        if attach_ids {
            list = list.with_item_ids();
        }
        let list = graph.add_object(list);
        let root = graph.add_object(ObjectData::object("Root").with_member("Items", list));
        graph.set_root(root).unwrap();
        Fixture { graph, root, list }
    }

    fn items_path(i: usize) -> GraphPath {
        GraphPath::new().member("Items").target().index(i).member("N")
    }

    #[test]
    fn test_conversion_mints_once_and_stores_the_id() {
        let mut f = fixture(true);
        let converter = PathConverter::default();
        let first = converter.convert_path(&mut f.graph, f.root, &items_path(1), 0).unwrap();
        let second = converter.convert_path(&mut f.graph, f.root, &items_path(1), 0).unwrap();
        assert_eq!(first, second);
        assert!(matches!(first.elements()[1], PathElement::ItemId(_)));

        // The conversion wrote into the graph.
        let ids = f.graph.item_ids(f.list).unwrap().unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(first.elements()[1], PathElement::ItemId(ids.get(&Index::Position(1)).unwrap()));
    }

    #[test]
    fn test_id_survives_insert_and_remove_of_siblings() {
        let mut f = fixture(true);
        let converter = PathConverter::default();
        let converted = converter.convert_path(&mut f.graph, f.root, &items_path(1), 0).unwrap();

        f.graph.insert_item(f.list, 0, Value::Null).unwrap();
        let resolved = resolve_serialization_path(&f.graph, f.root, &converted).unwrap();
        assert_eq!(resolved, items_path(2));
        assert_eq!(converter.convert_path(&mut f.graph, f.root, &items_path(2), 0).unwrap(), converted);

        f.graph.remove_item(f.list, &Index::Position(0)).unwrap();
        f.graph.remove_item(f.list, &Index::Position(0)).unwrap();
        let resolved = resolve_serialization_path(&f.graph, f.root, &converted).unwrap();
        assert_eq!(resolved, items_path(0));
    }

    #[test]
    fn test_raw_index_without_table_or_inside_opt_out() {
        let mut f = fixture(false);
        let converter = PathConverter::default();
        let converted = converter.convert_path(&mut f.graph, f.root, &items_path(2), 0).unwrap();
        assert_eq!(converted.to_string(), "Items[2].N");

        let mut f = fixture(true);
        let converted = converter.convert_path(&mut f.graph, f.root, &items_path(2), 1).unwrap();
        assert_eq!(converted.to_string(), "Items[2].N");
        assert!(f.graph.item_ids(f.list).unwrap().unwrap().is_empty());
    }

    #[test]
    fn test_existing_ids_are_used_even_when_minting_is_off() {
        let mut f = fixture(true);
        f.graph
            .attach_item_ids(f.list)
            .unwrap()
            .insert(Index::Position(0), ItemId::from_u128(7));
        let converter = PathConverter::new(&QuantumConfig {
            mint_item_ids: false,
            ..QuantumConfig::default()
        });
        let first = converter.convert_path(&mut f.graph, f.root, &items_path(0), 0).unwrap();
        assert_eq!(first.elements()[1], PathElement::ItemId(ItemId::from_u128(7)));
        let second = converter.convert_path(&mut f.graph, f.root, &items_path(1), 0).unwrap();
        assert_eq!(second.elements()[1], PathElement::Index(Index::Position(1)));
    }

    #[test]
    fn test_shape_mismatch_is_reported_with_walked_prefix() {
        let mut f = fixture(false);
        let converter = PathConverter::default();
        let bad = GraphPath::new().member("Items").target().member("N");
        match converter.convert_path(&mut f.graph, f.root, &bad, 0).unwrap_err() {
            GraphError::StructuralMismatch { path, .. } => assert_eq!(path, "Items->.N"),
            other => panic!("unexpected error: {other}"),
        }
        let bad = GraphPath::new().member("Items").index(0);
        assert!(matches!(
            converter.convert_path(&mut f.graph, f.root, &bad, 0).unwrap_err(),
            GraphError::StructuralMismatch { .. }
        ));
    }

    #[test]
    fn test_collector_records_references_as_serialization_paths() {
        let target_id = Identifier::from_u128(0x70);
        let mut graph = ObjectGraph::new();
        let target = graph.add_object(ObjectData::object("Part").with_id(target_id));
        let refs = graph.add_object(ObjectData::collection("PartRefs", vec![Value::Object(target)]).with_item_ids());
        let root = graph.add_object(
            ObjectData::object("Scene")
                .with_member("Owned", target)
                .with_member("Selected", target)
                .with_member("Refs", refs),
        );
        graph.set_root(root).unwrap();
        let types: TypeRegistry = [
            TypeDescriptor::new("Scene").with_reference_member("Selected"),
            TypeDescriptor::new("PartRefs").with_item_references(),
        ]
        .into_iter()
        .collect();

        let mut collector = MetadataCollector::default();
        collector.collect(&graph, &DeclaredReferences::new(&types), &types).unwrap();
        assert_eq!(collector.len(), 2);
        let metadata = collector.finish(&mut graph).unwrap();

        let minted = graph.item_ids(refs).unwrap().unwrap().get(&Index::Position(0)).unwrap();
        let rendered: Vec<_> = metadata.iter().map(|m| (m.path.to_string(), m.id)).collect();
        assert_eq!(
            rendered,
            vec![
                ("Selected".to_string(), target_id),
                (format!("Refs[~{minted}]"), target_id),
            ]
        );
    }
}
