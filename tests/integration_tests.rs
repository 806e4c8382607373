//! Integration tests for the asset property graph
//!
//! These tests drive the passes the way the asset pipeline does:
//! - load → scrub placeholders → collect identifiables
//! - serialize references → edit the graph → resolve them again
//! - derive an asset from its archetype → link → re-target references
//!
//! Run with: cargo test --test integration_tests

use anyhow::Result;
use assetgraph_quantum::{
    link_to_base, resolve_serialization_path, BaseToDerivedRegistry, DeclaredReferences, GraphError, GraphNode,
    GraphPath, IdentifiableObjectCollector, ItemIdBaseLinker, MetadataCollector, NodeContainer, NoReferences,
    PathConverter, RemoverPool, UnloadableObjectRemover,
};
use assetgraph_reflect::{
    Identifier, Index, ObjectData, ObjectGraph, ObjectHandle, TypeDescriptor, TypeRegistry, UnloadableInfo, Value,
};

const G1: Identifier = Identifier::from_u128(0x61);
const LAMP: Identifier = Identifier::from_u128(0x1A);

fn scene_types() -> TypeRegistry {
    [
        TypeDescriptor::new("Scene")
            .with_reference_member("Selected")
            .with_reference_member("Focus"),
        TypeDescriptor::new("EntityRefs").with_item_references(),
        TypeDescriptor::new("Keyframes").with_non_identifiable_items(),
    ]
    .into_iter()
    .collect()
}

/// A scene owning a list of entities, one of which is selected and focused.
struct Scene {
    graph: ObjectGraph,
    root: ObjectHandle,
    entities: ObjectHandle,
    lamp: ObjectHandle,
}

fn scene(focus_first: bool) -> Scene {
    let mut graph = ObjectGraph::new();
    let chair = graph.add_object(ObjectData::object("Entity").with_member("Name", "chair"));
    let lamp = graph.add_object(
        ObjectData::object("Entity")
            .with_id(LAMP)
            .with_member("Name", "lamp"),
    );
    let entities = graph.add_object(
        ObjectData::collection("Entities", vec![Value::Object(chair), Value::Object(lamp)]).with_item_ids(),
    );
    let favourites = graph.add_object(ObjectData::collection("EntityRefs", vec![Value::Object(lamp)]));
    let mut root = ObjectData::object("Scene").with_member("Entities", entities);
    root = if focus_first {
        root.with_member("Focus", lamp).with_member("Selected", lamp)
    } else {
        root.with_member("Selected", lamp).with_member("Focus", lamp)
    };
    let root = graph.add_object(root.with_member("Favourites", favourites));
    graph.set_root(root).unwrap();
    Scene {
        graph,
        root,
        entities,
        lamp,
    }
}

// ============================================================================
// Identifiable registry
// ============================================================================

#[test]
fn test_collect_only_registers_reference_reached_identifiables() -> Result<()> {
    let types = scene_types();
    let s = scene(false);
    let found = IdentifiableObjectCollector::collect(&s.graph, &DeclaredReferences::new(&types))?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[&LAMP].handle(), s.lamp);

    // Drop every reference: the lamp is then only contained and not registered.
    let mut contained = ObjectGraph::new();
    let lamp = contained.add_object(ObjectData::object("Entity").with_id(LAMP));
    let root = contained.add_object(ObjectData::object("Holder").with_member("Lamp", lamp));
    contained.set_root(root)?;
    let found = IdentifiableObjectCollector::collect(&contained, &NoReferences)?;
    assert!(found.is_empty());
    Ok(())
}

#[test]
fn test_collect_is_independent_of_reference_order() -> Result<()> {
    let types = scene_types();
    let a = scene(false);
    let b = scene(true);
    let from_a = IdentifiableObjectCollector::collect(&a.graph, &DeclaredReferences::new(&types))?;
    let from_b = IdentifiableObjectCollector::collect(&b.graph, &DeclaredReferences::new(&types))?;
    assert_eq!(from_a[&LAMP].handle(), from_b[&LAMP].handle());
    Ok(())
}

// ============================================================================
// Unloadable remover
// ============================================================================

#[test]
fn test_load_scrub_then_collect() -> Result<()> {
    let json = r#"{
        "objects": [
            { "type_name": "Entity", "id": "00000000-0000-0000-0000-00000000001a",
              "shape": { "object": { "members": [["Name", { "str": "lamp" }]] } } },
            { "type_name": "Plugin.Light",
              "shape": { "unloadable": { "type_name": "Plugin.Light", "reason": "assembly not found" } } },
            { "type_name": "Entities",
              "shape": { "collection": { "items": [{ "object": 0 }, { "object": 1 }] } } },
            { "type_name": "Scene",
              "shape": { "object": { "members": [
                  ["Entities", { "object": 2 }],
                  ["Selected", { "object": 0 }],
                  ["Broken", { "object": 1 }]
              ] } } }
        ],
        "root": 3
    }"#;
    let mut graph: ObjectGraph = serde_json::from_str(json)?;
    let types = scene_types();
    let policy = DeclaredReferences::new(&types);

    let removed = UnloadableObjectRemover::default().run(&mut graph, &policy)?;
    let paths: Vec<_> = removed.iter().map(|item| item.path.to_string()).collect();
    assert_eq!(paths, vec!["Entities->[1]", "Broken"]);
    assert_eq!(removed[0].info.reason, "assembly not found");
    assert_eq!(graph.item_indices(ObjectHandle::new(2))?.len(), 1);
    assert_eq!(graph.member(ObjectHandle::new(3), "Broken")?, &Value::Null);

    let found = IdentifiableObjectCollector::collect(&graph, &policy)?;
    assert_eq!(found[&LAMP].handle(), ObjectHandle::new(0));
    Ok(())
}

#[test]
fn test_interleaved_placeholders_leave_loadable_items_in_order() -> Result<()> {
    let mut graph = ObjectGraph::new();
    let a = Value::Object(graph.add_object(ObjectData::object("A")));
    let b = Value::Object(graph.add_object(ObjectData::object("B")));
    let mut unloadable = || {
        Value::Object(graph.add_object(ObjectData::unloadable(UnloadableInfo::new("Gone", "missing type"))))
    };
    let items = vec![a.clone(), unloadable(), b.clone(), unloadable()];
    let list = graph.add_object(ObjectData::collection("List", items));
    let root = graph.add_object(ObjectData::object("Root").with_member("Items", list));
    graph.set_root(root)?;

    let pool = RemoverPool::default();
    let mut remover = pool.get();
    assert_eq!(remover.run(&mut graph, &NoReferences)?.len(), 2);
    assert_eq!(graph.item(list, &Index::Position(0))?, &a);
    assert_eq!(graph.item(list, &Index::Position(1))?, &b);
    assert!(remover.run(&mut graph, &NoReferences)?.is_empty());
    Ok(())
}

// ============================================================================
// Reference metadata and path conversion
// ============================================================================

#[test]
fn test_reference_metadata_survives_list_edits() -> Result<()> {
    let types = scene_types();
    let mut s = scene(false);
    let mut collector = MetadataCollector::default();
    collector.collect(&s.graph, &DeclaredReferences::new(&types), &types)?;
    let metadata = collector.finish(&mut s.graph)?;
    let rendered: Vec<_> = metadata.iter().map(|m| m.path.to_string()).collect();
    assert_eq!(rendered, vec!["Selected", "Focus", "Favourites[0]"]);
    assert!(metadata.iter().all(|m| m.id == LAMP));

    // An item-id path to the lamp keeps working after a sibling is inserted.
    let converter = PathConverter::default();
    let lamp_path = GraphPath::new().member("Entities").target().index(1);
    let portable = converter.convert_path(&mut s.graph, s.root, &lamp_path, 0)?;
    s.graph.insert_item(s.entities, 0, Value::Null)?;
    let resolved = resolve_serialization_path(&s.graph, s.root, &portable)?;
    assert_eq!(resolved.to_string(), "Entities->[2]");
    assert_eq!(
        resolved.resolve(&s.graph, s.root)?.object(&s.graph),
        Some(s.lamp)
    );
    Ok(())
}

#[test]
fn test_converting_twice_does_not_mint_twice() -> Result<()> {
    let mut s = scene(false);
    let converter = PathConverter::default();
    let path: GraphPath = "Entities->[0].Name".parse()?;
    let first = converter.convert_path(&mut s.graph, s.root, &path, 0)?;
    let second = converter.convert_path(&mut s.graph, s.root, &path, 0)?;
    assert_eq!(first, second);
    assert_eq!(s.graph.item_ids(s.entities)?.map(|ids| ids.len()), Some(1));
    Ok(())
}

#[test]
fn test_stale_path_is_a_structural_mismatch() {
    let mut s = scene(false);
    let converter = PathConverter::default();
    let path: GraphPath = "Entities->[7]".parse().unwrap();
    let err = converter.convert_path(&mut s.graph, s.root, &path, 0).unwrap_err();
    assert!(matches!(err, GraphError::StructuralMismatch { .. }));
}

// ============================================================================
// Base-to-derived linking
// ============================================================================

#[test]
fn test_derived_asset_resolves_base_identifiable() -> Result<()> {
    let mut base = ObjectGraph::new();
    let root = base.add_object(ObjectData::object("Settings").with_id(G1).with_member("Value", 5i64));
    base.set_root(root)?;
    let derived = base.clone();

    let registry = link_to_base(&base, &derived, &NoReferences, &ItemIdBaseLinker)?;
    let referencer: GraphNode = NodeContainer::new(&derived).root_node()?.into();
    let resolved = registry
        .resolve_from_base(&Value::Object(root), &referencer)?
        .expect("base root maps to the derived root");
    assert_eq!(resolved.id, G1);
    assert_eq!(resolved.node.token(), derived.token());
    assert_eq!(derived.member(resolved.node.handle(), "Value")?, &Value::Int(5));
    Ok(())
}

#[test]
fn test_null_base_member_is_a_no_op() -> Result<()> {
    let mut base = ObjectGraph::new();
    let root = base.add_object(ObjectData::object("Holder").with_member("value", Value::Null));
    base.set_root(root)?;
    let derived = base.clone();

    let mut registry = BaseToDerivedRegistry::new(&base, &derived, &NoReferences, &ItemIdBaseLinker);
    let base_member = registry.base().member_node(&registry.base().root_node()?, "value")?;
    let derived_member = registry.derived().member_node(&registry.derived().root_node()?, "value")?;
    registry.register_base_to_derived(Some(&base_member.into()), &derived_member.into())?;
    assert!(registry.is_empty());
    Ok(())
}

#[test]
fn test_derived_scene_retargets_to_derived_entities() -> Result<()> {
    let types = scene_types();
    let base = scene(false);
    let mut derived = base.graph.clone();
    // Local override in the derived asset: a new entity appended.
    let extra = derived.add_object(ObjectData::object("Entity").with_member("Name", "extra"));
    derived.push_item(base.entities, Value::Object(extra))?;

    let policy = DeclaredReferences::new(&types);
    let registry = link_to_base(&base.graph, &derived, &policy, &ItemIdBaseLinker)?;
    let referencer: GraphNode = NodeContainer::new(&derived).root_node()?.into();

    let lamp = registry
        .resolve_from_base(&Value::Object(base.lamp), &referencer)?
        .expect("lamp is identifiable and owned by the entity list");
    assert_eq!(lamp.id, LAMP);
    assert_eq!(lamp.node.token(), derived.token());

    // Nothing in the base corresponds to the appended entity.
    let extra_node: GraphNode = NodeContainer::new(&derived).object_node(extra)?.into();
    assert!(registry.iter().all(|(_, d)| *d != extra_node));
    Ok(())
}
