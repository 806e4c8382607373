//! Quantum: the asset property graph
//!
//! A layer over `assetgraph_reflect::ObjectGraph` that turns a raw object
//! graph into something asset tooling can reason about:
//!
//! - **Nodes** (`node`): object and member nodes, branded with the graph
//!   they came from, plus item references for containers.
//! - **Ownership** (`policy`, `visitor`): every edge is either a containment
//!   edge or an object reference. The depth-first visitor only descends
//!   containment edges and reports references through a hook.
//! - **Registries**: identifiables reachable by reference
//!   (`identifiable`), and base-to-derived node pairs for archetype
//!   inheritance (`base_to_derived`).
//! - **Load-time cleanup** (`remover`): excise unloadable placeholders.
//! - **Stable addressing** (`path`, `serialization_path`, `metadata`):
//!   graph paths, their portable item-id form, and object-reference
//!   metadata for serializers.
//!
//! All passes are single-threaded and synchronous. Reuse across threads goes
//! through explicit ownership (`RemoverPool`).

pub mod base_to_derived;
pub mod config;
pub mod error;
pub mod identifiable;
pub mod metadata;
pub mod node;
pub mod path;
pub mod policy;
pub mod remover;
pub mod serialization_path;
pub mod visitor;

pub use base_to_derived::{link_to_base, link_to_base_with_config, BaseLinker, BaseToDerivedRegistry, ItemIdBaseLinker};
pub use config::QuantumConfig;
pub use error::{GraphError, Result};
pub use identifiable::IdentifiableObjectCollector;
pub use metadata::{resolve_serialization_path, MetadataCollector, ObjectReferenceMetadata, PathConverter};
pub use node::{GraphNode, IdentifiableRef, ItemReference, MemberNode, NodeContainer, ObjectNode};
pub use path::{Cursor, GraphPath, PathStep};
pub use policy::{DeclaredReferences, Edge, ItemKind, NoReferences, ReferencePolicy};
pub use remover::{PooledRemover, RemoverPool, UnloadableItem, UnloadableObjectRemover};
pub use serialization_path::{PathElement, SerializationPath};
pub use visitor::{GraphVisitor, VisitContext};
