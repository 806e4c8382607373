//! Asset object graphs: storage and shape descriptors
//!
//! This crate holds the in-memory representation of an asset's object graph
//! and answers the structural questions the property-graph layer asks about
//! it:
//!
//! - **Arena storage**: every object lives in one `ObjectGraph` table and is
//!   addressed by an `ObjectHandle`. A `Value::Object(handle)` in a slot is an
//!   edge; the same handle in two slots is an alias.
//! - **Shapes**: plain objects (ordered members), collections, fixed-size
//!   arrays, dictionaries and sets, plus the `Unloadable` placeholder left
//!   behind when a slot failed to deserialize.
//! - **Identity**: `Identifier` (identifiable objects) and `ItemId` (stable
//!   collection item identity), both 128-bit.
//! - **Descriptors**: `TypeRegistry` records per-type facts that are not
//!   visible in the data itself (which members are references, which
//!   collections opt out of item identity).
//!
//! Nothing here performs I/O.

pub mod error;
pub mod graph;
pub mod ids;
pub mod item_ids;
pub mod types;
pub mod value;

pub use error::{ReflectError, Result};
pub use graph::{GraphToken, ObjectData, ObjectGraph, Shape, ShapeKind, UnloadableInfo};
pub use ids::{Identifier, ItemId};
pub use item_ids::CollectionItemIds;
pub use types::{TypeDescriptor, TypeRegistry};
pub use value::{Index, Key, ObjectHandle, Value};
