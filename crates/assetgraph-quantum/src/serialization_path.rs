//! Serialization paths.
//!
//! The portable form of a `GraphPath`, as written into asset files. Target
//! steps are implicit, and items of containers that carry item ids are
//! addressed by id instead of position, so the path keeps pointing at the
//! same element when other elements are inserted or removed.
//!
//! Text form: `Components[~<item-id>].Name`, `Tags[="red"]`, `Points[2]`.

use crate::error::{GraphError, Result};
use crate::path::parse_index;
use assetgraph_reflect::{Index, ItemId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathElement {
    Member(String),
    Index(Index),
    ItemId(ItemId),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SerializationPath {
    elements: Vec<PathElement>,
}

impl SerializationPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn push(&mut self, element: PathElement) {
        self.elements.push(element);
    }

    pub fn push_member(&mut self, name: impl Into<String>) {
        self.elements.push(PathElement::Member(name.into()));
    }

    pub fn push_index(&mut self, index: Index) {
        self.elements.push(PathElement::Index(index));
    }

    pub fn push_item_id(&mut self, id: ItemId) {
        self.elements.push(PathElement::ItemId(id));
    }

    pub fn last(&self) -> Option<&PathElement> {
        self.elements.last()
    }
}

impl fmt::Display for SerializationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            match element {
                PathElement::Member(name) if i == 0 => f.write_str(name)?,
                PathElement::Member(name) => write!(f, ".{name}")?,
                PathElement::Index(index) => write!(f, "{index}")?,
                PathElement::ItemId(id) => write!(f, "[~{id}]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for SerializationPath {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        let mut path = SerializationPath::new();
        let mut rest = s.trim();
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('[') {
                let close = after
                    .find(']')
                    .ok_or_else(|| GraphError::UnrecognizedStep(rest.to_string()))?;
                let body = &after[..close];
                match body.strip_prefix('~') {
                    Some(id) => {
                        let id = id
                            .parse()
                            .map_err(|_| GraphError::UnrecognizedStep(format!("[{body}]")))?;
                        path.push_item_id(id);
                    }
                    None => path.push_index(parse_index(body)?),
                }
                rest = &after[close + 1..];
            } else {
                let body = if path.is_empty() {
                    rest
                } else {
                    rest.strip_prefix('.')
                        .ok_or_else(|| GraphError::UnrecognizedStep(rest.to_string()))?
                };
                let end = body
                    .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                    .unwrap_or(body.len());
                if end == 0 {
                    return Err(GraphError::UnrecognizedStep(rest.to_string()));
                }
                path.push_member(&body[..end]);
                rest = &body[end..];
            }
        }
        Ok(path)
    }
}
