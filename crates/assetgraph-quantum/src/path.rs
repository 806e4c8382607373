//! Graph paths.
//!
//! A `GraphPath` is the sequence of steps a visitor took from the root to
//! reach a slot:
//!
//! - `Member(name)`: move from an object to one of its members,
//! - `Target`: follow a member's object value into that object,
//! - `Index(i)`: move from a container to one of its items. An index step
//!   lands directly on the item's object, no `Target` needed.
//!
//! Text form: `Components->[2].Name`, `Tags[="red"]`, `Lookup[={<uuid>}]`.
//! A path is only meaningful against the graph instance it was produced on;
//! `crate::metadata` re-expresses it with item ids to make it portable.

use crate::error::{GraphError, Result};
use assetgraph_reflect::{Identifier, Index, Key, ObjectGraph, ObjectHandle, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStep {
    Member(String),
    Target,
    Index(Index),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphPath {
    steps: Vec<PathStep>,
}

impl GraphPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last(&self) -> Option<&PathStep> {
        self.steps.last()
    }

    pub fn push(&mut self, step: PathStep) {
        self.steps.push(step);
    }

    pub fn push_member(&mut self, name: impl Into<String>) {
        self.steps.push(PathStep::Member(name.into()));
    }

    pub fn push_target(&mut self) {
        self.steps.push(PathStep::Target);
    }

    pub fn push_index(&mut self, index: Index) {
        self.steps.push(PathStep::Index(index));
    }

    pub fn pop(&mut self) -> Option<PathStep> {
        self.steps.pop()
    }

    /// Builder-style variants, handy in tests and fixtures.
    pub fn member(mut self, name: impl Into<String>) -> Self {
        self.push_member(name);
        self
    }

    pub fn target(mut self) -> Self {
        self.push_target();
        self
    }

    pub fn index(mut self, index: impl Into<Index>) -> Self {
        self.push_index(index.into());
        self
    }

    /// The path without its last step, and that step.
    pub fn split_last(&self) -> Option<(GraphPath, &PathStep)> {
        let (last, rest) = self.steps.split_last()?;
        Some((
            GraphPath {
                steps: rest.to_vec(),
            },
            last,
        ))
    }

    /// Walk the path from `root` and return where it ends.
    pub fn resolve(&self, graph: &ObjectGraph, root: ObjectHandle) -> Result<Cursor> {
        let mut cursor = Cursor::Object(root);
        for (i, step) in self.steps.iter().enumerate() {
            cursor = cursor.step(graph, step).map_err(|message| {
                let walked = GraphPath {
                    steps: self.steps[..=i].to_vec(),
                };
                GraphError::mismatch(walked, message)
            })?;
        }
        Ok(cursor)
    }
}

/// A position reached while walking a path over a live graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    Object(ObjectHandle),
    Member { owner: ObjectHandle, name: String },
    Item { container: ObjectHandle, index: Index },
}

impl Cursor {
    /// The object this cursor designates. Member cursors need an explicit
    /// `Target` step first; item cursors stand for their object directly.
    pub fn object(&self, graph: &ObjectGraph) -> Option<ObjectHandle> {
        match self {
            Cursor::Object(h) => Some(*h),
            Cursor::Member { .. } => None,
            Cursor::Item { container, index } => graph
                .item(*container, index)
                .ok()
                .and_then(Value::as_object),
        }
    }

    pub(crate) fn step(&self, graph: &ObjectGraph, step: &PathStep) -> std::result::Result<Cursor, String> {
        match step {
            PathStep::Member(name) => {
                let owner = self
                    .object(graph)
                    .ok_or_else(|| format!("member `{name}` requested on a non-object position"))?;
                graph.member(owner, name).map_err(|e| e.to_string())?;
                Ok(Cursor::Member {
                    owner,
                    name: name.clone(),
                })
            }
            PathStep::Target => {
                let Cursor::Member { owner, name } = self else {
                    return Err("target step requires a member position".to_string());
                };
                graph
                    .member(*owner, name)
                    .map_err(|e| e.to_string())?
                    .as_object()
                    .map(Cursor::Object)
                    .ok_or_else(|| format!("member `{name}` has no target object"))
            }
            PathStep::Index(index) => {
                let container = self
                    .object(graph)
                    .ok_or_else(|| format!("index {index} requested on a non-object position"))?;
                graph.item(container, index).map_err(|e| e.to_string())?;
                Ok(Cursor::Item {
                    container,
                    index: index.clone(),
                })
            }
        }
    }
}

impl fmt::Display for GraphPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::Member(name) if i == 0 => f.write_str(name)?,
                PathStep::Member(name) => write!(f, ".{name}")?,
                PathStep::Target => f.write_str("->")?,
                PathStep::Index(index) => write!(f, "{index}")?,
            }
        }
        Ok(())
    }
}

impl FromStr for GraphPath {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        let mut path = GraphPath::new();
        let mut rest = s.trim();
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix("->") {
                path.push_target();
                rest = after;
            } else if let Some(after) = rest.strip_prefix('[') {
                let close = after
                    .find(']')
                    .ok_or_else(|| GraphError::UnrecognizedStep(rest.to_string()))?;
                path.push_index(parse_index(&after[..close])?);
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

pub(crate) fn parse_index(text: &str) -> Result<Index> {
    let unrecognized = || GraphError::UnrecognizedStep(format!("[{text}]"));
    if text.is_empty() {
        return Ok(Index::Empty);
    }
    let Some(key) = text.strip_prefix('=') else {
        return text.parse().map(Index::Position).map_err(|_| unrecognized());
    };
    let key = match key {
        "true" => Key::Bool(true),
        "false" => Key::Bool(false),
        _ if key.len() >= 2 && key.starts_with('"') && key.ends_with('"') => {
            Key::Str(key[1..key.len() - 1].to_string())
        }
        _ if key.len() >= 2 && key.starts_with('{') && key.ends_with('}') => {
            let id: Identifier = key[1..key.len() - 1].parse().map_err(|_| unrecognized())?;
            Key::Id(id)
        }
        _ if key.starts_with('#') => {
            Key::Object(ObjectHandle::new(key[1..].parse().map_err(|_| unrecognized())?))
        }
        _ => Key::Int(key.parse().map_err(|_| unrecognized())?),
    };
    Ok(Index::Key(key))
}
