//! Vertex/Edge/Path graph value shapes (spec §3).

use super::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A tag attached to a vertex: a label plus its property values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexTag {
    pub tag_name: String,
    pub props: BTreeMap<String, Value>,
}

/// `{id: Value; tags: [{tagName, props: map<string,Value>}]}` (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: Value,
    pub tags: Vec<VertexTag>,
}

impl Vertex {
    pub fn new(id: Value) -> Self {
        Vertex {
            id,
            tags: Vec::new(),
        }
    }

    pub fn tag(&self, name: &str) -> Option<&VertexTag> {
        self.tags.iter().find(|t| t.tag_name == name)
    }

    pub fn prop(&self, tag: &str, prop: &str) -> Option<&Value> {
        self.tag(tag)?.props.get(prop)
    }
}

/// `{src, dst: Value; type: i32; rank: i64; name: string; props:
/// map<string,Value>}` (spec §3). `(src, type, rank, dst)` is the edge's
/// composite key (GLOSSARY).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub src: Value,
    pub dst: Value,
    pub edge_type: i32,
    pub rank: i64,
    pub name: String,
    pub props: BTreeMap<String, Value>,
}

impl Edge {
    pub fn prop(&self, name: &str) -> Option<&Value> {
        self.props.get(name)
    }
}

/// A single traversal step: the edge taken and the vertex arrived at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    pub edge: Edge,
    pub dst: Vertex,
}

/// `{src: Vertex; steps: [{edge, dst}]}` (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub src: Vertex,
    pub steps: Vec<PathStep>,
}

impl Path {
    pub fn length(&self) -> usize {
        self.steps.len()
    }

    pub fn last_vertex(&self) -> &Vertex {
        self.steps.last().map_or(&self.src, |s| &s.dst)
    }
}
