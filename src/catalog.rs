//! Catalog interface (spec §4, §6, component C3): space/tag/edge/index
//! lookups and partitioning metadata. The real meta-catalog (persistence,
//! replication, RAFT-backed part allocation) is an external collaborator
//! (spec §1); this module is the read-mostly handle the query context
//! carries through validation and planning.
//!
//! Grounded in the teacher's `catalog.rs` (name → schema lookup), refreshed
//! under an `arc-swap` snapshot the way the teacher notes a catalog should
//! be ("read-mostly; internal read-write lock on refresh", spec §5).

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Bool,
    Int,
    Float,
    String,
    Date,
    Time,
    DateTime,
}

#[derive(Debug, Clone)]
pub struct PropertyDef {
    pub name: String,
    pub data_type: DataType,
}

#[derive(Debug, Clone)]
pub struct TagSchema {
    pub name: String,
    pub id: i32,
    pub props: Vec<PropertyDef>,
}

#[derive(Debug, Clone)]
pub struct EdgeSchema {
    pub name: String,
    pub edge_type: i32,
    pub props: Vec<PropertyDef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOwner {
    Tag,
    Edge,
}

#[derive(Debug, Clone)]
pub struct IndexSchema {
    pub name: String,
    pub id: i32,
    pub owner: IndexOwner,
    /// Name of the owning tag/edge type.
    pub owner_name: String,
    /// Indexed columns, in key order.
    pub columns: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SpaceSchema {
    pub name: String,
    pub id: i32,
    pub part_count: u32,
    pub tags: HashMap<String, TagSchema>,
    pub edges: HashMap<String, EdgeSchema>,
    pub indexes: HashMap<String, IndexSchema>,
    /// Partition id -> leader host (spec §6 "replica leaders per
    /// partition").
    pub leaders: HashMap<i32, String>,
}

impl SpaceSchema {
    pub fn new(name: impl Into<String>, id: i32, part_count: u32) -> Self {
        SpaceSchema {
            name: name.into(),
            id,
            part_count,
            tags: HashMap::new(),
            edges: HashMap::new(),
            indexes: HashMap::new(),
            leaders: HashMap::new(),
        }
    }
}

/// A stable snapshot the catalog swaps in on refresh.
#[derive(Debug, Clone, Default)]
struct CatalogSnapshot {
    spaces: HashMap<String, SpaceSchema>,
}

/// Catalog handle passed through the `QueryContext` (spec §9: "pass a
/// catalog handle through the query context; construct and wire at process
/// start, never dereference globals in hot paths").
pub struct Catalog {
    snapshot: ArcSwap<CatalogSnapshot>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog {
            snapshot: ArcSwap::from_pointee(CatalogSnapshot::default()),
        }
    }

    /// Atomically replace the whole catalog snapshot (e.g. after a schema
    /// change lands via the external meta-catalog). Readers never observe
    /// a torn state.
    pub fn refresh(&self, spaces: Vec<SpaceSchema>) {
        let snapshot = CatalogSnapshot {
            spaces: spaces.into_iter().map(|s| (s.name.clone(), s)).collect(),
        };
        self.snapshot.store(Arc::new(snapshot));
    }

    pub fn upsert_space(&self, space: SpaceSchema) {
        let mut spaces = (**self.snapshot.load()).clone();
        spaces.spaces.insert(space.name.clone(), space);
        self.snapshot.store(Arc::new(spaces));
    }

    pub fn get_space(&self, name: &str) -> Result<SpaceSchema> {
        self.snapshot
            .load()
            .spaces
            .get(name)
            .cloned()
            .ok_or_else(|| Error::SpaceNotFound {
                name: name.to_string(),
            })
    }

    pub fn get_tag(&self, space: &str, tag: &str) -> Result<TagSchema> {
        self.get_space(space)?
            .tags
            .get(tag)
            .cloned()
            .ok_or_else(|| Error::TagNotFound {
                name: tag.to_string(),
            })
    }

    pub fn get_edge(&self, space: &str, edge: &str) -> Result<EdgeSchema> {
        self.get_space(space)?
            .edges
            .get(edge)
            .cloned()
            .ok_or_else(|| Error::EdgeNotFound {
                name: edge.to_string(),
            })
    }

    pub fn get_index(&self, space: &str, index: &str) -> Result<IndexSchema> {
        self.get_space(space)?
            .indexes
            .get(index)
            .cloned()
            .ok_or_else(|| Error::IndexNotFound {
                name: index.to_string(),
            })
    }

    /// Find a tag/edge index usable for `columns` (a prefix match on the
    /// index's key order), used by `OptimizeTagIndexScanByFilter` /
    /// `IndexFullScan` selection.
    pub fn find_index_for_columns(
        &self,
        space: &str,
        owner: IndexOwner,
        owner_name: &str,
        columns: &[String],
    ) -> Option<IndexSchema> {
        let space = self.get_space(space).ok()?;
        space
            .indexes
            .values()
            .find(|idx| {
                idx.owner == owner
                    && idx.owner_name == owner_name
                    && columns
                        .iter()
                        .zip(idx.columns.iter())
                        .all(|(a, b)| a == b)
            })
            .cloned()
    }

    pub fn part_count(&self, space: &str) -> Result<u32> {
        Ok(self.get_space(space)?.part_count)
    }

    pub fn leader_for_part(&self, space: &str, part: i32) -> Result<String> {
        self.get_space(space)?
            .leaders
            .get(&part)
            .cloned()
            .ok_or(Error::PartNotFound { part })
    }

    /// Stable hash of a vertex id modulo the space's partition count (spec
    /// §4.6: "computes each vertex's partition via a stable hash of its id
    /// modulo part-count for the space").
    pub fn partition_of(&self, space: &str, vertex_id: &Value) -> Result<i32> {
        let part_count = self.part_count(space)?.max(1);
        let hash = stable_hash(vertex_id);
        Ok((hash % u64::from(part_count)) as i32)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

fn stable_hash(v: &Value) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    match v {
        Value::Int(i) => i.hash(&mut hasher),
        Value::String(s) => s.hash(&mut hasher),
        other => format!("{other:?}").hash(&mut hasher),
    }
    hasher.finish()
}
