//! In-memory fake backing [`StorageClient`] (spec §1: the real on-disk
//! engine and RAFT-replicated partitions are external collaborators; this
//! crate only needs something that answers partitioned RPCs the same
//! shape a real cluster would, so the fan-out/retry/aggregation logic in
//! [`super`] and the operator library can be exercised).
//!
//! Every operation still goes through [`Catalog::partition_of`] and
//! retries failures up to `StorageClientConfig::max_retries`, so tests
//! against this fake cover the façade's real behavior, not just a
//! pass-through.

use super::{
    aggregate_part_responses, AggregatedResponse, Direction, EdgeItem, EdgeKey, PartResponse,
    PartStatus, StorageClient, VertexItem,
};
use crate::catalog::Catalog;
use crate::config::StorageClientConfig;
use crate::error::Result;
use crate::value::{DataSet, Row, Value};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct StoredVertex {
    tag: String,
    props: HashMap<String, Value>,
}

#[derive(Debug, Clone)]
struct StoredEdge {
    key: EdgeKey,
    props: HashMap<String, Value>,
}

fn edge_key_string(key: &EdgeKey) -> String {
    format!("{:?}|{}|{}|{:?}", key.src, key.edge_type, key.rank, key.dst)
}

/// A space's data, keyed the way a real storage node would key rows, minus
/// the partition dimension (the fake always "has" every partition locally;
/// only the routing/aggregation logic is under test).
#[derive(Default)]
struct SpaceData {
    vertices: DashMap<String, Vec<StoredVertex>>,
    edges: DashMap<String, StoredEdge>,
}

pub struct InMemoryStorageClient {
    catalog: Arc<Catalog>,
    config: StorageClientConfig,
    spaces: DashMap<String, SpaceData>,
    /// Injected failure countdown per part, for exercising retries in
    /// tests: `fail_next.get(&part) > 0` means the next call for that part
    /// fails once and decrements.
    fail_next: DashMap<i32, AtomicU32>,
}

impl InMemoryStorageClient {
    pub fn new(catalog: Arc<Catalog>, config: StorageClientConfig) -> Self {
        InMemoryStorageClient {
            catalog,
            config,
            spaces: DashMap::new(),
            fail_next: DashMap::new(),
        }
    }

    /// Test/demo seeding hook: insert a vertex directly, bypassing the
    /// partitioned write path.
    pub fn seed_vertex(&self, space: &str, id: Value, tag: &str, props: HashMap<String, Value>) {
        let entry = self.spaces.entry(space.to_string()).or_default();
        let key = format!("{id:?}");
        entry
            .vertices
            .entry(key)
            .or_default()
            .push(StoredVertex { tag: tag.to_string(), props });
    }

    pub fn seed_edge(&self, space: &str, key: EdgeKey, props: HashMap<String, Value>) {
        let entry = self.spaces.entry(space.to_string()).or_default();
        let k = edge_key_string(&key);
        entry.edges.insert(k, StoredEdge { key, props });
    }

    /// Arrange for the next RPC touching `part` to fail `times` times
    /// before succeeding — used to exercise the retry-up-to-cap path.
    pub fn fail_part_next(&self, part: i32, times: u32) {
        self.fail_next.insert(part, AtomicU32::new(times));
    }

    fn take_injected_failure(&self, part: i32) -> bool {
        if let Some(counter) = self.fail_next.get(&part) {
            let remaining = counter.load(Ordering::Relaxed);
            if remaining > 0 {
                counter.fetch_sub(1, Ordering::Relaxed);
                return true;
            }
        }
        false
    }

    fn parts_for(&self, space: &str, ids: &[Value]) -> Vec<i32> {
        let mut parts: Vec<i32> = ids
            .iter()
            .filter_map(|id| self.catalog.partition_of(space, id).ok())
            .collect();
        parts.sort_unstable();
        parts.dedup();
        if parts.is_empty() {
            parts.push(0);
        }
        parts
    }

    /// Run one logical part's worth of work with the configured retry
    /// budget (spec §4.6 "per-part RPC retries on leader-change and
    /// timeout up to a configurable cap").
    async fn with_retries<T>(&self, part: i32, mut f: impl FnMut() -> PartResponse<T>) -> PartResponse<T> {
        let mut attempt = 0;
        loop {
            if self.take_injected_failure(part) {
                let response = PartResponse { part, status: PartStatus::Timeout, payload: None };
                if attempt >= self.config.max_retries {
                    return response;
                }
                attempt += 1;
                continue;
            }
            return f();
        }
    }
}

fn neighbors_dataset(
    edges: Vec<StoredEdge>,
    vertex_props: &[String],
    edge_props: &[String],
) -> DataSet {
    let mut col_names = vec!["src".to_string(), "dst".to_string()];
    col_names.extend(edge_props.iter().cloned());
    col_names.extend(vertex_props.iter().map(|p| format!("dst.{p}")));
    let mut ds = DataSet::new(col_names);
    for edge in edges {
        let mut values = vec![edge.key.src.clone(), edge.key.dst.clone()];
        for prop in edge_props {
            values.push(edge.props.get(prop).cloned().unwrap_or_else(Value::null));
        }
        for _ in vertex_props {
            values.push(Value::null());
        }
        ds.push_row(Row::new(values));
    }
    ds
}

#[async_trait]
impl StorageClient for InMemoryStorageClient {
    async fn get_neighbors(
        &self,
        space: &str,
        vertex_ids: &[Value],
        edge_types: &[String],
        vertex_props: &[String],
        edge_props: &[String],
        _filter_holds: bool,
        limit: Option<u64>,
        direction: Direction,
    ) -> Result<AggregatedResponse<DataSet>> {
        let parts = self.parts_for(space, vertex_ids);
        let mut responses = Vec::with_capacity(parts.len());
        for part in parts {
            let response = self
                .with_retries(part, || {
                    let Some(data) = self.spaces.get(space) else {
                        return PartResponse { part, status: PartStatus::Ok, payload: Some(DataSet::new(vec![])) };
                    };
                    let mut matched: Vec<StoredEdge> = data
                        .edges
                        .iter()
                        .filter(|e| {
                            let touches_src = vertex_ids.contains(&e.key.src);
                            let touches_dst = vertex_ids.contains(&e.key.dst);
                            let directional = match direction {
                                Direction::Outbound => touches_src,
                                Direction::Inbound => touches_dst,
                                Direction::Both => touches_src || touches_dst,
                            };
                            directional
                                && (edge_types.is_empty() || edge_types.contains(&e.key.edge_type))
                        })
                        .map(|e| e.value().clone())
                        .collect();
                    if let Some(limit) = limit {
                        matched.truncate(limit as usize);
                    }
                    let dataset = neighbors_dataset(matched, vertex_props, edge_props);
                    PartResponse { part, status: PartStatus::Ok, payload: Some(dataset) }
                })
                .await;
            responses.push(response);
        }
        aggregate_part_responses(responses, DataSet::new(vec![]), merge_datasets)
    }

    async fn get_vertices(
        &self,
        space: &str,
        vertex_ids: &[Value],
        tag: &str,
        tag_props: &[String],
    ) -> Result<AggregatedResponse<DataSet>> {
        let parts = self.parts_for(space, vertex_ids);
        let mut responses = Vec::with_capacity(parts.len());
        for part in parts {
            let response = self
                .with_retries(part, || {
                    let mut col_names = vec!["id".to_string()];
                    col_names.extend(tag_props.iter().cloned());
                    let mut ds = DataSet::new(col_names);
                    if let Some(data) = self.spaces.get(space) {
                        for id in vertex_ids {
                            let key = format!("{id:?}");
                            if let Some(versions) = data.vertices.get(&key) {
                                if let Some(v) = versions.iter().find(|v| v.tag == tag) {
                                    let mut values = vec![id.clone()];
                                    for prop in tag_props {
                                        values.push(v.props.get(prop).cloned().unwrap_or_else(Value::null));
                                    }
                                    ds.push_row(Row::new(values));
                                }
                            }
                        }
                    }
                    PartResponse { part, status: PartStatus::Ok, payload: Some(ds) }
                })
                .await;
            responses.push(response);
        }
        aggregate_part_responses(responses, DataSet::new(vec![]), merge_datasets)
    }

    async fn get_edges(
        &self,
        space: &str,
        edge_keys: &[EdgeKey],
        edge_props: &[String],
    ) -> Result<AggregatedResponse<DataSet>> {
        let ids: Vec<Value> = edge_keys.iter().map(|k| k.src.clone()).collect();
        let parts = self.parts_for(space, &ids);
        let mut responses = Vec::with_capacity(parts.len());
        for part in parts {
            let response = self
                .with_retries(part, || {
                    let mut col_names = vec!["src".to_string(), "dst".to_string()];
                    col_names.extend(edge_props.iter().cloned());
                    let mut ds = DataSet::new(col_names);
                    if let Some(data) = self.spaces.get(space) {
                        for key in edge_keys {
                            if let Some(edge) = data.edges.get(&edge_key_string(key)) {
                                let mut values = vec![edge.key.src.clone(), edge.key.dst.clone()];
                                for prop in edge_props {
                                    values.push(edge.props.get(prop).cloned().unwrap_or_else(Value::null));
                                }
                                ds.push_row(Row::new(values));
                            }
                        }
                    }
                    PartResponse { part, status: PartStatus::Ok, payload: Some(ds) }
                })
                .await;
            responses.push(response);
        }
        aggregate_part_responses(responses, DataSet::new(vec![]), merge_datasets)
    }

    async fn add_vertices(
        &self,
        space: &str,
        items: &[VertexItem],
        overwrite: bool,
    ) -> Result<AggregatedResponse<()>> {
        let ids: Vec<Value> = items.iter().map(|i| i.id.clone()).collect();
        let parts = self.parts_for(space, &ids);
        let mut responses = Vec::with_capacity(parts.len());
        for part in parts {
            let response = self
                .with_retries(part, || {
                    let entry = self.spaces.entry(space.to_string()).or_default();
                    for item in items {
                        let key = format!("{:?}", item.id);
                        let mut versions = entry.vertices.entry(key).or_default();
                        if overwrite {
                            versions.retain(|v| v.tag != item.tag);
                        }
                        versions.push(StoredVertex { tag: item.tag.clone(), props: item.props.clone() });
                    }
                    PartResponse { part, status: PartStatus::Ok, payload: Some(()) }
                })
                .await;
            responses.push(response);
        }
        aggregate_part_responses(responses, (), |(), ()| ())
    }

    async fn add_edges(&self, space: &str, items: &[EdgeItem], overwrite: bool) -> Result<AggregatedResponse<()>> {
        let ids: Vec<Value> = items.iter().map(|i| i.key.src.clone()).collect();
        let parts = self.parts_for(space, &ids);
        let mut responses = Vec::with_capacity(parts.len());
        for part in parts {
            let response = self
                .with_retries(part, || {
                    let entry = self.spaces.entry(space.to_string()).or_default();
                    for item in items {
                        let k = edge_key_string(&item.key);
                        if overwrite || !entry.edges.contains_key(&k) {
                            entry.edges.insert(k, StoredEdge { key: item.key.clone(), props: item.props.clone() });
                        }
                    }
                    PartResponse { part, status: PartStatus::Ok, payload: Some(()) }
                })
                .await;
            responses.push(response);
        }
        aggregate_part_responses(responses, (), |(), ()| ())
    }

    async fn delete_vertices(&self, space: &str, vertex_ids: &[Value]) -> Result<AggregatedResponse<()>> {
        let parts = self.parts_for(space, vertex_ids);
        let mut responses = Vec::with_capacity(parts.len());
        for part in parts {
            let response = self
                .with_retries(part, || {
                    if let Some(data) = self.spaces.get(space) {
                        for id in vertex_ids {
                            data.vertices.remove(&format!("{id:?}"));
                        }
                    }
                    PartResponse { part, status: PartStatus::Ok, payload: Some(()) }
                })
                .await;
            responses.push(response);
        }
        aggregate_part_responses(responses, (), |(), ()| ())
    }

    async fn delete_tags(&self, space: &str, vertex_ids: &[Value], tags: &[String]) -> Result<AggregatedResponse<()>> {
        let parts = self.parts_for(space, vertex_ids);
        let mut responses = Vec::with_capacity(parts.len());
        for part in parts {
            let response = self
                .with_retries(part, || {
                    if let Some(data) = self.spaces.get(space) {
                        for id in vertex_ids {
                            let key = format!("{id:?}");
                            if let Some(mut versions) = data.vertices.get_mut(&key) {
                                versions.retain(|v| !tags.contains(&v.tag));
                            }
                        }
                    }
                    PartResponse { part, status: PartStatus::Ok, payload: Some(()) }
                })
                .await;
            responses.push(response);
        }
        aggregate_part_responses(responses, (), |(), ()| ())
    }

    async fn delete_edges(&self, space: &str, edge_keys: &[EdgeKey]) -> Result<AggregatedResponse<()>> {
        let ids: Vec<Value> = edge_keys.iter().map(|k| k.src.clone()).collect();
        let parts = self.parts_for(space, &ids);
        let mut responses = Vec::with_capacity(parts.len());
        for part in parts {
            let response = self
                .with_retries(part, || {
                    if let Some(data) = self.spaces.get(space) {
                        for key in edge_keys {
                            data.edges.remove(&edge_key_string(key));
                        }
                    }
                    PartResponse { part, status: PartStatus::Ok, payload: Some(()) }
                })
                .await;
            responses.push(response);
        }
        aggregate_part_responses(responses, (), |(), ()| ())
    }

    async fn update_vertex(
        &self,
        space: &str,
        id: &Value,
        tag: &str,
        updates: &HashMap<String, Value>,
    ) -> Result<AggregatedResponse<()>> {
        let parts = self.parts_for(space, std::slice::from_ref(id));
        let mut responses = Vec::with_capacity(parts.len());
        for part in parts {
            let response = self
                .with_retries(part, || {
                    let entry = self.spaces.entry(space.to_string()).or_default();
                    let key = format!("{id:?}");
                    let mut versions = entry.vertices.entry(key).or_default();
                    match versions.iter_mut().find(|v| v.tag == tag) {
                        Some(v) => v.props.extend(updates.clone()),
                        None => versions.push(StoredVertex { tag: tag.to_string(), props: updates.clone() }),
                    }
                    PartResponse { part, status: PartStatus::Ok, payload: Some(()) }
                })
                .await;
            responses.push(response);
        }
        aggregate_part_responses(responses, (), |(), ()| ())
    }

    async fn lookup_index(
        &self,
        space: &str,
        _index_name: &str,
        _ranges_hint: &str,
    ) -> Result<AggregatedResponse<DataSet>> {
        // The fake has no real index structures; it answers with a full
        // scan's worth of vertex rows, matching the access-path contract
        // (IndexScan chooses *what to read*, not the predicate) without
        // reimplementing range matching twice.
        let mut ds = DataSet::new(vec!["id".to_string()]);
        if let Some(data) = self.spaces.get(space) {
            for entry in data.vertices.iter() {
                if let Some(first) = entry.value().first() {
                    let _ = first;
                    ds.push_row(Row::new(vec![Value::string(entry.key().clone())]));
                }
            }
        }
        aggregate_part_responses(
            vec![PartResponse { part: 0, status: PartStatus::Ok, payload: Some(ds) }],
            DataSet::new(vec![]),
            merge_datasets,
        )
    }
}

fn merge_datasets(mut a: DataSet, b: DataSet) -> DataSet {
    if a.col_names.is_empty() {
        a.col_names = b.col_names;
    }
    a.rows.extend(b.rows);
    a
}
