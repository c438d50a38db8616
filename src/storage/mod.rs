//! Storage client façade (spec §4.6, §6, component C10): the only way the
//! executor talks to the partitioned storage layer. The on-disk engine,
//! RAFT consensus, and wire codec are external collaborators (spec §1) —
//! this module only fans a logical request out to per-partition RPCs,
//! retries transient per-part failures, and aggregates partial success.
//!
//! `InMemoryStorageClient` is the fake backing used by tests and the
//! `graphcore-explain` demo binary: it holds its data in a
//! `DashMap`-backed table keyed by space, so the façade's fan-out/retry/
//! aggregation logic can be exercised without a real cluster.

mod fake;

pub use fake::InMemoryStorageClient;

use crate::error::{Error, Result};
use crate::value::{DataSet, Value};
use async_trait::async_trait;
use std::collections::HashMap;

/// Status of one partition's response to a fanned-out request (spec §6
/// "Each PartResponse includes an optional leader-change hint").
#[derive(Debug, Clone)]
pub struct PartResponse<T> {
    pub part: i32,
    pub status: PartStatus,
    pub payload: Option<T>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartStatus {
    Ok,
    LeaderChanged { new_leader: Option<String> },
    Timeout,
    Failed(String),
}

/// Direction used by a neighbor fan-out (mirrors `plan::Direction` so the
/// façade doesn't need to depend on `plan`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outbound,
    Inbound,
    Both,
}

#[derive(Debug, Clone)]
pub struct EdgeKey {
    pub src: Value,
    pub dst: Value,
    pub edge_type: String,
    pub rank: i64,
}

#[derive(Debug, Clone)]
pub struct VertexItem {
    pub id: Value,
    pub tag: String,
    pub props: HashMap<String, Value>,
}

#[derive(Debug, Clone)]
pub struct EdgeItem {
    pub key: EdgeKey,
    pub props: HashMap<String, Value>,
}

/// Asynchronous, partitioned storage operations (spec §4.6/§6). Every
/// method computes the owning partitions via the catalog's stable hash,
/// fans the request out per partition, and aggregates the per-part
/// responses into one `ExecResult`-shaped outcome through
/// [`aggregate_part_responses`].
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn get_neighbors(
        &self,
        space: &str,
        vertex_ids: &[Value],
        edge_types: &[String],
        vertex_props: &[String],
        edge_props: &[String],
        filter_holds: bool,
        limit: Option<u64>,
        direction: Direction,
    ) -> Result<AggregatedResponse<DataSet>>;

    async fn get_vertices(
        &self,
        space: &str,
        vertex_ids: &[Value],
        tag: &str,
        tag_props: &[String],
    ) -> Result<AggregatedResponse<DataSet>>;

    async fn get_edges(
        &self,
        space: &str,
        edge_keys: &[EdgeKey],
        edge_props: &[String],
    ) -> Result<AggregatedResponse<DataSet>>;

    async fn add_vertices(
        &self,
        space: &str,
        items: &[VertexItem],
        overwrite: bool,
    ) -> Result<AggregatedResponse<()>>;

    async fn add_edges(
        &self,
        space: &str,
        items: &[EdgeItem],
        overwrite: bool,
    ) -> Result<AggregatedResponse<()>>;

    async fn delete_vertices(&self, space: &str, vertex_ids: &[Value]) -> Result<AggregatedResponse<()>>;

    async fn delete_tags(&self, space: &str, vertex_ids: &[Value], tags: &[String]) -> Result<AggregatedResponse<()>>;

    async fn delete_edges(&self, space: &str, edge_keys: &[EdgeKey]) -> Result<AggregatedResponse<()>>;

    async fn update_vertex(
        &self,
        space: &str,
        id: &Value,
        tag: &str,
        updates: &HashMap<String, Value>,
    ) -> Result<AggregatedResponse<()>>;

    async fn lookup_index(
        &self,
        space: &str,
        index_name: &str,
        ranges_hint: &str,
    ) -> Result<AggregatedResponse<DataSet>>;
}

/// The façade's aggregated outcome across all parts touched by a request
/// (spec §4.6 "any response enables downstream, but the aggregate state is
/// `PartialSuccess` unless all parts reported OK").
#[derive(Debug, Clone)]
pub struct AggregatedResponse<T> {
    pub merged: T,
    pub all_ok: bool,
    pub errors: Vec<String>,
}

/// Fold per-part responses into one aggregate, merging payloads with
/// `merge`. `Err` only when every part failed (spec §7 "then the overall
/// error"); otherwise partial failures are recorded in `errors` and the
/// caller decides `ExecState::Ok` vs `PartialSuccess`.
pub fn aggregate_part_responses<T>(
    responses: Vec<PartResponse<T>>,
    zero: T,
    merge: impl Fn(T, T) -> T,
) -> Result<AggregatedResponse<T>> {
    let total = responses.len();
    let mut merged = zero;
    let mut errors = Vec::new();
    let mut ok_count = 0;
    for resp in responses {
        match resp.status {
            PartStatus::Ok => {
                ok_count += 1;
                if let Some(payload) = resp.payload {
                    merged = merge(merged, payload);
                }
            }
            PartStatus::LeaderChanged { .. } => {
                errors.push(format!("part {}: leader changed", resp.part));
            }
            PartStatus::Timeout => {
                errors.push(format!("part {}: timeout", resp.part));
            }
            PartStatus::Failed(message) => {
                errors.push(format!("part {}: {message}", resp.part));
            }
        }
    }
    if ok_count == 0 && total > 0 {
        return Err(Error::RpcFailure {
            message: errors.join("; "),
        });
    }
    Ok(AggregatedResponse {
        merged,
        all_ok: errors.is_empty(),
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_parts_failing_is_an_rpc_failure_not_a_partial_success() {
        let responses: Vec<PartResponse<u32>> = vec![
            PartResponse { part: 0, status: PartStatus::Timeout, payload: None },
            PartResponse { part: 1, status: PartStatus::Failed("down".into()), payload: None },
        ];
        let err = aggregate_part_responses(responses, 0u32, |a, b| a + b).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::RpcFailure);
    }

    #[test]
    fn one_failing_part_is_partial_but_still_returns_merged_payload() {
        let responses = vec![
            PartResponse { part: 0, status: PartStatus::Ok, payload: Some(5u32) },
            PartResponse { part: 1, status: PartStatus::LeaderChanged { new_leader: None }, payload: None },
        ];
        let aggregated = aggregate_part_responses(responses, 0u32, |a, b| a + b).unwrap();
        assert_eq!(aggregated.merged, 5);
        assert!(!aggregated.all_ok);
        assert_eq!(aggregated.errors.len(), 1);
    }
}
