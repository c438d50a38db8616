//! Graph-access operators (spec §4.6, §6): the operators that fan out to
//! the partitioned [`StorageClient`] rather than only touching already
//! materialized rows. Each combines the plan node's literal seed data with
//! ids piped in from a prior step (multi-hop `GO`/`FETCH`), then merges the
//! façade's per-part aggregate into an `ExecResult`.

use super::OperatorContext;
use crate::error::Result;
use crate::expression::Expression;
use crate::plan::result::ExecResult;
use crate::plan::{DataCollectMode, Direction, IndexRange};
use crate::storage::{self, AggregatedResponse, EdgeKey};
use crate::value::{compare, DataSet, Row, Value};
use std::collections::BTreeMap;

fn to_storage_direction(direction: Direction) -> storage::Direction {
    match direction {
        Direction::Outbound => storage::Direction::Outbound,
        Direction::Inbound => storage::Direction::Inbound,
        Direction::Both => storage::Direction::Both,
    }
}

/// Evaluate literal id expressions against a context with no current row
/// (they're constants or bound query parameters, never column references).
fn eval_literals(exprs: &[Expression], ctx: &OperatorContext) -> Vec<Value> {
    let empty_row = Row::new(vec![]);
    let empty_cols: Vec<String> = vec![];
    let rc = super::RowContext::new(&empty_row, &empty_cols, &ctx.parameters, &ctx.registry);
    exprs.iter().map(|e| e.eval(&rc)).collect()
}

fn dedup_ids(mut ids: Vec<Value>) -> Vec<Value> {
    ids.sort_by(compare);
    ids.dedup_by(|a, b| compare(a, b) == std::cmp::Ordering::Equal);
    ids
}

/// Ids flowing in from the previous pipeline step live in the input
/// dataset's first column (spec §4.3 "`$-` threads the prior step's output
/// as the new clause's input").
fn piped_ids(input: &ExecResult) -> Vec<Value> {
    input.dataset.rows.iter().filter_map(|r| r.get(0).cloned()).collect()
}

fn finish(dataset: DataSet, aggregated_all_ok: bool, errors: Vec<String>) -> ExecResult {
    if aggregated_all_ok {
        ExecResult::ok(dataset)
    } else {
        ExecResult::partial(dataset, errors)
    }
}

fn apply_filter(mut dataset: DataSet, filter: &Expression, ctx: &OperatorContext) -> DataSet {
    let col_names = dataset.col_names.clone();
    dataset.rows.retain(|row| {
        let rc = super::RowContext::new(row, &col_names, &ctx.parameters, &ctx.registry);
        filter.eval(&rc).is_truthy()
    });
    dataset
}

fn take_merged<T>(response: AggregatedResponse<T>) -> (T, bool, Vec<String>) {
    (response.merged, response.all_ok, response.errors)
}

#[allow(clippy::too_many_arguments)]
pub async fn get_neighbors(
    input: &ExecResult,
    space: &str,
    src_ids: &[Expression],
    edge_types: &[String],
    vertex_props: &[String],
    edge_props: &[String],
    filter: Option<&Expression>,
    limit: Option<u64>,
    direction: Direction,
    out_col_names: &[String],
    ctx: &OperatorContext,
) -> Result<ExecResult> {
    let mut ids = eval_literals(src_ids, ctx);
    ids.extend(piped_ids(input));
    let ids = dedup_ids(ids);
    if ids.is_empty() {
        return Ok(ExecResult::ok(DataSet::new(out_col_names.to_vec())));
    }

    let response = ctx
        .storage
        .get_neighbors(
            space,
            &ids,
            edge_types,
            vertex_props,
            edge_props,
            filter.is_some(),
            limit,
            to_storage_direction(direction),
        )
        .await?;
    let (mut dataset, all_ok, errors) = take_merged(response);
    if dataset.col_names.is_empty() {
        dataset.col_names = out_col_names.to_vec();
    }
    if let Some(condition) = filter {
        dataset = apply_filter(dataset, condition, ctx);
    }
    if let Some(limit) = limit {
        dataset.rows.truncate(limit as usize);
    }
    Ok(finish(dataset, all_ok, errors))
}

pub async fn get_vertices(
    input: &ExecResult,
    space: &str,
    tag: &str,
    literal_ids: &[Expression],
    tag_props: &[String],
    out_col_names: &[String],
    ctx: &OperatorContext,
) -> Result<ExecResult> {
    let mut ids = eval_literals(literal_ids, ctx);
    ids.extend(piped_ids(input));
    let ids = dedup_ids(ids);
    if ids.is_empty() {
        return Ok(ExecResult::ok(DataSet::new(out_col_names.to_vec())));
    }

    let response = ctx.storage.get_vertices(space, &ids, tag, tag_props).await?;
    let (mut dataset, all_ok, errors) = take_merged(response);
    if dataset.col_names.is_empty() {
        dataset.col_names = out_col_names.to_vec();
    }
    Ok(finish(dataset, all_ok, errors))
}

/// `Value::Edge` constants carry the composite key directly (spec
/// GLOSSARY "an edge's id is `(src, type, rank, dst)`"); a fetched edge's
/// literal "id" bundles the whole key rather than a single scalar.
fn edge_key_from_value(value: &Value, edge_type: &str) -> Option<EdgeKey> {
    match value {
        Value::Edge(edge) => Some(EdgeKey {
            src: edge.src.clone(),
            dst: edge.dst.clone(),
            edge_type: edge_type.to_string(),
            rank: edge.rank,
        }),
        _ => None,
    }
}

/// Edge keys piped in from a prior step live across the first three
/// columns: `src`, `dst`, `rank` (the convention `operators::graph`'s own
/// `GetNeighbors` output and `DeleteEdges`' literal keys both use).
fn piped_edge_keys(input: &ExecResult, edge_type: &str) -> Vec<EdgeKey> {
    input
        .dataset
        .rows
        .iter()
        .filter_map(|row| {
            let src = row.get(0)?.clone();
            let dst = row.get(1)?.clone();
            let rank = match row.get(2) {
                Some(Value::Int(r)) => *r,
                _ => 0,
            };
            Some(EdgeKey { src, dst, edge_type: edge_type.to_string(), rank })
        })
        .collect()
}

pub async fn get_edges(
    input: &ExecResult,
    space: &str,
    edge_type: &str,
    literal_ids: &[Expression],
    edge_props: &[String],
    out_col_names: &[String],
    ctx: &OperatorContext,
) -> Result<ExecResult> {
    let mut keys: Vec<EdgeKey> = eval_literals(literal_ids, ctx)
        .iter()
        .filter_map(|v| edge_key_from_value(v, edge_type))
        .collect();
    keys.extend(piped_edge_keys(input, edge_type));
    if keys.is_empty() {
        return Ok(ExecResult::ok(DataSet::new(out_col_names.to_vec())));
    }

    let response = ctx.storage.get_edges(space, &keys, edge_props).await?;
    let (mut dataset, all_ok, errors) = take_merged(response);
    if dataset.col_names.is_empty() {
        dataset.col_names = out_col_names.to_vec();
    }
    Ok(finish(dataset, all_ok, errors))
}

fn ranges_hint(ranges: &[IndexRange]) -> String {
    ranges
        .iter()
        .map(|r| {
            format!(
                "{}:{}{:?}..{:?}{}",
                r.column,
                if r.lower_inclusive { "[" } else { "(" },
                r.lower,
                r.upper,
                if r.upper_inclusive { "]" } else { ")" },
            )
        })
        .collect::<Vec<_>>()
        .join(",")
}

pub async fn index_scan(
    space: &str,
    index_name: &str,
    ranges: &[IndexRange],
    limit: Option<u64>,
    out_col_names: &[String],
    ctx: &OperatorContext,
) -> Result<ExecResult> {
    let hint = ranges_hint(ranges);
    let response = ctx.storage.lookup_index(space, index_name, &hint).await?;
    let (mut dataset, all_ok, errors) = take_merged(response);
    if dataset.col_names.is_empty() {
        dataset.col_names = out_col_names.to_vec();
    }
    if let Some(limit) = limit {
        dataset.rows.truncate(limit as usize);
    }
    Ok(finish(dataset, all_ok, errors))
}

/// Merge every input's partial-failure state into one outcome without
/// touching the dataset — the caller builds the dataset itself.
fn merge_state(dataset: DataSet, inputs: &[ExecResult]) -> ExecResult {
    let mut errors = Vec::new();
    let mut all_ok = true;
    for input in inputs {
        if !input.is_ok() {
            all_ok = false;
            errors.extend(input.partial_errors.clone());
        }
    }
    if all_ok {
        ExecResult::ok(dataset)
    } else {
        ExecResult::partial(dataset, errors)
    }
}

fn row_collect(inputs: &[ExecResult], out_col_names: &[String]) -> ExecResult {
    let mut out = DataSet::new(out_col_names.to_vec());
    for input in inputs {
        out.rows.extend(input.dataset.rows.iter().cloned());
    }
    merge_state(out, inputs)
}

/// Chain consecutive `GetNeighbors`-shaped steps (`src, dst, ...`) into
/// `Path` values: step 0 seeds one path per edge row, each later step
/// extends every path whose last vertex id matches that step's `src`
/// column (spec §3 "Path: {src: Vertex; steps: [{edge, dst}]}").
fn path_collect(inputs: &[ExecResult], out_col_names: &[String]) -> ExecResult {
    use crate::value::{Edge, Path, PathStep, Vertex};

    let mut paths: Vec<Path> = Vec::new();
    for (step_idx, input) in inputs.iter().enumerate() {
        let col_names = &input.dataset.col_names;
        let src_idx = col_names.iter().position(|c| c == "src");
        let dst_idx = col_names.iter().position(|c| c == "dst");
        let (Some(src_idx), Some(dst_idx)) = (src_idx, dst_idx) else {
            continue;
        };
        let rank_idx = col_names.iter().position(|c| c == "rank");
        let edge_type_idx = col_names.iter().position(|c| c == "edge_type");

        if step_idx == 0 {
            for row in &input.dataset.rows {
                let Some(src) = row.get(src_idx) else { continue };
                let Some(dst) = row.get(dst_idx) else { continue };
                let edge = Edge {
                    src: src.clone(),
                    dst: dst.clone(),
                    edge_type: 0,
                    rank: rank_idx.and_then(|i| row.get(i)).and_then(as_int).unwrap_or(0),
                    name: edge_type_idx
                        .and_then(|i| row.get(i))
                        .map(|v| format!("{v:?}"))
                        .unwrap_or_default(),
                    props: BTreeMap::new(),
                };
                paths.push(Path {
                    src: Vertex::new(src.clone()),
                    steps: vec![PathStep { edge, dst: Vertex::new(dst.clone()) }],
                });
            }
            continue;
        }

        let mut extended = Vec::with_capacity(paths.len());
        for path in paths {
            let last = path.last_vertex().id.clone();
            let mut matched_any = false;
            for row in &input.dataset.rows {
                let Some(src) = row.get(src_idx) else { continue };
                if compare(src, &last) != std::cmp::Ordering::Equal {
                    continue;
                }
                let Some(dst) = row.get(dst_idx) else { continue };
                matched_any = true;
                let edge = Edge {
                    src: src.clone(),
                    dst: dst.clone(),
                    edge_type: 0,
                    rank: rank_idx.and_then(|i| row.get(i)).and_then(as_int).unwrap_or(0),
                    name: edge_type_idx
                        .and_then(|i| row.get(i))
                        .map(|v| format!("{v:?}"))
                        .unwrap_or_default(),
                    props: BTreeMap::new(),
                };
                let mut next = path.clone();
                next.steps.push(PathStep { edge, dst: Vertex::new(dst.clone()) });
                extended.push(next);
            }
            if !matched_any {
                extended.push(path);
            }
        }
        paths = extended;
    }

    let mut out = DataSet::new(out_col_names.to_vec());
    for path in paths {
        out.push_row(Row::new(vec![Value::Path(std::sync::Arc::new(path))]));
    }
    merge_state(out, inputs)
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(n) => Some(*n),
        _ => None,
    }
}

pub fn data_collect(inputs: &[ExecResult], mode: DataCollectMode, out_col_names: &[String]) -> ExecResult {
    match mode {
        DataCollectMode::RowCollect => row_collect(inputs, out_col_names),
        DataCollectMode::PathCollect => path_collect(inputs, out_col_names),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::storage::InMemoryStorageClient;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn ctx_with_seed() -> (OperatorContext, Arc<InMemoryStorageClient>) {
        let catalog = Arc::new(Catalog::new());
        catalog.refresh(vec![crate::catalog::SpaceSchema::new("sg", 1, 4)]);
        let storage = Arc::new(InMemoryStorageClient::new(Arc::clone(&catalog), Default::default()));
        storage.seed_edge(
            "sg",
            EdgeKey { src: Value::Int(1), dst: Value::Int(2), edge_type: "knows".into(), rank: 0 },
            HashMap::new(),
        );
        let op_ctx = OperatorContext::new(Arc::clone(&catalog), storage.clone() as Arc<dyn storage::StorageClient>);
        (op_ctx, storage)
    }

    #[tokio::test]
    async fn get_neighbors_seeds_from_literal_src_ids() {
        let (ctx, _storage) = ctx_with_seed();
        let empty_input = ExecResult::ok(DataSet::new(vec![]));
        let result = get_neighbors(
            &empty_input,
            "sg",
            &[Expression::Constant(Value::Int(1))],
            &["knows".to_string()],
            &[],
            &[],
            None,
            None,
            Direction::Outbound,
            &["src".into(), "dst".into()],
            &ctx,
        )
        .await
        .unwrap();
        assert_eq!(result.dataset.len(), 1);
    }

    #[tokio::test]
    async fn get_neighbors_with_no_ids_returns_empty_without_calling_storage() {
        let (ctx, _storage) = ctx_with_seed();
        let empty_input = ExecResult::ok(DataSet::new(vec![]));
        let result = get_neighbors(
            &empty_input, "sg", &[], &[], &[], &[], None, None, Direction::Outbound, &["src".into()], &ctx,
        )
        .await
        .unwrap();
        assert!(result.dataset.is_empty());
    }

    #[test]
    fn path_collect_chains_two_hops_into_one_path() {
        let mut step0 = DataSet::new(vec!["src".into(), "dst".into()]);
        step0.push_row(Row::new(vec![Value::Int(1), Value::Int(2)]));
        let mut step1 = DataSet::new(vec!["src".into(), "dst".into()]);
        step1.push_row(Row::new(vec![Value::Int(2), Value::Int(3)]));
        let inputs = vec![ExecResult::ok(step0), ExecResult::ok(step1)];
        let result = path_collect(&inputs, &["path".into()]);
        assert_eq!(result.dataset.len(), 1);
        match result.dataset.rows[0].get(0).unwrap() {
            Value::Path(path) => assert_eq!(path.length(), 2),
            other => panic!("expected a path value, got {other:?}"),
        }
    }

    #[test]
    fn row_collect_concatenates_every_step() {
        let mut a = DataSet::new(vec!["id".into()]);
        a.push_row(Row::new(vec![Value::Int(1)]));
        let mut b = DataSet::new(vec!["id".into()]);
        b.push_row(Row::new(vec![Value::Int(2)]));
        let result = data_collect(&[ExecResult::ok(a), ExecResult::ok(b)], DataCollectMode::RowCollect, &["id".into()]);
        assert_eq!(result.dataset.len(), 2);
    }
}
