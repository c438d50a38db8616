//! # Operator library (spec §4.8, component C9)
//!
//! One function per `PlanKind` variant, dispatched from [`execute`]. Every
//! operator reads its inputs as already-materialized [`ExecResult`]s (the
//! scheduler resolves `PlanNode::inputs()` through the result cache before
//! calling in here — spec §4.6 "operators read by name and write by name")
//! and returns a fresh `ExecResult`; nothing here touches the cache
//! directly, keeping these functions plain and unit-testable.
//!
//! Grounded in `original_source`'s operator family (`Filter`, `Project`,
//! `GetNeighbors`, ...) reduced to the tagged-enum-dispatch style spec §9
//! asks for, and in the teacher's enum-dispatch executors for the general
//! shape of "one function per kind, matched once at the call site".

mod graph;
mod join;
mod mutation;
mod relational;
mod row;

pub use row::RowContext;

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::expression::FunctionRegistry;
use crate::plan::result::ExecResult;
use crate::plan::{Plan, PlanKind, PlanNode};
use crate::storage::StorageClient;
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Everything an operator needs beyond its already-resolved inputs: query
/// parameters, the function registry, and a storage/catalog handle for the
/// operators that fan out to the partitioned backend.
pub struct OperatorContext {
    pub parameters: HashMap<String, Value>,
    pub registry: FunctionRegistry,
    pub catalog: Arc<Catalog>,
    pub storage: Arc<dyn StorageClient>,
}

impl OperatorContext {
    pub fn new(catalog: Arc<Catalog>, storage: Arc<dyn StorageClient>) -> Self {
        OperatorContext {
            parameters: HashMap::new(),
            registry: FunctionRegistry::default(),
            catalog,
            storage,
        }
    }
}

/// Run the operator at `node`, given its already-resolved inputs in the
/// same order `PlanNode::inputs()` reports them. `Loop`/`Select` are not
/// dispatched here — the executor's scheduler interprets those directly
/// since their bodies are side-entries, not operators with a single
/// tabular result (spec §4.5).
pub async fn execute(plan: &Plan, node: &PlanNode, inputs: &[ExecResult], ctx: &OperatorContext) -> Result<ExecResult> {
    match &node.kind {
        PlanKind::Start => Ok(ExecResult::ok(crate::value::DataSet::new(node.col_names.clone()))),

        PlanKind::PassThrough { .. } => Ok(single(inputs)?.clone()),

        PlanKind::Project { yields, .. } => Ok(relational::project(single(inputs)?, &node.col_names, yields, ctx)),

        PlanKind::Filter { condition, need_stable, .. } => {
            Ok(relational::filter(single(inputs)?, condition, *need_stable, ctx))
        }

        PlanKind::Limit { offset, count, .. } => Ok(relational::limit(single(inputs)?, *offset, *count)),

        PlanKind::OrderBy { order_by, .. } => Ok(relational::order_by(single(inputs)?, order_by)),

        PlanKind::TopN { order_by, offset, limit, .. } => {
            Ok(relational::top_n(single(inputs)?, order_by, *offset, *limit))
        }

        PlanKind::Dedup { .. } => Ok(relational::dedup(single(inputs)?)),

        PlanKind::Aggregate { group_keys, aggregates, .. } => {
            Ok(relational::aggregate(single(inputs)?, &node.col_names, group_keys, aggregates, ctx))
        }

        PlanKind::Union { .. } => Ok(join::union(inputs, &node.col_names)?),
        PlanKind::Intersect { .. } => Ok(join::intersect(inputs, &node.col_names)?),
        PlanKind::CartesianProduct { .. } => Ok(join::cartesian_product(inputs)),

        PlanKind::Minus { .. } => {
            let (left, right) = pair(inputs)?;
            join::minus(left, right, &node.col_names)
        }

        PlanKind::InnerJoin { left_keys, right_keys, .. } => {
            let (left, right) = pair(inputs)?;
            Ok(join::inner_join(left, right, left_keys, right_keys, ctx))
        }

        PlanKind::LeftJoin { left_keys, right_keys, .. } => {
            let (left, right) = pair(inputs)?;
            Ok(join::left_join(left, right, left_keys, right_keys, ctx))
        }

        PlanKind::DataCollect { mode, .. } => Ok(graph::data_collect(inputs, *mode, &node.col_names)),

        PlanKind::GetNeighbors { space, src_ids, edge_types, vertex_props, edge_props, filter, limit, direction, .. } => {
            graph::get_neighbors(
                single(inputs)?,
                space,
                src_ids,
                edge_types,
                vertex_props,
                edge_props,
                filter.as_ref(),
                *limit,
                *direction,
                &node.col_names,
                ctx,
            )
            .await
        }

        PlanKind::GetVertices { space, tag, ids, tag_props, .. } => {
            graph::get_vertices(single(inputs)?, space, tag, ids, tag_props, &node.col_names, ctx).await
        }

        PlanKind::GetEdges { space, edge_type, ids, edge_props, .. } => {
            graph::get_edges(single(inputs)?, space, edge_type, ids, edge_props, &node.col_names, ctx).await
        }

        PlanKind::IndexScan { space, index_name, ranges, limit } => {
            graph::index_scan(space, index_name, ranges, *limit, &node.col_names, ctx).await
        }

        PlanKind::MultiOutputs { .. } => Ok(single(inputs)?.clone()),

        PlanKind::InsertVertices { space, tag, prop_names, rows, overwrite, .. } => {
            mutation::insert_vertices(space, tag, prop_names, rows, *overwrite, ctx).await
        }

        PlanKind::InsertEdges { space, edge_type, prop_names, rows, overwrite, .. } => {
            mutation::insert_edges(space, edge_type, prop_names, rows, *overwrite, ctx).await
        }

        PlanKind::DeleteVertices { space, ids, .. } => mutation::delete_vertices(space, ids, ctx).await,

        PlanKind::DeleteTags { space, tags, .. } => {
            mutation::delete_tags(single(inputs)?, space, tags, ctx).await
        }

        PlanKind::DeleteEdges { space, edge_type, keys, .. } => {
            mutation::delete_edges(space, edge_type, keys, ctx).await
        }

        PlanKind::Update { space, .. } => mutation::update_vertex(single(inputs)?, space, ctx).await,

        PlanKind::CreateSpace { name, part_count } => mutation::create_space(name, *part_count, ctx),

        PlanKind::Loop { .. } | PlanKind::Select { .. } | PlanKind::VarSource { .. } => Err(Error::Execution {
            message: format!("{} is a control-flow node, not a dispatchable operator", node.kind_name()),
        }),
    }
}

fn single(inputs: &[ExecResult]) -> Result<&ExecResult> {
    inputs.first().ok_or_else(|| Error::Execution {
        message: "operator expected exactly one input".into(),
    })
}

fn pair(inputs: &[ExecResult]) -> Result<(&ExecResult, &ExecResult)> {
    match inputs {
        [left, right] => Ok((left, right)),
        _ => Err(Error::Execution {
            message: format!("operator expected exactly two inputs, got {}", inputs.len()),
        }),
    }
}
