//! # Execution runtime (spec §4.5, §4.6, component C8)
//!
//! Drives a physical plan to completion: a cooperative, single-task-per-
//! query scheduler that dispatches nodes in [`Plan::topological_order`],
//! resolves each node's inputs by reading its dependencies' results back
//! out of the [`ResultCache`] by variable name, and checks
//! [`timeout::QueryTimeout`] between dispatches (spec §4.5 "Timeouts are
//! implemented as external cancels... nothing preempts mid-operator").
//!
//! `Loop`/`Select` are not part of any node's `inputs()` edge set
//! (invariant (a), `plan::mod`) — their bodies are side-entries the
//! scheduler recurses into explicitly, one independent `topological_order`
//! walk per body, rather than something the DAG walk surfaces on its own.

pub mod cache;
pub mod limits;
pub mod timeout;

pub use cache::ResultCache;
pub use limits::MemoryTracker;
pub use timeout::QueryTimeout;

use crate::catalog::Catalog;
use crate::config::ExecutorConfig;
use crate::error::{Error, Result};
use crate::expression::{Expression, FunctionRegistry};
use crate::operators::{self, OperatorContext};
use crate::plan::result::ExecResult;
use crate::plan::{NodeId, Plan, PlanKind, PlanNode};
use crate::storage::StorageClient;
use crate::value::{DataSet, Row, Value};
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;

/// A query's execution resources, constructed once per query and handed
/// to [`execute_plan`] (spec §4.6: "the execution context owns a result
/// cache, a memory tracker, and a cancellation handle").
pub struct ExecutionContext {
    pub catalog: Arc<Catalog>,
    pub storage: Arc<dyn StorageClient>,
    pub cache: ResultCache,
    pub memory: MemoryTracker,
    pub timeout: QueryTimeout,
}

impl ExecutionContext {
    pub fn new(catalog: Arc<Catalog>, storage: Arc<dyn StorageClient>, config: &ExecutorConfig) -> Self {
        ExecutionContext {
            catalog,
            storage,
            cache: ResultCache::new(config.result_cache_capacity),
            memory: MemoryTracker::new(config.memory_high_water_mark_bytes),
            timeout: QueryTimeout::new(config.default_timeout_ms.map(std::time::Duration::from_millis)),
        }
    }
}

/// Safety cap on `Loop` iterations (spec §9 "bound any repeating construct
/// the same way the optimizer bounds its rewrite loop" — mirrors
/// `OptimizerConfig::max_iterations`'s role as a cycle backstop rather
/// than an expected trip count).
const MAX_LOOP_ITERATIONS: u64 = 100_000;

/// Run `plan` from `root` to completion and return the root node's result.
pub async fn execute_plan(
    plan: &Plan,
    root: NodeId,
    parameters: HashMap<String, Value>,
    ctx: &ExecutionContext,
) -> Result<ExecResult> {
    let op_ctx = OperatorContext {
        parameters,
        registry: FunctionRegistry::default(),
        catalog: Arc::clone(&ctx.catalog),
        storage: Arc::clone(&ctx.storage),
    };
    run_subplan(plan, root, ctx, &op_ctx).await
}

fn estimate_bytes(dataset: &DataSet) -> usize {
    let width = dataset.col_names.len().max(1);
    dataset.rows.len() * width * 64
}

/// Run every node in `root`'s reachable subgraph, in dependency order,
/// writing each result into the cache by its output variable. Boxed
/// because `Loop`/`Select` dispatch recurses back into this function for
/// their bodies — a cycle an `async fn` can't express without indirection.
fn run_subplan<'a>(
    plan: &'a Plan,
    root: NodeId,
    ctx: &'a ExecutionContext,
    op_ctx: &'a OperatorContext,
) -> BoxFuture<'a, Result<ExecResult>> {
    Box::pin(async move {
        let order = plan.topological_order(root);
        let mut last: Option<ExecResult> = None;
        for node_id in order {
            ctx.timeout.check().map_err(|e| Error::Timeout { elapsed_ms: e.elapsed.as_millis() as u64 })?;
            let node = plan.get(node_id);
            let result = dispatch_node(plan, node, ctx, op_ctx).await?;
            ctx.memory
                .allocate(estimate_bytes(&result.dataset))
                .map_err(|e| match e {
                    limits::ResourceError::MemoryLimitExceeded { used, limit } => Error::MemoryExceeded { used, limit },
                })?;
            ctx.cache.write(&node.output_var, result.clone());
            last = Some(result);
        }
        last.ok_or_else(|| Error::Execution { message: "subplan rooted at an unreachable node".into() })
    })
}

fn dispatch_node<'a>(
    plan: &'a Plan,
    node: &'a PlanNode,
    ctx: &'a ExecutionContext,
    op_ctx: &'a OperatorContext,
) -> BoxFuture<'a, Result<ExecResult>> {
    Box::pin(async move {
        match &node.kind {
            PlanKind::Loop { condition, body, loop_var, accumulator } => {
                run_loop(plan, *body, loop_var, accumulator, condition, ctx, op_ctx).await
            }
            PlanKind::Select { condition, then_body, else_body } => {
                run_select(plan, condition, *then_body, *else_body, ctx, op_ctx).await
            }
            // Read-through: whatever `run_loop` seeded under `name` before
            // dispatching this iteration's body (or an empty placeholder if
            // nothing has seeded it yet, e.g. outside a loop body).
            PlanKind::VarSource { name } => {
                Ok(ctx.cache.read(name).unwrap_or_else(|| ExecResult::ok(DataSet::new(vec![name.clone()]))))
            }
            _ => {
                let inputs = resolve_inputs(plan, node, ctx)?;
                operators::execute(plan, node, &inputs, op_ctx).await
            }
        }
    })
}

fn resolve_inputs(plan: &Plan, node: &PlanNode, ctx: &ExecutionContext) -> Result<Vec<ExecResult>> {
    node.inputs()
        .into_iter()
        .map(|input_id| {
            let var = &plan.get(input_id).output_var;
            ctx.cache
                .read(var)
                .ok_or_else(|| Error::Execution { message: format!("no cached result for input variable {var}") })
        })
        .collect()
}

/// Evaluate a standalone condition (no current row — `Loop`/`Select`
/// conditions only ever reference parameters and already-cached `$-`
/// variables, never a per-row column) against an empty-row context.
fn eval_condition(condition: &Expression, loop_value: Option<&Value>, loop_var: &str, op_ctx: &OperatorContext) -> Value {
    let row = match loop_value {
        Some(v) => Row::new(vec![v.clone()]),
        None => Row::new(vec![]),
    };
    let col_names = match loop_value {
        Some(_) => vec![loop_var.to_string()],
        None => vec![],
    };
    let rc = operators::RowContext::new(&row, &col_names, &op_ctx.parameters, &op_ctx.registry);
    condition.eval(&rc)
}

/// Runs `body` once per iteration while `condition` holds, exposing the
/// current iteration counter to the body through a [`PlanKind::VarSource`]
/// named `loop_var` (seeded into the cache before each run, mirroring
/// `original_source`'s `ectx()->addValue(loopNode->varName(), value)`), and
/// folding each iteration's body output — its first result row's first
/// column — into a growing list stored under `accumulator`. The final list
/// is both the loop's own result and left in the cache under `accumulator`
/// for anything downstream that reads it by name.
async fn run_loop<'a>(
    plan: &'a Plan,
    body: NodeId,
    loop_var: &str,
    accumulator: &str,
    condition: &Expression,
    ctx: &'a ExecutionContext,
    op_ctx: &'a OperatorContext,
) -> Result<ExecResult> {
    let mut iteration: i64 = 0;
    let mut acc: Vec<Value> = Vec::new();
    loop {
        ctx.timeout.check().map_err(|e| Error::Timeout { elapsed_ms: e.elapsed.as_millis() as u64 })?;
        let condition_holds = eval_condition(condition, Some(&Value::Int(iteration)), loop_var, op_ctx).is_truthy();
        if !condition_holds {
            break;
        }
        ctx.cache.write(loop_var, ExecResult::ok(single_value_dataset(loop_var, Value::Int(iteration))));
        let body_result = run_subplan(plan, body, ctx, op_ctx).await?;
        if let Some(item) = body_result.dataset.rows.first().and_then(|r| r.get(0)).cloned() {
            acc.push(item);
        }
        iteration += 1;
        if iteration as u64 >= MAX_LOOP_ITERATIONS {
            return Err(Error::Execution {
                message: format!("loop on `{loop_var}` exceeded the safety cap of {MAX_LOOP_ITERATIONS} iterations"),
            });
        }
    }
    let result = ExecResult::ok(single_value_dataset(accumulator, Value::List(Arc::new(acc))));
    ctx.cache.write(accumulator, result.clone());
    Ok(result)
}

fn single_value_dataset(col_name: &str, value: Value) -> DataSet {
    let mut ds = DataSet::new(vec![col_name.to_string()]);
    ds.push_row(Row::new(vec![value]));
    ds
}

async fn run_select<'a>(
    plan: &'a Plan,
    condition: &Expression,
    then_body: NodeId,
    else_body: NodeId,
    ctx: &'a ExecutionContext,
    op_ctx: &'a OperatorContext,
) -> Result<ExecResult> {
    let branch = if eval_condition(condition, None, "", op_ctx).is_truthy() { then_body } else { else_body };
    run_subplan(plan, branch, ctx, op_ctx).await
}
