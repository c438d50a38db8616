//! Mutation and DDL operators (spec §4.7, §6): insert/delete vertices and
//! edges, tag removal, vertex property updates, and `CREATE SPACE`. Every
//! storage-touching operator here evaluates its plan node's literal
//! expressions once (they carry no per-row dependency — spec §9 decision
//! on literal seed/payload data) and fans a single façade call out to the
//! partitioned backend; `create_space` is catalog-only and stays
//! synchronous (spec §9 "stubbed DDL executors produce an empty dataset,
//! side effects delegated to the catalog handle").

use super::OperatorContext;
use crate::catalog::SpaceSchema;
use crate::error::Result;
use crate::expression::Expression;
use crate::plan::result::ExecResult;
use crate::storage::{EdgeItem, EdgeKey, VertexItem};
use crate::value::{DataSet, Row, Value};
use std::collections::HashMap;

/// Literal insert/delete payloads never reference a current row — they're
/// constants or bound query parameters — so they're evaluated against an
/// empty row through the same `RowContext` every other operator uses.
fn eval_literal(expr: &Expression, ctx: &OperatorContext) -> Value {
    let empty_row = Row::new(vec![]);
    let empty_cols: Vec<String> = vec![];
    let rc = super::RowContext::new(&empty_row, &empty_cols, &ctx.parameters, &ctx.registry);
    expr.eval(&rc)
}

fn props_from(prop_names: &[String], value_exprs: &[Expression], ctx: &OperatorContext) -> HashMap<String, Value> {
    prop_names
        .iter()
        .zip(value_exprs)
        .map(|(name, expr)| (name.clone(), eval_literal(expr, ctx)))
        .collect()
}

fn finish(all_ok: bool, errors: Vec<String>) -> ExecResult {
    let dataset = DataSet::new(vec![]);
    if all_ok {
        ExecResult::ok(dataset)
    } else {
        ExecResult::partial(dataset, errors)
    }
}

pub async fn insert_vertices(
    space: &str,
    tag: &str,
    prop_names: &[String],
    rows: &[(Expression, Vec<Expression>)],
    overwrite: bool,
    ctx: &OperatorContext,
) -> Result<ExecResult> {
    let items: Vec<VertexItem> = rows
        .iter()
        .map(|(id_expr, value_exprs)| VertexItem {
            id: eval_literal(id_expr, ctx),
            tag: tag.to_string(),
            props: props_from(prop_names, value_exprs, ctx),
        })
        .collect();
    let response = ctx.storage.add_vertices(space, &items, overwrite).await?;
    Ok(finish(response.all_ok, response.errors))
}

pub async fn insert_edges(
    space: &str,
    edge_type: &str,
    prop_names: &[String],
    rows: &[(Expression, Expression, i64, Vec<Expression>)],
    overwrite: bool,
    ctx: &OperatorContext,
) -> Result<ExecResult> {
    let items: Vec<EdgeItem> = rows
        .iter()
        .map(|(src_expr, dst_expr, rank, value_exprs)| EdgeItem {
            key: EdgeKey {
                src: eval_literal(src_expr, ctx),
                dst: eval_literal(dst_expr, ctx),
                edge_type: edge_type.to_string(),
                rank: *rank,
            },
            props: props_from(prop_names, value_exprs, ctx),
        })
        .collect();
    let response = ctx.storage.add_edges(space, &items, overwrite).await?;
    Ok(finish(response.all_ok, response.errors))
}

pub async fn delete_vertices(space: &str, ids: &[Expression], ctx: &OperatorContext) -> Result<ExecResult> {
    let values: Vec<Value> = ids.iter().map(|e| eval_literal(e, ctx)).collect();
    if values.is_empty() {
        return Ok(ExecResult::ok(DataSet::new(vec![])));
    }
    let response = ctx.storage.delete_vertices(space, &values).await?;
    Ok(finish(response.all_ok, response.errors))
}

/// `DELETE TAG ... FROM <ids>` has no literal seed on the plan node — the
/// ids it removes tags from arrive piped in through `$-` (input's first
/// column), the same convention every other multi-step clause uses.
pub async fn delete_tags(input: &ExecResult, space: &str, tags: &[String], ctx: &OperatorContext) -> Result<ExecResult> {
    let ids: Vec<Value> = input.dataset.rows.iter().filter_map(|r| r.get(0).cloned()).collect();
    if ids.is_empty() {
        return Ok(ExecResult::ok(DataSet::new(vec![])));
    }
    let response = ctx.storage.delete_tags(space, &ids, tags).await?;
    Ok(finish(response.all_ok, response.errors))
}

pub async fn delete_edges(
    space: &str,
    edge_type: &str,
    keys: &[(Expression, Expression, i64)],
    ctx: &OperatorContext,
) -> Result<ExecResult> {
    let edge_keys: Vec<EdgeKey> = keys
        .iter()
        .map(|(src_expr, dst_expr, rank)| EdgeKey {
            src: eval_literal(src_expr, ctx),
            dst: eval_literal(dst_expr, ctx),
            edge_type: edge_type.to_string(),
            rank: *rank,
        })
        .collect();
    if edge_keys.is_empty() {
        return Ok(ExecResult::ok(DataSet::new(vec![])));
    }
    let response = ctx.storage.delete_edges(space, &edge_keys).await?;
    Ok(finish(response.all_ok, response.errors))
}

/// `UPDATE VERTEX` has no current AST entry point (spec §9 decision log
/// #4/#5: no `Statement`/`Clause` variant constructs a `PlanKind::Update`
/// today), so this stays reachable only via direct plan construction. The
/// convention it expects: input rows carry the vertex id in column 0, the
/// tag name in column 1, and every remaining column is a property update
/// named by its own column name.
pub async fn update_vertex(input: &ExecResult, space: &str, ctx: &OperatorContext) -> Result<ExecResult> {
    let col_names = &input.dataset.col_names;
    let mut errors = Vec::new();
    let mut all_ok = true;
    for row in &input.dataset.rows {
        let Some(id) = row.get(0) else { continue };
        let Some(Value::String(tag)) = row.get(1) else { continue };
        let mut updates = HashMap::new();
        for (idx, name) in col_names.iter().enumerate().skip(2) {
            if let Some(value) = row.get(idx) {
                updates.insert(name.clone(), value.clone());
            }
        }
        let response = ctx.storage.update_vertex(space, id, tag, &updates).await?;
        if !response.all_ok {
            all_ok = false;
            errors.extend(response.errors);
        }
    }
    Ok(finish(all_ok, errors))
}

pub fn create_space(name: &str, part_count: u32, ctx: &OperatorContext) -> Result<ExecResult> {
    let next_id = 1;
    ctx.catalog.upsert_space(SpaceSchema::new(name, next_id, part_count));
    Ok(ExecResult::ok(DataSet::new(vec![])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::storage::InMemoryStorageClient;
    use std::sync::Arc;

    fn ctx() -> OperatorContext {
        let catalog = Arc::new(Catalog::new());
        catalog.refresh(vec![SpaceSchema::new("sg", 1, 4)]);
        let storage = Arc::new(InMemoryStorageClient::new(Arc::clone(&catalog), Default::default()));
        OperatorContext::new(catalog, storage)
    }

    #[tokio::test]
    async fn insert_then_delete_vertices_round_trips() {
        let ctx = ctx();
        let rows = vec![(Expression::Constant(Value::Int(1)), vec![Expression::Constant(Value::string("Ada"))])];
        let result = insert_vertices("sg", "Person", &["name".to_string()], &rows, true, &ctx).await.unwrap();
        assert!(result.is_ok());

        let deleted = delete_vertices("sg", &[Expression::Constant(Value::Int(1))], &ctx).await.unwrap();
        assert!(deleted.is_ok());
    }

    #[tokio::test]
    async fn delete_vertices_with_no_ids_is_a_no_op() {
        let ctx = ctx();
        let result = delete_vertices("sg", &[], &ctx).await.unwrap();
        assert!(result.dataset.is_empty());
    }

    #[test]
    fn create_space_registers_it_in_the_catalog() {
        let ctx = ctx();
        create_space("newspace", 8, &ctx).unwrap();
        assert!(ctx.catalog.get_space("newspace").is_ok());
    }
}
