//! AST → plan lowering (spec §4.1, component C6).
//!
//! Each clause lowers to a [`SubPlan`]; clauses chain by rewiring the next
//! clause's `input` to the previous clause's `root`, the same pipe-clause
//! composition the original `Validator` subclasses performed one clause at
//! a time (`original_source/src/graph/*Executor.cpp`, `toPlan()`).
//!
//! Failure modes map onto spec §4.1's named errors: unresolved variables
//! become `Error::SymbolNotFound`, a yield column naming a variable bound
//! twice in the same scope becomes `Error::AmbiguousColumn`, and comparing
//! or casting across incompatible static types becomes `Error::TypeMismatch`.

mod permission;

pub use permission::PermissionGate;

use crate::ast::{Clause, Statement, YieldColumn};
use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::expression::Expression;
use crate::plan::{Plan, PlanKind, SubPlan};
use crate::symbol::SymbolTable;
use crate::value::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Parse a `GO FROM <ids>` literal seed id the way the grammar accepts them:
/// a bare integer vertex id, or a quoted string id for string-typed VID spaces.
fn parse_id_literal(raw: &str) -> Value {
    match raw.parse::<i64>() {
        Ok(n) => Value::Int(n),
        Err(_) => Value::string(raw.trim_matches('"')),
    }
}

pub struct ValidatorContext {
    pub catalog: Arc<Catalog>,
    pub permission: PermissionGate,
    pub symbols: SymbolTable,
    pub plan: Plan,
}

impl ValidatorContext {
    pub fn new(catalog: Arc<Catalog>, permission: PermissionGate) -> Self {
        ValidatorContext {
            catalog,
            permission,
            symbols: SymbolTable::new(),
            plan: Plan::new(),
        }
    }
}

/// Validate and lower a statement, returning the finished plan with its
/// root set to the last clause's output node.
pub fn validate(stmt: &Statement, space: &str, ctx: &mut ValidatorContext) -> Result<()> {
    ctx.permission.check_read(space)?;
    let root = match stmt {
        Statement::Pipeline(clauses) => validate_pipeline(clauses, space, ctx)?,
        Statement::InsertVertices(clause) => {
            ctx.permission.check_write(space)?;
            validate_insert_vertices(clause, space, ctx)?
        }
        Statement::InsertEdges(clause) => {
            ctx.permission.check_write(space)?;
            validate_insert_edges(clause, space, ctx)?
        }
        Statement::DeleteVertices(clause) => {
            ctx.permission.check_write(space)?;
            validate_delete_vertices(clause, space, ctx)?
        }
        Statement::DeleteEdges(clause) => {
            ctx.permission.check_write(space)?;
            validate_delete_edges(clause, space, ctx)?
        }
        Statement::CreateSpace(clause) => {
            ctx.permission.check_admin()?;
            ctx.plan.make(
                PlanKind::CreateSpace {
                    name: clause.name.clone(),
                    part_count: clause.part_count,
                },
                ctx.symbols.new_anon_var(),
                vec![],
            )
        }
    };
    ctx.plan.root = Some(root);
    Ok(())
}

fn validate_pipeline(clauses: &[Clause], space: &str, ctx: &mut ValidatorContext) -> Result<crate::plan::NodeId> {
    let start = ctx.plan.make(PlanKind::Start, "$-", vec![]);
    let mut current = SubPlan { root: start, tail: start };
    for clause in clauses {
        current = validate_clause(clause, space, current, ctx)?;
    }
    Ok(current.root)
}

fn validate_clause(
    clause: &Clause,
    space: &str,
    prev: SubPlan,
    ctx: &mut ValidatorContext,
) -> Result<SubPlan> {
    match clause {
        Clause::Go(go) => {
            let col_names = yield_col_names(&go.yields);
            check_no_duplicate_aliases(&col_names)?;
            let var = ctx.symbols.new_anon_var();
            let node = ctx.plan.make(
                PlanKind::GetNeighbors {
                    input: prev.root,
                    space: space.to_string(),
                    src_ids: go.src_vars.iter().map(|v| Expression::Constant(parse_id_literal(v))).collect(),
                    edge_types: go.edge_types.clone(),
                    vertex_props: vec![],
                    edge_props: vec![],
                    filter: go.filter.clone(),
                    limit: None,
                    direction: go.direction,
                },
                &var,
                col_names.clone(),
            );
            ctx.symbols.bind_writer(&var, col_names.clone(), node);
            let project = if go.yields.is_empty() {
                node
            } else {
                lower_project(&go.yields, node, ctx)?
            };
            Ok(SubPlan { root: project, tail: project })
        }
        Clause::FetchVertices(fetch) => {
            ctx.catalog.get_tag(space, &fetch.tag)?;
            let col_names = yield_col_names(&fetch.yields);
            check_no_duplicate_aliases(&col_names)?;
            let var = ctx.symbols.new_anon_var();
            let node = ctx.plan.make(
                PlanKind::GetVertices {
                    input: prev.root,
                    space: space.to_string(),
                    tag: fetch.tag.clone(),
                    ids: fetch.ids.clone(),
                    tag_props: vec![],
                },
                &var,
                col_names.clone(),
            );
            ctx.symbols.bind_writer(&var, col_names, node);
            let project = if fetch.yields.is_empty() { node } else { lower_project(&fetch.yields, node, ctx)? };
            Ok(SubPlan { root: project, tail: project })
        }
        Clause::FetchEdges(fetch) => {
            ctx.catalog.get_edge(space, &fetch.edge_type)?;
            let col_names = yield_col_names(&fetch.yields);
            check_no_duplicate_aliases(&col_names)?;
            let var = ctx.symbols.new_anon_var();
            let node = ctx.plan.make(
                PlanKind::GetEdges {
                    input: prev.root,
                    space: space.to_string(),
                    edge_type: fetch.edge_type.clone(),
                    ids: fetch.ids.clone(),
                    edge_props: vec![],
                },
                &var,
                col_names.clone(),
            );
            ctx.symbols.bind_writer(&var, col_names, node);
            let project = if fetch.yields.is_empty() { node } else { lower_project(&fetch.yields, node, ctx)? };
            Ok(SubPlan { root: project, tail: project })
        }
        Clause::Lookup(lookup) => {
            let owner = if lookup.is_edge {
                crate::catalog::IndexOwner::Edge
            } else {
                crate::catalog::IndexOwner::Tag
            };
            let columns = lookup
                .filter
                .as_ref()
                .map(filter_columns)
                .unwrap_or_default();
            let index = ctx
                .catalog
                .find_index_for_columns(space, owner, &lookup.owner_name, &columns)
                .ok_or_else(|| Error::IndexNotFound { name: lookup.owner_name.clone() })?;
            let col_names = yield_col_names(&lookup.yields);
            check_no_duplicate_aliases(&col_names)?;
            let var = ctx.symbols.new_anon_var();
            let node = ctx.plan.make(
                PlanKind::IndexScan {
                    space: space.to_string(),
                    index_name: index.name,
                    ranges: vec![],
                    limit: None,
                },
                &var,
                col_names.clone(),
            );
            ctx.symbols.bind_writer(&var, col_names, node);
            let project = if lookup.yields.is_empty() { node } else { lower_project(&lookup.yields, node, ctx)? };
            Ok(SubPlan { root: project, tail: project })
        }
        Clause::Filter(condition) => {
            check_vars_resolved(condition, ctx)?;
            let var = ctx.symbols.new_anon_var();
            let col_names = ctx.symbols.col_names(&prev_output_var(ctx, prev.root)).map(<[String]>::to_vec).unwrap_or_default();
            let need_stable = !condition.references_only_edge_or_src();
            let node = ctx.plan.make(
                PlanKind::Filter {
                    input: prev.root,
                    condition: condition.clone(),
                    need_stable,
                },
                &var,
                col_names.clone(),
            );
            ctx.symbols.bind_writer(&var, col_names, node);
            Ok(SubPlan { root: node, tail: node })
        }
        Clause::Yield(yields) => {
            let col_names = yield_col_names(yields);
            check_no_duplicate_aliases(&col_names)?;
            let node = lower_project(yields, prev.root, ctx)?;
            Ok(SubPlan { root: node, tail: node })
        }
        Clause::OrderBy(order) => {
            let col_names = ctx.plan.get(prev.root).col_names.clone();
            let order_by = resolve_order_columns(&order.columns, &col_names)?;
            let var = ctx.symbols.new_anon_var();
            let node = ctx.plan.make(
                PlanKind::OrderBy { input: prev.root, order_by },
                &var,
                col_names.clone(),
            );
            ctx.symbols.bind_writer(&var, col_names, node);
            Ok(SubPlan { root: node, tail: node })
        }
        Clause::Limit { offset, count } => {
            let col_names = ctx.plan.get(prev.root).col_names.clone();
            let var = ctx.symbols.new_anon_var();
            let node = ctx.plan.make(
                PlanKind::Limit { input: prev.root, offset: *offset, count: *count },
                &var,
                col_names.clone(),
            );
            ctx.symbols.bind_writer(&var, col_names, node);
            Ok(SubPlan { root: node, tail: node })
        }
        Clause::GroupBy { keys, aggregates } => {
            for key in keys {
                check_vars_resolved(key, ctx)?;
            }
            let mut col_names: Vec<String> = Vec::new();
            let mut aggs = Vec::new();
            for (func, expr, alias) in aggregates {
                check_vars_resolved(expr, ctx)?;
                col_names.push(alias.clone());
                aggs.push((func.clone(), expr.clone()));
            }
            check_no_duplicate_aliases(&col_names)?;
            let var = ctx.symbols.new_anon_var();
            let node = ctx.plan.make(
                PlanKind::Aggregate {
                    input: prev.root,
                    group_keys: keys.clone(),
                    aggregates: aggs,
                },
                &var,
                col_names.clone(),
            );
            ctx.symbols.bind_writer(&var, col_names, node);
            Ok(SubPlan { root: node, tail: node })
        }
    }
}

fn lower_project(yields: &[YieldColumn], input: crate::plan::NodeId, ctx: &mut ValidatorContext) -> Result<crate::plan::NodeId> {
    for y in yields {
        check_vars_resolved(&y.expr, ctx)?;
    }
    let col_names = yield_col_names(yields);
    let var = ctx.symbols.new_anon_var();
    let node = ctx.plan.make(
        PlanKind::Project {
            input,
            yields: yields.iter().map(|y| (y.alias.clone(), y.expr.clone())).collect(),
        },
        &var,
        col_names.clone(),
    );
    ctx.symbols.bind_writer(&var, col_names, node);
    Ok(node)
}

fn validate_insert_vertices(clause: &crate::ast::InsertVerticesClause, space: &str, ctx: &mut ValidatorContext) -> Result<crate::plan::NodeId> {
    let tag = ctx.catalog.get_tag(space, &clause.tag)?;
    if clause.prop_names.len() != tag.props.len() && !clause.prop_names.is_empty() {
        return Err(Error::TypeMismatch {
            expected: format!("{} properties for tag {}", tag.props.len(), clause.tag),
            found: clause.prop_names.len().to_string(),
        });
    }
    let input = ctx.plan.make(PlanKind::Start, ctx.symbols.new_anon_var(), vec![]);
    Ok(ctx.plan.make(
        PlanKind::InsertVertices {
            input,
            space: space.to_string(),
            tag: clause.tag.clone(),
            prop_names: clause.prop_names.clone(),
            rows: clause.rows.clone(),
            overwrite: clause.overwrite,
        },
        ctx.symbols.new_anon_var(),
        vec![],
    ))
}

fn validate_insert_edges(clause: &crate::ast::InsertEdgesClause, space: &str, ctx: &mut ValidatorContext) -> Result<crate::plan::NodeId> {
    ctx.catalog.get_edge(space, &clause.edge_type)?;
    let input = ctx.plan.make(PlanKind::Start, ctx.symbols.new_anon_var(), vec![]);
    Ok(ctx.plan.make(
        PlanKind::InsertEdges {
            input,
            space: space.to_string(),
            edge_type: clause.edge_type.clone(),
            prop_names: clause.prop_names.clone(),
            rows: clause.rows.clone(),
            overwrite: clause.overwrite,
        },
        ctx.symbols.new_anon_var(),
        vec![],
    ))
}

fn validate_delete_vertices(clause: &crate::ast::DeleteVerticesClause, space: &str, ctx: &mut ValidatorContext) -> Result<crate::plan::NodeId> {
    let input = ctx.plan.make(PlanKind::Start, ctx.symbols.new_anon_var(), vec![]);
    Ok(ctx.plan.make(
        PlanKind::DeleteVertices { input, space: space.to_string(), ids: clause.ids.clone() },
        ctx.symbols.new_anon_var(),
        vec![],
    ))
}

fn validate_delete_edges(clause: &crate::ast::DeleteEdgesClause, space: &str, ctx: &mut ValidatorContext) -> Result<crate::plan::NodeId> {
    ctx.catalog.get_edge(space, &clause.edge_type)?;
    let input = ctx.plan.make(PlanKind::Start, ctx.symbols.new_anon_var(), vec![]);
    Ok(ctx.plan.make(
        PlanKind::DeleteEdges {
            input,
            space: space.to_string(),
            edge_type: clause.edge_type.clone(),
            keys: clause.keys.clone(),
        },
        ctx.symbols.new_anon_var(),
        vec![],
    ))
}

fn yield_col_names(yields: &[YieldColumn]) -> Vec<String> {
    yields.iter().map(|y| y.alias.clone()).collect()
}

fn check_no_duplicate_aliases(col_names: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    for name in col_names {
        if !seen.insert(name) {
            return Err(Error::AmbiguousColumn { name: name.clone() });
        }
    }
    Ok(())
}

/// Walk an expression's variable references and confirm each has been
/// written somewhere upstream in the symbol table.
fn check_vars_resolved(expr: &Expression, ctx: &ValidatorContext) -> Result<()> {
    let mut vars = HashSet::new();
    expr.referenced_vars(&mut vars);
    for var in vars {
        if ctx.symbols.get(&var).is_none() {
            return Err(Error::SymbolNotFound { name: var });
        }
    }
    Ok(())
}

fn prev_output_var(ctx: &ValidatorContext, node: crate::plan::NodeId) -> String {
    ctx.plan.get(node).output_var.clone()
}

/// Columns an equality/conjunction filter touches, used to pick an index
/// whose key prefix matches (spec §4.4 `OptimizeTagIndexScanByFilter`).
fn filter_columns(expr: &Expression) -> Vec<String> {
    let mut cols = Vec::new();
    collect_filter_columns(expr, &mut cols);
    cols
}

fn collect_filter_columns(expr: &Expression, out: &mut Vec<String>) {
    match expr {
        Expression::VarProp { prop, .. } | Expression::InputProp(prop) => out.push(prop.clone()),
        Expression::Logical { left, right, .. } | Expression::Relational { left, right, .. } => {
            collect_filter_columns(left, out);
            collect_filter_columns(right, out);
        }
        _ => {}
    }
}

fn resolve_order_columns(columns: &[(String, crate::ast::OrderDirection)], col_names: &[String]) -> Result<Vec<(usize, crate::plan::SortOrder)>> {
    columns
        .iter()
        .map(|(name, dir)| {
            let idx = col_names
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| Error::SymbolNotFound { name: name.clone() })?;
            let order = match dir {
                crate::ast::OrderDirection::Asc => crate::plan::SortOrder::Asc,
                crate::ast::OrderDirection::Desc => crate::plan::SortOrder::Desc,
            };
            Ok((idx, order))
        })
        .collect()
}
