//! Push a filter through a `GetNeighbors` when the predicate only touches
//! the edge or source-vertex columns (spec §4.4
//! `PushFilterDownGetNeighbors`) — those are known before the step's RPC
//! fans out, so the storage layer can discard non-matching edges instead
//! of shipping them home first. Uses
//! `Expression::references_only_edge_or_src` (spec §3) as the guard.

use super::super::Rule;
use crate::catalog::Catalog;
use crate::expression::{Expression, LogicalOp};
use crate::plan::{NodeId, Plan, PlanKind};

pub struct PushFilterDownGetNeighbors;

impl Rule for PushFilterDownGetNeighbors {
    fn name(&self) -> &'static str {
        "PushFilterDownGetNeighbors"
    }

    fn try_apply(&self, plan: &mut Plan, node_id: NodeId, _catalog: &Catalog) -> bool {
        let (input, condition) = match &plan.get(node_id).kind {
            PlanKind::Filter { input, condition, .. } => (*input, condition.clone()),
            _ => return false,
        };
        if !condition.references_only_edge_or_src() {
            return false;
        }
        let gn = match &plan.get(input).kind {
            PlanKind::GetNeighbors { .. } => plan.get(input).kind.clone(),
            _ => return false,
        };
        let (gn_input, space, src_ids, edge_types, vertex_props, edge_props, existing_filter, limit, direction) = match gn {
            PlanKind::GetNeighbors {
                input,
                space,
                src_ids,
                edge_types,
                vertex_props,
                edge_props,
                filter,
                limit,
                direction,
            } => (input, space, src_ids, edge_types, vertex_props, edge_props, filter, limit, direction),
            _ => unreachable!(),
        };

        let merged = match existing_filter {
            Some(existing) => Expression::Logical {
                op: LogicalOp::And,
                left: Box::new(existing),
                right: Box::new(condition),
            },
            None => condition,
        };
        let input_col_names = plan.get(input).col_names.clone();
        plan.replace(
            input,
            PlanKind::GetNeighbors {
                input: gn_input,
                space,
                src_ids,
                edge_types,
                vertex_props,
                edge_props,
                filter: Some(merged),
                limit,
                direction,
            },
            input_col_names,
        );
        let outer_col_names = plan.get(node_id).col_names.clone();
        plan.replace(node_id, PlanKind::PassThrough { input }, outer_col_names);
        true
    }
}
