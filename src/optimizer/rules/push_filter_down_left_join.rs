//! Split a filter above a `LeftJoin` into the conjuncts that only touch
//! the left input's columns — those can run before the join, shrinking
//! its probe side — and the remainder, which must stay above since it may
//! reference right-side columns that don't exist for unmatched left rows
//! (spec §4.4 `PushFilterDownLeftJoin`).

use super::super::Rule;
use super::{conjuncts, only_references, rebuild_and};
use crate::catalog::Catalog;
use crate::plan::{NodeId, Plan, PlanKind};

pub struct PushFilterDownLeftJoin;

impl Rule for PushFilterDownLeftJoin {
    fn name(&self) -> &'static str {
        "PushFilterDownLeftJoin"
    }

    fn try_apply(&self, plan: &mut Plan, node_id: NodeId, _catalog: &Catalog) -> bool {
        let (join_id, condition) = match &plan.get(node_id).kind {
            PlanKind::Filter { input, condition, .. } => (*input, condition.clone()),
            _ => return false,
        };
        let (left, right, left_keys, right_keys) = match &plan.get(join_id).kind {
            PlanKind::LeftJoin { left, right, left_keys, right_keys } => {
                (*left, *right, left_keys.clone(), right_keys.clone())
            }
            _ => return false,
        };

        let left_cols = plan.get(left).col_names.clone();
        let parts = conjuncts(&condition);
        let (pushable, remaining): (Vec<_>, Vec<_>) = parts.into_iter().partition(|c| only_references(c, &left_cols));
        if pushable.is_empty() {
            return false;
        }

        let pushed_condition = rebuild_and(pushable).expect("partition guarantees at least one element");
        let new_left = plan.make(
            PlanKind::Filter {
                input: left,
                condition: pushed_condition,
                need_stable: true,
            },
            plan.get(left).output_var.clone(),
            left_cols,
        );
        let join_col_names = plan.get(join_id).col_names.clone();
        plan.replace(
            join_id,
            PlanKind::LeftJoin { left: new_left, right, left_keys, right_keys },
            join_col_names,
        );

        let outer_col_names = plan.get(node_id).col_names.clone();
        match rebuild_and(remaining) {
            Some(residual) => plan.replace(
                node_id,
                PlanKind::Filter { input: join_id, condition: residual, need_stable: true },
                outer_col_names,
            ),
            None => plan.replace(node_id, PlanKind::PassThrough { input: join_id }, outer_col_names),
        }
        true
    }
}
