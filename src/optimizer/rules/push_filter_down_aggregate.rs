//! Push a filter on a group-by key below the `Aggregate` that produced it
//! (spec §4.4 `PushFilterDownAggregate`) — filtering rows before grouping
//! is always equivalent to filtering groups by the same key afterwards,
//! and it shrinks what the aggregate has to sum/count over. A predicate
//! that touches an aggregate's own output (a `HAVING`-style clause) is
//! left alone: that can only be evaluated after grouping.

use super::super::Rule;
use super::{conjuncts, rebuild_and};
use crate::catalog::Catalog;
use crate::expression::Expression;
use crate::plan::{NodeId, Plan, PlanKind};
use std::collections::HashMap;

pub struct PushFilterDownAggregate;

impl Rule for PushFilterDownAggregate {
    fn name(&self) -> &'static str {
        "PushFilterDownAggregate"
    }

    fn try_apply(&self, plan: &mut Plan, node_id: NodeId, _catalog: &Catalog) -> bool {
        let (agg_id, condition) = match &plan.get(node_id).kind {
            PlanKind::Filter { input, condition, .. } => (*input, condition.clone()),
            _ => return false,
        };
        let (agg_input, group_keys, aggregates, agg_col_names) = match &plan.get(agg_id).kind {
            PlanKind::Aggregate { input, group_keys, aggregates, .. } => {
                (*input, group_keys.clone(), aggregates.clone(), plan.get(agg_id).col_names.clone())
            }
            _ => return false,
        };
        // The aggregate's output columns are ordered group keys followed by
        // aggregate aliases; only the first `group_keys.len()` are simple
        // pass-throughs we can rewrite back into the pre-aggregation space.
        let group_cols: HashMap<&str, &Expression> = agg_col_names
            .iter()
            .take(group_keys.len())
            .map(String::as_str)
            .zip(group_keys.iter())
            .collect();

        let parts = conjuncts(&condition);
        let mut pushable = Vec::new();
        let mut remaining = Vec::new();
        for part in parts {
            match rebind_to_group_key(&part, &group_cols) {
                Some(rebound) => pushable.push(rebound),
                None => remaining.push(part),
            }
        }
        if pushable.is_empty() {
            return false;
        }

        let pushed_condition = rebuild_and(pushable).expect("non-empty by construction");
        let new_input = plan.make(
            PlanKind::Filter { input: agg_input, condition: pushed_condition, need_stable: true },
            plan.get(agg_input).output_var.clone(),
            plan.get(agg_input).col_names.clone(),
        );
        plan.replace(
            agg_id,
            PlanKind::Aggregate { input: new_input, group_keys, aggregates },
            agg_col_names,
        );

        let outer_col_names = plan.get(node_id).col_names.clone();
        match rebuild_and(remaining) {
            Some(residual) => plan.replace(
                node_id,
                PlanKind::Filter { input: agg_id, condition: residual, need_stable: true },
                outer_col_names,
            ),
            None => plan.replace(node_id, PlanKind::PassThrough { input: agg_id }, outer_col_names),
        }
        true
    }
}

/// Rewrite every reference to a group-by output column into the
/// pre-aggregation expression that produced it. Returns `None` if `expr`
/// references anything outside the group-key columns (an aggregate alias,
/// for instance), since that can't be evaluated before grouping.
fn rebind_to_group_key(expr: &Expression, group_cols: &HashMap<&str, &Expression>) -> Option<Expression> {
    match expr {
        Expression::InputProp(name) => group_cols.get(name.as_str()).map(|e| (*e).clone()),
        Expression::Logical { op, left, right } => Some(Expression::Logical {
            op: *op,
            left: Box::new(rebind_to_group_key(left, group_cols)?),
            right: Box::new(rebind_to_group_key(right, group_cols)?),
        }),
        Expression::Relational { op, left, right } => Some(Expression::Relational {
            op: *op,
            left: Box::new(rebind_to_group_key(left, group_cols)?),
            right: Box::new(rebind_to_group_key(right, group_cols)?),
        }),
        Expression::Arithmetic { op, left, right } => Some(Expression::Arithmetic {
            op: *op,
            left: Box::new(rebind_to_group_key(left, group_cols)?),
            right: Box::new(rebind_to_group_key(right, group_cols)?),
        }),
        Expression::Constant(_) | Expression::Parameter(_) | Expression::Uuid => Some(expr.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::RelOp;
    use crate::plan::AggFunc;
    use crate::value::Value;

    #[test]
    fn pushes_filter_on_group_key_below_aggregate() {
        let mut plan = Plan::new();
        let start = plan.make(PlanKind::Start, "$-", vec!["city".into(), "age".into()]);
        let agg = plan.make(
            PlanKind::Aggregate {
                input: start,
                group_keys: vec![Expression::InputProp("city".into())],
                aggregates: vec![(AggFunc::Count, Expression::InputProp("age".into()))],
            },
            "$agg",
            vec!["city".into(), "cnt".into()],
        );
        let condition = Expression::Relational {
            op: RelOp::Eq,
            left: Box::new(Expression::InputProp("city".into())),
            right: Box::new(Expression::Constant(Value::String("NYC".into()))),
        };
        let filter = plan.make(
            PlanKind::Filter { input: agg, condition, need_stable: true },
            "$f",
            vec!["city".into(), "cnt".into()],
        );
        let catalog = Catalog::new();
        assert!(PushFilterDownAggregate.try_apply(&mut plan, filter, &catalog));
        assert_eq!(plan.get(filter).kind_name(), "PassThrough");
        match &plan.get(agg).kind {
            PlanKind::Aggregate { input, .. } => assert_ne!(*input, start),
            _ => panic!("expected Aggregate"),
        }
    }

    #[test]
    fn does_not_push_filter_on_aggregate_output() {
        let mut plan = Plan::new();
        let start = plan.make(PlanKind::Start, "$-", vec!["city".into()]);
        let agg = plan.make(
            PlanKind::Aggregate {
                input: start,
                group_keys: vec![Expression::InputProp("city".into())],
                aggregates: vec![(AggFunc::Count, Expression::InputProp("city".into()))],
            },
            "$agg",
            vec!["city".into(), "cnt".into()],
        );
        let condition = Expression::Relational {
            op: RelOp::Gt,
            left: Box::new(Expression::InputProp("cnt".into())),
            right: Box::new(Expression::Constant(Value::Int(1))),
        };
        let filter = plan.make(
            PlanKind::Filter { input: agg, condition, need_stable: true },
            "$f",
            vec!["city".into(), "cnt".into()],
        );
        let catalog = Catalog::new();
        assert!(!PushFilterDownAggregate.try_apply(&mut plan, filter, &catalog));
    }
}
