//! Narrow an `IndexScan`'s key range using equality/comparison conjuncts
//! from a filter sitting directly above it (spec §4.4
//! `OptimizeTagIndexScanByFilter`) — once a conjunct is folded into a
//! range it no longer needs to be re-checked row by row.

use super::super::Rule;
use super::conjuncts;
use super::rebuild_and;
use crate::catalog::Catalog;
use crate::expression::{Expression, RelOp};
use crate::plan::{IndexRange, NodeId, Plan, PlanKind};
use crate::value::Value;

pub struct OptimizeTagIndexScanByFilter;

impl Rule for OptimizeTagIndexScanByFilter {
    fn name(&self) -> &'static str {
        "OptimizeTagIndexScanByFilter"
    }

    fn try_apply(&self, plan: &mut Plan, node_id: NodeId, catalog: &Catalog) -> bool {
        let (idx_id, condition) = match &plan.get(node_id).kind {
            PlanKind::Filter { input, condition, .. } => (*input, condition.clone()),
            _ => return false,
        };
        let (space, index_name, existing_ranges, limit) = match &plan.get(idx_id).kind {
            PlanKind::IndexScan { space, index_name, ranges, limit } if ranges.is_empty() => {
                (space.clone(), index_name.clone(), ranges.clone(), *limit)
            }
            _ => return false,
        };
        let Ok(index) = catalog.get_index(&space, &index_name) else { return false };

        let parts = conjuncts(&condition);
        let mut new_ranges: Vec<IndexRange> = existing_ranges;
        let mut remaining = Vec::new();
        for part in parts {
            match range_from_conjunct(&part, &index.columns) {
                Some(range) => new_ranges.push(range),
                None => remaining.push(part),
            }
        }
        if new_ranges.is_empty() {
            return false;
        }

        let idx_col_names = plan.get(idx_id).col_names.clone();
        plan.replace(
            idx_id,
            PlanKind::IndexScan { space, index_name, ranges: new_ranges, limit },
            idx_col_names,
        );
        let outer_col_names = plan.get(node_id).col_names.clone();
        match rebuild_and(remaining) {
            Some(residual) => plan.replace(
                node_id,
                PlanKind::Filter { input: idx_id, condition: residual, need_stable: true },
                outer_col_names,
            ),
            None => plan.replace(node_id, PlanKind::PassThrough { input: idx_id }, outer_col_names),
        }
        true
    }
}

/// Turn a single comparison conjunct into an `IndexRange` if it compares
/// one of the index's columns against a constant.
fn range_from_conjunct(expr: &Expression, index_columns: &[String]) -> Option<IndexRange> {
    let Expression::Relational { op, left, right } = expr else { return None };
    let (column, value, flipped) = match (left.as_ref(), right.as_ref()) {
        (Expression::InputProp(name), Expression::Constant(v)) if index_columns.iter().any(|c| c == name) => {
            (name.clone(), v.clone(), false)
        }
        (Expression::Constant(v), Expression::InputProp(name)) if index_columns.iter().any(|c| c == name) => {
            (name.clone(), v.clone(), true)
        }
        _ => return None,
    };
    let op = if flipped { flip(*op) } else { *op };
    Some(match op {
        RelOp::Eq => IndexRange {
            column,
            lower: Some(value.clone()),
            upper: Some(value),
            lower_inclusive: true,
            upper_inclusive: true,
        },
        RelOp::Gt => IndexRange { column, lower: Some(value), upper: None, lower_inclusive: false, upper_inclusive: true },
        RelOp::Ge => IndexRange { column, lower: Some(value), upper: None, lower_inclusive: true, upper_inclusive: true },
        RelOp::Lt => IndexRange { column, lower: None, upper: Some(value), lower_inclusive: true, upper_inclusive: false },
        RelOp::Le => IndexRange { column, lower: None, upper: Some(value), lower_inclusive: true, upper_inclusive: true },
        RelOp::Ne => return None,
    })
}

fn flip(op: RelOp) -> RelOp {
    match op {
        RelOp::Gt => RelOp::Lt,
        RelOp::Ge => RelOp::Le,
        RelOp::Lt => RelOp::Gt,
        RelOp::Le => RelOp::Ge,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{IndexOwner, IndexSchema, SpaceSchema};

    fn catalog_with_index() -> Catalog {
        let catalog = Catalog::new();
        let mut space = SpaceSchema::new("sg", 1, 4);
        space.indexes.insert(
            "by_age".into(),
            IndexSchema {
                name: "by_age".into(),
                id: 1,
                owner: IndexOwner::Tag,
                owner_name: "Person".into(),
                columns: vec!["age".into()],
            },
        );
        catalog.refresh(vec![space]);
        catalog
    }

    #[test]
    fn narrows_equality_conjunct_into_an_index_range() {
        let mut plan = Plan::new();
        let idx = plan.make(
            PlanKind::IndexScan { space: "sg".into(), index_name: "by_age".into(), ranges: vec![], limit: None },
            "$idx",
            vec!["age".into()],
        );
        let condition = Expression::Relational {
            op: RelOp::Eq,
            left: Box::new(Expression::InputProp("age".into())),
            right: Box::new(Expression::Constant(Value::Int(30))),
        };
        let filter = plan.make(
            PlanKind::Filter { input: idx, condition, need_stable: true },
            "$f",
            vec!["age".into()],
        );
        let catalog = catalog_with_index();
        assert!(OptimizeTagIndexScanByFilter.try_apply(&mut plan, filter, &catalog));
        assert_eq!(plan.get(filter).kind_name(), "PassThrough");
        match &plan.get(idx).kind {
            PlanKind::IndexScan { ranges, .. } => assert_eq!(ranges.len(), 1),
            _ => panic!("expected IndexScan"),
        }
    }
}
