mod collapse_project;
mod index_full_scan;
mod optimize_tag_index_scan_by_filter;
mod push_filter_down_aggregate;
mod push_filter_down_get_neighbors;
mod push_filter_down_left_join;
mod push_topn_down_index_range_scan;

pub use collapse_project::CollapseProject;
pub use index_full_scan::IndexFullScan;
pub use optimize_tag_index_scan_by_filter::OptimizeTagIndexScanByFilter;
pub use push_filter_down_aggregate::PushFilterDownAggregate;
pub use push_filter_down_get_neighbors::PushFilterDownGetNeighbors;
pub use push_filter_down_left_join::PushFilterDownLeftJoin;
pub use push_topn_down_index_range_scan::PushTopNDownIndexRangeScan;

use crate::expression::{Expression, LogicalOp};
use std::collections::HashSet;

/// Flatten an `AND` tree into its leaf conjuncts (depth-first, left to
/// right). A non-`AND` expression is its own single-element flattening.
pub(super) fn conjuncts(expr: &Expression) -> Vec<Expression> {
    match expr {
        Expression::Logical { op: LogicalOp::And, left, right } => {
            let mut out = conjuncts(left);
            out.extend(conjuncts(right));
            out
        }
        other => vec![other.clone()],
    }
}

/// Fold conjuncts back into a single `AND` tree; `None` if the list is empty.
pub(super) fn rebuild_and(mut exprs: Vec<Expression>) -> Option<Expression> {
    let first = exprs.pop()?;
    exprs.into_iter().rev().fold(Some(first), |acc, e| {
        acc.map(|a| Expression::Logical {
            op: LogicalOp::And,
            left: Box::new(e),
            right: Box::new(a),
        })
    })
}

/// Column/var names an expression touches, treating `VarProp`/`InputProp`
/// uniformly as "named column" references (spec §4.4 push-down rules only
/// need to know which columns a predicate depends on, not which access
/// path produced them).
pub(super) fn referenced_columns(expr: &Expression, out: &mut HashSet<String>) {
    match expr {
        Expression::VarProp { prop, .. } | Expression::InputProp(prop) => {
            out.insert(prop.clone());
        }
        Expression::Unary(_, inner) | Expression::TypeCast(_, inner) => referenced_columns(inner, out),
        Expression::Logical { left, right, .. }
        | Expression::Relational { left, right, .. }
        | Expression::Arithmetic { left, right, .. } => {
            referenced_columns(left, out);
            referenced_columns(right, out);
        }
        Expression::FunctionCall(_, args) => {
            for a in args {
                referenced_columns(a, out);
            }
        }
        _ => {}
    }
}

pub(super) fn only_references(expr: &Expression, allowed: &[String]) -> bool {
    let allowed: HashSet<&str> = allowed.iter().map(String::as_str).collect();
    let mut used = HashSet::new();
    referenced_columns(expr, &mut used);
    used.iter().all(|c| allowed.contains(c.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::RelOp;
    use crate::value::Value;

    fn prop(name: &str) -> Expression {
        Expression::InputProp(name.to_string())
    }

    #[test]
    fn conjuncts_flattens_nested_and() {
        let expr = Expression::Logical {
            op: LogicalOp::And,
            left: Box::new(Expression::Relational {
                op: RelOp::Gt,
                left: Box::new(prop("age")),
                right: Box::new(Expression::Constant(Value::Int(18))),
            }),
            right: Box::new(Expression::Relational {
                op: RelOp::Eq,
                left: Box::new(prop("city")),
                right: Box::new(Expression::Constant(Value::String("NYC".into()))),
            }),
        };
        assert_eq!(conjuncts(&expr).len(), 2);
    }

    #[test]
    fn only_references_respects_allowed_columns() {
        let expr = Expression::Relational {
            op: RelOp::Eq,
            left: Box::new(prop("age")),
            right: Box::new(Expression::Constant(Value::Int(1))),
        };
        assert!(only_references(&expr, &["age".to_string()]));
        assert!(!only_references(&expr, &["city".to_string()]));
    }
}
