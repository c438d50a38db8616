//! Collapse two adjacent `Project` nodes into one by substituting the
//! inner project's yields into the outer's expressions (spec §4.4
//! `CollapseProject`, §8 scenario 1). Grounded in `original_source`'s
//! `CollapseProjectRule`, which fires on the same `Project -> Project`
//! shape to avoid materializing an intermediate row twice.

use super::super::Rule;
use crate::catalog::Catalog;
use crate::expression::{Expression, Rewriter, SubstituteColumns};
use crate::plan::{NodeId, Plan, PlanKind};
use std::collections::HashMap;

pub struct CollapseProject;

/// Counts `Var(name)`/`InputProp(name)` occurrences in `expr` — used to
/// tell whether collapsing would duplicate a reference to a non-idempotent
/// inner yield (spec §4.4 "no inter-reference used more than once").
fn count_references(expr: &Expression, name: &str) -> usize {
    match expr {
        Expression::Var(n) | Expression::InputProp(n) => usize::from(n == name),
        Expression::FunctionCall(_, args) => args.iter().map(|a| count_references(a, name)).sum(),
        Expression::TypeCast(_, e) | Expression::Unary(_, e) => count_references(e, name),
        Expression::Arithmetic { left, right, .. }
        | Expression::Relational { left, right, .. }
        | Expression::Logical { left, right, .. } => count_references(left, name) + count_references(right, name),
        _ => 0,
    }
}

impl Rule for CollapseProject {
    fn name(&self) -> &'static str {
        "CollapseProject"
    }

    fn try_apply(&self, plan: &mut Plan, node_id: NodeId, _catalog: &Catalog) -> bool {
        let (inner_id, outer_yields) = match &plan.get(node_id).kind {
            PlanKind::Project { input, yields } => (*input, yields.clone()),
            _ => return false,
        };
        let (inner_input, inner_yields) = match &plan.get(inner_id).kind {
            PlanKind::Project { input, yields } => (*input, yields.clone()),
            _ => return false,
        };

        // Refuse to collapse if a non-idempotent inner yield (e.g. `uuid()`)
        // would end up evaluated more than once — the uncollapsed plan
        // materializes it exactly once and every downstream read sees that
        // single value; duplicating the call into each outer reference
        // would let them diverge.
        let total_references = |name: &str| -> usize {
            outer_yields.iter().map(|(_, expr)| count_references(expr, name)).sum()
        };
        for (name, expr) in &inner_yields {
            if !expr.is_deterministic() && total_references(name) > 1 {
                return false;
            }
        }

        let columns: HashMap<String, Expression> = inner_yields.into_iter().collect();
        let substitute = SubstituteColumns { columns: &columns };
        let composed: Vec<(String, Expression)> =
            outer_yields.iter().map(|(alias, expr)| (alias.clone(), substitute.apply(expr))).collect();

        let col_names: Vec<String> = composed.iter().map(|(a, _)| a.clone()).collect();
        plan.replace(
            node_id,
            PlanKind::Project {
                input: inner_input,
                yields: composed,
            },
            col_names,
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn collapses_outer_project_that_only_renames_inner_columns() {
        let mut plan = Plan::new();
        let start = plan.make(PlanKind::Start, "$-", vec![]);
        let inner = plan.make(
            PlanKind::Project {
                input: start,
                yields: vec![("age".into(), Expression::Constant(Value::Int(1)))],
            },
            "$inner",
            vec!["age".into()],
        );
        let outer = plan.make(
            PlanKind::Project {
                input: inner,
                yields: vec![("a".into(), Expression::InputProp("age".into()))],
            },
            "$outer",
            vec!["a".into()],
        );
        let catalog = Catalog::new();
        assert!(CollapseProject.try_apply(&mut plan, outer, &catalog));
        match &plan.get(outer).kind {
            PlanKind::Project { input, yields } => {
                assert_eq!(*input, start);
                assert_eq!(yields[0].0, "a");
            }
            _ => panic!("expected Project"),
        }
    }

    #[test]
    fn collapses_by_substituting_inner_expression_into_outer_arithmetic() {
        // Spec §8 scenario 1: Project[a1=$v.age+1, b1=$v] -> Project[a2=$a1+1, b2=$b1]
        // collapses to a single Project yielding a2=$v.age+1+1, b2=$v.
        let mut plan = Plan::new();
        let start = plan.make(PlanKind::Start, "$-", vec!["v".into()]);
        let inner = plan.make(
            PlanKind::Project {
                input: start,
                yields: vec![
                    (
                        "a1".into(),
                        Expression::Arithmetic {
                            op: crate::value::ArithOp::Add,
                            left: Box::new(Expression::VarProp { var: "v".into(), prop: "age".into() }),
                            right: Box::new(Expression::Constant(Value::Int(1))),
                        },
                    ),
                    ("b1".into(), Expression::Var("v".into())),
                ],
            },
            "$inner",
            vec!["a1".into(), "b1".into()],
        );
        let outer = plan.make(
            PlanKind::Project {
                input: inner,
                yields: vec![
                    (
                        "a2".into(),
                        Expression::Arithmetic {
                            op: crate::value::ArithOp::Add,
                            left: Box::new(Expression::InputProp("a1".into())),
                            right: Box::new(Expression::Constant(Value::Int(1))),
                        },
                    ),
                    ("b2".into(), Expression::InputProp("b1".into())),
                ],
            },
            "$outer",
            vec!["a2".into(), "b2".into()],
        );
        let catalog = Catalog::new();
        assert!(CollapseProject.try_apply(&mut plan, outer, &catalog));
        match &plan.get(outer).kind {
            PlanKind::Project { input, yields } => {
                assert_eq!(*input, start);
                assert_eq!(yields[0].0, "a2");
                match &yields[0].1 {
                    Expression::Arithmetic { left, .. } => match left.as_ref() {
                        Expression::Arithmetic { .. } => {}
                        other => panic!("expected nested arithmetic, got {other:?}"),
                    },
                    other => panic!("expected arithmetic, got {other:?}"),
                }
                assert_eq!(yields[1].1, Expression::Var("v".into()));
            }
            _ => panic!("expected Project"),
        }
    }

    #[test]
    fn refuses_to_collapse_when_a_nondeterministic_inner_yield_is_referenced_more_than_once() {
        // inner: b1 = uuid(); outer: b2 = $b1, c2 = $b1. Collapsing would
        // turn the one uuid() call into two independent calls.
        let mut plan = Plan::new();
        let start = plan.make(PlanKind::Start, "$-", vec![]);
        let inner = plan.make(
            PlanKind::Project {
                input: start,
                yields: vec![("b1".into(), Expression::Uuid)],
            },
            "$inner",
            vec!["b1".into()],
        );
        let outer = plan.make(
            PlanKind::Project {
                input: inner,
                yields: vec![
                    ("b2".into(), Expression::InputProp("b1".into())),
                    ("c2".into(), Expression::InputProp("b1".into())),
                ],
            },
            "$outer",
            vec!["b2".into(), "c2".into()],
        );
        let catalog = Catalog::new();
        assert!(!CollapseProject.try_apply(&mut plan, outer, &catalog));
        match &plan.get(outer).kind {
            PlanKind::Project { input, yields } => {
                assert_eq!(*input, inner);
                assert_eq!(yields.len(), 2);
            }
            _ => panic!("expected Project, plan should be unmodified"),
        }
    }

    #[test]
    fn still_collapses_a_nondeterministic_inner_yield_referenced_only_once() {
        let mut plan = Plan::new();
        let start = plan.make(PlanKind::Start, "$-", vec![]);
        let inner = plan.make(
            PlanKind::Project {
                input: start,
                yields: vec![("b1".into(), Expression::Uuid)],
            },
            "$inner",
            vec!["b1".into()],
        );
        let outer = plan.make(
            PlanKind::Project {
                input: inner,
                yields: vec![("b2".into(), Expression::InputProp("b1".into()))],
            },
            "$outer",
            vec!["b2".into()],
        );
        let catalog = Catalog::new();
        assert!(CollapseProject.try_apply(&mut plan, outer, &catalog));
        match &plan.get(outer).kind {
            PlanKind::Project { input, yields } => {
                assert_eq!(*input, start);
                assert_eq!(yields[0].1, Expression::Uuid);
            }
            _ => panic!("expected Project"),
        }
    }
}
