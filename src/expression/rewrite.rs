//! A named, reusable rewrite pass over an `Expression` tree. `Expression`
//! already exposes `rewrite(&self, f)` for ad-hoc closures; `Rewriter` lets
//! the optimizer register a handful of named passes (e.g. "rebind `$a` to
//! the pipe variable") and compose them.

use super::Expression;
use std::collections::HashMap;

pub trait Rewriter {
    /// Return `Some(replacement)` to substitute this node, or `None` to
    /// keep it (after its children have already been rewritten).
    fn rewrite_node(&self, expr: &Expression) -> Option<Expression>;

    fn apply(&self, expr: &Expression) -> Expression
    where
        Self: Sized,
    {
        expr.rewrite(&|e| self.rewrite_node(e))
    }
}

/// Rebinds every `VarProp { var, .. }` matching `from` to an `InputProp`,
/// used by `PushFilterDownGetNeighbors`/`PushFilterDownAggregate` once the
/// filter is relocated below the node that produced `from`.
pub struct RebindVarToInput {
    pub from: String,
}

impl Rewriter for RebindVarToInput {
    fn rewrite_node(&self, expr: &Expression) -> Option<Expression> {
        match expr {
            Expression::VarProp { var, prop } if *var == self.from => {
                Some(Expression::InputProp(prop.clone()))
            }
            Expression::Var(var) if *var == self.from => {
                Some(Expression::InputProp(String::new()))
            }
            _ => None,
        }
    }
}

/// Replaces each `Var`/`InputProp` whose name has a binding in `columns`
/// with the bound expression — used by `CollapseProject` to compose an
/// outer `Project`'s yields with the inner `Project` they read from
/// (spec §4.4, §8 scenario 1).
pub struct SubstituteColumns<'a> {
    pub columns: &'a HashMap<String, Expression>,
}

impl Rewriter for SubstituteColumns<'_> {
    fn rewrite_node(&self, expr: &Expression) -> Option<Expression> {
        match expr {
            Expression::Var(name) | Expression::InputProp(name) => self.columns.get(name).cloned(),
            _ => None,
        }
    }
}
