//! # Expression engine (spec §3, §4.1, component C2)
//!
//! A tree of typed expression nodes, evaluated against an
//! [`ExpressionContext`]. Expressions are immutable after construction; a
//! [`rewrite`](Expression::rewrite) pass visits the tree bottom-up and
//! returns a new tree — used by the optimizer to push predicates across
//! variable boundaries (e.g. `$a.prop` → `$-.prop` once `$a` is rebound to
//! the pipe variable by a rewrite rule).
//!
//! Logical `AND`/`OR` short-circuit; `XOR` always evaluates both operands
//! (spec §4.1). Relational comparisons use `Value`'s total order and yield
//! a typed null on incomparable kinds. `TypeCast` never panics: on failure
//! it returns `Null(BadType)`.

mod context;
mod display;
mod encode;
mod registry;
mod rewrite;

pub use context::ExpressionContext;
pub use registry::FunctionRegistry;
pub use rewrite::{Rewriter, SubstituteColumns};

use crate::value::{arithmetic as value_arithmetic, compare, ArithOp, NullVariant, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
    Xor,
}

/// Target type for `TypeCast` (spec §3: bool, int64, float64, string, date,
/// time, datetime among others).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CastKind {
    Bool,
    Int,
    Float,
    String,
}

/// A node in the expression tree (spec §3 "Expression").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Constant(Value),
    /// `$var` — reference to a whole named variable's current row value.
    Var(String),
    /// `$var.prop` — a property lookup on a bound variable.
    VarProp { var: String, prop: String },
    /// `$-.prop` — a property lookup on the pipe-input row.
    InputProp(String),
    /// `$^.prop` — a property on the traversal's source vertex.
    SrcProp(String),
    /// `$$.prop` — a property on the traversal's destination vertex.
    DstProp(String),
    /// `edge.prop` — a property on the current edge.
    EdgeProp(String),
    EdgeRank,
    EdgeType,
    EdgeSrc,
    EdgeDst,
    FunctionCall(String, Vec<Expression>),
    TypeCast(CastKind, Box<Expression>),
    Unary(UnaryOp, Box<Expression>),
    Arithmetic {
        op: ArithOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Relational {
        op: RelOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Uuid,
    Parameter(String),
}

impl Expression {
    /// Evaluate this expression against `ctx`. Never panics; every failure
    /// mode (unresolved symbol, bad cast, division by zero) is a typed
    /// null per spec §3/§4.1.
    pub fn eval(&self, ctx: &dyn ExpressionContext) -> Value {
        match self {
            Expression::Constant(v) => v.clone(),
            Expression::Var(name) => ctx.get_var(name),
            Expression::VarProp { var, prop } => ctx.get_var_prop(var, prop),
            Expression::InputProp(prop) => ctx.get_input_prop(prop),
            Expression::SrcProp(prop) => ctx.get_src_prop(prop),
            Expression::DstProp(prop) => ctx.get_dst_prop(prop),
            Expression::EdgeProp(prop) => ctx.get_edge_prop(prop),
            Expression::EdgeRank => ctx.get_edge_rank(),
            Expression::EdgeType => ctx.get_edge_type(),
            Expression::EdgeSrc => ctx.get_edge_src(),
            Expression::EdgeDst => ctx.get_edge_dst(),
            Expression::FunctionCall(name, args) => {
                let values: Vec<Value> = args.iter().map(|a| a.eval(ctx)).collect();
                ctx.call_function(name, &values)
            }
            Expression::TypeCast(kind, expr) => cast(*kind, expr.eval(ctx)),
            Expression::Unary(op, expr) => eval_unary(*op, expr.eval(ctx)),
            Expression::Arithmetic { op, left, right } => {
                value_arithmetic(*op, &left.eval(ctx), &right.eval(ctx))
            }
            Expression::Relational { op, left, right } => {
                eval_relational(*op, &left.eval(ctx), &right.eval(ctx))
            }
            Expression::Logical { op, left, right } => eval_logical(*op, left, right, ctx),
            Expression::Uuid => Value::string(uuid::Uuid::new_v4().to_string()),
            Expression::Parameter(name) => ctx.get_parameter(name),
        }
    }

    /// Visit every node, replacing it where `f` returns `Some`. Bottom-up:
    /// children are rewritten before the parent is offered to `f`, so a
    /// rule rewriting `$a.prop` to `$-.prop` sees already-rewritten children
    /// when it inspects a compound node.
    pub fn rewrite(&self, f: &dyn Fn(&Expression) -> Option<Expression>) -> Expression {
        let rewritten_children = match self {
            Expression::FunctionCall(name, args) => Expression::FunctionCall(
                name.clone(),
                args.iter().map(|a| a.rewrite(f)).collect(),
            ),
            Expression::TypeCast(kind, expr) => {
                Expression::TypeCast(*kind, Box::new(expr.rewrite(f)))
            }
            Expression::Unary(op, expr) => Expression::Unary(*op, Box::new(expr.rewrite(f))),
            Expression::Arithmetic { op, left, right } => Expression::Arithmetic {
                op: *op,
                left: Box::new(left.rewrite(f)),
                right: Box::new(right.rewrite(f)),
            },
            Expression::Relational { op, left, right } => Expression::Relational {
                op: *op,
                left: Box::new(left.rewrite(f)),
                right: Box::new(right.rewrite(f)),
            },
            Expression::Logical { op, left, right } => Expression::Logical {
                op: *op,
                left: Box::new(left.rewrite(f)),
                right: Box::new(right.rewrite(f)),
            },
            other => other.clone(),
        };
        f(&rewritten_children).unwrap_or(rewritten_children)
    }

    /// Whether evaluating this expression twice is guaranteed to produce
    /// the same value — used by `CollapseProject` to refuse substituting
    /// an inner yield into more than one outer reference when it isn't.
    /// `Uuid` is the only nondeterministic leaf today; a `FunctionCall` is
    /// conservatively treated as nondeterministic too, since the registry
    /// can hold impure functions the optimizer has no visibility into.
    pub fn is_deterministic(&self) -> bool {
        match self {
            Expression::Uuid | Expression::FunctionCall(..) => false,
            Expression::Constant(_)
            | Expression::Var(_)
            | Expression::VarProp { .. }
            | Expression::InputProp(_)
            | Expression::SrcProp(_)
            | Expression::DstProp(_)
            | Expression::EdgeProp(_)
            | Expression::EdgeRank
            | Expression::EdgeType
            | Expression::EdgeSrc
            | Expression::EdgeDst
            | Expression::Parameter(_) => true,
            Expression::TypeCast(_, e) | Expression::Unary(_, e) => e.is_deterministic(),
            Expression::Arithmetic { left, right, .. }
            | Expression::Relational { left, right, .. }
            | Expression::Logical { left, right, .. } => left.is_deterministic() && right.is_deterministic(),
        }
    }

    /// Whether this expression references only edge/src properties (no
    /// `$-`/input-row or other-variable references) — used by
    /// `PushFilterDownGetNeighbors` to decide a predicate is safe to push.
    pub fn references_only_edge_or_src(&self) -> bool {
        match self {
            Expression::Constant(_)
            | Expression::EdgeProp(_)
            | Expression::EdgeRank
            | Expression::EdgeType
            | Expression::EdgeSrc
            | Expression::EdgeDst
            | Expression::SrcProp(_)
            | Expression::Uuid
            | Expression::Parameter(_) => true,
            Expression::Var(_)
            | Expression::VarProp { .. }
            | Expression::InputProp(_)
            | Expression::DstProp(_) => false,
            Expression::FunctionCall(_, args) => {
                args.iter().all(Expression::references_only_edge_or_src)
            }
            Expression::TypeCast(_, e) | Expression::Unary(_, e) => {
                e.references_only_edge_or_src()
            }
            Expression::Arithmetic { left, right, .. }
            | Expression::Relational { left, right, .. }
            | Expression::Logical { left, right, .. } => {
                left.references_only_edge_or_src() && right.references_only_edge_or_src()
            }
        }
    }

    /// The set of `$var` / `$var.prop` variable names this expression
    /// reads — used by `PushFilterDownLeftJoin` to split a predicate into
    /// left-only / right-only / mixed terms.
    pub fn referenced_vars(&self, out: &mut std::collections::HashSet<String>) {
        match self {
            Expression::Var(name) | Expression::VarProp { var: name, .. } => {
                out.insert(name.clone());
            }
            Expression::FunctionCall(_, args) => {
                args.iter().for_each(|a| a.referenced_vars(out));
            }
            Expression::TypeCast(_, e) | Expression::Unary(_, e) => e.referenced_vars(out),
            Expression::Arithmetic { left, right, .. }
            | Expression::Relational { left, right, .. }
            | Expression::Logical { left, right, .. } => {
                left.referenced_vars(out);
                right.referenced_vars(out);
            }
            _ => {}
        }
    }
}

fn cast(kind: CastKind, v: Value) -> Value {
    if v.is_null() {
        return v;
    }
    match (kind, &v) {
        (CastKind::Bool, Value::Bool(_)) => v,
        (CastKind::Int, Value::Int(_)) => v,
        (CastKind::Float, Value::Float(_)) => v,
        (CastKind::String, Value::String(_)) => v,
        (CastKind::Bool, Value::Int(i)) => Value::Bool(*i != 0),
        (CastKind::Bool, Value::String(s)) => match s.as_ref() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::bad_type(),
        },
        (CastKind::Int, Value::Float(f)) => Value::Int(*f as i64),
        (CastKind::Int, Value::String(s)) => s
            .parse::<i64>()
            .map(Value::Int)
            .unwrap_or_else(|_| Value::bad_type()),
        (CastKind::Float, Value::Int(i)) => Value::Float(*i as f64),
        (CastKind::Float, Value::String(s)) => s
            .parse::<f64>()
            .map(Value::Float)
            .unwrap_or_else(|_| Value::bad_type()),
        (CastKind::String, Value::Int(i)) => Value::string(i.to_string()),
        (CastKind::String, Value::Float(f)) => Value::string(f.to_string()),
        (CastKind::String, Value::Bool(b)) => Value::string(b.to_string()),
        _ => Value::bad_type(),
    }
}

fn eval_unary(op: UnaryOp, v: Value) -> Value {
    match (op, &v) {
        (UnaryOp::IsNull, _) => Value::Bool(v.is_null()),
        (UnaryOp::IsNotNull, _) => Value::Bool(!v.is_null()),
        (UnaryOp::Not, Value::Bool(b)) => Value::Bool(!b),
        (UnaryOp::Neg, Value::Int(i)) => Value::Int(-i),
        (UnaryOp::Neg, Value::Float(f)) => Value::Float(-f),
        (UnaryOp::Not, _) | (UnaryOp::Neg, _) if v.is_null() => v,
        _ => Value::bad_type(),
    }
}

fn eval_relational(op: RelOp, a: &Value, b: &Value) -> Value {
    if a.is_null() || b.is_null() {
        return Value::Null(NullVariant::Normal);
    }
    if !same_comparable_family(a, b) {
        return Value::Null(NullVariant::BadType);
    }
    let ord = compare(a, b);
    Value::Bool(match op {
        RelOp::Eq => ord == Ordering::Equal,
        RelOp::Ne => ord != Ordering::Equal,
        RelOp::Lt => ord == Ordering::Less,
        RelOp::Le => ord != Ordering::Greater,
        RelOp::Gt => ord == Ordering::Greater,
        RelOp::Ge => ord != Ordering::Less,
    })
}

fn same_comparable_family(a: &Value, b: &Value) -> bool {
    use Value::*;
    matches!(
        (a, b),
        (Int(_), Int(_))
            | (Float(_), Float(_))
            | (Int(_), Float(_))
            | (Float(_), Int(_))
            | (String(_), String(_))
            | (Bool(_), Bool(_))
            | (Date(_), Date(_))
            | (Time(_), Time(_))
            | (DateTime(_), DateTime(_))
    )
}

fn eval_logical(
    op: LogicalOp,
    left: &Expression,
    right: &Expression,
    ctx: &dyn ExpressionContext,
) -> Value {
    match op {
        LogicalOp::And => {
            let l = left.eval(ctx);
            if matches!(l, Value::Bool(false)) {
                return Value::Bool(false);
            }
            let r = right.eval(ctx);
            if matches!(r, Value::Bool(false)) {
                return Value::Bool(false);
            }
            if l.is_null() || r.is_null() {
                return Value::Null(NullVariant::Normal);
            }
            Value::Bool(l.is_truthy() && r.is_truthy())
        }
        LogicalOp::Or => {
            let l = left.eval(ctx);
            if matches!(l, Value::Bool(true)) {
                return Value::Bool(true);
            }
            let r = right.eval(ctx);
            if matches!(r, Value::Bool(true)) {
                return Value::Bool(true);
            }
            if l.is_null() || r.is_null() {
                return Value::Null(NullVariant::Normal);
            }
            Value::Bool(l.is_truthy() || r.is_truthy())
        }
        LogicalOp::Xor => {
            // XOR always evaluates both operands (spec §4.1: no short-circuit).
            let l = left.eval(ctx);
            let r = right.eval(ctx);
            if l.is_null() || r.is_null() {
                return Value::Null(NullVariant::Normal);
            }
            Value::Bool(l.is_truthy() ^ r.is_truthy())
        }
    }
}
