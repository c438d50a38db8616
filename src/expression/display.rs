//! Human-readable `toString` for every expression kind (spec §9 open
//! question: "TypeCasting.toString ... unimplemented in the source; the
//! rewrite must implement ... human-readable toString for all kinds").

use super::{CastKind, Expression, LogicalOp, RelOp, UnaryOp};
use std::fmt;

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(v) => write!(f, "{v:?}"),
            Expression::Var(name) => write!(f, "${name}"),
            Expression::VarProp { var, prop } => write!(f, "${var}.{prop}"),
            Expression::InputProp(prop) => write!(f, "$-.{prop}"),
            Expression::SrcProp(prop) => write!(f, "$^.{prop}"),
            Expression::DstProp(prop) => write!(f, "$$.{prop}"),
            Expression::EdgeProp(prop) => write!(f, "edge.{prop}"),
            Expression::EdgeRank => write!(f, "edge._rank"),
            Expression::EdgeType => write!(f, "edge._type"),
            Expression::EdgeSrc => write!(f, "edge._src"),
            Expression::EdgeDst => write!(f, "edge._dst"),
            Expression::FunctionCall(name, args) => {
                write!(f, "{name}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
            Expression::TypeCast(kind, expr) => write!(f, "({}){expr}", cast_name(*kind)),
            Expression::Unary(op, expr) => write!(f, "{}{expr}", unary_symbol(*op)),
            Expression::Arithmetic { op, left, right } => {
                write!(f, "({left} {} {right})", arith_symbol(*op))
            }
            Expression::Relational { op, left, right } => {
                write!(f, "({left} {} {right})", rel_symbol(*op))
            }
            Expression::Logical { op, left, right } => {
                write!(f, "({left} {} {right})", logical_symbol(*op))
            }
            Expression::Uuid => write!(f, "uuid()"),
            Expression::Parameter(name) => write!(f, "${{{name}}}"),
        }
    }
}

fn cast_name(kind: CastKind) -> &'static str {
    match kind {
        CastKind::Bool => "BOOL",
        CastKind::Int => "INT64",
        CastKind::Float => "FLOAT64",
        CastKind::String => "STRING",
    }
}

fn unary_symbol(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Not => "!",
        UnaryOp::Neg => "-",
        UnaryOp::IsNull => "is_null ",
        UnaryOp::IsNotNull => "is_not_null ",
    }
}

fn arith_symbol(op: crate::value::ArithOp) -> &'static str {
    use crate::value::ArithOp;
    match op {
        ArithOp::Add => "+",
        ArithOp::Sub => "-",
        ArithOp::Mul => "*",
        ArithOp::Div => "/",
        ArithOp::Mod => "%",
    }
}

fn rel_symbol(op: RelOp) -> &'static str {
    match op {
        RelOp::Eq => "==",
        RelOp::Ne => "!=",
        RelOp::Lt => "<",
        RelOp::Le => "<=",
        RelOp::Gt => ">",
        RelOp::Ge => ">=",
    }
}

fn logical_symbol(op: LogicalOp) -> &'static str {
    match op {
        LogicalOp::And => "AND",
        LogicalOp::Or => "OR",
        LogicalOp::Xor => "XOR",
    }
}
