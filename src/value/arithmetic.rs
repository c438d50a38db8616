//! Arithmetic on `Value` (spec §3): int+float widens to float, any
//! arithmetic touching null yields a typed null, division by zero yields
//! `NullVariant::DivByZero`, and overflow yields `NullVariant::Overflow`.

use super::{NullVariant, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Evaluate `lhs op rhs`. Never panics: every failure mode is a typed null.
pub fn arithmetic(op: ArithOp, lhs: &Value, rhs: &Value) -> Value {
    if lhs.is_null() || rhs.is_null() {
        return Value::Null(NullVariant::Normal);
    }
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => int_arith(op, *a, *b),
        (Value::Float(a), Value::Int(b)) => float_arith(op, *a, *b as f64),
        (Value::Int(a), Value::Float(b)) => float_arith(op, *a as f64, *b),
        (Value::Float(a), Value::Float(b)) => float_arith(op, *a, *b),
        (Value::String(a), Value::String(b)) if op == ArithOp::Add => {
            Value::string(format!("{a}{b}"))
        }
        _ => Value::bad_type(),
    }
}

fn int_arith(op: ArithOp, a: i64, b: i64) -> Value {
    match op {
        ArithOp::Add => a
            .checked_add(b)
            .map(Value::Int)
            .unwrap_or(Value::Null(NullVariant::Overflow)),
        ArithOp::Sub => a
            .checked_sub(b)
            .map(Value::Int)
            .unwrap_or(Value::Null(NullVariant::Overflow)),
        ArithOp::Mul => a
            .checked_mul(b)
            .map(Value::Int)
            .unwrap_or(Value::Null(NullVariant::Overflow)),
        ArithOp::Div => {
            if b == 0 {
                Value::Null(NullVariant::DivByZero)
            } else {
                a.checked_div(b)
                    .map(Value::Int)
                    .unwrap_or(Value::Null(NullVariant::Overflow))
            }
        }
        ArithOp::Mod => {
            if b == 0 {
                Value::Null(NullVariant::DivByZero)
            } else {
                Value::Int(a % b)
            }
        }
    }
}

fn float_arith(op: ArithOp, a: f64, b: f64) -> Value {
    let result = match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => {
            if b == 0.0 {
                return Value::Null(NullVariant::DivByZero);
            }
            a / b
        }
        ArithOp::Mod => {
            if b == 0.0 {
                return Value::Null(NullVariant::DivByZero);
            }
            a % b
        }
    };
    if result.is_nan() {
        Value::Null(NullVariant::NaN)
    } else if result.is_infinite() {
        Value::Null(NullVariant::Overflow)
    } else {
        Value::Float(result)
    }
}
