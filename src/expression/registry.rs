//! Name → implementation function registry (spec §4.1: "the engine does
//! not itself define the math/string/time library [...] registered
//! externally"). A small built-in set is registered by default so the
//! validator/executor have something to dispatch to in tests; the full
//! library is explicitly out of scope.

use crate::value::{NullVariant, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub type BuiltinFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

#[derive(Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, BuiltinFn>,
}

impl FunctionRegistry {
    pub fn empty() -> Self {
        FunctionRegistry {
            functions: HashMap::new(),
        }
    }

    /// Register or replace a function implementation under `name`.
    pub fn register(&mut self, name: impl Into<String>, f: BuiltinFn) {
        self.functions.insert(name.into(), f);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Dispatch `name(args)`. An unregistered name returns `Null(Unknown)`
    /// rather than panicking, matching the engine's "never throws" eval
    /// contract.
    pub fn call(&self, name: &str, args: &[Value]) -> Value {
        match self.functions.get(name) {
            Some(f) => f(args),
            None => Value::Null(NullVariant::Unknown),
        }
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        let mut registry = FunctionRegistry::empty();

        registry.register(
            "abs",
            Arc::new(|args| match args.first() {
                Some(Value::Int(i)) => Value::Int(i.abs()),
                Some(Value::Float(f)) => Value::Float(f.abs()),
                _ => Value::bad_type(),
            }),
        );

        registry.register(
            "length",
            Arc::new(|args| match args.first() {
                Some(Value::String(s)) => Value::Int(s.chars().count() as i64),
                Some(Value::List(l)) | Some(Value::Set(l)) => Value::Int(l.len() as i64),
                _ => Value::bad_type(),
            }),
        );

        registry.register(
            "concat",
            Arc::new(|args| {
                let mut out = String::new();
                for a in args {
                    match a {
                        Value::String(s) => out.push_str(s),
                        other if other.is_null() => return Value::Null(NullVariant::Normal),
                        _ => return Value::bad_type(),
                    }
                }
                Value::string(out)
            }),
        );

        registry.register(
            "coalesce",
            Arc::new(|args| {
                args.iter()
                    .find(|v| !v.is_null())
                    .cloned()
                    .unwrap_or(Value::null())
            }),
        );

        registry
    }
}
