//! Generic row evaluation context (spec §4.1/§4.8): the same
//! `ExpressionContext` impl backs Project/Filter/Aggregate/OrderBy/join-key
//! evaluation and `GetNeighbors`' pushed-down edge filter, since every one
//! of those just needs "look this column up in the current row".
//!
//! `Var`/`VarProp` resolve exactly like `InputProp` here — a column lookup
//! by name in the current row — rather than chasing a separate variable
//! binding. This crate's clause-pipeline AST never produces a plan where
//! `$var.prop` and `$-.prop` diverge (there is no cross-statement variable
//! scope), so the distinction the original grammar makes between them
//! collapses to the same lookup once the validator has lowered a clause.

use crate::expression::ExpressionContext;
use crate::value::{Row, Value};
use std::collections::HashMap;

pub struct RowContext<'a> {
    row: &'a Row,
    col_names: &'a [String],
    parameters: &'a HashMap<String, Value>,
    registry: &'a crate::expression::FunctionRegistry,
}

impl<'a> RowContext<'a> {
    pub fn new(
        row: &'a Row,
        col_names: &'a [String],
        parameters: &'a HashMap<String, Value>,
        registry: &'a crate::expression::FunctionRegistry,
    ) -> Self {
        RowContext { row, col_names, parameters, registry }
    }

    fn column(&self, name: &str) -> Value {
        self.col_names
            .iter()
            .position(|c| c == name)
            .and_then(|idx| self.row.get(idx))
            .cloned()
            .unwrap_or(Value::null())
    }
}

impl ExpressionContext for RowContext<'_> {
    fn get_var(&self, name: &str) -> Value {
        self.column(name)
    }

    fn get_var_prop(&self, _var: &str, prop: &str) -> Value {
        self.column(prop)
    }

    fn get_input_prop(&self, prop: &str) -> Value {
        self.column(prop)
    }

    fn get_src_prop(&self, prop: &str) -> Value {
        self.column(&format!("src.{prop}"))
    }

    fn get_dst_prop(&self, prop: &str) -> Value {
        self.column(&format!("dst.{prop}"))
    }

    fn get_edge_prop(&self, prop: &str) -> Value {
        self.column(prop)
    }

    fn get_edge_rank(&self) -> Value {
        self.column("rank")
    }

    fn get_edge_type(&self) -> Value {
        self.column("edge_type")
    }

    fn get_edge_src(&self) -> Value {
        self.column("src")
    }

    fn get_edge_dst(&self) -> Value {
        self.column("dst")
    }

    fn get_parameter(&self, name: &str) -> Value {
        self.parameters.get(name).cloned().unwrap_or(Value::null())
    }

    fn call_function(&self, name: &str, args: &[Value]) -> Value {
        self.registry.call(name, args)
    }
}
