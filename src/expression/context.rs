//! Evaluation context contract (spec §4.1): `eval(ctx)` reads through this
//! trait rather than touching global state, so an expression can be
//! evaluated against a plain row (tests), a live operator's current
//! row/iterator (executor), or a partial-binding context (optimizer
//! constant-folding) uniformly.

use crate::value::Value;

pub trait ExpressionContext {
    fn get_var(&self, name: &str) -> Value;
    fn get_var_prop(&self, var: &str, prop: &str) -> Value;
    fn get_input_prop(&self, prop: &str) -> Value;
    fn get_src_prop(&self, prop: &str) -> Value;
    fn get_dst_prop(&self, prop: &str) -> Value;
    fn get_edge_prop(&self, prop: &str) -> Value;
    fn get_edge_rank(&self) -> Value;
    fn get_edge_type(&self) -> Value;
    fn get_edge_src(&self) -> Value;
    fn get_edge_dst(&self) -> Value;
    fn get_parameter(&self, name: &str) -> Value;
    fn call_function(&self, name: &str, args: &[Value]) -> Value;
}
