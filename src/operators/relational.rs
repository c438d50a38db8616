//! Row-shaped operators that need no storage access (spec §4.8): Project,
//! Filter, Dedup, Limit, OrderBy, TopN, Aggregate. Each takes an
//! already-materialized input and returns a fresh `ExecResult`; Filter's
//! `need_stable` flag picks `erase`/`unstable_erase` the way
//! `original_source`'s `Filter` executor distinguishes an order-preserving
//! pass from one whose output feeds an unordered consumer (spec §4.7).

use super::OperatorContext;
use crate::expression::Expression;
use crate::iterator::RowIterator;
use crate::plan::result::ExecResult;
use crate::plan::{AggFunc, SortOrder};
use crate::value::{compare, DataSet, Row, Value};
use std::cmp::Ordering;
use std::collections::HashSet;

fn row_context<'a>(
    row: &'a Row,
    col_names: &'a [String],
    ctx: &'a OperatorContext,
) -> super::RowContext<'a> {
    super::RowContext::new(row, col_names, &ctx.parameters, &ctx.registry)
}

pub fn project(input: &ExecResult, out_col_names: &[String], yields: &[(String, Expression)], ctx: &OperatorContext) -> ExecResult {
    let mut out = DataSet::new(out_col_names.to_vec());
    for row in &input.dataset.rows {
        let rc = row_context(row, &input.dataset.col_names, ctx);
        let values = yields.iter().map(|(_, expr)| expr.eval(&rc)).collect();
        out.push_row(Row::new(values));
    }
    ExecResult { dataset: out, state: input.state, partial_errors: input.partial_errors.clone() }
}

pub fn filter(input: &ExecResult, condition: &Expression, need_stable: bool, ctx: &OperatorContext) -> ExecResult {
    let mut iter = RowIterator::sequential(input.dataset.clone());
    while iter.valid() {
        let keep = {
            let row = iter.row().expect("valid() guarantees a row");
            let rc = row_context(row, input.dataset.col_names.as_slice(), ctx);
            condition.eval(&rc).is_truthy()
        };
        if keep {
            iter.next();
        } else if need_stable {
            iter.erase();
        } else {
            iter.unstable_erase();
        }
    }
    let dataset = into_dataset(iter);
    ExecResult { dataset, state: input.state, partial_errors: input.partial_errors.clone() }
}

pub fn dedup(input: &ExecResult) -> ExecResult {
    let mut seen = HashSet::new();
    let mut out = DataSet::new(input.dataset.col_names.clone());
    for row in &input.dataset.rows {
        if seen.insert(row_key(row)) {
            out.push_row(row.clone());
        }
    }
    ExecResult { dataset: out, state: input.state, partial_errors: input.partial_errors.clone() }
}

pub fn limit(input: &ExecResult, offset: usize, count: usize) -> ExecResult {
    let mut out = DataSet::new(input.dataset.col_names.clone());
    for row in input.dataset.rows.iter().skip(offset).take(count) {
        out.push_row(row.clone());
    }
    ExecResult { dataset: out, state: input.state, partial_errors: input.partial_errors.clone() }
}

pub fn order_by(input: &ExecResult, order_by: &[(usize, SortOrder)]) -> ExecResult {
    let mut rows = input.dataset.rows.clone();
    rows.sort_by(|a, b| compare_rows(a, b, order_by));
    ExecResult {
        dataset: DataSet { col_names: input.dataset.col_names.clone(), rows },
        state: input.state,
        partial_errors: input.partial_errors.clone(),
    }
}

pub fn top_n(input: &ExecResult, order_by: &[(usize, SortOrder)], offset: usize, limit: usize) -> ExecResult {
    let mut rows = input.dataset.rows.clone();
    rows.sort_by(|a, b| compare_rows(a, b, order_by));
    let rows = rows.into_iter().skip(offset).take(limit).collect();
    ExecResult {
        dataset: DataSet { col_names: input.dataset.col_names.clone(), rows },
        state: input.state,
        partial_errors: input.partial_errors.clone(),
    }
}

pub fn aggregate(
    input: &ExecResult,
    out_col_names: &[String],
    group_keys: &[Expression],
    aggregates: &[(AggFunc, Expression)],
    ctx: &OperatorContext,
) -> ExecResult {
    let mut groups: Vec<(Vec<Value>, Vec<Value>)> = Vec::new();
    for row in &input.dataset.rows {
        let rc = row_context(row, &input.dataset.col_names, ctx);
        let key: Vec<Value> = group_keys.iter().map(|e| e.eval(&rc)).collect();
        let agg_inputs: Vec<Value> = aggregates.iter().map(|(_, e)| e.eval(&rc)).collect();
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, acc)) => fold_into(acc, &agg_inputs, aggregates),
            None => {
                let mut acc = vec![Value::null(); aggregates.len()];
                fold_into(&mut acc, &agg_inputs, aggregates);
                groups.push((key, acc));
            }
        }
    }
    let mut out = DataSet::new(out_col_names.to_vec());
    for (key, acc) in groups {
        let mut values = key;
        values.extend(acc);
        out.push_row(Row::new(values));
    }
    ExecResult { dataset: out, state: input.state, partial_errors: input.partial_errors.clone() }
}

/// Seed/accumulate one row's contribution into a group's running
/// aggregates. `Collect` accumulates into a `Value::List`; the rest start
/// from `Null` and widen on first non-null input (matching
/// `value::arithmetic`'s int/float widening for Sum/Avg).
fn fold_into(acc: &mut [Value], inputs: &[Value], aggregates: &[(AggFunc, Expression)]) {
    for (i, (func, _)) in aggregates.iter().enumerate() {
        let input = &inputs[i];
        acc[i] = match func {
            AggFunc::Count => match &acc[i] {
                Value::Int(n) => Value::Int(n + 1),
                _ => Value::Int(1),
            },
            AggFunc::Sum => crate::value::arithmetic(crate::value::ArithOp::Add, &acc[i].clone().or_zero(), input),
            AggFunc::Min => min_value(&acc[i], input),
            AggFunc::Max => max_value(&acc[i], input),
            AggFunc::Avg => {
                // stash running (sum, count) as a 2-element list, materialize on read
                avg_step(&acc[i], input)
            }
            AggFunc::Collect => match acc[i].clone() {
                Value::List(items) => {
                    let mut v = (*items).clone();
                    v.push(input.clone());
                    Value::List(std::sync::Arc::new(v))
                }
                _ => Value::List(std::sync::Arc::new(vec![input.clone()])),
            },
        };
    }
    // Avg needs a finalize pass since we stash (sum,count) while accumulating;
    // done lazily below so intermediate folds stay O(1) per row.
    for (i, (func, _)) in aggregates.iter().enumerate() {
        if matches!(func, AggFunc::Avg) {
            acc[i] = finalize_avg(&acc[i]);
        }
    }
}

trait OrZero {
    fn or_zero(self) -> Value;
}
impl OrZero for Value {
    fn or_zero(self) -> Value {
        if self.is_null() {
            Value::Int(0)
        } else {
            self
        }
    }
}

fn min_value(acc: &Value, input: &Value) -> Value {
    if acc.is_null() {
        return input.clone();
    }
    if input.is_null() {
        return acc.clone();
    }
    if compare(input, acc) == Ordering::Less {
        input.clone()
    } else {
        acc.clone()
    }
}

fn max_value(acc: &Value, input: &Value) -> Value {
    if acc.is_null() {
        return input.clone();
    }
    if input.is_null() {
        return acc.clone();
    }
    if compare(input, acc) == Ordering::Greater {
        input.clone()
    } else {
        acc.clone()
    }
}

/// Running average is carried as a 2-element `List([sum, count])` between
/// folds and only unpacked into a scalar by `finalize_avg`.
fn avg_step(acc: &Value, input: &Value) -> Value {
    let (sum, count) = match acc {
        Value::List(items) if items.len() == 2 => (items[0].clone(), items[1].clone()),
        _ => (Value::Int(0), Value::Int(0)),
    };
    if input.is_null() {
        return Value::List(std::sync::Arc::new(vec![sum, count]));
    }
    let new_sum = crate::value::arithmetic(crate::value::ArithOp::Add, &sum, input);
    let new_count = match count {
        Value::Int(n) => Value::Int(n + 1),
        _ => Value::Int(1),
    };
    Value::List(std::sync::Arc::new(vec![new_sum, new_count]))
}

fn finalize_avg(acc: &Value) -> Value {
    match acc {
        Value::List(items) if items.len() == 2 => {
            crate::value::arithmetic(crate::value::ArithOp::Div, &items[0], &items[1])
        }
        other => other.clone(),
    }
}

fn compare_rows(a: &Row, b: &Row, order_by: &[(usize, SortOrder)]) -> Ordering {
    for (col, order) in order_by {
        let av = a.get(*col).cloned().unwrap_or(Value::null());
        let bv = b.get(*col).cloned().unwrap_or(Value::null());
        let ord = compare(&av, &bv);
        let ord = match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn row_key(row: &Row) -> Vec<u8> {
    // Dedup only needs equality, not a total order; hashing Debug output is
    // adequate here since rows are small and this isn't on the query's
    // critical path for index selection.
    format!("{row:?}").into_bytes()
}

fn into_dataset(mut iter: RowIterator) -> DataSet {
    iter.reset();
    let col_names = iter.col_names().to_vec();
    let mut ds = DataSet::new(col_names);
    while iter.valid() {
        ds.push_row(iter.row().expect("valid() guarantees a row").clone());
        iter.next();
    }
    ds
}
