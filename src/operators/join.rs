//! Set and join operators (spec §4.8): InnerJoin/LeftJoin build a hash
//! table on the smaller side the way `original_source`'s `HashInnerJoin`/
//! `HashLeftJoin` executors do; Union/Intersect/Minus are set-wise over
//! rows and require every input to share the same column-name vector
//! (spec §4.8 "Union/Intersect/Minus require identical column-name
//! vectors across inputs").

use super::OperatorContext;
use crate::error::{Error, Result};
use crate::expression::Expression;
use crate::plan::result::ExecResult;
use crate::value::{DataSet, Row, Value};
use std::collections::{HashMap, HashSet};

fn row_key(row: &Row) -> String {
    format!("{row:?}")
}

fn key_of(row: &Row, col_names: &[String], keys: &[Expression], ctx: &OperatorContext) -> Vec<Value> {
    let rc = super::RowContext::new(row, col_names, &ctx.parameters, &ctx.registry);
    keys.iter().map(|k| k.eval(&rc)).collect()
}

pub fn inner_join(
    left: &ExecResult,
    right: &ExecResult,
    left_keys: &[Expression],
    right_keys: &[Expression],
    ctx: &OperatorContext,
) -> ExecResult {
    let (build, probe, build_keys, probe_keys, build_is_left) =
        if left.dataset.len() <= right.dataset.len() {
            (left, right, left_keys, right_keys, true)
        } else {
            (right, left, right_keys, left_keys, false)
        };

    let mut table: HashMap<Vec<Value>, Vec<&Row>> = HashMap::new();
    for row in &build.dataset.rows {
        let key = key_of(row, &build.dataset.col_names, build_keys, ctx);
        table.entry(key).or_default().push(row);
    }

    let mut col_names = left.dataset.col_names.clone();
    col_names.extend(right.dataset.col_names.clone());
    let mut out = DataSet::new(col_names);
    for probe_row in &probe.dataset.rows {
        let key = key_of(probe_row, &probe.dataset.col_names, probe_keys, ctx);
        if let Some(matches) = table.get(&key) {
            for build_row in matches {
                let row = if build_is_left { (*build_row).concat(probe_row) } else { probe_row.concat(build_row) };
                out.push_row(row);
            }
        }
    }
    merge_state(out, &[left, right])
}

pub fn left_join(
    left: &ExecResult,
    right: &ExecResult,
    left_keys: &[Expression],
    right_keys: &[Expression],
    ctx: &OperatorContext,
) -> ExecResult {
    let mut table: HashMap<Vec<Value>, Vec<&Row>> = HashMap::new();
    for row in &right.dataset.rows {
        let key = key_of(row, &right.dataset.col_names, right_keys, ctx);
        table.entry(key).or_default().push(row);
    }

    let mut col_names = left.dataset.col_names.clone();
    col_names.extend(right.dataset.col_names.clone());
    let mut out = DataSet::new(col_names);
    let right_arity = right.dataset.col_names.len();
    for left_row in &left.dataset.rows {
        let key = key_of(left_row, &left.dataset.col_names, left_keys, ctx);
        match table.get(&key) {
            Some(matches) if !matches.is_empty() => {
                for right_row in matches {
                    out.push_row(left_row.concat(right_row));
                }
            }
            _ => {
                let nulls = Row::new(vec![Value::null(); right_arity]);
                out.push_row(left_row.concat(&nulls));
            }
        }
    }
    merge_state(out, &[left, right])
}

pub fn cartesian_product(inputs: &[ExecResult]) -> ExecResult {
    let mut col_names = Vec::new();
    for input in inputs {
        col_names.extend(input.dataset.col_names.clone());
    }
    let mut rows = vec![Row::new(vec![])];
    for input in inputs {
        let mut next = Vec::with_capacity(rows.len() * input.dataset.len().max(1));
        for prefix in &rows {
            for row in &input.dataset.rows {
                next.push(prefix.concat(row));
            }
        }
        rows = next;
    }
    let mut out = DataSet::new(col_names);
    out.rows = rows;
    merge_state(out, &inputs.iter().collect::<Vec<_>>())
}

pub fn union(inputs: &[ExecResult], out_col_names: &[String]) -> Result<ExecResult> {
    check_same_columns(inputs)?;
    let mut out = DataSet::new(out_col_names.to_vec());
    for input in inputs {
        out.rows.extend(input.dataset.rows.iter().cloned());
    }
    Ok(merge_state(out, &inputs.iter().collect::<Vec<_>>()))
}

pub fn intersect(inputs: &[ExecResult], out_col_names: &[String]) -> Result<ExecResult> {
    check_same_columns(inputs)?;
    let mut out = DataSet::new(out_col_names.to_vec());
    if let Some((first, rest)) = inputs.split_first() {
        let rest_keys: Vec<HashSet<String>> =
            rest.iter().map(|r| r.dataset.rows.iter().map(row_key).collect()).collect();
        for row in &first.dataset.rows {
            let key = row_key(row);
            if rest_keys.iter().all(|keys| keys.contains(&key)) {
                out.push_row(row.clone());
            }
        }
    }
    Ok(merge_state(out, &inputs.iter().collect::<Vec<_>>()))
}

pub fn minus(left: &ExecResult, right: &ExecResult, out_col_names: &[String]) -> Result<ExecResult> {
    check_same_columns(&[left.clone(), right.clone()])?;
    let right_keys: HashSet<String> = right.dataset.rows.iter().map(row_key).collect();
    let mut out = DataSet::new(out_col_names.to_vec());
    for row in &left.dataset.rows {
        if !right_keys.contains(&row_key(row)) {
            out.push_row(row.clone());
        }
    }
    Ok(merge_state(out, &[left, right]))
}

fn check_same_columns(inputs: &[ExecResult]) -> Result<()> {
    if let Some((first, rest)) = inputs.split_first() {
        for other in rest {
            if other.dataset.col_names != first.dataset.col_names {
                return Err(Error::TypeMismatch {
                    expected: first.dataset.col_names.join(","),
                    found: other.dataset.col_names.join(","),
                });
            }
        }
    }
    Ok(())
}

fn merge_state(dataset: DataSet, inputs: &[&ExecResult]) -> ExecResult {
    let mut errors = Vec::new();
    let mut all_ok = true;
    for input in inputs {
        if !input.is_ok() {
            all_ok = false;
            errors.extend(input.partial_errors.clone());
        }
    }
    if all_ok {
        ExecResult::ok(dataset)
    } else {
        ExecResult::partial(dataset, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::storage::InMemoryStorageClient;
    use std::sync::Arc;

    fn ctx() -> OperatorContext {
        let catalog = Arc::new(Catalog::new());
        let storage = Arc::new(InMemoryStorageClient::new(Arc::clone(&catalog), Default::default()));
        OperatorContext::new(catalog, storage)
    }

    fn dataset(col: &str, values: &[i64]) -> ExecResult {
        let mut ds = DataSet::new(vec![col.to_string()]);
        for v in values {
            ds.push_row(Row::new(vec![Value::Int(*v)]));
        }
        ExecResult::ok(ds)
    }

    #[test]
    fn inner_join_matches_on_equal_keys() {
        let left = dataset("id", &[1, 2, 3]);
        let right = dataset("id", &[2, 3, 4]);
        let keys = vec![Expression::InputProp("id".into())];
        let result = inner_join(&left, &right, &keys, &keys, &ctx());
        assert_eq!(result.dataset.len(), 2);
    }

    #[test]
    fn left_join_null_pads_unmatched_left_rows() {
        let left = dataset("id", &[1, 2]);
        let right = dataset("id", &[2]);
        let keys = vec![Expression::InputProp("id".into())];
        let result = left_join(&left, &right, &keys, &keys, &ctx());
        assert_eq!(result.dataset.len(), 2);
        let unmatched = result.dataset.rows.iter().find(|r| r.get(0) == Some(&Value::Int(1))).unwrap();
        assert!(unmatched.get(1).unwrap().is_null());
    }

    #[test]
    fn union_requires_identical_column_vectors() {
        let left = dataset("id", &[1]);
        let mut mismatched = DataSet::new(vec!["other".into()]);
        mismatched.push_row(Row::new(vec![Value::Int(2)]));
        let right = ExecResult::ok(mismatched);
        assert!(union(&[left, right], &["id".into()]).is_err());
    }

    #[test]
    fn minus_removes_rows_present_on_the_right() {
        let left = dataset("id", &[1, 2, 3]);
        let right = dataset("id", &[2]);
        let result = minus(&left, &right, &["id".into()]).unwrap();
        assert_eq!(result.dataset.len(), 2);
    }
}
