//! Total order over `Value` (spec §3): lexicographic by kind rank, then by
//! value within a kind. Graph/composite kinds (vertex, edge, path, list,
//! map, set, dataset) compare structurally field-by-field; nulls are always
//! least within their own kind-slot and compare equal to each other
//! regardless of sub-kind (the sub-kind only affects equality/display, not
//! ordering, per the original source's `Value::operator<`).

use super::{DataSet, Value};
use std::cmp::Ordering;

pub fn compare(a: &Value, b: &Value) -> Ordering {
    let rank_cmp = a.kind_rank().cmp(&b.kind_rank());
    if rank_cmp != Ordering::Equal {
        return rank_cmp;
    }
    match (a, b) {
        (Value::Null(_), Value::Null(_)) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        (Value::Time(x), Value::Time(y)) => x.cmp(y),
        (Value::DateTime(x), Value::DateTime(y)) => x.cmp(y),
        (Value::Vertex(x), Value::Vertex(y)) => compare(&x.id, &y.id),
        (Value::Edge(x), Value::Edge(y)) => compare(&x.src, &y.src)
            .then_with(|| x.edge_type.cmp(&y.edge_type))
            .then_with(|| x.rank.cmp(&y.rank))
            .then_with(|| compare(&x.dst, &y.dst)),
        (Value::Path(x), Value::Path(y)) => x.length().cmp(&y.length()),
        (Value::List(x), Value::Set(y)) | (Value::Set(x), Value::List(y)) => {
            compare_seq(x, y)
        }
        (Value::List(x), Value::List(y)) | (Value::Set(x), Value::Set(y)) => compare_seq(x, y),
        (Value::Map(x), Value::Map(y)) => x
            .iter()
            .zip(y.iter())
            .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| compare(va, vb)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::DataSet(x), Value::DataSet(y)) => compare_dataset(x, y),
        _ => Ordering::Equal,
    }
}

fn compare_seq(x: &[Value], y: &[Value]) -> Ordering {
    x.iter()
        .zip(y.iter())
        .map(|(a, b)| compare(a, b))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or_else(|| x.len().cmp(&y.len()))
}

fn compare_dataset(x: &DataSet, y: &DataSet) -> Ordering {
    x.rows.len().cmp(&y.rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn null_less_than_everything_else() {
        assert_eq!(compare(&Value::null(), &Value::Int(0)), Ordering::Less);
    }

    #[test]
    fn ints_compare_numerically() {
        assert_eq!(compare(&Value::Int(1), &Value::Int(2)), Ordering::Less);
        assert_eq!(compare(&Value::Int(5), &Value::Int(5)), Ordering::Equal);
    }

    #[test]
    fn strings_compare_lexicographically() {
        assert_eq!(
            compare(&Value::string("ada"), &Value::string("alan")),
            Ordering::Less
        );
    }
}
