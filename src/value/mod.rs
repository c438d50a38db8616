//! # Value / Row / DataSet model (spec §3, component C1)
//!
//! `Value` is a tagged sum over the kinds spec §3 lists; `Row` is an ordered,
//! cheaply-cloned sequence of `Value`; `DataSet` pairs column names with rows
//! under the invariant `∀ row. len(row) = len(colNames)`.
//!
//! Total order is defined lexicographically per kind (null < bool < int64 <
//! float64 < string < date < time < datetime < vertex < edge < path < list <
//! map < set < dataset), then by value within a kind. Arithmetic on
//! mismatched numeric kinds widens (`int + float -> float`); any arithmetic
//! touching a null produces a typed null; division by zero yields
//! `NullVariant::DivByZero`; overflow yields `NullVariant::Overflow`.

mod arithmetic;
mod graph;
mod ordering;

pub use graph::{Edge, Path, PathStep, Vertex};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Sub-kinds of the null value (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NullVariant {
    Normal,
    NaN,
    BadType,
    BadData,
    Overflow,
    DivByZero,
    OutOfRange,
    /// Absence of a value for reasons not covered above (e.g. a missing
    /// property on a vertex).
    Unknown,
}

/// A tagged sum value. Lists/sets/maps/datasets nest `Value` via `Arc` so
/// that `Value` stays cheap to clone (rows are "cheap to move, copyable"
/// per spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null(NullVariant),
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Arc<str>),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Vertex(Arc<Vertex>),
    Edge(Arc<Edge>),
    Path(Arc<Path>),
    List(Arc<Vec<Value>>),
    Map(Arc<BTreeMap<String, Value>>),
    Set(Arc<Vec<Value>>),
    DataSet(Arc<DataSet>),
}

impl Value {
    pub fn null() -> Self {
        Value::Null(NullVariant::Normal)
    }

    pub fn bad_type() -> Self {
        Value::Null(NullVariant::BadType)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    /// Truthiness used by Filter/Select/Loop condition evaluation: only
    /// `Bool(true)` is truthy; anything else (including null) is not.
    pub fn is_truthy(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    /// A stable rank used for the total order across kinds (spec §3).
    fn kind_rank(&self) -> u8 {
        match self {
            Value::Null(_) => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::Float(_) => 3,
            Value::String(_) => 4,
            Value::Date(_) => 5,
            Value::Time(_) => 6,
            Value::DateTime(_) => 7,
            Value::Vertex(_) => 8,
            Value::Edge(_) => 9,
            Value::Path(_) => 10,
            Value::List(_) => 11,
            Value::Map(_) => 12,
            Value::Set(_) => 13,
            Value::DataSet(_) => 14,
        }
    }
}

/// An ordered sequence of `Value`. `Arc`-backed so `Row::clone()` is O(1)
/// regardless of arity, matching spec §3's "cheap to move, copyable".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Row(Arc<Vec<Value>>);

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Row(Arc::new(values))
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.0.get(idx)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Build a new row by appending columns (used by CartesianProduct and
    /// LeftJoin's null-padded rows).
    pub fn concat(&self, other: &Row) -> Row {
        let mut values = (*self.0).clone();
        values.extend(other.0.iter().cloned());
        Row::new(values)
    }
}

impl FromIterator<Value> for Row {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Row::new(iter.into_iter().collect())
    }
}

/// `{colNames: [string]; rows: [Row]}` with the invariant
/// `∀ row. len(row) = len(colNames)` (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DataSet {
    pub col_names: Vec<String>,
    pub rows: Vec<Row>,
}

impl DataSet {
    pub fn new(col_names: Vec<String>) -> Self {
        DataSet {
            col_names,
            rows: Vec::new(),
        }
    }

    /// Push a row, asserting the arity invariant. This is a programmer
    /// error if violated (an operator produced a malformed row), not a user
    /// error, so it panics rather than returning a `Result`.
    pub fn push_row(&mut self, row: Row) {
        debug_assert_eq!(
            row.arity(),
            self.col_names.len(),
            "row arity must match colNames length"
        );
        self.rows.push(row);
    }

    pub fn col_index(&self, name: &str) -> Option<usize> {
        self.col_names.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(ordering::compare(self, other))
    }
}

pub use arithmetic::{arithmetic, ArithOp};
pub use ordering::compare;
