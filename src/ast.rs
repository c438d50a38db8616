//! Input AST contract (spec §2, §4.1, component C1): the shape the
//! validator consumes. Parsing itself is out of scope (spec §1 Non-goal);
//! callers build a `Statement` tree directly (or a future parser would).
//!
//! Names follow the clause/sentence vocabulary in
//! `original_source/src/graph/*Executor.h` (`GoSentence`, `FetchSentence`,
//! `InsertVertexSentence`, ...) translated into a tagged enum per variant
//! instead of one class per clause (spec §9).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepRange {
    Exact(u32),
    Range { min: u32, max: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldColumn {
    pub alias: String,
    pub expr: crate::expression::Expression,
}

/// `GO ... OVER ... WHERE ... YIELD ...` (original `GoSentence`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoClause {
    pub src_vars: Vec<String>,
    pub edge_types: Vec<String>,
    pub steps: StepRange,
    pub direction: crate::plan::Direction,
    pub filter: Option<crate::expression::Expression>,
    pub yields: Vec<YieldColumn>,
}

/// `FETCH PROP ON <tag> <ids> YIELD ...` (original `FetchVerticesSentence`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchVerticesClause {
    pub tag: String,
    pub ids: Vec<crate::expression::Expression>,
    pub yields: Vec<YieldColumn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchEdgesClause {
    pub edge_type: String,
    pub ids: Vec<crate::expression::Expression>,
    pub yields: Vec<YieldColumn>,
}

/// `LOOKUP ON <tag|edge> WHERE ... YIELD ...` (original `LookupSentence`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupClause {
    pub owner_name: String,
    pub is_edge: bool,
    pub filter: Option<crate::expression::Expression>,
    pub yields: Vec<YieldColumn>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderByClause {
    pub columns: Vec<(String, OrderDirection)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertVerticesClause {
    pub tag: String,
    pub prop_names: Vec<String>,
    pub rows: Vec<(crate::expression::Expression, Vec<crate::expression::Expression>)>,
    pub overwrite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertEdgesClause {
    pub edge_type: String,
    pub prop_names: Vec<String>,
    pub rows: Vec<(
        crate::expression::Expression,
        crate::expression::Expression,
        i64,
        Vec<crate::expression::Expression>,
    )>,
    pub overwrite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteVerticesClause {
    pub ids: Vec<crate::expression::Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteEdgesClause {
    pub edge_type: String,
    pub keys: Vec<(crate::expression::Expression, crate::expression::Expression, i64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSpaceClause {
    pub name: String,
    pub part_count: u32,
}

/// One clause in a pipe-separated chain (`|` in the original grammar): the
/// validator lowers each clause into a `SubPlan` and wires them tail-to-root
/// in order, threading `$-` (the previous clause's output) as the new
/// clause's input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Clause {
    Go(GoClause),
    FetchVertices(FetchVerticesClause),
    FetchEdges(FetchEdgesClause),
    Lookup(LookupClause),
    Filter(crate::expression::Expression),
    Yield(Vec<YieldColumn>),
    OrderBy(OrderByClause),
    Limit { offset: usize, count: usize },
    GroupBy {
        keys: Vec<crate::expression::Expression>,
        aggregates: Vec<(crate::plan::AggFunc, crate::expression::Expression, String)>,
    },
}

/// A top-level statement (spec §4.1 "Statement"). `Pipeline` covers the
/// read path (`GO`/`FETCH`/`LOOKUP` chained with `|`); the rest are DML/DDL
/// leaves the original groups under `ExecutionPlan::setRoot`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Pipeline(Vec<Clause>),
    InsertVertices(InsertVerticesClause),
    InsertEdges(InsertEdgesClause),
    DeleteVertices(DeleteVerticesClause),
    DeleteEdges(DeleteEdgesClause),
    CreateSpace(CreateSpaceClause),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_holds_clauses_in_source_order() {
        let stmt = Statement::Pipeline(vec![
            Clause::Go(GoClause {
                src_vars: vec!["100".into()],
                edge_types: vec!["follow".into()],
                steps: StepRange::Exact(1),
                direction: crate::plan::Direction::Outbound,
                filter: None,
                yields: vec![],
            }),
            Clause::Limit { offset: 0, count: 10 },
        ]);
        match stmt {
            Statement::Pipeline(clauses) => assert_eq!(clauses.len(), 2),
            _ => panic!("expected pipeline"),
        }
    }
}
