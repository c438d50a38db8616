//! # Plan model (spec §3, §4.2, component C4)
//!
//! A DAG of typed operators. Construction is append-only (`Plan::make`
//! returns a fresh node id; there is no deletion) and dependency
//! replacement goes through [`Plan::replace`] so that optimizer rewrites
//! are DAG substitutions keyed by stable node id rather than pointer
//! surgery (spec §4.2, §9 "replace shared-pointer plan nodes with an arena
//! owned by the query context").
//!
//! Kinds are a tagged enum (spec §9: "replace inheritance hierarchies of
//! Executor/Expression with tagged enums"), each variant carrying its own
//! payload; `PlanNode::inputs()` is a free function matching on the tag
//! rather than virtual dispatch.
//!
//! Invariant (a): the DAG is acyclic except for the back-edge implied by
//! `Loop`, whose body is *not* a dependency edge (it's a side-entry run
//! once per iteration while the condition holds) — `inputs()` therefore
//! never returns a `Loop`/`Select` body id.

pub mod describe;
pub mod result;

use crate::expression::Expression;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type NodeId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Outbound,
    Inbound,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataCollectMode {
    /// Finalize GetNeighbors-style multi-step results into paths.
    PathCollect,
    /// Pass inputs through, concatenating rows (M-to-N step filtering).
    RowCollect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Collect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexRange {
    pub column: String,
    pub lower: Option<crate::value::Value>,
    pub upper: Option<crate::value::Value>,
    pub lower_inclusive: bool,
    pub upper_inclusive: bool,
}

/// Operator kinds (spec §3 "Plan Node"). Each non-leaf variant embeds the
/// ids of the nodes it depends on directly in its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanKind {
    Start,
    PassThrough {
        input: NodeId,
    },
    Project {
        input: NodeId,
        yields: Vec<(String, Expression)>,
    },
    Filter {
        input: NodeId,
        condition: Expression,
        /// Whether `erase` must preserve row order (spec §4.8: stable vs
        /// unstable erase).
        need_stable: bool,
    },
    Limit {
        input: NodeId,
        offset: usize,
        count: usize,
    },
    OrderBy {
        input: NodeId,
        order_by: Vec<(usize, SortOrder)>,
    },
    TopN {
        input: NodeId,
        order_by: Vec<(usize, SortOrder)>,
        offset: usize,
        limit: usize,
    },
    Dedup {
        input: NodeId,
    },
    Union {
        inputs: Vec<NodeId>,
    },
    Intersect {
        inputs: Vec<NodeId>,
    },
    Minus {
        left: NodeId,
        right: NodeId,
    },
    InnerJoin {
        left: NodeId,
        right: NodeId,
        left_keys: Vec<Expression>,
        right_keys: Vec<Expression>,
    },
    LeftJoin {
        left: NodeId,
        right: NodeId,
        left_keys: Vec<Expression>,
        right_keys: Vec<Expression>,
    },
    CartesianProduct {
        inputs: Vec<NodeId>,
    },
    DataCollect {
        inputs: Vec<NodeId>,
        mode: DataCollectMode,
    },
    Aggregate {
        input: NodeId,
        group_keys: Vec<Expression>,
        aggregates: Vec<(AggFunc, Expression)>,
    },
    GetNeighbors {
        input: NodeId,
        space: String,
        /// Literal seed vertex ids (spec §6 `getNeighbors(space, [vertexId],
        /// ...)`), e.g. from `GO FROM 100,200`. Additional ids may also
        /// flow in through `input`'s first column for multi-step traversal.
        src_ids: Vec<Expression>,
        edge_types: Vec<String>,
        vertex_props: Vec<String>,
        edge_props: Vec<String>,
        filter: Option<Expression>,
        limit: Option<u64>,
        direction: Direction,
    },
    GetVertices {
        input: NodeId,
        space: String,
        tag: String,
        /// Literal `FETCH PROP ON tag <ids>` seed ids, distinct from `input`
        /// which carries ids piped in from a prior `$-` step.
        ids: Vec<Expression>,
        tag_props: Vec<String>,
    },
    GetEdges {
        input: NodeId,
        space: String,
        edge_type: String,
        /// Literal `FETCH PROP ON edge_type <ids>` seed edge keys (each
        /// expression evaluates to a `Value::Edge` carrying src/dst/rank).
        ids: Vec<Expression>,
        edge_props: Vec<String>,
    },
    IndexScan {
        space: String,
        index_name: String,
        ranges: Vec<IndexRange>,
        limit: Option<u64>,
    },
    /// Leaf that reads a named variable straight out of the executor's
    /// result cache instead of computing from a structural input (spec §8
    /// scenario 6). Grounded in `original_source`'s `LoopExecutor`, which
    /// calls `ectx()->addValue(loopNode->varName(), value)` before each
    /// body run so the body can read the current iteration back out of the
    /// execution context's variable store; this is that store's read side,
    /// expressed as a plan node since this crate has no separate named-value
    /// table outside the result cache.
    VarSource {
        name: String,
    },
    /// Body is a side-entry, not a dependency (invariant (a)). `accumulator`
    /// names the variable the loop folds each iteration's body output into
    /// (spec §8 scenario 6: "a body that appends `iter` to variable `X`
    /// yields final `X=[0,1,2]`") — the body itself only has to yield the
    /// value to append for that iteration; the fold and the final list live
    /// in the loop, mirroring `ectx()->addValue` updating one named slot per
    /// iteration rather than the body managing its own accumulator state.
    Loop {
        condition: Expression,
        body: NodeId,
        loop_var: String,
        accumulator: String,
    },
    /// Both bodies are side-entries, not dependencies.
    Select {
        condition: Expression,
        then_body: NodeId,
        else_body: NodeId,
    },
    MultiOutputs {
        input: NodeId,
    },
    InsertVertices {
        input: NodeId,
        space: String,
        tag: String,
        prop_names: Vec<String>,
        /// Literal `(vertex id, prop values)` rows from `INSERT VERTEX ...
        /// VALUES ...` — there is no upstream dataset for this leaf, so the
        /// payload has to travel on the node itself.
        rows: Vec<(Expression, Vec<Expression>)>,
        overwrite: bool,
    },
    InsertEdges {
        input: NodeId,
        space: String,
        edge_type: String,
        prop_names: Vec<String>,
        /// Literal `(src, dst, rank, prop values)` rows.
        rows: Vec<(Expression, Expression, i64, Vec<Expression>)>,
        overwrite: bool,
    },
    DeleteVertices {
        input: NodeId,
        space: String,
        ids: Vec<Expression>,
    },
    DeleteTags {
        input: NodeId,
        space: String,
        tags: Vec<String>,
    },
    DeleteEdges {
        input: NodeId,
        space: String,
        edge_type: String,
        keys: Vec<(Expression, Expression, i64)>,
    },
    Update {
        input: NodeId,
        space: String,
    },
    /// DDL/admin leaf (spec §9 open question: stubbed DDL executors
    /// produce an empty dataset with `Succeeded`, delegating side effects
    /// to the catalog client).
    CreateSpace {
        name: String,
        part_count: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanNode {
    pub id: NodeId,
    pub kind: PlanKind,
    pub output_var: String,
    pub col_names: Vec<String>,
    pub cost: Option<f64>,
}

impl PlanNode {
    /// Direct dependency edges — excludes `Loop`/`Select` body side-entries
    /// per invariant (a).
    pub fn inputs(&self) -> Vec<NodeId> {
        match &self.kind {
            PlanKind::Start
            | PlanKind::IndexScan { .. }
            | PlanKind::CreateSpace { .. }
            | PlanKind::VarSource { .. } => vec![],
            PlanKind::PassThrough { input }
            | PlanKind::Project { input, .. }
            | PlanKind::Filter { input, .. }
            | PlanKind::Limit { input, .. }
            | PlanKind::OrderBy { input, .. }
            | PlanKind::TopN { input, .. }
            | PlanKind::Dedup { input }
            | PlanKind::Aggregate { input, .. }
            | PlanKind::GetNeighbors { input, .. }
            | PlanKind::GetVertices { input, .. }
            | PlanKind::GetEdges { input, .. }
            | PlanKind::MultiOutputs { input }
            | PlanKind::InsertVertices { input, .. }
            | PlanKind::InsertEdges { input, .. }
            | PlanKind::DeleteVertices { input, .. }
            | PlanKind::DeleteTags { input, .. }
            | PlanKind::DeleteEdges { input, .. }
            | PlanKind::Update { input, .. } => vec![*input],
            PlanKind::Minus { left, right } => vec![*left, *right],
            PlanKind::InnerJoin { left, right, .. } | PlanKind::LeftJoin { left, right, .. } => {
                vec![*left, *right]
            }
            PlanKind::Union { inputs }
            | PlanKind::Intersect { inputs }
            | PlanKind::CartesianProduct { inputs }
            | PlanKind::DataCollect { inputs, .. } => inputs.clone(),
            PlanKind::Loop { .. } | PlanKind::Select { .. } => vec![],
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            PlanKind::Start => "Start",
            PlanKind::PassThrough { .. } => "PassThrough",
            PlanKind::Project { .. } => "Project",
            PlanKind::Filter { .. } => "Filter",
            PlanKind::Limit { .. } => "Limit",
            PlanKind::OrderBy { .. } => "OrderBy",
            PlanKind::TopN { .. } => "TopN",
            PlanKind::Dedup { .. } => "Dedup",
            PlanKind::Union { .. } => "Union",
            PlanKind::Intersect { .. } => "Intersect",
            PlanKind::Minus { .. } => "Minus",
            PlanKind::InnerJoin { .. } => "InnerJoin",
            PlanKind::LeftJoin { .. } => "LeftJoin",
            PlanKind::CartesianProduct { .. } => "CartesianProduct",
            PlanKind::DataCollect { .. } => "DataCollect",
            PlanKind::Aggregate { .. } => "Aggregate",
            PlanKind::GetNeighbors { .. } => "GetNeighbors",
            PlanKind::GetVertices { .. } => "GetVertices",
            PlanKind::GetEdges { .. } => "GetEdges",
            PlanKind::IndexScan { .. } => "IndexScan",
            PlanKind::VarSource { .. } => "VarSource",
            PlanKind::Loop { .. } => "Loop",
            PlanKind::Select { .. } => "Select",
            PlanKind::MultiOutputs { .. } => "MultiOutputs",
            PlanKind::InsertVertices { .. } => "InsertVertices",
            PlanKind::InsertEdges { .. } => "InsertEdges",
            PlanKind::DeleteVertices { .. } => "DeleteVertices",
            PlanKind::DeleteTags { .. } => "DeleteTags",
            PlanKind::DeleteEdges { .. } => "DeleteEdges",
            PlanKind::Update { .. } => "Update",
            PlanKind::CreateSpace { .. } => "CreateSpace",
        }
    }
}

/// A pair `(root, tail)` identifying a connected slice of the plan DAG used
/// for composition while the validator lowers a clause chain (GLOSSARY
/// "Subplan"). `tail` is the operator that still needs its `input` wired to
/// whatever comes before it in the clause chain.
#[derive(Debug, Clone, Copy)]
pub struct SubPlan {
    pub root: NodeId,
    pub tail: NodeId,
}

/// The per-query arena owning every `PlanNode` (spec §3 "Lifecycles": plan
/// nodes are allocated in a per-query arena that lives as long as the query
/// context; no plan node is shared across queries).
#[derive(Debug, Default)]
pub struct Plan {
    nodes: HashMap<NodeId, PlanNode>,
    next_id: NodeId,
    pub root: Option<NodeId>,
}

impl Plan {
    pub fn new() -> Self {
        Plan::default()
    }

    /// Append-only construction: always returns a fresh id.
    pub fn make(&mut self, kind: PlanKind, output_var: impl Into<String>, col_names: Vec<String>) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(
            id,
            PlanNode {
                id,
                kind,
                output_var: output_var.into(),
                col_names,
                cost: None,
            },
        );
        id
    }

    pub fn get(&self, id: NodeId) -> &PlanNode {
        self.nodes
            .get(&id)
            .unwrap_or_else(|| panic!("plan node {id} not found — inputs must reference nodes in the same plan"))
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut PlanNode {
        self.nodes
            .get_mut(&id)
            .unwrap_or_else(|| panic!("plan node {id} not found"))
    }

    /// Substitute the kind (and optionally column names) at `id` in place,
    /// keeping the same id so every other node's input edges stay valid.
    /// This is how the optimizer rewrites the DAG (spec §4.2/§9).
    pub fn replace(&mut self, id: NodeId, kind: PlanKind, col_names: Vec<String>) {
        let node = self.get_mut(id);
        node.kind = kind;
        node.col_names = col_names;
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Topological order of the reachable subgraph rooted at `root`
    /// (dependencies before dependents), used by the scheduler (spec
    /// §4.5). Loop/Select bodies are walked too (as independent roots)
    /// since the scheduler must also be able to run them, but they are not
    /// linked as dependencies of their owner.
    pub fn topological_order(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut visited = std::collections::HashSet::new();
        self.visit_post_order(root, &mut visited, &mut order);
        order
    }

    fn visit_post_order(
        &self,
        id: NodeId,
        visited: &mut std::collections::HashSet<NodeId>,
        order: &mut Vec<NodeId>,
    ) {
        if !visited.insert(id) {
            return;
        }
        for input in self.get(id).inputs() {
            self.visit_post_order(input, visited, order);
        }
        order.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_returns_fresh_ids_and_preserves_order() {
        let mut plan = Plan::new();
        let start = plan.make(PlanKind::Start, "$-", vec![]);
        let filter = plan.make(
            PlanKind::Filter {
                input: start,
                condition: Expression::Constant(crate::value::Value::Bool(true)),
                need_stable: true,
            },
            "$f",
            vec!["a".into()],
        );
        assert_eq!(plan.get(filter).inputs(), vec![start]);
        let order = plan.topological_order(filter);
        assert_eq!(order, vec![start, filter]);
    }

    #[test]
    fn replace_preserves_id_for_downstream_references() {
        let mut plan = Plan::new();
        let start = plan.make(PlanKind::Start, "$-", vec![]);
        let pass = plan.make(PlanKind::PassThrough { input: start }, "$p", vec![]);
        plan.replace(pass, PlanKind::PassThrough { input: start }, vec!["renamed".into()]);
        assert_eq!(plan.get(pass).col_names, vec!["renamed".to_string()]);
        assert_eq!(plan.get(pass).inputs(), vec![start]);
    }

    #[test]
    fn loop_and_select_bodies_are_not_dependency_edges() {
        let mut plan = Plan::new();
        let body = plan.make(PlanKind::Start, "$body", vec![]);
        let loop_node = plan.make(
            PlanKind::Loop {
                condition: Expression::Constant(crate::value::Value::Bool(true)),
                body,
                loop_var: "iter".into(),
                accumulator: "x".into(),
            },
            "$loop",
            vec![],
        );
        assert!(plan.get(loop_node).inputs().is_empty());
    }
}
