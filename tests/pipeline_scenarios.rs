//! End-to-end tests for the validator-free half of the pipeline: hand-built
//! plans, run through the optimizer and executor, checked against the
//! literal inputs/outputs used as the project's acceptance scenarios.
//! Grounded in the teacher's `tests/optimizer_tests.rs`/
//! `advanced_integration_tests.rs` style — build a plan, run it, assert on
//! the resulting rows rather than on internal structure.

use std::collections::HashMap;
use std::sync::Arc;

use graphcore::catalog::{Catalog, SpaceSchema};
use graphcore::config::{ExecutorConfig, OptimizerConfig};
use graphcore::executor::{self, ExecutionContext};
use graphcore::expression::{Expression, RelOp};
use graphcore::optimizer;
use graphcore::plan::{Direction, Plan, PlanKind, SortOrder};
use graphcore::storage::{EdgeKey, InMemoryStorageClient};
use graphcore::value::{ArithOp, Value};

fn space(name: &str, part_count: u32) -> Arc<Catalog> {
    let catalog = Arc::new(Catalog::new());
    catalog.refresh(vec![SpaceSchema::new(name, 1, part_count)]);
    catalog
}

fn exec_ctx(catalog: Arc<Catalog>, storage: Arc<InMemoryStorageClient>) -> ExecutionContext {
    ExecutionContext::new(catalog, storage, &ExecutorConfig::default())
}

fn run(plan: &Plan, root: graphcore::plan::NodeId, ctx: &ExecutionContext) -> graphcore::plan::result::ExecResult {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(executor::execute_plan(plan, root, HashMap::new(), ctx)).unwrap()
}

/// Scenario 1 (spec §8): `Project[a1=$v.age+1, b1=$v] -> Project[a2=$a1+1,
/// b2=$b1]` over a single row with `age=20` collapses to one `Project`
/// yielding `(a2=22, b2=20)`. `$v` is represented by its flattened `age`
/// column here, matching how `VarProp`/`Var` resolve in this crate's row
/// model (operators::row::RowContext) rather than as a nested vertex value.
#[test]
fn project_collapse_composes_inner_and_outer_expressions() {
    let catalog = space("sg", 4);
    let storage = Arc::new(InMemoryStorageClient::new(Arc::clone(&catalog), Default::default()));
    storage.seed_vertex("sg", Value::Int(1), "Person", HashMap::from([("age".to_string(), Value::Int(20))]));

    let mut plan = Plan::new();
    let start = plan.make(PlanKind::Start, "$-", vec![]);
    let gv = plan.make(
        PlanKind::GetVertices {
            input: start,
            space: "sg".into(),
            tag: "Person".into(),
            ids: vec![Expression::Constant(Value::Int(1))],
            tag_props: vec!["age".into()],
        },
        "$v",
        vec!["id".into(), "age".into()],
    );
    let inner = plan.make(
        PlanKind::Project {
            input: gv,
            yields: vec![
                (
                    "a1".into(),
                    Expression::Arithmetic {
                        op: ArithOp::Add,
                        left: Box::new(Expression::VarProp { var: "v".into(), prop: "age".into() }),
                        right: Box::new(Expression::Constant(Value::Int(1))),
                    },
                ),
                ("b1".into(), Expression::InputProp("age".into())),
            ],
        },
        "$inner",
        vec!["a1".into(), "b1".into()],
    );
    let outer = plan.make(
        PlanKind::Project {
            input: inner,
            yields: vec![
                (
                    "a2".into(),
                    Expression::Arithmetic {
                        op: ArithOp::Add,
                        left: Box::new(Expression::InputProp("a1".into())),
                        right: Box::new(Expression::Constant(Value::Int(1))),
                    },
                ),
                ("b2".into(), Expression::InputProp("b1".into())),
            ],
        },
        "$outer",
        vec!["a2".into(), "b2".into()],
    );

    let config = OptimizerConfig::default();
    let rules = optimizer::default_rules(&config);
    optimizer::optimize(&mut plan, outer, &rules, &catalog, config.max_iterations);

    // The outer node is now a single collapsed Project reading directly
    // from `gv` (spec §8 invariant 4: colNames(after) = colNames of the
    // top project before the rewrite).
    match &plan.get(outer).kind {
        PlanKind::Project { input, .. } => assert_eq!(*input, gv),
        other => panic!("expected a collapsed Project, got {other:?}"),
    }
    assert_eq!(plan.get(outer).col_names, vec!["a2".to_string(), "b2".to_string()]);

    let ctx = exec_ctx(catalog, storage);
    let result = run(&plan, outer, &ctx);
    assert_eq!(result.dataset.len(), 1);
    let row = &result.dataset.rows[0];
    assert_eq!(row.get(0), Some(&Value::Int(22)));
    assert_eq!(row.get(1), Some(&Value::Int(20)));
}

/// Scenario 2 (spec §8): `Filter[$edge.weight > 5] -> GetNeighbors(edgeType
/// = knows)` becomes `GetNeighbors(..., filter = $edge.weight > 5)`. Under
/// edges `u->v` (weight 3) and `u->w` (weight 7), the only surviving row is
/// `u->w`.
#[tokio::test]
async fn filter_pushes_down_into_get_neighbors_and_narrows_the_traversal() {
    let catalog = space("sg", 4);
    let storage = Arc::new(InMemoryStorageClient::new(Arc::clone(&catalog), Default::default()));
    storage.seed_edge(
        "sg",
        EdgeKey { src: Value::string("u"), dst: Value::string("v"), edge_type: "knows".into(), rank: 0 },
        HashMap::from([("weight".to_string(), Value::Int(3))]),
    );
    storage.seed_edge(
        "sg",
        EdgeKey { src: Value::string("u"), dst: Value::string("w"), edge_type: "knows".into(), rank: 0 },
        HashMap::from([("weight".to_string(), Value::Int(7))]),
    );

    let mut plan = Plan::new();
    let start = plan.make(PlanKind::Start, "$-", vec![]);
    let gn = plan.make(
        PlanKind::GetNeighbors {
            input: start,
            space: "sg".into(),
            src_ids: vec![Expression::Constant(Value::string("u"))],
            edge_types: vec!["knows".into()],
            vertex_props: vec![],
            edge_props: vec!["weight".into()],
            filter: None,
            limit: None,
            direction: Direction::Outbound,
        },
        "$n",
        vec!["src".into(), "dst".into(), "weight".into()],
    );
    let condition = Expression::Relational {
        op: RelOp::Gt,
        left: Box::new(Expression::EdgeProp("weight".into())),
        right: Box::new(Expression::Constant(Value::Int(5))),
    };
    let filter = plan.make(
        PlanKind::Filter { input: gn, condition, need_stable: true },
        "$f",
        vec!["src".into(), "dst".into(), "weight".into()],
    );

    let config = OptimizerConfig::default();
    let rules = optimizer::default_rules(&config);
    optimizer::optimize(&mut plan, filter, &rules, &catalog, config.max_iterations);

    match &plan.get(gn).kind {
        PlanKind::GetNeighbors { filter: Some(_), .. } => {}
        other => panic!("expected the filter to have been pushed into GetNeighbors, got {other:?}"),
    }
    assert_eq!(plan.get(filter).kind_name(), "PassThrough");

    let ctx = exec_ctx(catalog, storage);
    let result = executor::execute_plan(&plan, filter, HashMap::new(), &ctx).await.unwrap();
    assert_eq!(result.dataset.len(), 1);
    let row = &result.dataset.rows[0];
    assert_eq!(row.get(0), Some(&Value::string("u")));
    assert_eq!(row.get(1), Some(&Value::string("w")));
    assert_eq!(row.get(2), Some(&Value::Int(7)));
}

fn seed_join_sides(catalog: &Arc<Catalog>) -> Arc<InMemoryStorageClient> {
    let storage = Arc::new(InMemoryStorageClient::new(Arc::clone(catalog), Default::default()));
    for id in [1, 2, 3] {
        storage.seed_vertex("sg", Value::Int(id), "Left", HashMap::new());
    }
    for id in [2, 3, 4] {
        storage.seed_vertex("sg", Value::Int(id), "Right", HashMap::new());
    }
    storage
}

fn join_side(plan: &mut Plan, tag: &str, ids: &[i64]) -> graphcore::plan::NodeId {
    let start = plan.make(PlanKind::Start, "$-", vec![]);
    let gv = plan.make(
        PlanKind::GetVertices {
            input: start,
            space: "sg".into(),
            tag: tag.into(),
            ids: ids.iter().map(|id| Expression::Constant(Value::Int(*id))).collect(),
            tag_props: vec![],
        },
        format!("${tag}"),
        vec!["id".into()],
    );
    plan.make(
        PlanKind::Project { input: gv, yields: vec![("a".into(), Expression::InputProp("id".into()))] },
        format!("${tag}_a"),
        vec!["a".into()],
    )
}

/// Scenario 3 (spec §8): inner join of `{a:[1,2,3]}` and `{a:[2,3,4]}` on
/// `a` yields exactly `{(2,2),(3,3)}` (order unspecified).
#[tokio::test]
async fn inner_join_on_a_single_key_yields_the_intersection() {
    let catalog = space("sg", 4);
    let storage = seed_join_sides(&catalog);
    let mut plan = Plan::new();
    let left = join_side(&mut plan, "Left", &[1, 2, 3]);
    let right = join_side(&mut plan, "Right", &[2, 3, 4]);
    let join = plan.make(
        PlanKind::InnerJoin {
            left,
            right,
            left_keys: vec![Expression::InputProp("a".into())],
            right_keys: vec![Expression::InputProp("a".into())],
        },
        "$join",
        vec!["a".into(), "a".into()],
    );
    let ctx = exec_ctx(catalog, storage);
    let result = executor::execute_plan(&plan, join, HashMap::new(), &ctx).await.unwrap();
    let mut rows: Vec<(i64, i64)> = result
        .dataset
        .rows
        .iter()
        .map(|r| match (r.get(0), r.get(1)) {
            (Some(Value::Int(a)), Some(Value::Int(b))) => (*a, *b),
            _ => panic!("expected int pairs"),
        })
        .collect();
    rows.sort();
    assert_eq!(rows, vec![(2, 2), (3, 3)]);
}

/// Scenario 4 (spec §8): the same inputs under a left join pad the
/// unmatched left row (`1`) with `null`.
#[tokio::test]
async fn left_join_pads_unmatched_left_rows_with_null() {
    let catalog = space("sg", 4);
    let storage = seed_join_sides(&catalog);
    let mut plan = Plan::new();
    let left = join_side(&mut plan, "Left", &[1, 2, 3]);
    let right = join_side(&mut plan, "Right", &[2, 3, 4]);
    let join = plan.make(
        PlanKind::LeftJoin {
            left,
            right,
            left_keys: vec![Expression::InputProp("a".into())],
            right_keys: vec![Expression::InputProp("a".into())],
        },
        "$join",
        vec!["a".into(), "a".into()],
    );
    let ctx = exec_ctx(catalog, storage);
    let result = executor::execute_plan(&plan, join, HashMap::new(), &ctx).await.unwrap();
    let mut rows: Vec<(i64, Value)> = result
        .dataset
        .rows
        .iter()
        .map(|r| match r.get(0) {
            Some(Value::Int(a)) => (*a, r.get(1).cloned().unwrap()),
            _ => panic!("expected int left column"),
        })
        .collect();
    rows.sort_by_key(|(a, _)| *a);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], (1, Value::null()));
    assert_eq!(rows[1], (2, Value::Int(2)));
    assert_eq!(rows[2], (3, Value::Int(3)));
}

/// Scenario 5 (spec §8): `TopN(orderBy=name asc, limit=2) ->
/// IndexScan(tag=Person, index=byName)` pushes its row budget into the
/// index scan. The push-down itself is checked at the plan level (the fake
/// storage client has no real per-property index to execute a narrowed
/// scan against); the literal `[Ada, Alan]` output is checked by running
/// `TopN` over a `GetVertices` fetch whose rows arrive in scrambled order,
/// which is what `TopN`'s own sort-then-truncate has to correct for
/// regardless of which access path fed it.
#[test]
fn topn_pushes_its_budget_into_a_matching_index_scan() {
    let catalog = Catalog::new();
    let mut plan = Plan::new();
    let idx = plan.make(
        PlanKind::IndexScan { space: "sg".into(), index_name: "byName".into(), ranges: vec![], limit: None },
        "$idx",
        vec!["name".into()],
    );
    let topn = plan.make(
        PlanKind::TopN { input: idx, order_by: vec![(0, SortOrder::Asc)], offset: 0, limit: 2 },
        "$top",
        vec!["name".into()],
    );
    let config = OptimizerConfig::default();
    let rules = optimizer::default_rules(&config);
    optimizer::optimize(&mut plan, topn, &rules, &catalog, config.max_iterations);
    match &plan.get(idx).kind {
        PlanKind::IndexScan { limit: Some(2), .. } => {}
        other => panic!("expected the row budget pushed into IndexScan, got {other:?}"),
    }
}

#[tokio::test]
async fn topn_sorts_and_truncates_to_the_literal_names() {
    let catalog = space("sg", 4);
    let storage = Arc::new(InMemoryStorageClient::new(Arc::clone(&catalog), Default::default()));
    for (id, name) in [(1, "Cam"), (2, "Ada"), (3, "Bob"), (4, "Alan")] {
        storage.seed_vertex("sg", Value::Int(id), "Person", HashMap::from([("name".to_string(), Value::string(name))]));
    }

    let mut plan = Plan::new();
    let start = plan.make(PlanKind::Start, "$-", vec![]);
    let gv = plan.make(
        PlanKind::GetVertices {
            input: start,
            space: "sg".into(),
            tag: "Person".into(),
            // Deliberately scrambled relative to name order.
            ids: [4i64, 1, 3, 2].iter().map(|id| Expression::Constant(Value::Int(*id))).collect(),
            tag_props: vec!["name".into()],
        },
        "$v",
        vec!["id".into(), "name".into()],
    );
    let topn = plan.make(
        PlanKind::TopN { input: gv, order_by: vec![(1, SortOrder::Asc)], offset: 0, limit: 2 },
        "$top",
        vec!["id".into(), "name".into()],
    );

    let ctx = exec_ctx(catalog, storage);
    let result = executor::execute_plan(&plan, topn, HashMap::new(), &ctx).await.unwrap();
    let names: Vec<String> = result
        .dataset
        .rows
        .iter()
        .map(|r| match r.get(1) {
            Some(Value::String(s)) => s.to_string(),
            _ => panic!("expected string name"),
        })
        .collect();
    assert_eq!(names, vec!["Ada".to_string(), "Alan".to_string()]);
}

/// Scenario 6 (spec §8): a `Loop` with condition `iter < 3` over a body
/// that appends `iter` to variable `X` yields final `X=[0,1,2]`; a `Select`
/// with `iter == 1` takes the `then` branch whenever its condition holds,
/// the `else` branch otherwise.
#[tokio::test]
async fn loop_appends_each_iteration_to_the_accumulator_and_select_picks_a_branch() {
    let catalog = space("sg", 4);
    let storage = Arc::new(InMemoryStorageClient::new(Arc::clone(&catalog), Default::default()));
    let ctx = exec_ctx(catalog, storage);

    let mut plan = Plan::new();
    let iter_src = plan.make(PlanKind::VarSource { name: "iter".into() }, "$iter_src", vec!["iter".into()]);
    let body = plan.make(
        PlanKind::Project {
            input: iter_src,
            yields: vec![("item".into(), Expression::InputProp("iter".into()))],
        },
        "$item",
        vec!["item".into()],
    );
    let loop_node = plan.make(
        PlanKind::Loop {
            condition: Expression::Relational {
                op: RelOp::Lt,
                left: Box::new(Expression::Var("iter".into())),
                right: Box::new(Expression::Constant(Value::Int(3))),
            },
            body,
            loop_var: "iter".into(),
            accumulator: "X".into(),
        },
        "$loop",
        vec!["X".into()],
    );
    // The loop always terminates (iteration is bounded by the literal `3`
    // in its condition); a run that never returns would hang this test.
    let result = executor::execute_plan(&plan, loop_node, HashMap::new(), &ctx).await.unwrap();
    assert_eq!(result.dataset.col_names, vec!["X".to_string()]);
    assert_eq!(
        result.dataset.rows[0].get(0),
        Some(&Value::List(std::sync::Arc::new(vec![Value::Int(0), Value::Int(1), Value::Int(2)])))
    );
    assert_eq!(ctx.cache.read("X").map(|r| r.dataset), Some(result.dataset));

    for flag in [true, false] {
        let mut select_plan = Plan::new();
        let then_body = select_plan.make(PlanKind::Start, "$then", vec!["picked".into()]);
        let else_body = select_plan.make(PlanKind::Start, "$else", vec!["picked".into()]);
        let select = select_plan.make(
            PlanKind::Select { condition: Expression::Constant(Value::Bool(flag)), then_body, else_body },
            "$sel",
            vec!["picked".into()],
        );
        let result = executor::execute_plan(&select_plan, select, HashMap::new(), &ctx).await.unwrap();
        // Both branches are bodies of `Start` (always empty) here: the
        // assertion that matters is which *branch* ran, which we confirm
        // indirectly via each branch's distinct output_var being cached.
        assert!(result.dataset.is_empty());
        assert!(ctx.cache.read(if flag { "$then" } else { "$else" }).is_some());
    }
}

/// Property test (spec §8): for random small plans over a Filter ->
/// Project chain, running the optimizer must not change the multiset of
/// rows produced relative to running the unoptimized plan.
mod optimizer_preserves_semantics {
    use super::*;
    use proptest::prelude::*;

    fn build_plan(threshold: i64, ages: &[i64]) -> (Plan, Arc<Catalog>, Arc<InMemoryStorageClient>, graphcore::plan::NodeId) {
        let catalog = space("sg", 4);
        let storage = Arc::new(InMemoryStorageClient::new(Arc::clone(&catalog), Default::default()));
        for (i, age) in ages.iter().enumerate() {
            storage.seed_vertex(
                "sg",
                Value::Int(i as i64),
                "Person",
                HashMap::from([("age".to_string(), Value::Int(*age))]),
            );
        }
        let ids: Vec<Expression> = (0..ages.len() as i64).map(|i| Expression::Constant(Value::Int(i))).collect();

        let mut plan = Plan::new();
        let start = plan.make(PlanKind::Start, "$-", vec![]);
        let gv = plan.make(
            PlanKind::GetVertices { input: start, space: "sg".into(), tag: "Person".into(), ids, tag_props: vec!["age".into()] },
            "$v",
            vec!["id".into(), "age".into()],
        );
        let inner = plan.make(
            PlanKind::Project {
                input: gv,
                yields: vec![("age".into(), Expression::InputProp("age".into()))],
            },
            "$p1",
            vec!["age".into()],
        );
        let outer = plan.make(
            PlanKind::Project { input: inner, yields: vec![("age".into(), Expression::InputProp("age".into()))] },
            "$p2",
            vec!["age".into()],
        );
        let filter = plan.make(
            PlanKind::Filter {
                input: outer,
                condition: Expression::Relational {
                    op: RelOp::Gt,
                    left: Box::new(Expression::InputProp("age".into())),
                    right: Box::new(Expression::Constant(Value::Int(threshold))),
                },
                need_stable: true,
            },
            "$f",
            vec!["age".into()],
        );
        (plan, catalog, storage, filter)
    }

    fn multiset(result: &graphcore::plan::result::ExecResult) -> Vec<i64> {
        let mut ages: Vec<i64> = result
            .dataset
            .rows
            .iter()
            .map(|r| match r.get(0) {
                Some(Value::Int(a)) => *a,
                _ => panic!("expected int age"),
            })
            .collect();
        ages.sort_unstable();
        ages
    }

    proptest! {
        #[test]
        fn optimizer_on_and_off_yield_identical_multisets(
            threshold in -5i64..50,
            ages in prop::collection::vec(0i64..60, 0..12),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();

            let (plan_off, catalog_off, storage_off, root_off) = build_plan(threshold, &ages);
            let ctx_off = exec_ctx(catalog_off, storage_off);
            let off = rt.block_on(executor::execute_plan(&plan_off, root_off, HashMap::new(), &ctx_off)).unwrap();

            let (mut plan_on, catalog_on, storage_on, root_on) = build_plan(threshold, &ages);
            let config = OptimizerConfig::default();
            let rules = optimizer::default_rules(&config);
            optimizer::optimize(&mut plan_on, root_on, &rules, &catalog_on, config.max_iterations);
            let ctx_on = exec_ctx(catalog_on, storage_on);
            let on = rt.block_on(executor::execute_plan(&plan_on, root_on, HashMap::new(), &ctx_on)).unwrap();

            prop_assert_eq!(multiset(&off), multiset(&on));
        }
    }
}
