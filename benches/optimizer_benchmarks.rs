//! Optimizer benchmarks: fixed-point rewrite cost over a chain of
//! `Filter → Project` nodes, with and without the rule set enabled, and
//! over growing chain lengths.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use graphcore::catalog::{Catalog, SpaceSchema};
use graphcore::config::OptimizerConfig;
use graphcore::expression::Expression;
use graphcore::optimizer;
use graphcore::plan::{Plan, PlanKind};
use graphcore::value::Value;

fn build_project_chain(depth: usize) -> (Plan, graphcore::plan::NodeId) {
    let mut plan = Plan::new();
    let mut current = plan.make(PlanKind::Start, "$-", vec!["v".into()]);
    for i in 0..depth {
        current = plan.make(
            PlanKind::Project {
                input: current,
                yields: vec![("v".into(), Expression::Var("v".into()))],
            },
            format!("$p{i}"),
            vec!["v".into()],
        );
    }
    (plan, current)
}

fn bench_collapse_project_chain(c: &mut Criterion) {
    let catalog = Catalog::new();
    catalog.refresh(vec![SpaceSchema::new("sg", 1, 4)]);
    let config = OptimizerConfig::default();
    let rules = optimizer::default_rules(&config);

    let mut group = c.benchmark_group("collapse_project_chain");
    for depth in [8usize, 32, 128] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter_batched(
                || build_project_chain(depth),
                |(mut plan, root)| optimizer::optimize(&mut plan, root, &rules, &catalog, config.max_iterations),
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_filter_pushdown_over_neighbors(c: &mut Criterion) {
    let catalog = Catalog::new();
    catalog.refresh(vec![SpaceSchema::new("sg", 1, 4)]);
    let config = OptimizerConfig::default();
    let rules = optimizer::default_rules(&config);

    c.bench_function("filter_pushdown_over_get_neighbors", |b| {
        b.iter_batched(
            || {
                let mut plan = Plan::new();
                let start = plan.make(PlanKind::Start, "$-", vec![]);
                let neighbors = plan.make(
                    PlanKind::GetNeighbors {
                        input: start,
                        space: "sg".into(),
                        src_ids: vec![Expression::Constant(Value::Int(1))],
                        edge_types: vec!["knows".into()],
                        vertex_props: vec![],
                        edge_props: vec!["weight".into()],
                        filter: None,
                        limit: None::<u64>,
                        direction: graphcore::plan::Direction::Outbound,
                    },
                    "$n",
                    vec!["src".into(), "dst".into(), "weight".into()],
                );
                let filter = plan.make(
                    PlanKind::Filter {
                        input: neighbors,
                        condition: Expression::Constant(Value::Bool(true)),
                        need_stable: true,
                    },
                    "$f",
                    vec!["src".into(), "dst".into(), "weight".into()],
                );
                (plan, filter)
            },
            |(mut plan, root)| optimizer::optimize(&mut plan, root, &rules, &catalog, config.max_iterations),
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_collapse_project_chain, bench_filter_pushdown_over_neighbors);
criterion_main!(benches);
