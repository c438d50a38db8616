//! Executor benchmarks: end-to-end scheduling cost for a filter/project
//! pipeline and for a traversal fanning out to the in-memory storage
//! façade, at growing dataset sizes.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use graphcore::catalog::{Catalog, SpaceSchema};
use graphcore::config::ExecutorConfig;
use graphcore::executor::{self, ExecutionContext};
use graphcore::expression::{Expression, RelOp};
use graphcore::plan::{Direction, Plan, PlanKind};
use graphcore::storage::{EdgeKey, InMemoryStorageClient};
use graphcore::value::Value;
use std::sync::Arc;
use tokio::runtime::Runtime;

fn bench_filter_over_neighbors(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("filter_over_neighbors");
    for fanout in [10u32, 100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(fanout), &fanout, |b, &fanout| {
            let catalog = Arc::new(Catalog::new());
            catalog.refresh(vec![SpaceSchema::new("sg", 1, 4)]);
            let storage = Arc::new(InMemoryStorageClient::new(Arc::clone(&catalog), Default::default()));
            for dst in 0..fanout {
                storage.seed_edge(
                    "sg",
                    EdgeKey { src: Value::Int(1), dst: Value::Int(i64::from(dst)), edge_type: "knows".into(), rank: 0 },
                    Default::default(),
                );
            }
            let exec_ctx = ExecutionContext::new(Arc::clone(&catalog), storage, &ExecutorConfig::default());

            b.iter(|| {
                rt.block_on(async {
                    let mut plan = Plan::new();
                    let start = plan.make(PlanKind::Start, "$-", vec![]);
                    let neighbors = plan.make(
                        PlanKind::GetNeighbors {
                            input: start,
                            space: "sg".into(),
                            src_ids: vec![Expression::Constant(Value::Int(1))],
                            edge_types: vec!["knows".into()],
                            vertex_props: vec![],
                            edge_props: vec![],
                            filter: None,
                            limit: None,
                            direction: Direction::Outbound,
                        },
                        "$n",
                        vec!["src".into(), "dst".into()],
                    );
                    let filter = plan.make(
                        PlanKind::Filter {
                            input: neighbors,
                            condition: Expression::Relational {
                                op: RelOp::Gt,
                                left: Box::new(Expression::Var("dst".into())),
                                right: Box::new(Expression::Constant(Value::Int(0))),
                            },
                            need_stable: true,
                        },
                        "$f",
                        vec!["src".into(), "dst".into()],
                    );
                    executor::execute_plan(&plan, filter, Default::default(), &exec_ctx).await.unwrap()
                })
            });
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(20);
    targets = bench_filter_over_neighbors
}
criterion_main!(benches);
