//! `graphcore-explain`: builds a small query plan against an in-memory
//! seeded space, runs it through the optimizer, and prints its EXPLAIN
//! JSON tree plus the rows it produces. Stands in for the teacher's
//! interactive REPL binary — this crate has no parser (spec §1 Non-goal),
//! so there's no query text to read; the demo statement is built directly
//! as an AST the way a real caller's parser output would look.

use std::sync::Arc;

use clap::Parser;
use graphcore::ast::{GoClause, StepRange, Statement};
use graphcore::catalog::{Catalog, EdgeSchema, PropertyDef, SpaceSchema, DataType};
use graphcore::config::{Config, ExecutorConfig, OptimizerConfig};
use graphcore::executor::{self, ExecutionContext};
use graphcore::optimizer;
use graphcore::plan::Direction;
use graphcore::storage::{EdgeKey, InMemoryStorageClient};
use graphcore::validator::{self, PermissionGate, ValidatorContext};
use graphcore::value::Value;
use graphcore::auth::Role;

#[derive(Parser)]
#[command(name = "graphcore-explain", about = "Plan, optimize, and run a demo traversal against a seeded in-memory space")]
struct Args {
    /// Starting vertex id for the demo `GO FROM <id> OVER knows` traversal.
    #[arg(long, default_value_t = 1)]
    start: i64,

    /// Skip the optimizer pass and run the unoptimized plan.
    #[arg(long)]
    no_optimize: bool,
}

#[tokio::main]
async fn main() {
    let config = Config::default();
    graphcore::config::init_tracing(&config.logging);

    let args = Args::parse();

    let catalog = Arc::new(seed_catalog());
    let storage = Arc::new(seed_storage(Arc::clone(&catalog)));

    let statement = Statement::Pipeline(vec![graphcore::ast::Clause::Go(GoClause {
        src_vars: vec![args.start.to_string()],
        edge_types: vec!["knows".into()],
        steps: StepRange::Exact(1),
        direction: Direction::Outbound,
        filter: None,
        yields: vec![],
    })]);

    let mut ctx = ValidatorContext::new(Arc::clone(&catalog), PermissionGate::new(Role::Admin));
    if let Err(err) = validator::validate(&statement, "sg", &mut ctx) {
        eprintln!("validation failed: {err}");
        std::process::exit(1);
    }
    let root = ctx.plan.root.expect("validated plan has a root");

    if !args.no_optimize {
        let rules = optimizer::default_rules(&OptimizerConfig::default());
        optimizer::optimize(&mut ctx.plan, root, &rules, &catalog, config.optimizer.max_iterations);
    }

    println!("=== EXPLAIN ===");
    println!("{}", serde_json::to_string_pretty(&ctx.plan.describe(root).to_json()).unwrap());

    let exec_ctx = ExecutionContext::new(catalog, storage, &ExecutorConfig::default());
    match executor::execute_plan(&ctx.plan, root, Default::default(), &exec_ctx).await {
        Ok(result) => {
            println!("\n=== ROWS ===");
            println!("columns: {:?}", result.dataset.col_names);
            for row in &result.dataset.rows {
                println!("{:?}", row.values());
            }
        }
        Err(err) => {
            eprintln!("execution failed: {err}");
            std::process::exit(1);
        }
    }
}

fn seed_catalog() -> Catalog {
    let catalog = Catalog::new();
    let mut space = SpaceSchema::new("sg", 1, 4);
    space.edges.insert(
        "knows".into(),
        EdgeSchema { name: "knows".into(), edge_type: 1, props: vec![PropertyDef { name: "since".into(), data_type: DataType::Int }] },
    );
    catalog.refresh(vec![space]);
    catalog
}

fn seed_storage(catalog: Arc<Catalog>) -> InMemoryStorageClient {
    let storage = InMemoryStorageClient::new(catalog, Default::default());
    storage.seed_edge("sg", EdgeKey { src: Value::Int(1), dst: Value::Int(2), edge_type: "knows".into(), rank: 0 }, Default::default());
    storage.seed_edge("sg", EdgeKey { src: Value::Int(1), dst: Value::Int(3), edge_type: "knows".into(), rank: 0 }, Default::default());
    storage
}
