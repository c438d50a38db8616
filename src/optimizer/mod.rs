//! Rule-based optimizer (spec §4.4, component C7): rewrites the plan DAG
//! bottom-up to a fixed point, bounded by `OptimizerConfig::max_iterations`
//! as a safety cap against a rule cycle.
//!
//! Each [`Rule`] is a pattern match against one node (plus, where a rule
//! needs schema facts, the catalog) and an in-place rewrite through
//! [`Plan::replace`]/[`Plan::make`] — never a full tree rebuild, mirroring
//! how `original_source`'s `Optimizer::doOptimize` walks a plan applying
//! one `OptRule` at a time until nothing changes.

pub mod rules;

use crate::catalog::Catalog;
use crate::config::OptimizerConfig;
use crate::plan::{NodeId, Plan};

/// A single rewrite rule. `try_apply` returns whether it fired; rules
/// mutate `plan` directly rather than returning a new tree, since node ids
/// must stay stable for any sibling edges not touched by the rewrite.
pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;
    fn try_apply(&self, plan: &mut Plan, node_id: NodeId, catalog: &Catalog) -> bool;
}

pub fn default_rules(config: &OptimizerConfig) -> Vec<Box<dyn Rule>> {
    let mut rs: Vec<Box<dyn Rule>> = vec![Box::new(rules::CollapseProject)];
    if config.enable_filter_pushdown {
        rs.push(Box::new(rules::PushFilterDownGetNeighbors));
        rs.push(Box::new(rules::PushFilterDownLeftJoin));
        rs.push(Box::new(rules::PushFilterDownAggregate));
    }
    if config.enable_index_selection {
        rs.push(Box::new(rules::OptimizeTagIndexScanByFilter));
        rs.push(Box::new(rules::IndexFullScan));
    }
    if config.enable_topn_pushdown {
        rs.push(Box::new(rules::PushTopNDownIndexRangeScan));
    }
    rs
}

/// Run every rule against every reachable node, bottom-up, until a full
/// pass makes no change or `max_iterations` passes have run.
pub fn optimize(plan: &mut Plan, root: NodeId, rule_set: &[Box<dyn Rule>], catalog: &Catalog, max_iterations: usize) {
    for iteration in 0..max_iterations {
        let mut changed = false;
        for node_id in plan.topological_order(root) {
            for rule in rule_set {
                if rule.try_apply(plan, node_id, catalog) {
                    tracing::debug!(rule = rule.name(), node_id, iteration, "optimizer rule fired");
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptimizerConfig;
    use crate::expression::Expression;
    use crate::plan::PlanKind;
    use crate::value::Value;

    #[test]
    fn optimize_terminates_within_iteration_cap_on_a_stable_plan() {
        let mut plan = Plan::new();
        let start = plan.make(PlanKind::Start, "$-", vec![]);
        let filter = plan.make(
            PlanKind::Filter {
                input: start,
                condition: Expression::Constant(Value::Bool(true)),
                need_stable: false,
            },
            "$f",
            vec![],
        );
        let catalog = Catalog::new();
        let config = OptimizerConfig::default();
        let rule_set = default_rules(&config);
        optimize(&mut plan, filter, &rule_set, &catalog, config.max_iterations);
        assert_eq!(plan.get(filter).kind_name(), "Filter");
    }
}
