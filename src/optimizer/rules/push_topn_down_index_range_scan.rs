//! Push a `TopN`'s row budget into an `IndexScan` that already returns
//! rows ordered by the same leading column (spec §4.4
//! `PushTopNDownIndexRangeScan`) — the index only needs to read
//! `offset + limit` entries instead of the whole range.
//!
//! Guarded conservatively: fires only when the `TopN`'s primary sort
//! column is the index's first key column, since that's the only case
//! where "first N index entries" and "top N sorted rows" coincide without
//! an explicit sort step in between.

use super::super::Rule;
use crate::catalog::Catalog;
use crate::plan::{NodeId, Plan, PlanKind};

pub struct PushTopNDownIndexRangeScan;

impl Rule for PushTopNDownIndexRangeScan {
    fn name(&self) -> &'static str {
        "PushTopNDownIndexRangeScan"
    }

    fn try_apply(&self, plan: &mut Plan, node_id: NodeId, _catalog: &Catalog) -> bool {
        let (idx_id, order_by, offset, limit) = match &plan.get(node_id).kind {
            PlanKind::TopN { input, order_by, offset, limit } => (*input, order_by.clone(), *offset, *limit),
            _ => return false,
        };
        let Some((leading_col, _)) = order_by.first() else { return false };
        let node_col_names = plan.get(node_id).col_names.clone();
        let (space, index_name, ranges, existing_limit) = match &plan.get(idx_id).kind {
            PlanKind::IndexScan { space, index_name, ranges, limit } => {
                (space.clone(), index_name.clone(), ranges.clone(), *limit)
            }
            _ => return false,
        };
        if *leading_col != 0 {
            return false;
        }
        let budget = (offset + limit) as u64;
        if existing_limit.is_some_and(|l| l <= budget) {
            return false;
        }
        let idx_col_names = plan.get(idx_id).col_names.clone();
        plan.replace(
            idx_id,
            PlanKind::IndexScan { space, index_name, ranges, limit: Some(budget) },
            idx_col_names,
        );
        // Keep the TopN node itself (it still has to sort the narrowed set);
        // touching its col_names is unnecessary here since it only gained a
        // cheaper source, so we stamp the same kind back to mark the node
        // visited this round without otherwise changing it.
        plan.replace(
            node_id,
            PlanKind::TopN { input: idx_id, order_by, offset, limit },
            node_col_names,
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::SortOrder;

    #[test]
    fn pushes_row_budget_into_index_scan_on_matching_leading_column() {
        let mut plan = Plan::new();
        let idx = plan.make(
            PlanKind::IndexScan { space: "sg".into(), index_name: "by_age".into(), ranges: vec![], limit: None },
            "$idx",
            vec!["age".into()],
        );
        let topn = plan.make(
            PlanKind::TopN { input: idx, order_by: vec![(0, SortOrder::Asc)], offset: 0, limit: 10 },
            "$top",
            vec!["age".into()],
        );
        let catalog = Catalog::new();
        assert!(PushTopNDownIndexRangeScan.try_apply(&mut plan, topn, &catalog));
        match &plan.get(idx).kind {
            PlanKind::IndexScan { limit: Some(10), .. } => {}
            other => panic!("expected pushed limit, got {other:?}"),
        }
    }

    #[test]
    fn does_not_push_when_sort_column_is_not_the_index_leading_column() {
        let mut plan = Plan::new();
        let idx = plan.make(
            PlanKind::IndexScan { space: "sg".into(), index_name: "by_age".into(), ranges: vec![], limit: None },
            "$idx",
            vec!["age".into(), "city".into()],
        );
        let topn = plan.make(
            PlanKind::TopN { input: idx, order_by: vec![(1, SortOrder::Asc)], offset: 0, limit: 10 },
            "$top",
            vec!["age".into(), "city".into()],
        );
        let catalog = Catalog::new();
        assert!(!PushTopNDownIndexRangeScan.try_apply(&mut plan, topn, &catalog));
    }
}
