//! Replace a full tag/edge scan guarded only by an existence-style
//! predicate (one a range can't narrow — e.g. `!=`, or a predicate over a
//! column with no usable index range) with a scan of a covering index
//! instead of the base data, when one exists (spec §4.4 `IndexFullScan`).
//! Reading a narrow covering index is cheaper than reading full
//! vertex/edge property blocks even when every row still has to be
//! visited.

use super::super::Rule;
use crate::catalog::{Catalog, IndexOwner};
use crate::plan::{NodeId, Plan, PlanKind};

pub struct IndexFullScan;

impl Rule for IndexFullScan {
    fn name(&self) -> &'static str {
        "IndexFullScan"
    }

    fn try_apply(&self, plan: &mut Plan, node_id: NodeId, catalog: &Catalog) -> bool {
        let scan_id = match &plan.get(node_id).kind {
            PlanKind::Filter { input, .. } => *input,
            _ => return false,
        };
        let (space, owner, owner_name, props) = match &plan.get(scan_id).kind {
            PlanKind::GetVertices { space, tag, tag_props, .. } => {
                (space.clone(), IndexOwner::Tag, tag.clone(), tag_props.clone())
            }
            PlanKind::GetEdges { space, edge_type, edge_props, .. } => {
                (space.clone(), IndexOwner::Edge, edge_type.clone(), edge_props.clone())
            }
            _ => return false,
        };
        if props.is_empty() {
            return false;
        }
        let Some(index) = catalog.find_index_for_columns(&space, owner, &owner_name, &props) else {
            return false;
        };

        let scan_col_names = plan.get(scan_id).col_names.clone();
        plan.replace(
            scan_id,
            PlanKind::IndexScan { space, index_name: index.name, ranges: vec![], limit: None },
            scan_col_names,
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{IndexSchema, SpaceSchema};
    use crate::expression::Expression;
    use crate::value::Value;

    #[test]
    fn replaces_a_covered_vertex_scan_with_an_index_scan() {
        let mut plan = Plan::new();
        let start = plan.make(PlanKind::Start, "$-", vec![]);
        let scan = plan.make(
            PlanKind::GetVertices {
                input: start,
                space: "sg".into(),
                tag: "Person".into(),
                ids: vec![],
                tag_props: vec!["name".into()],
            },
            "$v",
            vec!["name".into()],
        );
        let filter = plan.make(
            PlanKind::Filter {
                input: scan,
                condition: Expression::Constant(Value::Bool(true)),
                need_stable: true,
            },
            "$f",
            vec!["name".into()],
        );
        let catalog = Catalog::new();
        let mut space = SpaceSchema::new("sg", 1, 4);
        space.indexes.insert(
            "by_name".into(),
            IndexSchema {
                name: "by_name".into(),
                id: 1,
                owner: IndexOwner::Tag,
                owner_name: "Person".into(),
                columns: vec!["name".into()],
            },
        );
        catalog.refresh(vec![space]);
        assert!(IndexFullScan.try_apply(&mut plan, filter, &catalog));
        assert_eq!(plan.get(scan).kind_name(), "IndexScan");
    }
}
