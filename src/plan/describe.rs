//! EXPLAIN plan description (spec §6): renders a node and its dependency
//! subgraph into a JSON tree a client can print, independent of the
//! `PlanNode` representation the optimizer mutates.

use super::{Plan, PlanKind, NodeId};
use serde_json::{json, Value as Json};

#[derive(Debug, Clone)]
pub struct PlanDescription {
    pub id: NodeId,
    pub name: &'static str,
    pub output_var: String,
    pub col_names: Vec<String>,
    pub description: Vec<(String, String)>,
    pub children: Vec<PlanDescription>,
}

impl PlanDescription {
    pub fn to_json(&self) -> Json {
        json!({
            "id": self.id,
            "name": self.name,
            "outputVar": self.output_var,
            "colNames": self.col_names,
            "description": self.description.iter().map(|(k, v)| json!({"key": k, "value": v})).collect::<Vec<_>>(),
            "children": self.children.iter().map(PlanDescription::to_json).collect::<Vec<_>>(),
        })
    }
}

impl Plan {
    pub fn describe(&self, id: NodeId) -> PlanDescription {
        let node = self.get(id);
        let description = describe_kind(&node.kind);
        let mut children: Vec<PlanDescription> = node.inputs().iter().map(|&i| self.describe(i)).collect();
        if let PlanKind::Loop { body, .. } = &node.kind {
            children.push(self.describe(*body));
        }
        if let PlanKind::Select { then_body, else_body, .. } = &node.kind {
            children.push(self.describe(*then_body));
            children.push(self.describe(*else_body));
        }
        PlanDescription {
            id: node.id,
            name: node.kind_name(),
            output_var: node.output_var.clone(),
            col_names: node.col_names.clone(),
            description,
            children,
        }
    }
}

fn describe_kind(kind: &PlanKind) -> Vec<(String, String)> {
    match kind {
        PlanKind::Project { yields, .. } => yields
            .iter()
            .map(|(alias, expr)| (alias.clone(), expr.to_string()))
            .collect(),
        PlanKind::Filter { condition, need_stable, .. } => vec![
            ("condition".into(), condition.to_string()),
            ("needStable".into(), need_stable.to_string()),
        ],
        PlanKind::Limit { offset, count, .. } => vec![
            ("offset".into(), offset.to_string()),
            ("count".into(), count.to_string()),
        ],
        PlanKind::OrderBy { order_by, .. } | PlanKind::TopN { order_by, .. } => {
            let mut out: Vec<(String, String)> = order_by
                .iter()
                .map(|(col, order)| (format!("col[{col}]"), format!("{order:?}")))
                .collect();
            if let PlanKind::TopN { offset, limit, .. } = kind {
                out.push(("offset".into(), offset.to_string()));
                out.push(("limit".into(), limit.to_string()));
            }
            out
        }
        PlanKind::InnerJoin { left_keys, right_keys, .. } | PlanKind::LeftJoin { left_keys, right_keys, .. } => {
            vec![
                ("leftKeys".into(), join_exprs(left_keys)),
                ("rightKeys".into(), join_exprs(right_keys)),
            ]
        }
        PlanKind::Aggregate { group_keys, aggregates, .. } => {
            let mut out = vec![("groupKeys".into(), join_exprs(group_keys))];
            out.push((
                "aggregates".into(),
                aggregates
                    .iter()
                    .map(|(f, e)| format!("{f:?}({e})"))
                    .collect::<Vec<_>>()
                    .join(", "),
            ));
            out
        }
        PlanKind::GetNeighbors { space, src_ids, edge_types, filter, direction, .. } => {
            let mut out = vec![
                ("space".into(), space.clone()),
                ("edgeTypes".into(), edge_types.join(",")),
                ("direction".into(), format!("{direction:?}")),
            ];
            if !src_ids.is_empty() {
                out.push((
                    "srcIds".into(),
                    src_ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(","),
                ));
            }
            if let Some(f) = filter {
                out.push(("filter".into(), f.to_string()));
            }
            out
        }
        PlanKind::GetVertices { space, tag, ids, .. } => {
            let mut out = vec![("space".into(), space.clone()), ("tag".into(), tag.clone())];
            if !ids.is_empty() {
                out.push(("ids".into(), ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")));
            }
            out
        }
        PlanKind::GetEdges { space, edge_type, ids, .. } => {
            let mut out = vec![("space".into(), space.clone()), ("edgeType".into(), edge_type.clone())];
            if !ids.is_empty() {
                out.push(("ids".into(), ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")));
            }
            out
        }
        PlanKind::IndexScan { space, index_name, limit, .. } => {
            let mut out = vec![("space".into(), space.clone()), ("index".into(), index_name.clone())];
            if let Some(l) = limit {
                out.push(("limit".into(), l.to_string()));
            }
            out
        }
        PlanKind::Loop { condition, loop_var, accumulator, .. } => vec![
            ("condition".into(), condition.to_string()),
            ("loopVar".into(), loop_var.clone()),
            ("accumulator".into(), accumulator.clone()),
        ],
        PlanKind::VarSource { name } => vec![("name".into(), name.clone())],
        PlanKind::Select { condition, .. } => vec![("condition".into(), condition.to_string())],
        PlanKind::InsertVertices { space, tag, rows, overwrite, .. } => vec![
            ("space".into(), space.clone()),
            ("tag".into(), tag.clone()),
            ("rows".into(), rows.len().to_string()),
            ("overwrite".into(), overwrite.to_string()),
        ],
        PlanKind::InsertEdges { space, edge_type, rows, overwrite, .. } => vec![
            ("space".into(), space.clone()),
            ("edgeType".into(), edge_type.clone()),
            ("rows".into(), rows.len().to_string()),
            ("overwrite".into(), overwrite.to_string()),
        ],
        PlanKind::DeleteVertices { space, ids, .. } => vec![
            ("space".into(), space.clone()),
            ("ids".into(), ids.len().to_string()),
        ],
        PlanKind::DeleteEdges { space, edge_type, keys, .. } => vec![
            ("space".into(), space.clone()),
            ("edgeType".into(), edge_type.clone()),
            ("keys".into(), keys.len().to_string()),
        ],
        PlanKind::Update { space, .. } => vec![("space".into(), space.clone())],
        PlanKind::DeleteTags { space, tags, .. } => vec![
            ("space".into(), space.clone()),
            ("tags".into(), tags.join(",")),
        ],
        PlanKind::CreateSpace { name, part_count } => vec![
            ("name".into(), name.clone()),
            ("partCount".into(), part_count.to_string()),
        ],
        PlanKind::Start
        | PlanKind::PassThrough { .. }
        | PlanKind::Dedup { .. }
        | PlanKind::Union { .. }
        | PlanKind::Intersect { .. }
        | PlanKind::Minus { .. }
        | PlanKind::CartesianProduct { .. }
        | PlanKind::DataCollect { .. }
        | PlanKind::MultiOutputs { .. } => vec![],
    }
}

fn join_exprs(exprs: &[crate::expression::Expression]) -> String {
    exprs.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;
    use crate::value::Value;

    #[test]
    fn describe_walks_dependencies_into_children() {
        let mut plan = Plan::new();
        let start = plan.make(PlanKind::Start, "$-", vec![]);
        let filter = plan.make(
            PlanKind::Filter {
                input: start,
                condition: Expression::Constant(Value::Bool(true)),
                need_stable: false,
            },
            "$f",
            vec!["a".into()],
        );
        let description = plan.describe(filter);
        assert_eq!(description.name, "Filter");
        assert_eq!(description.children.len(), 1);
        assert_eq!(description.children[0].name, "Start");
    }

    #[test]
    fn describe_serializes_to_json_tree() {
        let mut plan = Plan::new();
        let start = plan.make(PlanKind::Start, "$-", vec![]);
        let json = plan.describe(start).to_json();
        assert_eq!(json["name"], "Start");
    }
}
