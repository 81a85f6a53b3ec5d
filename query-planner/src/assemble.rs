use crate::ast::{InlineFragment, QueryField, Selection, SelectionSet, TypeCondition};
use crate::context::QueryPlanningContext;
use crate::error::Result;
use crate::groups::FetchGroup;
use crate::helpers::Head;
use crate::model::{group_by_parent_type, group_by_response_name, FetchNode, FieldSet, FlattenNode, ParallelNode, PlanNode, SequenceNode};

/// Renders a `FieldSet` back into a GraphQL selection set, per §4.5: entries
/// sharing (response name, parent type) are merged by concatenating their
/// subselections; entries sharing only a response name are each wrapped in
/// an inline fragment guarded by their own parent type.
pub fn render_fields<'q>(fields: &FieldSet<'q>) -> SelectionSet<'q> {
    let mut items = Vec::new();

    for (_, same_response_name) in group_by_response_name(fields.clone()) {
        let by_parent_type = group_by_parent_type(same_response_name);

        if by_parent_type.len() == 1 {
            let (_, same_parent_type) = by_parent_type.into_iter().next().unwrap();
            items.push(Selection::Field(merge_field_nodes(same_parent_type)));
        } else {
            for (type_name, same_parent_type) in by_parent_type {
                let merged = merge_field_nodes(same_parent_type);
                items.push(Selection::InlineFragment(InlineFragment {
                    position: crate::ast::pos(),
                    type_condition: Some(TypeCondition::On(type_name)),
                    directives: vec![],
                    selection_set: SelectionSet {
                        span: crate::ast::span(),
                        items: vec![Selection::Field(merged)],
                    },
                }));
            }
        }
    }

    SelectionSet {
        span: crate::ast::span(),
        items,
    }
}

/// Concatenates the subselections of every entry sharing (response name,
/// parent type) onto the first entry's node; alias, arguments, and
/// directives come from that first entry, per §4.5.
fn merge_field_nodes<'q>(fields: FieldSet<'q>) -> QueryField<'q> {
    let (first, rest) = fields.head();
    let mut node = first.field_node;
    for other in rest {
        node.selection_set.items.extend(other.field_node.selection_set.items);
    }
    node
}

fn render_fields_to_string<'q>(fields: &FieldSet<'q>) -> String {
    render_fields(fields).to_string()
}

/// Builds the `PlanNode` for one fetch group and its dependents, per §4.5:
/// a `Fetch`, wrapped in `Flatten` when it applies at a nested path, then
/// composed with its dependent groups (if any) into a `Sequence`.
pub fn execution_node_for_group<'q>(context: &QueryPlanningContext<'q>, group: FetchGroup<'q>) -> Result<PlanNode> {
    let selection_set_text = render_fields_to_string(&group.fields);

    let requires = if group.required_fields.is_empty() {
        None
    } else {
        Some(render_fields_to_string(&group.required_fields))
    };

    let variable_usages = match group.root_type {
        Some(root_type) => {
            let rendered = render_fields(&group.fields);
            context
                .get_variable_usages(root_type, &rendered)?
                .into_iter()
                .map(|(name, _)| name.to_string())
                .collect()
        }
        None => vec![],
    };

    let fetch = PlanNode::Fetch(FetchNode {
        service_name: group.service_name.clone(),
        selection_set: selection_set_text,
        requires,
        variable_usages,
    });

    let merge_at = group.merge_at.clone();
    let fetch = if merge_at.is_empty() {
        fetch
    } else {
        PlanNode::Flatten(FlattenNode {
            path: merge_at,
            node: Box::new(fetch),
        })
    };

    let mut dependents = Vec::new();
    for (_, dependent) in group.dependent_groups_by_service {
        dependents.push(execution_node_for_group(context, dependent)?);
    }
    for dependent in group.other_dependent_groups {
        dependents.push(execution_node_for_group(context, dependent)?);
    }

    if dependents.is_empty() {
        Ok(fetch)
    } else {
        let dependents_node = if dependents.len() == 1 {
            dependents.into_iter().next().unwrap()
        } else {
            PlanNode::Parallel(ParallelNode { nodes: dependents })
        };
        Ok(PlanNode::Sequence(SequenceNode {
            nodes: vec![fetch, dependents_node],
        }))
    }
}

/// Wraps per-service root groups into the plan's root node: `Parallel` for
/// queries (or the bare node when there is only one), `Sequence` for
/// mutations.
pub fn wrap_root_groups<'q>(
    context: &QueryPlanningContext<'q>,
    groups: Vec<FetchGroup<'q>>,
    serial: bool,
) -> Result<Option<PlanNode>> {
    if groups.is_empty() {
        return Ok(None);
    }

    let mut nodes = Vec::with_capacity(groups.len());
    for group in groups {
        nodes.push(execution_node_for_group(context, group)?);
    }

    if nodes.len() == 1 {
        return Ok(Some(nodes.into_iter().next().unwrap()));
    }

    Ok(Some(if serial {
        PlanNode::Sequence(SequenceNode { nodes })
    } else {
        PlanNode::Parallel(ParallelNode { nodes })
    }))
}
