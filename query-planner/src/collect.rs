use crate::ast::{Name, Selection, SelectionSet, TypeDefinition, TypeCondition};
use crate::context::QueryPlanningContext;
use crate::error::Result;
use crate::model::{Field, FieldSet};
use std::collections::HashSet;

/// Flattens a selection set into a `FieldSet`: field selections are
/// appended directly, inline fragments recurse under their type condition
/// (or the current parent type if none), and named fragment spreads are
/// resolved through the operation's fragment map. Each fragment name expands
/// at most once per call, via `visited_fragments`, which prevents cycles.
/// Unknown fragment names are silently skipped — validating that every spread
/// resolves is the composer's job, not the planner's.
pub fn collect_fields<'q>(
    context: &QueryPlanningContext<'q>,
    parent_type: &'q TypeDefinition<'q>,
    selection_set: &SelectionSet<'q>,
    acc: &mut FieldSet<'q>,
    visited_fragments: &mut HashSet<Name<'q>>,
) -> Result<()> {
    for selection in &selection_set.items {
        match selection {
            Selection::Field(field_node) => {
                let field_def = context.get_field_def(parent_type, field_node)?;
                acc.push(Field {
                    parent_type,
                    field_node: field_node.clone(),
                    field_def,
                });
            }
            Selection::InlineFragment(frag) => {
                let target_type = resolve_type_condition(context, &frag.type_condition, parent_type);
                collect_fields(context, target_type, &frag.selection_set, acc, visited_fragments)?;
            }
            Selection::FragmentSpread(spread) => {
                if !visited_fragments.insert(spread.fragment_name) {
                    continue;
                }
                if let Some(frag_def) = context.operation_context.fragments.get(spread.fragment_name) {
                    let target_type = context
                        .schema
                        .type_by_name(type_condition_name(&frag_def.type_condition))
                        .unwrap_or(parent_type);
                    collect_fields(context, target_type, &frag_def.selection_set, acc, visited_fragments)?;
                }
            }
        }
    }
    Ok(())
}

/// Collapses subfields from every input field's subselection under the
/// nominal `return_type`, sharing one `visited_fragments` set across all
/// inputs. This deliberately loses per-runtime-type parent information: the
/// splitter re-derives runtime types when it recurses into the collapsed set.
pub fn collect_subfields<'q>(
    context: &QueryPlanningContext<'q>,
    return_type: &'q TypeDefinition<'q>,
    fields: &FieldSet<'q>,
) -> Result<FieldSet<'q>> {
    let mut acc = Vec::new();
    let mut visited_fragments = HashSet::new();
    for field in fields {
        collect_fields(
            context,
            return_type,
            &field.field_node.selection_set,
            &mut acc,
            &mut visited_fragments,
        )?;
    }
    Ok(acc)
}

fn resolve_type_condition<'q>(
    context: &QueryPlanningContext<'q>,
    type_condition: &Option<TypeCondition<'q>>,
    default: &'q TypeDefinition<'q>,
) -> &'q TypeDefinition<'q> {
    match type_condition {
        Some(tc) => context
            .schema
            .type_by_name(type_condition_name(tc))
            .unwrap_or(default),
        None => default,
    }
}

fn type_condition_name<'q>(tc: &TypeCondition<'q>) -> Name<'q> {
    let TypeCondition::On(name) = tc;
    name
}
