use crate::ast::{named_type_name, TypeDefinition};
use crate::collect::collect_subfields;
use crate::consts::{is_introspection_field, is_introspection_type};
use crate::context::QueryPlanningContext;
use crate::error::Result;
use crate::groups::{FetchGroup, GroupForField, GroupForSubField, ParallelGroupForField, SerialGroupForField};
use crate::helpers::Head;
use crate::model::{self, add_path, group_by_match, group_by_parent_type, group_by_response_name, Field, FieldSet, ResponsePath};

/// Partitions a `FieldSet` into fetch groups using `group_selector` to pick,
/// for each field, which group should resolve it. Fields sharing a response
/// name are handled together so their subselections end up merged on the
/// representative entry the caller appends.
pub fn split_fields<'q, G: GroupForField<'q>>(
    context: &QueryPlanningContext<'q>,
    path: &ResponsePath,
    fields: FieldSet<'q>,
    group_selector: &mut G,
) -> Result<()> {
    for (_, same_response_name) in group_by_response_name(fields) {
        for (_, same_parent_type) in group_by_parent_type(same_response_name) {
            for same_shape in group_by_match(same_parent_type) {
                let (representative, _) = same_shape.clone().head();

                if model::is_typename(representative.field_node.name) {
                    continue;
                }
                if is_introspection_field(representative.field_node.name) {
                    continue;
                }
                if is_introspection_type(named_type_name(&representative.field_def.field_type)) {
                    continue;
                }

                match representative.parent_type {
                    TypeDefinition::Object(_) => {
                        let group = group_selector.group_for_field(representative.parent_type, &representative)?;
                        let completed = complete_field(context, path, group, representative, &same_shape)?;
                        group.fields.push(completed);
                    }
                    _ => split_abstract_field(context, path, group_selector, representative, &same_shape)?,
                }
            }
        }
    }
    Ok(())
}

/// Handles a field selected directly on an interface or union: each possible
/// concrete type may resolve the field through a different service, so the
/// field is re-split once per concrete type, guarded by its own parent type.
///
/// This always emits one entry per concrete type rather than collapsing to a
/// single bare entry when every concrete type happens to route to the same
/// group (the optimization §4.4 item 3 describes) — the renderer already
/// wraps differing-parent-type entries in inline fragments, so the emitted
/// plan is correct either way, just more verbose than the collapsed form.
fn split_abstract_field<'q, G: GroupForField<'q>>(
    context: &QueryPlanningContext<'q>,
    path: &ResponsePath,
    group_selector: &mut G,
    representative: Field<'q>,
    siblings: &FieldSet<'q>,
) -> Result<()> {
    for concrete in context.get_possible_types(representative.parent_type) {
        let concrete_type = match context.schema.type_by_name(concrete.name) {
            Some(t) => t,
            None => continue,
        };
        let field_def = context.get_field_def(concrete_type, &representative.field_node)?;
        let field = Field {
            parent_type: concrete_type,
            field_node: representative.field_node.clone(),
            field_def,
        };

        let group = group_selector.group_for_field(concrete_type, &field)?;
        let completed = complete_field(context, path, group, field, siblings)?;
        group.fields.push(completed);
    }
    Ok(())
}

/// Root-field splitting for queries: every root field joins its owning
/// service's group, and all groups are later wrapped in `Parallel`.
pub fn split_root_fields<'q>(
    context: &QueryPlanningContext<'q>,
    root_type: &'q TypeDefinition<'q>,
    fields: FieldSet<'q>,
) -> Result<Vec<FetchGroup<'q>>> {
    let mut selector = ParallelGroupForField::new(context);
    split_fields(context, &vec![], fields, &mut selector)?;
    Ok(selector
        .into_groups()
        .into_iter()
        .map(|mut g| {
            g.root_type = Some(root_type);
            g
        })
        .collect())
}

/// Root-field splitting for mutations: a new group starts only when the
/// owning service changes from the previous field, preserving source order.
pub fn split_root_fields_serially<'q>(
    context: &QueryPlanningContext<'q>,
    root_type: &'q TypeDefinition<'q>,
    fields: FieldSet<'q>,
) -> Result<Vec<FetchGroup<'q>>> {
    let mut selector = SerialGroupForField::new(context);
    split_fields(context, &vec![], fields, &mut selector)?;
    Ok(selector
        .into_groups()
        .into_iter()
        .map(|mut g| {
            g.root_type = Some(root_type);
            g
        })
        .collect())
}

/// Splits the subfields of an already-placed composite field into
/// `parent_group` and whatever dependent groups the federation routing rules
/// (`GroupForSubField`) require; any dependents created are lifted onto
/// `parent_group.other_dependent_groups` by the caller (`complete_field`).
pub fn split_subfields<'q>(
    context: &QueryPlanningContext<'q>,
    path: &ResponsePath,
    fields: FieldSet<'q>,
    parent_group: FetchGroup<'q>,
) -> Result<FetchGroup<'q>> {
    let mut selector = GroupForSubField::new(context, parent_group);
    split_fields(context, path, fields, &mut selector)?;
    let (group, _) = selector.into_groups().head();
    Ok(group)
}

/// Finishes a representative field after it has been routed to a group:
/// leaf fields pass through unchanged; composite fields get a fresh
/// sub-group, have their subfields recursively split, and end up with their
/// `selection_set` replaced by the sub-group's fields rendered as GraphQL
/// text (the assembler does the actual rendering at emission time — here we
/// just thread the sub-group's fields back onto the node's selection set).
fn complete_field<'q>(
    context: &QueryPlanningContext<'q>,
    path: &ResponsePath,
    parent_group: &mut FetchGroup<'q>,
    field: Field<'q>,
    siblings: &FieldSet<'q>,
) -> Result<Field<'q>> {
    let return_type_name = named_type_name(&field.field_def.field_type);
    let return_type = context.schema.type_by_name(return_type_name);

    let return_type = match return_type {
        Some(t @ TypeDefinition::Object(_)) | Some(t @ TypeDefinition::Interface(_)) | Some(t @ TypeDefinition::Union(_)) => t,
        _ => return Ok(field),
    };

    let response_name = field.response_name();
    let field_path = add_path(path.clone(), response_name, &field.field_def.field_type);

    let provided_fields = context.get_provided_fields(field.parent_type, &field.field_def, &parent_group.service_name)?;
    let provided_field_names = provided_fields.iter().map(|f| f.field_def.name).collect();

    let mut sub_group = FetchGroup::new(parent_group.service_name.clone(), field_path.clone(), provided_field_names);
    sub_group.root_type = Some(return_type);

    let is_abstract = matches!(return_type, TypeDefinition::Interface(_) | TypeDefinition::Union(_));
    if is_abstract {
        sub_group.fields.push(model::typename_field(return_type));
    }

    let subfields = collect_subfields(context, return_type, siblings)?;
    let sub_group = split_subfields(context, &field_path, subfields, sub_group)?;

    let rendered = crate::assemble::render_fields(&sub_group.fields);

    parent_group.other_dependent_groups.extend(sub_group.dependent_groups_by_service.into_iter().map(|(_, g)| g));
    parent_group.other_dependent_groups.extend(sub_group.other_dependent_groups);

    let mut field_node = field.field_node;
    field_node.selection_set = rendered;

    Ok(Field {
        parent_type: field.parent_type,
        field_node,
        field_def: field.field_def,
    })
}
