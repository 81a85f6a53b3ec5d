use crate::ast::{Name, TypeDefinition};
use crate::consts::TYPENAME_FIELD_NAME;
use crate::context::QueryPlanningContext;
use crate::error::{PlanningError, Result};
use crate::helpers::type_name;
use crate::model::{Field, FieldSet, ResponsePath};
use linked_hash_map::LinkedHashMap;

/// One service's share of a plan: the fields it can resolve directly, the
/// input it needs from elsewhere to resolve them, and whatever further
/// fetches depend on this one's result.
#[derive(Debug)]
pub struct FetchGroup<'q> {
    pub service_name: String,
    pub fields: FieldSet<'q>,
    pub required_fields: FieldSet<'q>,
    pub provided_fields: Vec<Name<'q>>,
    pub dependent_groups_by_service: LinkedHashMap<String, FetchGroup<'q>>,
    pub other_dependent_groups: Vec<FetchGroup<'q>>,
    pub merge_at: ResponsePath,
    /// The type `fields` is selected under — the operation root type for a
    /// root group, the entity type for a dependent/key-entered group, or the
    /// field's return type for a `completeField` sub-group. Used only to seed
    /// variable-usage extraction at assembly time; never set for the generic
    /// `init` constructor since callers that need it set it explicitly.
    pub root_type: Option<&'q TypeDefinition<'q>>,
}

impl<'q> FetchGroup<'q> {
    pub fn init(service_name: String) -> FetchGroup<'q> {
        FetchGroup::new(service_name, vec![], vec![])
    }

    pub fn new(service_name: String, merge_at: ResponsePath, provided_fields: Vec<Name<'q>>) -> FetchGroup<'q> {
        FetchGroup {
            service_name,
            merge_at,
            provided_fields,
            fields: vec![],
            required_fields: vec![],
            dependent_groups_by_service: LinkedHashMap::new(),
            other_dependent_groups: vec![],
            root_type: None,
        }
    }

    /// The dependent group fetching from `service`, created on first use.
    /// `required_fields` are recorded as this group's dependency input and
    /// also folded into this group's own selection, so the executor fetches
    /// them before handing off.
    pub fn dependent_group_for_service<'a>(
        &'a mut self,
        service: String,
        required_fields: FieldSet<'q>,
    ) -> &'a mut FetchGroup<'q> {
        let group = self
            .dependent_groups_by_service
            .entry(service.clone())
            .or_insert_with(|| FetchGroup::init(service));

        if group.merge_at.is_empty() {
            group.merge_at = self.merge_at.clone();
        }

        if !required_fields.is_empty() {
            if group.root_type.is_none() {
                group.root_type = required_fields.first().map(|f| f.parent_type);
            }
            group.required_fields.extend_from_slice(&required_fields);
            self.fields.extend(required_fields);
        }

        group
    }
}

/// Strategy for routing one field into a `FetchGroup`, varying by where in
/// the operation the field sits: parallel/serial for root fields, dependency
/// aware for subfields of an already-placed parent.
pub trait GroupForField<'q> {
    fn group_for_field<'a>(
        &'a mut self,
        parent_type: &'q TypeDefinition<'q>,
        field: &Field<'q>,
    ) -> Result<&'a mut FetchGroup<'q>>;

    fn into_groups(self) -> Vec<FetchGroup<'q>>;
}

/// Routes root query fields: every distinct owning service gets its own
/// group, and all groups run in parallel.
pub struct ParallelGroupForField<'c, 'q> {
    context: &'c QueryPlanningContext<'q>,
    groups_map: LinkedHashMap<String, FetchGroup<'q>>,
}

impl<'c, 'q> ParallelGroupForField<'c, 'q> {
    pub fn new(context: &'c QueryPlanningContext<'q>) -> Self {
        Self {
            context,
            groups_map: LinkedHashMap::new(),
        }
    }
}

impl<'c, 'q> GroupForField<'q> for ParallelGroupForField<'c, 'q> {
    fn group_for_field<'a>(
        &'a mut self,
        parent_type: &'q TypeDefinition<'q>,
        field: &Field<'q>,
    ) -> Result<&'a mut FetchGroup<'q>> {
        let service_name = self
            .context
            .get_owning_service(type_name(parent_type), field.field_def.name)?
            .to_string();

        Ok(self
            .groups_map
            .entry(service_name.clone())
            .or_insert_with(|| FetchGroup::init(service_name)))
    }

    fn into_groups(self) -> Vec<FetchGroup<'q>> {
        self.groups_map.into_iter().map(|(_, v)| v).collect()
    }
}

/// Routes root mutation fields: a new group starts only when the owning
/// service changes from the previous field, so consecutive same-service
/// mutations share one fetch and the groups as a whole run in sequence.
pub struct SerialGroupForField<'c, 'q> {
    context: &'c QueryPlanningContext<'q>,
    groups: Vec<FetchGroup<'q>>,
}

impl<'c, 'q> SerialGroupForField<'c, 'q> {
    pub fn new(context: &'c QueryPlanningContext<'q>) -> Self {
        Self {
            context,
            groups: vec![],
        }
    }
}

impl<'c, 'q> GroupForField<'q> for SerialGroupForField<'c, 'q> {
    fn group_for_field<'a>(
        &'a mut self,
        parent_type: &'q TypeDefinition<'q>,
        field: &Field<'q>,
    ) -> Result<&'a mut FetchGroup<'q>> {
        let service_name = self
            .context
            .get_owning_service(type_name(parent_type), field.field_def.name)?
            .to_string();

        match self.groups.last() {
            Some(group) if group.service_name == service_name => (),
            _ => self.groups.push(FetchGroup::init(service_name)),
        }

        Ok(self.groups.last_mut().unwrap())
    }

    fn into_groups(self) -> Vec<FetchGroup<'q>> {
        self.groups
    }
}

/// Routes a non-root field into (or out of) its parent's group, per §4.4
/// item 2: value types and base-service fields that the parent already
/// fetched or was provided stay put; everything else spins off a dependent
/// fetch, possibly via an intermediate key fetch against the base service.
pub struct GroupForSubField<'c, 'q> {
    context: &'c QueryPlanningContext<'q>,
    parent_group: FetchGroup<'q>,
}

impl<'c, 'q> GroupForSubField<'c, 'q> {
    pub fn new(context: &'c QueryPlanningContext<'q>, parent_group: FetchGroup<'q>) -> Self {
        Self {
            context,
            parent_group,
        }
    }
}

impl<'c, 'q> GroupForField<'q> for GroupForSubField<'c, 'q> {
    fn group_for_field<'a>(
        &'a mut self,
        parent_type: &'q TypeDefinition<'q>,
        field: &Field<'q>,
    ) -> Result<&'a mut FetchGroup<'q>> {
        let field_def = &field.field_def;

        if field_def.name == TYPENAME_FIELD_NAME {
            return Ok(&mut self.parent_group);
        }

        let parent_type_name = type_name(parent_type);

        let (base_service, owning_service) = if self.context.schema.metadata.is_value_type(parent_type_name) {
            (
                self.parent_group.service_name.clone(),
                self.parent_group.service_name.clone(),
            )
        } else {
            (
                self.context.get_base_service(parent_type_name)?.to_string(),
                self.context
                    .get_owning_service(parent_type_name, field_def.name)?
                    .to_string(),
            )
        };

        if owning_service == base_service {
            if owning_service == self.parent_group.service_name
                || self
                    .parent_group
                    .provided_fields.contains(&field_def.name)
            {
                return Ok(&mut self.parent_group);
            }

            let key_fields = self.context.get_key_fields(parent_type, &self.parent_group.service_name);
            let key_fields = if key_fields.len() == 1 && key_fields[0].field_def.name == TYPENAME_FIELD_NAME {
                // The parent service has no `@key` for this type; fall back
                // to the owning service's own keys.
                self.context.get_key_fields(parent_type, &owning_service)
            } else {
                key_fields
            };

            Ok(self.parent_group.dependent_group_for_service(owning_service, key_fields))
        } else {
            let required_fields = self.context.get_required_fields(parent_type, field_def, &owning_service)?;

            let all_required_fields_are_provided = required_fields.iter().all(|required_field| {
                self.parent_group
                    .provided_fields.contains(&required_field.field_def.name)
            });

            if all_required_fields_are_provided {
                if owning_service == self.parent_group.service_name {
                    Ok(&mut self.parent_group)
                } else {
                    Ok(self
                        .parent_group
                        .dependent_group_for_service(owning_service, required_fields))
                }
            } else if base_service == self.parent_group.service_name {
                Ok(self
                    .parent_group
                    .dependent_group_for_service(owning_service, required_fields))
            } else {
                let key_fields = self.context.get_key_fields(parent_type, &self.parent_group.service_name);
                if key_fields.len() == 1 && key_fields[0].field_def.name == TYPENAME_FIELD_NAME {
                    return Err(PlanningError::MissingKeys {
                        parent_type: type_name(parent_type).to_string(),
                        service: self.parent_group.service_name.clone(),
                    });
                }

                Ok(self
                    .parent_group
                    .dependent_group_for_service(base_service, key_fields)
                    .dependent_group_for_service(owning_service, required_fields))
            }
        }
    }

    fn into_groups(self) -> Vec<FetchGroup<'q>> {
        vec![self.parent_group]
    }
}
