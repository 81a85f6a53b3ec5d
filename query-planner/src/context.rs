use crate::ast::{
    self, FragmentDefinition, Name, Operation, QueryDocument, SchemaDocument, Selection,
    SelectionSet, TypeCondition, TypeDefinition, Value,
};
use crate::consts::{is_introspection_field, TYPENAME_FIELD_NAME};
use crate::error::{PlanningError, Result};
use crate::helpers::{get_operations, type_name, Op};
use crate::model::{self, typename_field_def, Field, FieldSet};
use crate::schema::FederationSchema;
use graphql_parser::query::Definition as QueryDefinitionItem;
use linked_hash_map::LinkedHashMap;
use std::cell::RefCell;
use std::collections::HashMap;

/// The resolved operation a plan is being built for, plus every fragment
/// definition in the document it may reference. Built once per planning call
/// by [`build_operation_context`].
pub struct OperationContext<'q> {
    pub schema: &'q SchemaDocument<'q>,
    pub query_document: &'q QueryDocument<'q>,
    pub operation: Op<'q>,
    pub fragments: LinkedHashMap<Name<'q>, &'q FragmentDefinition<'q>>,
}

/// Picks the operation a plan should be built for, per §4.1: the sole
/// operation if there is exactly one, the named operation if `operation_name`
/// is given, and an error otherwise. Subscriptions are rejected outright —
/// the planner has no notion of a standing, incremental fetch.
#[tracing::instrument(skip_all, fields(operation_name))]
pub fn build_operation_context<'q>(
    schema: &'q SchemaDocument<'q>,
    query_document: &'q QueryDocument<'q>,
    operation_name: Option<&str>,
) -> Result<OperationContext<'q>> {
    let operations = get_operations(query_document);

    let operation = match operation_name {
        Some(name) => operations
            .into_iter()
            .find(|op| op.name == Some(name))
            .ok_or_else(|| PlanningError::UnknownOperation(name.to_string()))?,
        None => {
            let (op, rest) = match operations.len() {
                0 => return Err(PlanningError::MissingOperation),
                _ => {
                    let mut iter = operations.into_iter();
                    let first = iter.next().unwrap();
                    (first, iter.collect::<Vec<_>>())
                }
            };
            if !rest.is_empty() {
                return Err(PlanningError::AmbiguousOperation);
            }
            op
        }
    };

    if operation.kind == Operation::Subscription {
        tracing::warn!("rejecting subscription operation");
        return Err(PlanningError::SubscriptionsUnsupported);
    }

    let fragments = query_document
        .definitions
        .iter()
        .filter_map(|d| match d {
            QueryDefinitionItem::Fragment(f) => Some((f.name, f)),
            QueryDefinitionItem::Operation(_) => None,
        })
        .collect();

    Ok(OperationContext {
        schema,
        query_document,
        operation,
        fragments,
    })
}

/// Everything the splitter and assembler need while building one plan:
/// the resolved operation, the composed schema, and memoized lookups that
/// would otherwise be recomputed for every field in every group.
pub struct QueryPlanningContext<'q> {
    pub operation_context: &'q OperationContext<'q>,
    pub schema: &'q FederationSchema<'q>,
    key_fields_cache: RefCell<HashMap<(Name<'q>, String), FieldSet<'q>>>,
}

/// A variable reference found while walking a selection set, resolved to the
/// argument's declared input type and effective default.
#[derive(Debug, Clone)]
pub struct VariableUsage<'q> {
    pub name: Name<'q>,
    pub input_type: ast::GqlType<'q>,
    pub default_value: Option<Value<'q>>,
}

impl<'q> QueryPlanningContext<'q> {
    pub fn new(operation_context: &'q OperationContext<'q>, schema: &'q FederationSchema<'q>) -> Self {
        Self {
            operation_context,
            schema,
            key_fields_cache: RefCell::new(HashMap::new()),
        }
    }

    /// Resolves a query-document field to its schema definition. `__typename`
    /// is synthesized rather than looked up: every composite type supports it
    /// implicitly, with no entry of its own in the schema's field list.
    pub fn get_field_def(
        &self,
        parent_type: &'q TypeDefinition<'q>,
        field_node: &ast::QueryField<'q>,
    ) -> Result<ast::SchemaField<'q>> {
        if field_node.name == TYPENAME_FIELD_NAME {
            return Ok(typename_field_def());
        }
        // `__schema`/`__type` aren't declared on any type in the schema
        // document (the planner doesn't model the introspection type
        // system), so they're synthesized the same way `__typename` is.
        // `split_fields` drops them before their `field_type` is ever
        // inspected, so the placeholder's return type is never used.
        if is_introspection_field(field_node.name) {
            return Ok(typename_field_def());
        }

        let fields: &[ast::SchemaField<'q>] = match parent_type {
            TypeDefinition::Object(t) => &t.fields,
            TypeDefinition::Interface(t) => &t.fields,
            _ => &[],
        };

        fields
            .iter()
            .find(|f| f.name == field_node.name)
            .cloned()
            .ok_or_else(|| PlanningError::UnknownField {
                parent_type: type_name(parent_type).to_string(),
                field: field_node.name.to_string(),
            })
    }

    pub fn get_possible_types(&self, type_def: &'q TypeDefinition<'q>) -> Vec<&'q ast::ObjectType<'q>> {
        self.schema.possible_types(type_def)
    }

    pub fn get_base_service(&self, type_name: &str) -> Result<&str> {
        self.schema
            .metadata
            .base_service(type_name)
            .ok_or_else(|| PlanningError::MissingBaseService {
                parent_type: type_name.to_string(),
            })
    }

    pub fn get_owning_service(&self, parent_type_name: &'q str, field_name: &'q str) -> Result<&str> {
        self.schema
            .metadata
            .owning_service(parent_type_name, field_name)
            .ok_or_else(|| PlanningError::MissingOwningService {
                parent_type: parent_type_name.to_string(),
                field: field_name.to_string(),
            })
    }

    /// The `__typename` plus first declared key selection for `parent_type`
    /// on `service`, memoized per `(type, service)` pair. An object with no
    /// declared keys on that service yields just `__typename` — callers that
    /// need a real key should check [`FederationMetadata::keys`] first.
    pub fn get_key_fields(&self, parent_type: &'q TypeDefinition<'q>, service: &str) -> FieldSet<'q> {
        let cache_key = (type_name(parent_type), service.to_string());
        if let Some(cached) = self.key_fields_cache.borrow().get(&cache_key) {
            return cached.clone();
        }

        let mut fields = vec![model::typename_field(parent_type)];

        for object in self.get_possible_types(parent_type) {
            let object_type = match self.schema.type_by_name(object.name) {
                Some(t) => t,
                None => continue,
            };
            if let Some(keys) = self.schema.metadata.keys(object.name, service) {
                if let Some(first_key) = keys.first() {
                    if let Ok(expanded) = self.expand_selection_fields(object_type, first_key) {
                        fields.extend(expanded);
                    }
                }
            }
        }

        self.key_fields_cache.borrow_mut().insert(cache_key, fields.clone());
        fields
    }

    /// The fields a dependent fetch must carry along as input, per §3's
    /// `@requires`: the type's key fields, plus whatever extra selection the
    /// field declares it needs.
    pub fn get_required_fields(
        &self,
        parent_type: &'q TypeDefinition<'q>,
        field_def: &ast::SchemaField<'q>,
        service: &str,
    ) -> Result<FieldSet<'q>> {
        let mut fields = self.get_key_fields(parent_type, service);
        if let Some(requires) = self.schema.metadata.requires(type_name(parent_type), field_def.name) {
            fields.extend(self.expand_selection_fields(parent_type, requires)?);
        }
        Ok(fields)
    }

    /// The fields a field's owning service can answer inline without a
    /// further fetch, per §3's `@provides`: the return type's key fields,
    /// plus whatever extra selection the field declares it provides.
    pub fn get_provided_fields(
        &self,
        parent_type: &'q TypeDefinition<'q>,
        field_def: &ast::SchemaField<'q>,
        service: &str,
    ) -> Result<FieldSet<'q>> {
        let return_type_name = ast::named_type_name(&field_def.field_type);
        let return_type = match self.schema.type_by_name(return_type_name) {
            Some(t @ TypeDefinition::Object(_))
            | Some(t @ TypeDefinition::Interface(_))
            | Some(t @ TypeDefinition::Union(_)) => t,
            _ => return Ok(vec![]),
        };

        let mut fields = self.get_key_fields(return_type, service);
        if let Some(provides) = self.schema.metadata.provides(type_name(parent_type), field_def.name) {
            fields.extend(self.expand_selection_fields(return_type, provides)?);
        }
        Ok(fields)
    }

    /// Expands a bare field selection set (as found in `@key`/`@requires`/
    /// `@provides` metadata) into a `FieldSet`. These selections are always
    /// flat field lists over a concrete type, never fragments.
    fn expand_selection_fields(
        &self,
        parent_type: &'q TypeDefinition<'q>,
        selection_set: &SelectionSet<'q>,
    ) -> Result<FieldSet<'q>> {
        let mut fields = Vec::new();
        for selection in &selection_set.items {
            if let Selection::Field(field_node) = selection {
                let field_def = self.get_field_def(parent_type, field_node)?;
                fields.push(Field {
                    parent_type,
                    field_node: field_node.clone(),
                    field_def,
                });
            }
        }
        Ok(fields)
    }

    /// Every variable referenced under `selection_set`, resolved to its
    /// declared argument type and effective default (the operation's own
    /// variable-definition default, falling back to the schema argument's).
    pub fn get_variable_usages(
        &self,
        parent_type: &'q TypeDefinition<'q>,
        selection_set: &SelectionSet<'q>,
    ) -> Result<LinkedHashMap<Name<'q>, VariableUsage<'q>>> {
        let mut usages = LinkedHashMap::new();
        self.walk_selection_set(parent_type, selection_set, &mut usages)?;
        Ok(usages)
    }

    fn walk_selection_set(
        &self,
        parent_type: &'q TypeDefinition<'q>,
        selection_set: &SelectionSet<'q>,
        usages: &mut LinkedHashMap<Name<'q>, VariableUsage<'q>>,
    ) -> Result<()> {
        for selection in &selection_set.items {
            match selection {
                Selection::Field(field_node) => {
                    let field_def = self.get_field_def(parent_type, field_node)?;

                    for (arg_name, value) in &field_node.arguments {
                        let arg_def = field_def.arguments.iter().find(|a| &a.name == arg_name);
                        self.collect_variable_usage(
                            value,
                            arg_def.map(|a| (a.value_type.clone(), a.default_value.clone())),
                            usages,
                        );
                    }
                    for directive in &field_node.directives {
                        for (_, value) in &directive.arguments {
                            self.collect_variable_usage(value, None, usages);
                        }
                    }

                    if !field_node.selection_set.items.is_empty() {
                        let return_type_name = ast::named_type_name(&field_def.field_type);
                        if let Some(return_type) = self.schema.type_by_name(return_type_name) {
                            self.walk_selection_set(return_type, &field_node.selection_set, usages)?;
                        }
                    }
                }
                Selection::InlineFragment(frag) => {
                    let target = match &frag.type_condition {
                        Some(TypeCondition::On(name)) => self.schema.type_by_name(name).unwrap_or(parent_type),
                        None => parent_type,
                    };
                    self.walk_selection_set(target, &frag.selection_set, usages)?;
                }
                Selection::FragmentSpread(_) => {}
            }
        }
        Ok(())
    }

    fn collect_variable_usage(
        &self,
        value: &Value<'q>,
        type_and_default: Option<(ast::GqlType<'q>, Option<Value<'q>>)>,
        usages: &mut LinkedHashMap<Name<'q>, VariableUsage<'q>>,
    ) {
        match value {
            Value::Variable(name) => {
                let name: Name<'q> = *name;
                if usages.contains_key(name) {
                    return;
                }
                let (input_type, arg_default) = match type_and_default {
                    Some(pair) => pair,
                    None => return,
                };
                let default_value = self.resolve_default(name, arg_default.as_ref());
                usages.insert(
                    name,
                    VariableUsage {
                        name,
                        input_type,
                        default_value,
                    },
                );
            }
            Value::List(items) => {
                for item in items {
                    self.collect_variable_usage(item, type_and_default.clone(), usages);
                }
            }
            Value::Object(fields) => {
                for value in fields.values() {
                    self.collect_variable_usage(value, type_and_default.clone(), usages);
                }
            }
            _ => {}
        }
    }

    /// The operation's own variable-definition default overrides the schema
    /// argument's default; the latter applies only when the operation
    /// declares none.
    fn resolve_default(&self, var_name: &str, arg_default: Option<&Value<'q>>) -> Option<Value<'q>> {
        let operation_default = self
            .operation_context
            .operation
            .variable_definitions
            .iter()
            .find(|vd| vd.name == var_name)
            .and_then(|vd| vd.default_value.clone());

        operation_default.or_else(|| arg_default.cloned())
    }
}
