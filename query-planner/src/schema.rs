use crate::ast::{Name, ObjectType, Operation, SchemaDocument, SelectionSet, TypeDefinition};
use crate::helpers::{build_possible_types, names_to_types, type_name};
use graphql_parser::schema::Definition as SchemaDefinitionItem;
use std::collections::HashMap;

/// Per-`(type, service)` federation metadata attached to an object type, as
/// described in `spec.md` §3: the service that "owns" the type's identity
/// plus the key selections that let other services re-enter it.
#[derive(Debug, Default, Clone)]
pub struct TypeFederationMetadata<'q> {
    pub base_service: Option<String>,
    pub keys: HashMap<String, Vec<SelectionSet<'q>>>,
    pub externals: HashMap<String, Vec<Name<'q>>>,
}

/// Per-`(type, field)` federation metadata: the service that resolves the
/// field, and the extra selections it requires as input or provides inline.
#[derive(Debug, Default, Clone)]
pub struct FieldFederationMetadata<'q> {
    pub service: Option<String>,
    pub requires: Option<SelectionSet<'q>>,
    pub provides: Option<SelectionSet<'q>>,
}

/// Read-only federation metadata for a composed schema, supplied by the
/// composition pipeline. The planner never derives this from directive text;
/// it consumes it as already-resolved data, per the Non-goals in `spec.md`
/// §1 ("Schema composition ... cross-service validation").
#[derive(Debug, Default, Clone)]
pub struct FederationMetadata<'q> {
    types: HashMap<Name<'q>, TypeFederationMetadata<'q>>,
    fields: HashMap<(Name<'q>, Name<'q>), FieldFederationMetadata<'q>>,
}

impl<'q> FederationMetadata<'q> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_base_service(&mut self, type_name: Name<'q>, service: impl Into<String>) -> &mut Self {
        self.types.entry(type_name).or_default().base_service = Some(service.into());
        self
    }

    pub fn add_key(&mut self, type_name: Name<'q>, service: impl Into<String>, key: SelectionSet<'q>) -> &mut Self {
        self.types
            .entry(type_name)
            .or_default()
            .keys
            .entry(service.into())
            .or_default()
            .push(key);
        self
    }

    pub fn add_external(&mut self, type_name: Name<'q>, service: impl Into<String>, field: Name<'q>) -> &mut Self {
        self.types
            .entry(type_name)
            .or_default()
            .externals
            .entry(service.into())
            .or_default()
            .push(field);
        self
    }

    pub fn set_field_service(&mut self, type_name: Name<'q>, field_name: Name<'q>, service: impl Into<String>) -> &mut Self {
        self.fields.entry((type_name, field_name)).or_default().service = Some(service.into());
        self
    }

    pub fn set_requires(&mut self, type_name: Name<'q>, field_name: Name<'q>, requires: SelectionSet<'q>) -> &mut Self {
        self.fields.entry((type_name, field_name)).or_default().requires = Some(requires);
        self
    }

    pub fn set_provides(&mut self, type_name: Name<'q>, field_name: Name<'q>, provides: SelectionSet<'q>) -> &mut Self {
        self.fields.entry((type_name, field_name)).or_default().provides = Some(provides);
        self
    }

    pub fn base_service<'a>(&'a self, type_name: &str) -> Option<&'a str> {
        self.types.get(type_name)?.base_service.as_deref()
    }

    pub fn field_service<'a>(&'a self, type_name: &'q str, field_name: &'q str) -> Option<&'a str> {
        self.fields.get(&(type_name, field_name))?.service.as_deref()
    }

    /// The service the named field resolves on, falling back to the
    /// declaring type's base service.
    pub fn owning_service<'a>(&'a self, type_name: &'q str, field_name: &'q str) -> Option<&'a str> {
        self.field_service(type_name, field_name)
            .or_else(|| self.base_service(type_name))
    }

    /// A type with no declared base service and no per-field owners is a
    /// value type: plain data shared verbatim by whichever service asked for
    /// it, never worth a dependent fetch of its own.
    pub fn is_value_type(&self, type_name: &str) -> bool {
        match self.types.get(type_name) {
            None => true,
            Some(meta) => meta.base_service.is_none(),
        }
    }

    pub fn keys<'a>(&'a self, type_name: &str, service: &str) -> Option<&'a [SelectionSet<'q>]> {
        self.types.get(type_name)?.keys.get(service).map(Vec::as_slice)
    }

    pub fn requires<'a>(&'a self, type_name: &'q str, field_name: &'q str) -> Option<&'a SelectionSet<'q>> {
        self.fields.get(&(type_name, field_name))?.requires.as_ref()
    }

    pub fn provides<'a>(&'a self, type_name: &'q str, field_name: &'q str) -> Option<&'a SelectionSet<'q>> {
        self.fields.get(&(type_name, field_name))?.provides.as_ref()
    }
}

/// A composed multi-service schema: the standard GraphQL type system plus
/// the federation metadata table above.
pub struct FederationSchema<'q> {
    pub document: &'q SchemaDocument<'q>,
    pub metadata: FederationMetadata<'q>,
    types_by_name: HashMap<Name<'q>, &'q TypeDefinition<'q>>,
    possible_types: HashMap<Name<'q>, Vec<&'q ObjectType<'q>>>,
}

impl<'q> FederationSchema<'q> {
    pub fn new(document: &'q SchemaDocument<'q>, metadata: FederationMetadata<'q>) -> Self {
        let types_by_name = names_to_types(document);
        let possible_types = build_possible_types(document, &types_by_name);
        Self {
            document,
            metadata,
            types_by_name,
            possible_types,
        }
    }

    pub fn type_by_name(&self, name: &str) -> Option<&'q TypeDefinition<'q>> {
        self.types_by_name.get(name).copied()
    }

    /// The operation root type for `operation_kind`: an explicit `schema {
    /// ... }` definition wins, falling back to the `Query`/`Mutation`/
    /// `Subscription` convention.
    pub fn root_type(&self, operation_kind: Operation) -> Option<&'q TypeDefinition<'q>> {
        let explicit = self.document.definitions.iter().find_map(|d| match d {
            SchemaDefinitionItem::SchemaDefinition(def) => match operation_kind {
                Operation::Query => def.query,
                Operation::Mutation => def.mutation,
                Operation::Subscription => def.subscription,
            },
            _ => None,
        });

        let name = explicit.unwrap_or(match operation_kind {
            Operation::Query => "Query",
            Operation::Mutation => "Mutation",
            Operation::Subscription => "Subscription",
        });

        self.type_by_name(name)
    }

    /// Object types map to themselves; abstract types map to every object
    /// that can appear at runtime where they're expected.
    pub fn possible_types(&self, type_def: &'q TypeDefinition<'q>) -> Vec<&'q ObjectType<'q>> {
        match type_def {
            TypeDefinition::Object(obj) => vec![obj],
            _ => self
                .possible_types
                .get(type_name(type_def))
                .cloned()
                .unwrap_or_default(),
        }
    }
}
