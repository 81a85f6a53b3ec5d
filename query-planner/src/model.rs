use crate::ast::{Name, QueryField, TypeDefinition};
use crate::consts::TYPENAME_FIELD_NAME;
use crate::helpers::group_by;
use linked_hash_map::LinkedHashMap;
use serde::Serialize;

/// One selected field, tagged with the type it's selected under and the
/// schema field definition it resolved to. Two `Field`s with the same
/// response name and the same `parent_type` necessarily share field name and
/// arguments; only their subselections may differ, and must be merged.
#[derive(Debug, Clone)]
pub struct Field<'q> {
    pub parent_type: &'q TypeDefinition<'q>,
    /// Owned rather than borrowed: `completeField` (§4.4.3) replaces a
    /// field's subselection with the sub-group's planned fields, and
    /// synthesized fields (`__typename` inserted for runtime discrimination)
    /// have no node in the source document to borrow from.
    pub field_node: QueryField<'q>,
    pub field_def: crate::ast::SchemaField<'q>,
}

impl<'q> Field<'q> {
    pub fn response_name(&self) -> Name<'q> {
        self.field_node.alias.unwrap_or(self.field_node.name)
    }

    pub fn parent_type_name(&self) -> Name<'q> {
        crate::helpers::type_name(self.parent_type)
    }
}

/// An ordered sequence of selected fields. Order is the order fields were
/// first appended; it is never sorted, since plan output must stay
/// deterministic and byte-identical run over run for the same input.
pub type FieldSet<'q> = Vec<Field<'q>>;

/// True when two fields would collapse into a single selection: same
/// response name, same field name, same arguments. Selection-set
/// differences are never compared here, only merged by the caller.
pub fn matches_field<'q>(a: &Field<'q>, b: &Field<'q>) -> bool {
    a.response_name() == b.response_name()
        && a.field_node.name == b.field_node.name
        && a.field_node.arguments == b.field_node.arguments
}

/// Group a `FieldSet` by response name, preserving first-occurrence order.
pub fn group_by_response_name<'q>(fields: FieldSet<'q>) -> LinkedHashMap<Name<'q>, FieldSet<'q>> {
    group_by(fields, |f| f.response_name())
}

/// Further partitions a bucket already grouped by response name and parent
/// type into buckets that actually satisfy `matches_field` pairwise. A
/// validated operation never splits a bucket this way (two selections
/// sharing a response name and parent type always share field name and
/// arguments too), but the planner doesn't assume a validated operation, so
/// a field name or argument mismatch gets its own group instead of being
/// silently merged with an unrelated selection. Linear rather than hashed,
/// since `Value` isn't `Hash`; buckets are small enough for it not to matter.
pub fn group_by_match<'q>(fields: FieldSet<'q>) -> Vec<FieldSet<'q>> {
    let mut groups: Vec<FieldSet<'q>> = Vec::new();
    'fields: for field in fields {
        for group in &mut groups {
            if matches_field(&group[0], &field) {
                group.push(field);
                continue 'fields;
            }
        }
        groups.push(vec![field]);
    }
    groups
}

/// Group a `FieldSet` by the name of the parent type it was selected under,
/// preserving first-occurrence order.
pub fn group_by_parent_type<'q>(fields: FieldSet<'q>) -> LinkedHashMap<Name<'q>, FieldSet<'q>> {
    group_by(fields, |f| f.parent_type_name())
}

/// Response-name path to a value in a fetched result. List wrapper levels
/// are recorded as the literal token `"@"`, so the executor knows where to
/// flatten a dependent fetch's result back into its parent.
pub type ResponsePath = Vec<String>;

/// Push `response_name` onto `path`, then one `"@"` for every list wrapper
/// found walking `field_type` before its named type.
pub fn add_path<'q>(mut path: ResponsePath, response_name: Name<'q>, field_type: &crate::ast::GqlType<'q>) -> ResponsePath {
    use graphql_parser::query::Type;

    path.push(response_name.to_string());

    fn push_list_markers(path: &mut ResponsePath, t: &crate::ast::GqlType) {
        match t {
            Type::ListType(inner) => {
                path.push("@".to_string());
                push_list_markers(path, inner);
            }
            Type::NonNullType(inner) => push_list_markers(path, inner),
            Type::NamedType(_) => {}
        }
    }

    push_list_markers(&mut path, field_type);
    path
}

pub fn is_typename(name: &str) -> bool {
    name == TYPENAME_FIELD_NAME
}

/// A synthesized `__typename` selection, with no counterpart in the source
/// document. Built fresh every time it's needed rather than shared, since
/// `QueryField`/`Field` are owned values now.
pub fn typename_field_node<'q>() -> QueryField<'q> {
    QueryField {
        position: crate::ast::pos(),
        alias: None,
        name: TYPENAME_FIELD_NAME,
        arguments: vec![],
        directives: vec![],
        selection_set: graphql_parser::query::SelectionSet {
            span: crate::ast::span(),
            items: vec![],
        },
    }
}

pub fn typename_field_def<'q>() -> crate::ast::SchemaField<'q> {
    graphql_parser::schema::Field {
        position: crate::ast::pos(),
        description: None,
        name: TYPENAME_FIELD_NAME,
        arguments: vec![],
        field_type: graphql_parser::schema::Type::NonNullType(Box::new(
            graphql_parser::schema::Type::NamedType("String"),
        )),
        directives: vec![],
    }
}

pub fn typename_field<'q>(parent_type: &'q TypeDefinition<'q>) -> Field<'q> {
    Field {
        parent_type,
        field_node: typename_field_node(),
        field_def: typename_field_def(),
    }
}

/// A complete, executable query plan. `node` is absent only for an empty
/// operation (one whose root selection collapses to nothing, e.g. a query
/// made entirely of introspection fields).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub struct QueryPlan {
    pub node: Option<PlanNode>,
}

/// One node of the plan tree. Tagged exactly as described in the external
/// interface: a caller can serialize this directly to the executor's wire
/// format.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum PlanNode {
    Fetch(FetchNode),
    Flatten(FlattenNode),
    Sequence(SequenceNode),
    Parallel(ParallelNode),
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchNode {
    pub service_name: String,
    /// Rendered GraphQL selection set text, e.g. `"{ me { name } }"`.
    pub selection_set: String,
    /// Rendered `requires` selection, present only when this fetch depends
    /// on fields supplied by a parent fetch.
    pub requires: Option<String>,
    pub variable_usages: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlattenNode {
    pub path: ResponsePath,
    pub node: Box<PlanNode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SequenceNode {
    pub nodes: Vec<PlanNode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParallelNode {
    pub nodes: Vec<PlanNode>,
}
