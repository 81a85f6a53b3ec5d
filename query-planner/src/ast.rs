//! Thin aliases over `graphql_parser`'s AST, fixed to `&'q str` text storage.
//!
//! The planner borrows directly from the caller's parsed schema and query
//! documents for the lifetime of a single planning call; nothing here is
//! owned or copied onto the heap beyond what `graphql_parser` itself does.

pub type Name<'q> = &'q str;

pub type QueryDocument<'q> = graphql_parser::query::Document<'q, &'q str>;
pub type OperationDefinition<'q> = graphql_parser::query::OperationDefinition<'q, &'q str>;
pub type FragmentDefinition<'q> = graphql_parser::query::FragmentDefinition<'q, &'q str>;
pub type SelectionSet<'q> = graphql_parser::query::SelectionSet<'q, &'q str>;
pub type Selection<'q> = graphql_parser::query::Selection<'q, &'q str>;
pub type QueryField<'q> = graphql_parser::query::Field<'q, &'q str>;
pub type FragmentSpread<'q> = graphql_parser::query::FragmentSpread<'q, &'q str>;
pub type InlineFragment<'q> = graphql_parser::query::InlineFragment<'q, &'q str>;
pub type TypeCondition<'q> = graphql_parser::query::TypeCondition<'q, &'q str>;
pub type VariableDefinition<'q> = graphql_parser::query::VariableDefinition<'q, &'q str>;
pub type Value<'q> = graphql_parser::query::Value<'q, &'q str>;
pub type Directive<'q> = graphql_parser::query::Directive<'q, &'q str>;

/// `graphql_parser` distinguishes operation kinds only by which
/// `OperationDefinition` variant is used; this flattens that into the plain
/// enum the rest of the planner reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Query,
    Mutation,
    Subscription,
}

/// `query::Type` and `schema::Type` are both plain re-exports of the same
/// underlying `common::Type`, so one alias covers a field's declared type
/// whether it was reached from a query argument or a schema field.
pub type GqlType<'q> = graphql_parser::query::Type<'q, &'q str>;

pub type SchemaDocument<'q> = graphql_parser::schema::Document<'q, &'q str>;
pub type TypeDefinition<'q> = graphql_parser::schema::TypeDefinition<'q, &'q str>;
pub type ObjectType<'q> = graphql_parser::schema::ObjectType<'q, &'q str>;
pub type InterfaceType<'q> = graphql_parser::schema::InterfaceType<'q, &'q str>;
pub type UnionType<'q> = graphql_parser::schema::UnionType<'q, &'q str>;
pub type SchemaField<'q> = graphql_parser::schema::Field<'q, &'q str>;

/// The named type at the bottom of a (possibly list- and non-null-wrapped)
/// type reference.
pub fn named_type_name<'q>(field_type: &GqlType<'q>) -> Name<'q> {
    use graphql_parser::query::Type;
    match field_type {
        Type::NamedType(name) => name,
        Type::ListType(inner) => named_type_name(inner),
        Type::NonNullType(inner) => named_type_name(inner),
    }
}

pub(crate) fn pos() -> graphql_parser::Pos {
    graphql_parser::Pos { line: 0, column: 0 }
}

pub(crate) fn span() -> (graphql_parser::Pos, graphql_parser::Pos) {
    (pos(), pos())
}
