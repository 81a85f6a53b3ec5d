pub const TYPENAME_FIELD_NAME: &str = "__typename";
pub const INTROSPECTION_SCHEMA_FIELD_NAME: &str = "__schema";
pub const INTROSPECTION_TYPE_FIELD_NAME: &str = "__type";

// https://github.com/graphql/graphql-js/blob/7b3241329e1ff49fb647b043b80568f0cf9e1a7c/src/type/introspection.js#L500-L509
pub fn is_introspection_type(name: &str) -> bool {
    name == "__Schema"
        || name == "__Directive"
        || name == "__DirectiveLocation"
        || name == "__Type"
        || name == "__Field"
        || name == "__InputValue"
        || name == "__EnumValue"
        || name == "__TypeKind"
}

/// True for the two root introspection entry points (`__schema`, `__type`),
/// as opposed to `is_introspection_type`, which looks at a field's *return*
/// type rather than its own name.
pub fn is_introspection_field(name: &str) -> bool {
    name == INTROSPECTION_SCHEMA_FIELD_NAME || name == INTROSPECTION_TYPE_FIELD_NAME
}
