use crate::ast::{
    self, Name, ObjectType, Operation, QueryDocument, SchemaDocument, SelectionSet, TypeDefinition,
};
use graphql_parser::query::Definition as QueryDefinition;
use graphql_parser::schema::Definition as SchemaDefinitionItem;
use linked_hash_map::LinkedHashMap;
use std::collections::HashMap;
use std::hash::Hash;

/// One top-level operation in a document, with its selection set flattened
/// out of the `Query`/`Mutation`/`Subscription`/bare-selection-set variants
/// `graphql_parser` distinguishes.
#[derive(Debug, Clone, PartialEq)]
pub struct Op<'q> {
    pub name: Option<Name<'q>>,
    pub kind: Operation,
    pub selection_set: &'q SelectionSet<'q>,
    pub variable_definitions: &'q [ast::VariableDefinition<'q>],
}

pub fn get_operations<'q>(document: &'q QueryDocument<'q>) -> Vec<Op<'q>> {
    document
        .definitions
        .iter()
        .filter_map(|d| match d {
            QueryDefinition::Operation(op) => Some(op_from(op)),
            QueryDefinition::Fragment(_) => None,
        })
        .collect()
}

fn op_from<'q>(op: &'q ast::OperationDefinition<'q>) -> Op<'q> {
    use graphql_parser::query::OperationDefinition::*;
    match op {
        SelectionSet(ss) => Op {
            name: None,
            kind: Operation::Query,
            selection_set: ss,
            variable_definitions: &[],
        },
        Query(q) => Op {
            name: q.name,
            kind: Operation::Query,
            selection_set: &q.selection_set,
            variable_definitions: &q.variable_definitions,
        },
        Mutation(m) => Op {
            name: m.name,
            kind: Operation::Mutation,
            selection_set: &m.selection_set,
            variable_definitions: &m.variable_definitions,
        },
        Subscription(s) => Op {
            name: s.name,
            kind: Operation::Subscription,
            selection_set: &s.selection_set,
            variable_definitions: &s.variable_definitions,
        },
    }
}

pub fn type_name<'q>(type_def: &'q TypeDefinition<'q>) -> Name<'q> {
    match type_def {
        TypeDefinition::Scalar(t) => t.name,
        TypeDefinition::Object(t) => t.name,
        TypeDefinition::Interface(t) => t.name,
        TypeDefinition::Union(t) => t.name,
        TypeDefinition::Enum(t) => t.name,
        TypeDefinition::InputObject(t) => t.name,
    }
}

pub fn names_to_types<'q>(schema: &'q SchemaDocument<'q>) -> HashMap<&'q str, &'q TypeDefinition<'q>> {
    schema
        .definitions
        .iter()
        .filter_map(|d| match d {
            SchemaDefinitionItem::TypeDefinition(td) => Some(td),
            _ => None,
        })
        .map(|td| (type_name(td), td))
        .collect()
}

/// For every type, the set of concrete object types that can show up at
/// runtime where that type is expected: an object type maps to itself, a
/// union maps to its members, and an interface maps to every object that
/// declares it in `implements`.
pub fn build_possible_types<'q>(
    schema: &'q SchemaDocument<'q>,
    types: &HashMap<&'q str, &'q TypeDefinition<'q>>,
) -> HashMap<&'q str, Vec<&'q ObjectType<'q>>> {
    let mut implementing_types: HashMap<&'q str, Vec<&'q ObjectType<'q>>> = HashMap::new();

    let ordered_types: Vec<&TypeDefinition> = schema
        .definitions
        .iter()
        .filter_map(|d| match d {
            SchemaDefinitionItem::TypeDefinition(td) => Some(td),
            _ => None,
        })
        .collect();

    for td in ordered_types {
        match td {
            TypeDefinition::Union(union) => {
                let objects_for_union = union
                    .types
                    .iter()
                    .filter_map(|name| match types.get(name) {
                        Some(TypeDefinition::Object(obj)) => Some(obj),
                        _ => None,
                    })
                    .collect();
                implementing_types.insert(union.name, objects_for_union);
            }
            TypeDefinition::Object(obj) => {
                implementing_types.insert(obj.name, vec![obj]);

                for &iface_name in &obj.implements_interfaces {
                    implementing_types.entry(iface_name).or_default().push(obj);
                }
            }
            _ => (),
        }
    }

    implementing_types
}

pub fn group_by<T, K, F>(v: Vec<T>, f: F) -> LinkedHashMap<K, Vec<T>>
where
    F: Fn(&T) -> K,
    K: Hash + PartialEq + Eq,
{
    let mut map: LinkedHashMap<K, Vec<T>> = LinkedHashMap::new();
    for element in v.into_iter() {
        map.entry(f(&element)).or_default().push(element);
    }
    map
}

pub trait Head<T> {
    /// Splits a non-empty vector into its first element and the rest.
    fn head(self) -> (T, Vec<T>);
}

impl<T> Head<T> for Vec<T> {
    fn head(self) -> (T, Vec<T>) {
        let mut iter = self.into_iter();
        let head = iter.next().expect("head called on an empty Vec");
        (head, iter.collect())
    }
}
