//! End-to-end coverage over `build_operation_context` + `build_query_plan`,
//! one test per scenario enumerated in the spec's worked-examples section.
//! Schemas and queries are small, hand-written SDL/query text; federation
//! metadata (`@key`/`@requires`/`@provides` equivalents) is attached
//! programmatically through `FederationMetadata`'s builder methods, since
//! this crate consumes already-composed metadata rather than parsing
//! directives itself.

use federation_query_planner::{
    build_operation_context, build_query_plan, FederationMetadata, FederationSchema, PlanNode, PlanningError,
};
use graphql_parser::query::{Field as QueryFieldNode, Selection, SelectionSet};
use graphql_parser::Pos;

fn pos() -> Pos {
    Pos { line: 0, column: 0 }
}

fn span() -> (Pos, Pos) {
    (pos(), pos())
}

/// A flat `{ a b c }` selection set, as used in `@key`/`@requires`/`@provides`
/// metadata — always bare field lists over a concrete type.
fn field_selection<'q>(names: &[&'q str]) -> SelectionSet<'q, &'q str> {
    SelectionSet {
        span: span(),
        items: names
            .iter()
            .map(|&name| {
                Selection::Field(QueryFieldNode {
                    position: pos(),
                    alias: None,
                    name,
                    arguments: vec![],
                    directives: vec![],
                    selection_set: SelectionSet { span: span(), items: vec![] },
                })
            })
            .collect(),
    }
}

/// Renders a `PlanNode` into a compact, human-readable string for assertions.
fn describe(node: &PlanNode) -> String {
    match node {
        PlanNode::Fetch(f) => {
            let mut s = format!("Fetch({}, {}", f.service_name, normalize(&f.selection_set));
            if let Some(r) = &f.requires {
                s.push_str(&format!(", requires={}", normalize(r)));
            }
            if !f.variable_usages.is_empty() {
                s.push_str(&format!(", vars={:?}", f.variable_usages));
            }
            s.push(')');
            s
        }
        PlanNode::Flatten(fl) => format!("Flatten({:?}, {})", fl.path, describe(&fl.node)),
        PlanNode::Sequence(s) => format!(
            "Sequence[{}]",
            s.nodes.iter().map(describe).collect::<Vec<_>>().join(", ")
        ),
        PlanNode::Parallel(p) => format!(
            "Parallel[{}]",
            p.nodes.iter().map(describe).collect::<Vec<_>>().join(", ")
        ),
    }
}

fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Builds a `FederationMetadata` whose lifetime is inferred from how the
/// result is used, rather than frozen at the point the builder calls run —
/// letting each test's metadata (built entirely from `'static` literals)
/// still unify against the shorter lifetime of the locally parsed schema.
fn build_metadata<'q>(f: impl FnOnce(&mut FederationMetadata<'q>)) -> FederationMetadata<'q> {
    let mut metadata = FederationMetadata::new();
    f(&mut metadata);
    metadata
}

macro_rules! plan {
    ($schema_sdl:expr, $build_metadata:expr, $query:expr) => {{
        // `OperationContext`/`FederationSchema` close over the document
        // they're parsed from with an invariant lifetime, which makes a
        // same-block `let` binding subject to drop-check's conservative
        // outlives requirement regardless of the two never actually being
        // used past this block. Leaking sidesteps it the way a test harness
        // that doesn't care about freeing memory can afford to.
        let schema_doc: &'static _ = Box::leak(Box::new(graphql_parser::parse_schema::<&str>($schema_sdl).unwrap()));
        let query_doc: &'static _ = Box::leak(Box::new(graphql_parser::parse_query::<&str>($query).unwrap()));
        let metadata = build_metadata($build_metadata);
        let schema: &'static _ = Box::leak(Box::new(FederationSchema::new(schema_doc, metadata)));
        let op_context: &'static _ = Box::leak(Box::new(build_operation_context(schema_doc, query_doc, None).unwrap()));
        build_query_plan(op_context, schema)
    }};
}

#[test]
fn single_service_query_is_one_fetch() {
    let sdl = r#"
        schema { query: Query }
        type Query { me: User }
        type User { name: String }
    "#;
    let metadata_builder = |m: &mut FederationMetadata| {
        m.set_field_service("Query", "me", "acc");
        m.set_field_service("User", "name", "acc");
    };

    let plan = plan!(sdl, metadata_builder, "{ me { name } }").unwrap();
    assert_eq!(describe(&plan.node.unwrap()), "Fetch(acc, { me { name } })");
}

#[test]
fn single_service_round_trip_through_a_fragment() {
    let sdl = r#"
        schema { query: Query }
        type Query { me: User }
        type User { name: String }
    "#;
    let metadata_builder = |m: &mut FederationMetadata| {
        m.set_field_service("Query", "me", "acc");
        m.set_field_service("User", "name", "acc");
    };

    let plan = plan!(sdl, metadata_builder, "query { me { ...F } } fragment F on User { name }").unwrap();
    assert_eq!(describe(&plan.node.unwrap()), "Fetch(acc, { me { name } })");
}

#[test]
fn entity_extension_spins_off_a_flattened_dependent_fetch() {
    let sdl = r#"
        schema { query: Query }
        type Query { me: User }
        type User { id: ID name: String reviews: [Review!]! }
        type Review { body: String }
    "#;
    let metadata_builder = |m: &mut FederationMetadata| {
        m.set_field_service("Query", "me", "acc");
        m.set_base_service("User", "acc");
        m.add_key("User", "acc", field_selection(&["id"]));
        m.add_key("User", "reviews", field_selection(&["id"]));
        m.set_field_service("User", "name", "acc");
        m.set_field_service("User", "reviews", "reviews");
        m.set_field_service("Review", "body", "reviews");
    };

    let plan = plan!(sdl, metadata_builder, "{ me { name reviews { body } } }").unwrap();
    let description = describe(&plan.node.unwrap());

    // The base fetch must carry the entity's key alongside whatever else it
    // selected, and the dependent fetch must declare that key as `requires`.
    assert!(description.starts_with("Sequence[Fetch(acc, { me {"));
    assert!(description.contains("__typename"));
    assert!(description.contains("id"));
    assert!(description.contains("name"));
    assert!(description.contains(
        "Flatten([\"me\"], Fetch(reviews, { reviews { body } }, requires={ __typename id }))"
    ));
}

#[test]
fn independent_root_fields_run_in_parallel() {
    let sdl = r#"
        schema { query: Query }
        type Query { me: User topProducts: [Product!]! }
        type User { name: String }
        type Product { upc: String }
    "#;
    let metadata_builder = |m: &mut FederationMetadata| {
        m.set_field_service("Query", "me", "acc");
        m.set_field_service("Query", "topProducts", "products");
        m.set_field_service("User", "name", "acc");
        m.set_field_service("Product", "upc", "products");
    };

    let plan = plan!(sdl, metadata_builder, "{ me { name } topProducts { upc } }").unwrap();
    assert_eq!(
        describe(&plan.node.unwrap()),
        "Parallel[Fetch(acc, { me { name } }), Fetch(products, { topProducts { upc } })]"
    );
}

#[test]
fn mutations_run_serially_grouped_by_consecutive_service() {
    let sdl = r#"
        schema { query: Query mutation: Mutation }
        type Query { _empty: String }
        type Mutation {
            createReview: Review
            updateReview: Review
            login: LoginResult
            deleteReview: Review
        }
        type Review { id: ID }
        type LoginResult { token: String }
    "#;
    let metadata_builder = |m: &mut FederationMetadata| {
        m.set_field_service("Mutation", "createReview", "reviews");
        m.set_field_service("Mutation", "updateReview", "reviews");
        m.set_field_service("Mutation", "login", "acc");
        m.set_field_service("Mutation", "deleteReview", "reviews");
        m.set_field_service("Review", "id", "reviews");
        m.set_field_service("LoginResult", "token", "acc");
    };

    let query = "mutation { createReview { id } updateReview { id } login { token } deleteReview { id } }";
    let plan = plan!(sdl, metadata_builder, query).unwrap();
    assert_eq!(
        describe(&plan.node.unwrap()),
        "Sequence[Fetch(reviews, { createReview { id } updateReview { id } }), \
         Fetch(acc, { login { token } }), \
         Fetch(reviews, { deleteReview { id } })]"
    );
}

#[test]
fn provides_lets_the_owning_service_answer_inline() {
    let sdl = r#"
        schema { query: Query }
        type Query { topReviews: [Review!]! }
        type Review { author: User }
        type User { id: ID name: String }
    "#;
    let metadata_builder = |m: &mut FederationMetadata| {
        m.set_field_service("Query", "topReviews", "reviews");
        m.set_field_service("Review", "author", "reviews");
        m.set_provides("Review", "author", field_selection(&["name"]));
        m.set_base_service("User", "acc");
        m.add_key("User", "acc", field_selection(&["id"]));
        m.set_field_service("User", "id", "acc");
        m.set_field_service("User", "name", "acc");
    };

    let plan = plan!(sdl, metadata_builder, "{ topReviews { author { name } } }").unwrap();
    assert_eq!(
        describe(&plan.node.unwrap()),
        "Fetch(reviews, { topReviews { author { name } } })"
    );
}

#[test]
fn abstract_type_with_divergent_owners_fans_out_per_concrete_type() {
    let sdl = r#"
        schema { query: Query }
        type Query { media: Media }
        interface Media { title: String }
        type Book implements Media { title: String }
        type Movie implements Media { title: String }
    "#;
    let metadata_builder = |m: &mut FederationMetadata| {
        m.set_field_service("Query", "media", "catalog");
        m.set_base_service("Book", "books");
        m.set_field_service("Book", "title", "books");
        m.set_base_service("Movie", "movies");
        m.set_field_service("Movie", "title", "movies");
    };

    let query = "{ media { ... on Book { title } ... on Movie { title } } }";
    let plan = plan!(sdl, metadata_builder, query).unwrap();
    let description = describe(&plan.node.unwrap());

    assert!(description.starts_with("Sequence[Fetch(catalog, { media {"));
    assert!(description.contains("... on Book { __typename }"));
    assert!(description.contains("... on Movie { __typename }"));
    assert!(description.contains(
        "Flatten([\"media\"], Fetch(books, { title }, requires={ __typename }))"
    ));
    assert!(description.contains(
        "Flatten([\"media\"], Fetch(movies, { title }, requires={ __typename }))"
    ));
}

#[test]
fn subscriptions_are_rejected_before_planning_starts() {
    let sdl = r#"
        schema { query: Query subscription: Subscription }
        type Query { _empty: String }
        type Subscription { ping: String }
    "#;
    let schema_doc = graphql_parser::parse_schema::<&str>(sdl).unwrap();
    let query_doc = graphql_parser::parse_query::<&str>("subscription { ping }").unwrap();

    match build_operation_context(&schema_doc, &query_doc, None) {
        Err(err) => assert_eq!(err, PlanningError::SubscriptionsUnsupported),
        Ok(_) => panic!("expected subscriptions to be rejected"),
    };
}

#[test]
fn requires_chains_through_an_intermediate_base_service_hop() {
    // `featuredUser` is itself owned by `reviews`, so resolving `socialScore`
    // (owned by `social`, base `acc`) needs two hops: first back to the base
    // service for the entity's key, then on to `social` with that key plus
    // the extra field `socialScore` requires.
    let sdl = r#"
        schema { query: Query }
        type Query { featuredUser: User }
        type User { id: ID friendCount: Int socialScore: Int }
    "#;
    let metadata_builder = |m: &mut FederationMetadata| {
        m.set_field_service("Query", "featuredUser", "reviews");
        m.set_base_service("User", "acc");
        m.add_key("User", "acc", field_selection(&["id"]));
        m.add_key("User", "reviews", field_selection(&["id"]));
        m.set_field_service("User", "socialScore", "social");
        m.set_requires("User", "socialScore", field_selection(&["friendCount"]));
    };

    let plan = plan!(sdl, metadata_builder, "{ featuredUser { socialScore } }").unwrap();
    let description = describe(&plan.node.unwrap());

    assert!(description.starts_with("Sequence[Fetch(reviews, { featuredUser { __typename id } })"));
    assert!(description.contains(
        "Flatten([\"featuredUser\"], Fetch(acc, { __typename friendCount }, requires={ __typename id }))"
    ));
    assert!(description.contains(
        "Flatten([\"featuredUser\"], Fetch(social, { socialScore }, requires={ __typename friendCount }))"
    ));
}

#[test]
fn two_hop_requires_without_a_base_hop_key_is_missing_keys() {
    // Same shape as `requires_chains_through_an_intermediate_base_service_hop`,
    // but `reviews` never declares a `@key` for `User` — the intermediate
    // base-service hop has nothing to key the entity by.
    let sdl = r#"
        schema { query: Query }
        type Query { featuredUser: User }
        type User { id: ID friendCount: Int socialScore: Int }
    "#;
    let metadata_builder = |m: &mut FederationMetadata| {
        m.set_field_service("Query", "featuredUser", "reviews");
        m.set_base_service("User", "acc");
        m.add_key("User", "acc", field_selection(&["id"]));
        m.set_field_service("User", "socialScore", "social");
        m.set_requires("User", "socialScore", field_selection(&["friendCount"]));
    };

    let err = plan!(sdl, metadata_builder, "{ featuredUser { socialScore } }").unwrap_err();
    assert_eq!(
        err,
        PlanningError::MissingKeys {
            parent_type: "User".to_string(),
            service: "reviews".to_string(),
        }
    );
}

#[test]
fn value_type_is_shared_verbatim_with_no_dependent_fetch() {
    let sdl = r#"
        schema { query: Query }
        type Query { me: User topProducts: [Product!]! }
        type User { address: Address }
        type Product { shipping: Address }
        type Address { city: String }
    "#;
    let metadata_builder = |m: &mut FederationMetadata| {
        m.set_field_service("Query", "me", "acc");
        m.set_field_service("Query", "topProducts", "products");
        m.set_field_service("User", "address", "acc");
        m.set_field_service("Product", "shipping", "products");
    };

    let plan = plan!(sdl, metadata_builder, "{ me { address { city } } topProducts { shipping { city } } }").unwrap();
    assert_eq!(
        describe(&plan.node.unwrap()),
        "Parallel[Fetch(acc, { me { address { city } } }), \
         Fetch(products, { topProducts { shipping { city } } })]"
    );
}

#[test]
fn introspection_root_fields_are_dropped_rather_than_planned() {
    let sdl = r#"
        schema { query: Query }
        type Query { me: String }
    "#;
    let metadata_builder = |m: &mut FederationMetadata| {
        m.set_field_service("Query", "me", "acc");
    };

    let plan = plan!(sdl, metadata_builder, "{ me __schema { queryType { name } } __type(name: \"Query\") { name } }").unwrap();
    assert_eq!(describe(&plan.node.unwrap()), "Fetch(acc, { me })");
}
