//! Partitions a GraphQL operation across the services of a federated schema
//! into an executable fetch plan.
//!
//! The two entry points mirror `spec.md` §4.1 and §4.4-4.5: build an
//! [`OperationContext`] once per incoming request, then hand it plus the
//! composed [`FederationSchema`] to [`build_query_plan`] to get the
//! [`QueryPlan`] the executor runs.

pub mod assemble;
pub mod ast;
pub mod collect;
pub mod consts;
pub mod context;
pub mod error;
pub mod groups;
pub mod helpers;
pub mod model;
pub mod schema;
pub mod split;

use std::collections::HashSet;

pub use context::{build_operation_context, OperationContext, QueryPlanningContext, VariableUsage};
pub use error::{PlanningError, Result};
pub use model::{FetchNode, FlattenNode, ParallelNode, PlanNode, QueryPlan, SequenceNode};
pub use schema::{FederationMetadata, FederationSchema};

use ast::Operation;

/// Builds the executable plan for an already-resolved operation, per §4.1:
/// collect the operation's root fields, split them across services (in
/// parallel for queries, serially for mutations — subscriptions are rejected
/// by [`build_operation_context`] before a `QueryPlanningContext` ever
/// exists), and assemble the resulting groups into a plan tree.
#[tracing::instrument(skip_all)]
pub fn build_query_plan<'q>(
    operation_context: &'q OperationContext<'q>,
    schema: &'q FederationSchema<'q>,
) -> Result<QueryPlan> {
    let context = QueryPlanningContext::new(operation_context, schema);
    let op = &operation_context.operation;
    tracing::debug!(kind = ?op.kind, "building query plan");

    let root_type = schema.root_type(op.kind).ok_or_else(|| PlanningError::MissingRootType {
        operation: match op.kind {
            Operation::Query => "query",
            Operation::Mutation => "mutation",
            Operation::Subscription => "subscription",
        }
        .to_string(),
    })?;

    let mut fields = Vec::new();
    let mut visited_fragments = HashSet::new();
    collect::collect_fields(&context, root_type, op.selection_set, &mut fields, &mut visited_fragments)?;

    let groups = match op.kind {
        Operation::Mutation => split::split_root_fields_serially(&context, root_type, fields)?,
        _ => split::split_root_fields(&context, root_type, fields)?,
    };

    let node = assemble::wrap_root_groups(&context, groups, op.kind == Operation::Mutation)?;
    Ok(QueryPlan { node })
}
