/// Errors raised by the planner. Every variant is synchronous and aborts
/// planning; the planner never recovers from one of these internally.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PlanningError {
    #[error("subscriptions are not supported by the query planner")]
    SubscriptionsUnsupported,

    #[error("no operation found in document")]
    MissingOperation,

    #[error("operation `{0}` not found in document")]
    UnknownOperation(String),

    #[error("document defines multiple operations; an operation name must be provided")]
    AmbiguousOperation,

    #[error("field `{field}` not found on type `{parent_type}`")]
    UnknownField { parent_type: String, field: String },

    #[error("no owning or base service found for field `{field}` on type `{parent_type}`")]
    MissingOwningService { parent_type: String, field: String },

    #[error("no base service found for type `{parent_type}`")]
    MissingBaseService { parent_type: String },

    #[error("service `{service}` has no declared keys for type `{parent_type}`")]
    MissingKeys { parent_type: String, service: String },

    #[error("schema has no root type for {operation} operations")]
    MissingRootType { operation: String },
}

pub type Result<T> = std::result::Result<T, PlanningError>;
