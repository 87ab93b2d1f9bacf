//! Shared vocabulary for the strata list engine: identifier newtypes, the
//! item/query data model, the error taxonomy, the storage-adapter contract
//! and the per-request context.

mod adapter;
mod context;
mod error;
mod ids;
mod item;

pub use adapter::{AdapterError, AdapterProvider, ListAdapter, PrimaryKeyConfig};
pub use context::{
    AccessControl, AccessDecision, AccessMeta, AllowAll, CacheHint, CacheScope, Context,
    Operation, OperationKind,
};
pub use error::{
    AccessDeniedError, ConfigError, FieldValidationError, LimitKind, LimitsExceededError,
    OperationError, ValidationFailureError,
};
pub use ids::{FieldPath, ItemId, ListKey, SchemaVariant};
pub use item::{IdFilter, Item, QueryArgs, QueryExtra, QueryResult, ResolvedData};
