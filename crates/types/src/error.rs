use nonempty::NonEmpty;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::adapter::AdapterError;
use crate::context::OperationKind;
use crate::ids::{FieldPath, ItemId, ListKey};

/// Errors raised while constructing or initializing a list. These are fatal
/// to startup and are never surfaced at request time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "unable to use list key `{key}`: both the singular (`{singular}`) and plural (`{plural}`) \
         forms are the same; provide explicit `singular` and `plural` overrides"
    )]
    AmbiguousPlural {
        key: ListKey,
        singular: String,
        plural: String,
    },

    #[error("fields of list `{0}` have already been initialized")]
    FieldsAlreadyInitialized(ListKey),

    #[error(
        "list `{0}` declares no `id` field and its adapter does not provide a default primary \
         key configuration"
    )]
    MissingPrimaryKeyStrategy(ListKey),

    #[error(
        "invalid field path `{field}` on list `{list}`: paths beginning with `_` are reserved \
         for auxiliary lists"
    )]
    ReservedFieldPath { list: ListKey, field: FieldPath },

    #[error("field `{list}.{field}` is missing a type")]
    MissingFieldType { list: ListKey, field: FieldPath },

    #[error("unknown field type `{type_name}` on field `{list}.{field}`")]
    UnknownFieldType {
        list: ListKey,
        field: FieldPath,
        type_name: String,
    },

    #[error(
        "field type `{type_name}` on field `{list}.{field}` is not supported by the `{adapter}` \
         adapter"
    )]
    UnsupportedFieldType {
        list: ListKey,
        field: FieldPath,
        type_name: String,
        adapter: String,
    },

    #[error("relationship field `{list}.{field}` references unknown list `{reference}`")]
    UnknownRelatedList {
        list: ListKey,
        field: FieldPath,
        reference: ListKey,
    },

    #[error("malformed cache hint on list `{list}`: {reason}")]
    MalformedCacheHint { list: ListKey, reason: String },

    #[error("malformed access configuration on `{subject}`: {reason}")]
    MalformedAccess { subject: String, reason: String },
}

/// Denial of a list- or field-level operation. The message deliberately does
/// not distinguish "item missing" from "access denied" so that access checks
/// never leak whether an item exists.
#[derive(Debug, Error)]
#[error("You do not have access to this resource")]
pub struct AccessDeniedError {
    pub kind: OperationKind,
    /// Ids the denial applies to, when known.
    pub item_ids: Option<Vec<ItemId>>,
    /// Field paths the acting user may not touch; empty for list-level denials.
    pub restricted_fields: Vec<FieldPath>,
}

impl AccessDeniedError {
    #[must_use]
    pub fn list_level(kind: OperationKind, item_ids: Option<Vec<ItemId>>) -> Self {
        AccessDeniedError {
            kind,
            item_ids,
            restricted_fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn field_level(item_ids: Option<Vec<ItemId>>, restricted_fields: Vec<FieldPath>) -> Self {
        AccessDeniedError {
            kind: OperationKind::Mutation,
            item_ids,
            restricted_fields,
        }
    }

    #[must_use]
    pub fn details(&self) -> serde_json::Value {
        json!({
            "type": self.kind.to_string(),
            "itemIds": self.item_ids,
            "restrictedFields": self.restricted_fields,
        })
    }
}

/// A single field's validation failure, as reported by a validator hook.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldValidationError {
    pub field: Option<FieldPath>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Aggregated validation failure for one pipeline phase. Raised at most once
/// per phase, carrying every collected error.
#[derive(Debug, Error)]
#[error("You attempted to perform an invalid mutation")]
pub struct ValidationFailureError {
    pub messages: NonEmpty<String>,
    pub errors: Vec<FieldValidationError>,
}

impl ValidationFailureError {
    #[must_use]
    pub fn new(errors: NonEmpty<FieldValidationError>) -> Self {
        let messages = errors.clone().map(|error| error.message);
        ValidationFailureError {
            messages,
            errors: errors.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn details(&self) -> serde_json::Value {
        json!({ "errors": self.errors })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LimitKind {
    MaxResults,
    MaxTotalResults,
}

impl std::fmt::Display for LimitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimitKind::MaxResults => f.write_str("maxResults"),
            LimitKind::MaxTotalResults => f.write_str("maxTotalResults"),
        }
    }
}

/// A query exceeded a configured result-count ceiling.
#[derive(Debug, Error)]
#[error("Your request exceeded server limits ({kind}: {limit})")]
pub struct LimitsExceededError {
    pub kind: LimitKind,
    pub limit: u64,
}

/// Request-time failure of a list operation. Terminal to the request, never
/// to the process.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error(transparent)]
    AccessDenied(#[from] AccessDeniedError),

    #[error(transparent)]
    Validation(#[from] ValidationFailureError),

    #[error(transparent)]
    LimitsExceeded(#[from] LimitsExceededError),

    #[error("adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("hook error: {0}")]
    Hook(String),
}

impl OperationError {
    /// Structured data suitable for a GraphQL error's `extensions` payload.
    #[must_use]
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            OperationError::AccessDenied(error) => Some(error.details()),
            OperationError::Validation(error) => Some(error.details()),
            OperationError::LimitsExceeded(error) => Some(json!({
                "type": error.kind,
                "limit": error.limit,
            })),
            OperationError::Adapter(_) | OperationError::Hook(_) => None,
        }
    }
}
